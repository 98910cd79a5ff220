//! Assistant instructions and per-instruction message composition.

use whiteboard_core::ShapeStore;

const COORDINATES: &str = "The canvas origin (0, 0) is at its centre. \
x increases to the right and y increases downward. \
Shapes are rectangles positioned by x and y with width w and height h. \
Colors are written as hsl(h, s%, l%).";

pub struct PromptBuilder;

impl PromptBuilder {
    /// Fixed instructions the assistant is created with.
    pub fn instructions() -> String {
        format!(
            "You are the drawing assistant of a shared whiteboard. \
             Carry out the user's request by calling createShape to add rectangles \
             and editExistingShape to change existing ones. \
             Every request comes with the current shapes as JSON; refer to shapes by their id. \
             If a tool call returns an error, correct the arguments and try again.\n\n{COORDINATES}"
        )
    }

    /// The user message for one instruction: the text, the current shapes, and
    /// a reminder of the coordinate system.
    pub fn user_message(instruction: &str, store: &ShapeStore) -> String {
        format!(
            "{instruction}\n\nCurrent shapes: {}\n\n{COORDINATES}",
            store.to_json()
        )
    }
}
