use thiserror::Error;

use whiteboard_core::CanvasError;

/// Why a tool call could not be carried out.
///
/// These never abort a run; they are reported back to the assistant as the
/// call's output so it can adjust.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("function {0} could not be found")]
    UnknownFunction(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },

    #[error(transparent)]
    Canvas(#[from] CanvasError),
}
