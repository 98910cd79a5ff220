//! The two shape tools offered to the assistant.
//!
//! Calls arrive as a function name plus a JSON argument string; they are parsed
//! into a [`ShapeTool`] before anything touches the store.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use whiteboard_core::{
    CanvasError, Shape, ShapeId, ShapePatch, ShapeStore, ToolSchema, DEFAULT_COLOR,
};

use crate::error::ToolError;

/// The closed set of tools the assistant may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    CreateShape,
    EditExistingShape,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::CreateShape, ToolKind::EditExistingShape];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::CreateShape => "createShape",
            ToolKind::EditExistingShape => "editExistingShape",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::CreateShape => {
                "Create a rectangle on the whiteboard. Coordinates are relative to the canvas \
                 centre; x grows to the right and y grows downward."
            }
            ToolKind::EditExistingShape => {
                "Change an existing rectangle, identified by id. Only the supplied fields are \
                 changed."
            }
        }
    }

    /// JSON Schema of the tool's arguments.
    pub fn parameters(&self) -> Value {
        match self {
            ToolKind::CreateShape => json!({
                "type": "object",
                "properties": {
                    "x": { "type": "number", "description": "Horizontal position of the shape" },
                    "y": { "type": "number", "description": "Vertical position of the shape" },
                    "w": { "type": "number", "description": "Width of the shape" },
                    "h": { "type": "number", "description": "Height of the shape" },
                    "color": { "type": "string", "description": "Fill color as hsl(h, s%, l%)" }
                },
                "required": ["x", "y", "w", "h"]
            }),
            ToolKind::EditExistingShape => json!({
                "type": "object",
                "properties": {
                    "id": { "type": "number", "description": "Id of the shape to edit" },
                    "x": { "type": "number", "description": "New horizontal position" },
                    "y": { "type": "number", "description": "New vertical position" },
                    "w": { "type": "number", "description": "New width" },
                    "h": { "type": "number", "description": "New height" },
                    "color": { "type": "string", "description": "New fill color as hsl(h, s%, l%)" }
                },
                "required": ["id"]
            }),
        }
    }

    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateShapeArgs {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default)]
    pub color: Option<String>,
}

impl CreateShapeArgs {
    pub fn into_shape(self, id: ShapeId) -> Shape {
        Shape {
            id,
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
            color: self.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EditShapeArgs {
    /// Numbers from the schema arrive as JSON numbers, possibly `42.0`.
    pub id: f64,
    #[serde(flatten)]
    pub patch: ShapePatch,
}

impl EditShapeArgs {
    fn shape_id(&self) -> Result<ShapeId, ToolError> {
        if self.id.is_finite() && self.id.fract() == 0.0 {
            Ok(self.id as ShapeId)
        } else {
            Err(ToolError::Canvas(CanvasError::Validation(format!(
                "id must be an integer, got {}",
                self.id
            ))))
        }
    }
}

/// A parsed, typed tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeTool {
    CreateShape(CreateShapeArgs),
    EditExistingShape(EditShapeArgs),
}

impl ShapeTool {
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| ToolError::UnknownFunction(name.to_string()))?;
        let tool = match kind {
            ToolKind::CreateShape => ShapeTool::CreateShape(decode(kind, arguments)?),
            ToolKind::EditExistingShape => ShapeTool::EditExistingShape(decode(kind, arguments)?),
        };
        Ok(tool)
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            ShapeTool::CreateShape(_) => ToolKind::CreateShape,
            ShapeTool::EditExistingShape(_) => ToolKind::EditExistingShape,
        }
    }

    /// Run the tool against the store. At most one store mutation happens, and
    /// only after validation passes.
    pub fn apply(self, store: &mut ShapeStore, new_id: ShapeId) -> Result<Shape, ToolError> {
        match self {
            ShapeTool::CreateShape(args) => {
                let shape = store.append(args.into_shape(new_id))?.clone();
                info!(id = shape.id, "Shape created by assistant");
                Ok(shape)
            }
            ShapeTool::EditExistingShape(args) => {
                let id = args.shape_id()?;
                let shape = store.mutate(id, &args.patch)?.clone();
                info!(id, "Shape edited by assistant");
                Ok(shape)
            }
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(kind: ToolKind, arguments: &str) -> Result<T, ToolError> {
    serde_json::from_str(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: kind.name(),
        message: e.to_string(),
    })
}
