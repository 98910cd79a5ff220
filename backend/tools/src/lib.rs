//! Tools the assistant uses to draw on the whiteboard.

pub mod error;
pub mod registry;
pub mod shape_tools;

pub use error::ToolError;
pub use registry::ToolRegistry;
pub use shape_tools::{CreateShapeArgs, EditShapeArgs, ShapeTool, ToolKind};
