//! Shared canvas model for the whiteboard server.
//!
//! Holds the shape types and store, the error taxonomy, and the contract of the
//! external assistant service that turns instructions into tool calls.

pub mod error;
pub mod run;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{CanvasError, ServiceError};
pub use run::{AssistantSpec, Run, RunStatus, ToolCall, ToolOutput, ToolSchema};
pub use store::ShapeStore;
pub use traits::AssistantService;
pub use types::{Shape, ShapeId, ShapePatch, ShapeUpdate, DEFAULT_COLOR};
