use std::sync::Arc;

use rand::Rng;
use tracing::{debug, warn};

use whiteboard_core::{ShapeId, ShapeStore, ToolCall, ToolOutput, ToolSchema};

use crate::error::ToolError;
use crate::shape_tools::{ShapeTool, ToolKind};

/// Upper bound (exclusive) of generated shape ids.
pub const SHAPE_ID_RANGE: ShapeId = 100_000;

/// Draws tried before giving up on finding a free id.
const MAX_ID_DRAWS: usize = 16;

type IdSource = Arc<dyn Fn() -> ShapeId + Send + Sync>;

/// Routes assistant tool calls to the shape tools.
///
/// Ids for new shapes are drawn uniformly from `[0, SHAPE_ID_RANGE)`. A draw
/// that hits a live id is redrawn.
#[derive(Clone)]
pub struct ToolRegistry {
    next_id: IdSource,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(|| rand::thread_rng().gen_range(0..SHAPE_ID_RANGE)),
        }
    }

    /// Use a fixed id source instead of random draws.
    pub fn with_id_source(next_id: impl Fn() -> ShapeId + Send + Sync + 'static) -> Self {
        Self {
            next_id: Arc::new(next_id),
        }
    }

    /// Schemas of every tool, in a fixed order.
    pub fn describe_tools(&self) -> Vec<ToolSchema> {
        ToolKind::ALL.iter().map(ToolKind::schema).collect()
    }

    /// Answer one tool call. Failures become the output text.
    pub fn dispatch(&self, store: &mut ShapeStore, call: &ToolCall) -> ToolOutput {
        debug!(tool = %call.name, call_id = %call.id, "Dispatching tool call");

        let output = match self.run(store, &call.name, &call.arguments) {
            Ok(()) => format!("Success. Current shapes: {}", store.to_json()),
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool call failed");
                format!("Error: {e}")
            }
        };

        ToolOutput {
            tool_call_id: call.id.clone(),
            output,
        }
    }

    /// Answer a whole batch in the order given. Every call gets an output.
    pub fn dispatch_batch(&self, store: &mut ShapeStore, calls: &[ToolCall]) -> Vec<ToolOutput> {
        calls.iter().map(|call| self.dispatch(store, call)).collect()
    }

    fn run(&self, store: &mut ShapeStore, name: &str, arguments: &str) -> Result<(), ToolError> {
        let tool = ShapeTool::parse(name, arguments)?;
        let new_id = match tool.kind() {
            ToolKind::CreateShape => self.free_id(store),
            ToolKind::EditExistingShape => 0,
        };
        tool.apply(store, new_id)?;
        Ok(())
    }

    /// The last draw is returned even if taken; the store then rejects it.
    fn free_id(&self, store: &ShapeStore) -> ShapeId {
        let mut id = (self.next_id)();
        for _ in 1..MAX_ID_DRAWS {
            if store.find_by_id(id).is_none() {
                break;
            }
            id = (self.next_id)();
        }
        id
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
