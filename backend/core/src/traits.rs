use async_trait::async_trait;

use crate::error::ServiceError;
use crate::run::{AssistantSpec, Run, ToolOutput};

/// The external assistant service that interprets instructions.
///
/// Work happens inside a *thread* (one per session) through *runs*, which are
/// polled until they finish or ask for tool outputs.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Service name used in logs and errors (e.g., "openai").
    fn name(&self) -> &str;

    /// Register the assistant and return its id.
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, ServiceError>;

    /// Open a conversation thread and return its id.
    async fn create_thread(&self) -> Result<String, ServiceError>;

    /// Append a user message to the thread.
    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), ServiceError>;

    /// Start a run of the assistant over the thread.
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ServiceError>;

    /// Fetch the current state of a run.
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ServiceError>;

    /// Answer every pending tool call of a run in one batch.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, ServiceError>;
}
