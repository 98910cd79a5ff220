use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use whiteboard_core::{
    AssistantService, AssistantSpec, Run, RunStatus, ServiceError, ToolCall, ToolOutput,
};

const SERVICE: &str = "mock";

/// What the next status fetch or tool-output submission returns.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Status(RunStatus),
    ToolCalls(Vec<ToolCall>),
    Error(String),
}

#[derive(Default)]
struct Recorded {
    assistants: Vec<AssistantSpec>,
    threads: usize,
    messages: Vec<(String, String)>,
    runs_created: usize,
    retrievals: usize,
    submissions: Vec<Vec<ToolOutput>>,
}

/// An assistant service that replays a fixed script and records every call.
///
/// Once the script runs out, runs report `completed`.
pub struct ScriptedAssistant {
    script: Mutex<VecDeque<ScriptStep>>,
    fail_start: Option<String>,
    recorded: Mutex<Recorded>,
}

impl ScriptedAssistant {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fail_start: None,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn then(self, step: ScriptStep) -> Self {
        lock(&self.script).push_back(step);
        self
    }

    pub fn then_status(self, status: RunStatus) -> Self {
        self.then(ScriptStep::Status(status))
    }

    pub fn then_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        self.then(ScriptStep::ToolCalls(calls))
    }

    pub fn then_error(self, message: impl Into<String>) -> Self {
        self.then(ScriptStep::Error(message.into()))
    }

    /// Make `create_run` fail with the given message.
    pub fn failing_start(mut self, message: impl Into<String>) -> Self {
        self.fail_start = Some(message.into());
        self
    }

    pub fn assistants(&self) -> Vec<AssistantSpec> {
        lock(&self.recorded).assistants.clone()
    }

    pub fn threads_created(&self) -> usize {
        lock(&self.recorded).threads
    }

    /// `(thread_id, content)` of every appended message.
    pub fn messages(&self) -> Vec<(String, String)> {
        lock(&self.recorded).messages.clone()
    }

    pub fn runs_created(&self) -> usize {
        lock(&self.recorded).runs_created
    }

    pub fn retrievals(&self) -> usize {
        lock(&self.recorded).retrievals
    }

    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        lock(&self.recorded).submissions.clone()
    }

    fn next_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ServiceError> {
        let step = lock(&self.script).pop_front();
        match step {
            None => Ok(Run::new(run_id, thread_id, RunStatus::Completed)),
            Some(ScriptStep::Status(status)) => Ok(Run::new(run_id, thread_id, status)),
            Some(ScriptStep::ToolCalls(calls)) => {
                Ok(Run::new(run_id, thread_id, RunStatus::RequiresAction).with_tool_calls(calls))
            }
            Some(ScriptStep::Error(message)) => Err(ServiceError::unexpected(SERVICE, message)),
        }
    }
}

impl Default for ScriptedAssistant {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl AssistantService for ScriptedAssistant {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, ServiceError> {
        let mut recorded = lock(&self.recorded);
        recorded.assistants.push(spec.clone());
        Ok(format!("asst_{}", recorded.assistants.len()))
    }

    async fn create_thread(&self) -> Result<String, ServiceError> {
        let mut recorded = lock(&self.recorded);
        recorded.threads += 1;
        Ok(format!("thread_{}", recorded.threads))
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), ServiceError> {
        lock(&self.recorded)
            .messages
            .push((thread_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, _assistant_id: &str) -> Result<Run, ServiceError> {
        if let Some(message) = &self.fail_start {
            return Err(ServiceError::unexpected(SERVICE, message.clone()));
        }
        let mut recorded = lock(&self.recorded);
        recorded.runs_created += 1;
        Ok(Run::new(
            format!("run_{}", recorded.runs_created),
            thread_id,
            RunStatus::Queued,
        ))
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ServiceError> {
        lock(&self.recorded).retrievals += 1;
        self.next_run(thread_id, run_id)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, ServiceError> {
        lock(&self.recorded).submissions.push(outputs.to_vec());
        self.next_run(thread_id, run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_replays_in_order_then_completes() {
        let mock = ScriptedAssistant::new()
            .then_status(RunStatus::InProgress)
            .then_tool_calls(vec![ToolCall::new("c1", "createShape", "{}")])
            .then_error("boom");

        let thread = mock.create_thread().await.unwrap();
        let run = mock.create_run(&thread, "asst_1").await.unwrap();
        assert_eq!(run.status, RunStatus::Queued);

        let run = mock.retrieve_run(&thread, &run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::InProgress);

        let run = mock.retrieve_run(&thread, &run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::RequiresAction);
        assert_eq!(run.tool_calls.len(), 1);

        assert!(mock.submit_tool_outputs(&thread, &run.id, &[]).await.is_err());
        let run = mock.retrieve_run(&thread, &run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);

        assert_eq!(mock.retrievals(), 3);
        assert_eq!(mock.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_start() {
        let mock = ScriptedAssistant::new().failing_start("quota exceeded");
        let err = mock.create_run("thread_1", "asst_1").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(mock.runs_created(), 0);
    }
}
