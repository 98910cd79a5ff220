//! The run driver: turns one instruction into a run on the assistant service
//! and drives it to the end.
//!
//! The run moves through [`RunPhase`]s. Every fresh snapshot from the service
//! goes through [`RunPhase::observe`], a pure function that picks the next
//! phase; the driver loop performs the side effects each phase calls for.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use whiteboard_core::{
    AssistantService, AssistantSpec, Run, RunStatus, ServiceError, ShapeStore,
};
use whiteboard_tools::ToolRegistry;

use crate::run_slot::{RunGuard, RunSlot};
use crate::session_state::{AssistantSession, DriverConfig, ModelConfig};
use crate::system_prompt::PromptBuilder;

/// Why a run ended without completing.
#[derive(Debug, Clone, Error)]
pub enum RunFailure {
    #[error("run {run_id} ended {status}")]
    Status { run_id: String, status: RunStatus },

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("run {run_id} still pending after {polls} status checks")]
    PollLimit { run_id: String, polls: u32 },
}

impl RunFailure {
    /// Text shown to the client that issued the instruction.
    pub fn notice(&self) -> String {
        match self {
            RunFailure::Status { status, .. } => format!("Run {status}"),
            RunFailure::Service(e) => format!("Run failed: {e}"),
            RunFailure::PollLimit { .. } => format!("Run abandoned: {self}"),
        }
    }
}

/// Where a run currently is.
#[derive(Debug, Clone)]
pub enum RunPhase {
    /// Instruction accepted; message and run not yet submitted.
    Starting,
    /// The run is `queued` or `in_progress`.
    Polling(Run),
    /// The run is `requires_action` and carries the pending calls.
    AwaitingToolOutputs(Run),
    Completed(Run),
    Failed(RunFailure),
}

impl RunPhase {
    /// Next phase for a freshly fetched run.
    pub fn observe(run: Run) -> RunPhase {
        if run.status.is_pending() {
            RunPhase::Polling(run)
        } else if run.status == RunStatus::RequiresAction {
            if run.tool_calls.is_empty() {
                RunPhase::Failed(RunFailure::Service(ServiceError::unexpected(
                    "assistant",
                    format!("run {} requires action but lists no tool calls", run.id),
                )))
            } else {
                RunPhase::AwaitingToolOutputs(run)
            }
        } else if run.status.is_failure() {
            RunPhase::Failed(RunFailure::Status {
                run_id: run.id,
                status: run.status,
            })
        } else {
            RunPhase::Completed(run)
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunPhase::Starting => "starting",
            RunPhase::Polling(_) => "polling",
            RunPhase::AwaitingToolOutputs(_) => "awaiting_tool_outputs",
            RunPhase::Completed(_) => "completed",
            RunPhase::Failed(_) => "failed",
        }
    }

    fn from_result(result: Result<Run, ServiceError>) -> RunPhase {
        match result {
            Ok(run) => RunPhase::observe(run),
            Err(e) => RunPhase::Failed(RunFailure::Service(e)),
        }
    }
}

/// How a driven run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed { run_id: String },
    Failed(RunFailure),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Owns the session's assistant thread and its single run slot.
pub struct RunDriver {
    service: Arc<dyn AssistantService>,
    registry: ToolRegistry,
    store: Arc<RwLock<ShapeStore>>,
    session: AssistantSession,
    slot: RunSlot,
    config: DriverConfig,
}

impl RunDriver {
    /// Register the assistant with its tools and open the session thread.
    pub async fn connect(
        service: Arc<dyn AssistantService>,
        registry: ToolRegistry,
        store: Arc<RwLock<ShapeStore>>,
        model: &ModelConfig,
        config: DriverConfig,
    ) -> Result<Self, ServiceError> {
        let spec = AssistantSpec {
            name: model.assistant_name.clone(),
            model: model.model_name.clone(),
            instructions: PromptBuilder::instructions(),
            tools: registry.describe_tools(),
        };

        let assistant_id = service.create_assistant(&spec).await?;
        let thread_id = service.create_thread().await?;
        info!(
            service = service.name(),
            assistant_id = %assistant_id,
            thread_id = %thread_id,
            "Assistant session ready"
        );

        Ok(Self {
            service,
            registry,
            store,
            session: AssistantSession {
                assistant_id,
                thread_id,
            },
            slot: RunSlot::new(),
            config,
        })
    }

    pub fn slot(&self) -> &RunSlot {
        &self.slot
    }

    /// Claim the run slot. `None` means a run is already in flight and the
    /// instruction must not start another.
    pub fn try_begin(&self) -> Option<RunGuard> {
        self.slot.try_acquire()
    }

    /// Drive one instruction to a terminal phase.
    ///
    /// `notify` receives progress text in the order phases are reached: the
    /// status while pending, a failure notice, or an empty string on success.
    /// The slot is released before the final notification.
    #[instrument(skip_all, fields(thread_id = %self.session.thread_id))]
    pub async fn drive(
        &self,
        guard: RunGuard,
        instruction: &str,
        notify: &(dyn Fn(String) + Send + Sync),
    ) -> RunOutcome {
        info!("Starting run for instruction");

        let mut phase = RunPhase::Starting;
        let mut polls: u32 = 0;

        loop {
            debug!(phase = phase.name(), "Run phase");

            phase = match phase {
                RunPhase::Starting => RunPhase::from_result(self.start(&guard, instruction).await),
                RunPhase::Polling(run) => match self.config.max_polls {
                    Some(max) if polls >= max => {
                        warn!(run_id = %run.id, polls, "Poll limit reached");
                        RunPhase::Failed(RunFailure::PollLimit {
                            run_id: run.id,
                            polls,
                        })
                    }
                    _ => {
                        polls += 1;
                        notify(format!("Run status: {}", run.status));
                        tokio::time::sleep(self.config.poll_interval).await;
                        RunPhase::from_result(
                            self.service.retrieve_run(&run.thread_id, &run.id).await,
                        )
                    }
                },
                RunPhase::AwaitingToolOutputs(run) => {
                    let outputs = {
                        let mut store = self.store.write().await;
                        self.registry.dispatch_batch(&mut store, &run.tool_calls)
                    };
                    info!(run_id = %run.id, count = outputs.len(), "Answering tool calls");
                    RunPhase::from_result(
                        self.service
                            .submit_tool_outputs(&run.thread_id, &run.id, &outputs)
                            .await,
                    )
                }
                RunPhase::Completed(run) => {
                    info!(run_id = %run.id, status = %run.status, "Run completed");
                    drop(guard);
                    notify(String::new());
                    return RunOutcome::Completed { run_id: run.id };
                }
                RunPhase::Failed(failure) => {
                    error!(error = %failure, "Run failed");
                    drop(guard);
                    notify(failure.notice());
                    return RunOutcome::Failed(failure);
                }
            };
        }
    }

    /// Post the instruction, start a run, and fetch its first status.
    async fn start(&self, guard: &RunGuard, instruction: &str) -> Result<Run, ServiceError> {
        let content = {
            let store = self.store.read().await;
            PromptBuilder::user_message(instruction, &store)
        };

        let thread_id = &self.session.thread_id;
        self.service.add_message(thread_id, &content).await?;
        let run = self
            .service
            .create_run(thread_id, &self.session.assistant_id)
            .await?;
        guard.attach(&run.id);
        info!(run_id = %run.id, "Run created");

        self.service.retrieve_run(&run.thread_id, &run.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use whiteboard_assistant::ScriptedAssistant;
    use whiteboard_core::{Shape, ToolCall};

    use crate::run_slot::SlotState;

    struct Harness {
        mock: Arc<ScriptedAssistant>,
        store: Arc<RwLock<ShapeStore>>,
        driver: Arc<RunDriver>,
        notes: Arc<Mutex<Vec<String>>>,
    }

    impl Harness {
        async fn new(mock: ScriptedAssistant) -> Self {
            Self::with_config(mock, DriverConfig::default(), Vec::new()).await
        }

        async fn with_config(
            mock: ScriptedAssistant,
            config: DriverConfig,
            shapes: Vec<Shape>,
        ) -> Self {
            let mock = Arc::new(mock);
            let mut store = ShapeStore::new();
            for shape in shapes {
                store.append(shape).unwrap();
            }
            let store = Arc::new(RwLock::new(store));
            let driver = RunDriver::connect(
                mock.clone(),
                ToolRegistry::new(),
                store.clone(),
                &ModelConfig::default(),
                config,
            )
            .await
            .unwrap();
            Self {
                mock,
                store,
                driver: Arc::new(driver),
                notes: Arc::new(Mutex::new(Vec::new())),
            }
        }

        async fn run(&self, instruction: &str) -> RunOutcome {
            let guard = self.driver.try_begin().expect("slot free");
            let notes = self.notes.clone();
            let notify = move |text: String| notes.lock().unwrap().push(text);
            self.driver.drive(guard, instruction, &notify).await
        }

        fn notes(&self) -> Vec<String> {
            self.notes.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_observe_classifies_statuses() {
        let run = |status| Run::new("run_1", "thread_1", status);
        assert!(matches!(
            RunPhase::observe(run(RunStatus::Queued)),
            RunPhase::Polling(_)
        ));
        assert!(matches!(
            RunPhase::observe(run(RunStatus::InProgress)),
            RunPhase::Polling(_)
        ));
        assert!(matches!(
            RunPhase::observe(
                run(RunStatus::RequiresAction)
                    .with_tool_calls(vec![ToolCall::new("c", "createShape", "{}")])
            ),
            RunPhase::AwaitingToolOutputs(_)
        ));
        assert!(matches!(
            RunPhase::observe(run(RunStatus::RequiresAction)),
            RunPhase::Failed(RunFailure::Service(_))
        ));
        for status in [RunStatus::Cancelled, RunStatus::Failed, RunStatus::Expired] {
            assert!(matches!(
                RunPhase::observe(run(status)),
                RunPhase::Failed(RunFailure::Status { .. })
            ));
        }
        for status in [
            RunStatus::Completed,
            RunStatus::Incomplete,
            RunStatus::Cancelling,
            RunStatus::Unknown,
        ] {
            assert!(matches!(
                RunPhase::observe(run(status)),
                RunPhase::Completed(_)
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_registers_tools_and_one_thread() {
        let h = Harness::new(ScriptedAssistant::new()).await;

        let assistants = h.mock.assistants();
        assert_eq!(assistants.len(), 1);
        let tool_names: Vec<_> = assistants[0].tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tool_names, vec!["createShape", "editExistingShape"]);

        h.run("first").await;
        h.run("second").await;

        assert_eq!(h.mock.threads_created(), 1);
        let threads: Vec<_> = h.mock.messages().into_iter().map(|(t, _)| t).collect();
        assert_eq!(threads, vec!["thread_1", "thread_1"]);
        assert_eq!(h.mock.runs_created(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_red_square_at_origin() {
        let mock = ScriptedAssistant::new()
            .then_status(RunStatus::InProgress)
            .then_tool_calls(vec![ToolCall::new(
                "call_1",
                "createShape",
                r#"{"x":0,"y":0,"w":50,"h":50,"color":"hsl(0,100%,50%)"}"#,
            )])
            .then_status(RunStatus::Completed);
        let h = Harness::new(mock).await;

        let outcome = h.run("draw a red square at the origin").await;

        assert!(outcome.is_completed());
        let store = h.store.read().await;
        assert_eq!(store.len(), 1);
        let shape = &store.snapshot()[0];
        assert!((0..100_000).contains(&shape.id));
        assert_eq!(
            (shape.x, shape.y, shape.w, shape.h, shape.color.as_str()),
            (0.0, 0.0, 50.0, 50.0, "hsl(0,100%,50%)")
        );
        assert_eq!(h.notes(), vec!["Run status: in_progress".to_string(), String::new()]);
        assert_eq!(h.driver.slot().state(), SlotState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_move_shape_left() {
        let mock = ScriptedAssistant::new().then_tool_calls(vec![ToolCall::new(
            "call_1",
            "editExistingShape",
            r#"{"id":42,"x":-10}"#,
        )]);
        let h = Harness::with_config(
            mock,
            DriverConfig::default(),
            vec![Shape::new(42, 0.0, 0.0, 10.0, 10.0)],
        )
        .await;

        let outcome = h.run("move shape 42 left by 10").await;

        assert!(outcome.is_completed());
        assert_eq!(
            h.store.read().await.snapshot(),
            &[Shape::new(42, -10.0, 0.0, 10.0, 10.0)]
        );
        let (_, message) = &h.mock.messages()[0];
        assert!(message.contains(r#""id":42"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_batch_is_answered_in_full() {
        let batch = |prefix: &str| {
            vec![
                ToolCall::new(format!("{prefix}1"), "createShape", r#"{"x":0,"y":0,"w":1,"h":1}"#),
                ToolCall::new(format!("{prefix}2"), "createShape", r#"{"x":5,"y":5,"w":1,"h":1}"#),
                ToolCall::new(format!("{prefix}3"), "editExistingShape", r#"{"id":-1}"#),
            ]
        };
        let mock = ScriptedAssistant::new()
            .then_tool_calls(batch("a"))
            .then_status(RunStatus::InProgress)
            .then_tool_calls(batch("b"))
            .then_tool_calls(batch("c"));
        let h = Harness::new(mock).await;

        assert!(h.run("draw things").await.is_completed());

        let submissions = h.mock.submissions();
        assert_eq!(submissions.len(), 3);
        for (outputs, prefix) in submissions.iter().zip(["a", "b", "c"]) {
            let ids: Vec<_> = outputs.iter().map(|o| o.tool_call_id.clone()).collect();
            assert_eq!(ids, vec![format!("{prefix}1"), format!("{prefix}2"), format!("{prefix}3")]);
            assert!(outputs[2].output.starts_with("Error:"));
        }
        assert_eq!(h.store.read().await.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_tool_reported_and_polling_continues() {
        let mock = ScriptedAssistant::new()
            .then_tool_calls(vec![ToolCall::new("call_1", "deleteShape", r#"{"id":1}"#)])
            .then_status(RunStatus::InProgress)
            .then_status(RunStatus::Completed);
        let h = Harness::new(mock).await;

        assert!(h.run("delete everything").await.is_completed());

        let submissions = h.mock.submissions();
        assert_eq!(submissions.len(), 1);
        assert!(submissions[0][0].output.contains("could not be found"));
        assert!(h.store.read().await.is_empty());
        assert_eq!(h.mock.retrievals(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_statuses_free_the_slot() {
        for status in [RunStatus::Cancelled, RunStatus::Failed, RunStatus::Expired] {
            let mock = ScriptedAssistant::new()
                .then_tool_calls(vec![ToolCall::new(
                    "call_1",
                    "createShape",
                    r#"{"x":0,"y":0,"w":1,"h":1}"#,
                )])
                .then_status(status);
            let h = Harness::new(mock).await;

            let outcome = h.run("draw").await;

            match outcome {
                RunOutcome::Failed(RunFailure::Status { status: s, .. }) => assert_eq!(s, status),
                other => panic!("unexpected outcome {other:?}"),
            }
            assert_eq!(h.driver.slot().state(), SlotState::Idle);
            assert_eq!(h.notes().last().cloned(), Some(format!("Run {status}")));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_error_while_polling_fails_run() {
        let mock = ScriptedAssistant::new()
            .then_status(RunStatus::Queued)
            .then_error("connection reset");
        let h = Harness::new(mock).await;

        let outcome = h.run("draw").await;

        assert!(matches!(outcome, RunOutcome::Failed(RunFailure::Service(_))));
        let last = h.notes().last().cloned().unwrap();
        assert!(last.starts_with("Run failed:"));
        assert!(last.contains("connection reset"));
        assert!(!h.driver.slot().is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_fails_run() {
        let h = Harness::new(ScriptedAssistant::new().failing_start("quota exceeded")).await;

        let outcome = h.run("draw").await;

        assert!(matches!(outcome, RunOutcome::Failed(RunFailure::Service(_))));
        assert_eq!(h.mock.retrievals(), 0);
        assert!(!h.driver.slot().is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_limit() {
        let mut mock = ScriptedAssistant::new();
        for _ in 0..10 {
            mock = mock.then_status(RunStatus::InProgress);
        }
        let config = DriverConfig {
            poll_interval: Duration::from_millis(10),
            max_polls: Some(3),
        };
        let h = Harness::with_config(mock, config, Vec::new()).await;

        let outcome = h.run("draw").await;

        assert!(matches!(
            outcome,
            RunOutcome::Failed(RunFailure::PollLimit { polls: 3, .. })
        ));
        // One fetch at start plus one per poll.
        assert_eq!(h.mock.retrievals(), 4);
        assert!(h.notes().last().unwrap().starts_with("Run abandoned"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_instruction_refused_while_running() {
        let mut mock = ScriptedAssistant::new();
        for _ in 0..5 {
            mock = mock.then_status(RunStatus::InProgress);
        }
        let h = Harness::new(mock).await;

        let guard = h.driver.try_begin().unwrap();
        let driver = h.driver.clone();
        let task = tokio::spawn(async move {
            let notify = |_: String| {};
            driver.drive(guard, "slow", &notify).await
        });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(matches!(h.driver.slot().state(), SlotState::Active { .. }));
        assert!(h.driver.try_begin().is_none());

        assert!(task.await.unwrap().is_completed());
        assert_eq!(h.mock.runs_created(), 1);
        assert!(h.driver.try_begin().is_some());
    }
}
