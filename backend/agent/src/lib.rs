//! Whiteboard run driver.
//!
//! Turns a user instruction into a run on the assistant service, answers the
//! tool calls it makes against the shared shape store, and guarantees that at
//! most one run is in flight per session.

pub mod run_driver;
pub mod run_slot;
pub mod session_state;
pub mod system_prompt;

pub use run_driver::{RunDriver, RunFailure, RunOutcome, RunPhase};
pub use run_slot::{RunGuard, RunSlot, SlotState};
pub use session_state::{AssistantSession, DriverConfig, ModelConfig};
pub use system_prompt::PromptBuilder;
