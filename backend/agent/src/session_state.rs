//! Assistant-side state of the whiteboard session.

use std::time::Duration;

/// Model the assistant is created with.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub assistant_name: String,
    pub model_name: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            assistant_name: "Whiteboard Assistant".to_string(),
            model_name: "gpt-4o".to_string(),
        }
    }
}

/// Polling policy of the run driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Delay between status fetches while a run is pending.
    pub poll_interval: Duration,
    /// Give up after this many status fetches. `None` polls until the run ends.
    pub max_polls: Option<u32>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_polls: None,
        }
    }
}

/// Ids of the assistant and of the single thread shared by every instruction
/// in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSession {
    pub assistant_id: String,
    pub thread_id: String,
}
