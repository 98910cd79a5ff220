//! Clients for the external assistant service.
//!
//! `providers::openai` talks to the OpenAI Assistants API; `providers::mock`
//! replays scripted runs for tests.

pub mod providers;

pub use providers::mock::{ScriptStep, ScriptedAssistant};
pub use providers::openai::OpenAiAssistants;
