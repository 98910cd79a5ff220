//! Whiteboard session gateway.
//!
//! Accepts WebSocket clients, applies their direct edits, feeds their
//! instructions to the run driver one at a time, and broadcasts the canvas.

pub mod health_api;
pub mod server;
pub mod session;
pub mod session_registry;
pub mod ws_protocol;
pub mod ws_server;

pub use server::{build_router, start_server, GatewayState};
pub use session::Session;
pub use ws_protocol::{ClientEvent, ServerEvent};
