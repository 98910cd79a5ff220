//! Structured logging for the whiteboard server.

pub mod logger;

pub use logger::init_logger;
