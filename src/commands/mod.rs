//! Command implementations
//!
//! The binary has a single command: send one message.

pub mod send_message;
