//! Chat application module for conversations with a chat-completion API.
//!
//! This module drives a conversation over the completion client. It supports:
//!
//! - Single-shot mode: one prompt, one reply
//! - Interactive mode: turns read from a line-oriented stream until it ends
//! - Echoing every turn to the console and, optionally, an append-only file
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: the session state machine and API interaction

mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use config::{ChatArgs, ChatConfig, ChatMode};
pub use session::{ChatSession, SessionState, SessionStats, Termination};
