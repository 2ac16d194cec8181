//! A small chat client for OpenAI-compatible chat-completion APIs.
//!
//! The library is split the way the binary uses it: an [`OpenAi`] client that
//! implements [`Completer`], a [`Transcript`] of [`Turn`]s that is resent on
//! every request, and a [`chat::ChatSession`] that reads user turns, asks the
//! client for replies, and reports both to the console and an optional file.

// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod input;
pub mod observability;
pub mod render;
pub mod sink;
pub mod transcript;
pub mod types;

// Re-exports
pub use client::{API_TOKEN_ENV, Completer, OpenAi};
pub use error::{Error, Result};
pub use input::{InputMode, TurnReader};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use sink::TranscriptSink;
pub use transcript::Transcript;
pub use types::*;
