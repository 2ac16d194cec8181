use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Model, Role, Turn, Usage};

/// Body of a `POST /chat/completions` request.
///
/// Borrows the transcript so that building a request never copies or aliases
/// turns the caller still owns.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// The model to complete with.
    pub model: &'a Model,

    /// The whole conversation so far, oldest first.
    pub messages: &'a [Turn],
}

impl<'a> ChatCompletionRequest<'a> {
    /// Create a request for `model` over `messages`.
    pub fn new(model: &'a Model, messages: &'a [Turn]) -> Self {
        Self { model, messages }
    }
}

/// A successful chat-completion response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletion {
    /// Identifier assigned by the API.
    #[serde(default)]
    pub id: Option<String>,

    /// The model that actually served the request.
    #[serde(default)]
    pub model: Option<String>,

    /// Candidate replies; the first one is used.
    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Token accounting, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One candidate reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    /// Position of the choice in the response.
    #[serde(default)]
    pub index: u32,

    /// The generated message.
    pub message: ChoiceMessage,

    /// Why generation stopped, e.g. `stop` or `length`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The message inside a [`Choice`].
///
/// Content is optional on the wire (tool calls and refusals omit it).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceMessage {
    /// Role reported by the API; always `assistant` for a usable reply.
    pub role: String,

    /// The reply text.
    #[serde(default)]
    pub content: Option<String>,
}

/// The agent turn produced by one completion, with its token accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// The agent turn to append to the transcript.
    pub turn: Turn,

    /// Token accounting for the request, if reported.
    pub usage: Option<Usage>,
}

impl ChatCompletion {
    /// Converts the first choice into an agent turn.
    ///
    /// A response with no choices, with a non-assistant first choice, or whose
    /// first choice has no text is malformed: it never becomes an empty turn.
    pub fn into_reply(self) -> Result<Reply> {
        let Some(choice) = self.choices.into_iter().next() else {
            return Err(Error::malformed_response("response contained no choices"));
        };
        if choice.message.role != "assistant" {
            return Err(Error::malformed_response(format!(
                "expected an assistant reply, got role {:?}",
                choice.message.role
            )));
        }
        match choice.message.content {
            Some(content) if !content.is_empty() => Ok(Reply {
                turn: Turn::new(Role::Agent, content),
                usage: self.usage,
            }),
            _ => Err(Error::malformed_response("reply had no content")),
        }
    }
}
