use std::fmt;

use serde::{Deserialize, Serialize};

/// Who produced a turn.
///
/// On the wire the agent is the API's `assistant`; on the console and in
/// transcript files it is labeled `agent`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The person at the keyboard.
    #[serde(rename = "user")]
    User,

    /// The remote model.
    #[serde(rename = "assistant")]
    Agent,
}

impl Role {
    /// The label used when a turn is echoed or written to a file.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One message in a conversation.
///
/// Serializes to exactly the `{"role": ..., "content": ...}` object the
/// chat-completion endpoint expects, so a transcript slice can be sent as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The role of the turn.
    pub role: Role,

    /// The text of the turn.
    pub content: String,
}

impl Turn {
    /// Create a new `Turn` with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user `Turn`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new agent `Turn`.
    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content)
    }

    /// Returns true if this turn was typed by the user.
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Returns true if this turn came back from the model.
    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }
}

/// Renders the turn as a labeled line, e.g. `agent: hello`.
impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role, self.content)
    }
}

impl From<&str> for Turn {
    fn from(content: &str) -> Self {
        Self::user(content)
    }
}

impl From<String> for Turn {
    fn from(content: String) -> Self {
        Self::user(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn turn_wire_format() {
        assert_eq!(
            to_value(Turn::user("Hello!")).unwrap(),
            json!({"role": "user", "content": "Hello!"})
        );
        assert_eq!(
            to_value(Turn::agent("Hi.")).unwrap(),
            json!({"role": "assistant", "content": "Hi."})
        );
    }

    #[test]
    fn turn_rejects_system_role() {
        let result = serde_json::from_value::<Turn>(json!({
            "role": "system",
            "content": "You are terse."
        }));
        assert!(result.is_err());
    }

    #[test]
    fn turn_labels() {
        assert_eq!(Turn::user("a").to_string(), "user: a");
        assert_eq!(Turn::agent("b").to_string(), "agent: b");
        assert_eq!(Turn::agent("two\nlines").to_string(), "agent: two\nlines");
    }

    #[test]
    fn turn_from_str() {
        let turn: Turn = "hello".into();
        assert!(turn.is_user());
        assert!(!turn.is_agent());
    }
}
