//! The ordered, append-only record of one conversation.
//!
//! The chat-completion API keeps no state between calls, so the whole
//! transcript is resent on every request.  [`Transcript::snapshot`] lends the
//! turns out as a shared slice; the borrow ends before the next
//! [`Transcript::append`], so a request that has been sent can never observe a
//! later turn.

use crate::types::{Role, Turn};

/// The turns of one session, oldest first.
///
/// There is no way to remove or edit a turn once it has been appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `turn` to the end of the transcript.
    ///
    /// Roles are not required to alternate: two user turns in a row happen
    /// when a request fails and the session is driven again.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Returns every turn appended so far, in order.
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    /// Returns the number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns the most recent turn.
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Counts the turns with the given role.
    pub fn count_role(&self, role: Role) -> usize {
        self.turns.iter().filter(|turn| turn.role == role).count()
    }

    /// Consumes the transcript, returning its turns.
    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
