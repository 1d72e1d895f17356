//! The chat transcript shown for the current game.
//!
//! This is plain data shared between front ends: the controller appends to
//! it on each turn and replaces it wholesale when a game starts or loads.

use serde::{Deserialize, Serialize};

/// Who produced a chat entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    User,
    System,
}

/// One line of the transcript. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    origin: Origin,
    text: String,
}

impl ChatEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::User,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::System,
            text: text.into(),
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLog {
    entries: Vec<ChatEntry>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn replace_with(&mut self, entries: Vec<ChatEntry>) {
        self.entries = entries;
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_insertion_order() {
        let mut log = ConversationLog::new();
        log.push(ChatEntry::system("You enter a cafe."));
        log.push(ChatEntry::user("look around"));

        let origins: Vec<Origin> = log.entries().iter().map(ChatEntry::origin).collect();
        assert_eq!(origins, vec![Origin::System, Origin::User]);
        assert_eq!(log.last().map(ChatEntry::text), Some("look around"));
    }

    #[test]
    fn test_replace_discards_previous_entries() {
        let mut log = ConversationLog::new();
        log.push(ChatEntry::user("one"));
        log.push(ChatEntry::system("two"));

        log.replace_with(vec![ChatEntry::system("fresh start")]);
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0], ChatEntry::system("fresh start"));
    }
}
