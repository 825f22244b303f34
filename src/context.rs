//! Recent conversation history supplied alongside a draft.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::draft::truncate_chars;

/// Who wrote a message, as far as the platform lets us tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The user writing the current draft.
    Me,
    /// The conversation partner.
    Them,
    Unknown,
}

/// One message of history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub sender: Sender,
    /// Display name the platform exposed for the author, if any.
    #[serde(default)]
    pub author: Option<String>,
    pub text: String,
}

impl ContextMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            author: None,
            text: text.into(),
        }
    }

    pub fn by(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Renders the message as a prompt line, e.g. `[Them] (alice): hi`.
    pub fn render(&self, max_chars: usize) -> String {
        let text = truncate_chars(&self.text, max_chars);
        let tag = match self.sender {
            Sender::Me => Some("[Me]"),
            Sender::Them => Some("[Them]"),
            Sender::Unknown => None,
        };
        match (tag, self.author.as_deref()) {
            (Some(tag), Some(author)) => format!("{tag} ({author}): {text}"),
            (Some(tag), None) => format!("{tag}: {text}"),
            (None, Some(author)) => format!("{author}: {text}"),
            (None, None) => text.to_string(),
        }
    }
}

/// Bounded, most-recent-last window of [`ContextMessage`]s.
///
/// Pushing beyond the limit evicts the oldest message, so the window never
/// holds more than `limit` entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextWindow {
    limit: usize,
    messages: VecDeque<ContextMessage>,
}

impl ContextWindow {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            messages: VecDeque::with_capacity(limit),
        }
    }

    /// Builds a window keeping only the last `limit` of `messages`.
    pub fn from_messages(limit: usize, messages: impl IntoIterator<Item = ContextMessage>) -> Self {
        let mut window = Self::new(limit);
        for message in messages {
            window.push(message);
        }
        window
    }

    pub fn push(&mut self, message: ContextMessage) {
        if self.limit == 0 {
            return;
        }
        while self.messages.len() >= self.limit {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContextMessage> {
        self.messages.iter()
    }

    /// The last `count` messages, oldest first.
    pub fn latest(&self, count: usize) -> impl Iterator<Item = &ContextMessage> {
        self.messages.iter().skip(self.messages.len().saturating_sub(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_never_exceeds_limit() {
        let window = ContextWindow::from_messages(
            3,
            (0..10).map(|i| ContextMessage::new(Sender::Them, format!("m{i}"))),
        );
        assert_eq!(window.len(), 3);
        let texts: Vec<_> = window.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["m7", "m8", "m9"]);
    }

    #[test]
    fn zero_limit_holds_nothing() {
        let mut window = ContextWindow::new(0);
        window.push(ContextMessage::new(Sender::Me, "hi"));
        assert!(window.is_empty());
    }

    #[test]
    fn latest_returns_tail_in_order() {
        let window = ContextWindow::from_messages(
            12,
            ["a", "b", "c", "d"].map(|t| ContextMessage::new(Sender::Unknown, t)),
        );
        let tail: Vec<_> = window.latest(2).map(|m| m.text.as_str()).collect();
        assert_eq!(tail, ["c", "d"]);
        assert_eq!(window.latest(10).count(), 4);
    }

    #[test]
    fn renders_sender_tags() {
        assert_eq!(ContextMessage::new(Sender::Me, "sure").render(100), "[Me]: sure");
        assert_eq!(
            ContextMessage::new(Sender::Them, "where?").by("alice").render(100),
            "[Them] (alice): where?"
        );
        assert_eq!(ContextMessage::new(Sender::Unknown, "hmm").render(100), "hmm");
        assert_eq!(ContextMessage::new(Sender::Me, "abcdef").render(3), "[Me]: abc");
    }
}
