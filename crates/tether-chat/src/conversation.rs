//! Conversation history: completed user/assistant exchanges.

use tether_ai::{Message, Role};

/// Ordered log of completed chat turns.
///
/// Only whole turns are stored, so the length is always even. There is no
/// size cap: history grows until [`History::clear`] is called.
#[derive(Debug, Clone, Default)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Both messages are stored or neither is.
    ///
    /// Refuses pairs that are not user-then-assistant or whose reply is empty.
    pub fn record_turn(&mut self, user: Message, assistant: Message) -> bool {
        if user.role != Role::User
            || assistant.role != Role::Assistant
            || assistant.content.is_empty()
        {
            tracing::debug!(
                "Not recording turn: roles {}/{}, reply {} bytes",
                user.role,
                assistant.role,
                assistant.content.len()
            );
            return false;
        }
        self.messages.reserve(2);
        self.messages.push(user);
        self.messages.push(assistant);
        true
    }

    /// Copies of the stored messages, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of completed turns
    pub fn turns(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_turn_appends_pair() {
        let mut history = History::new();
        assert!(history.record_turn(Message::user("hi"), Message::assistant("hello")));
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns(), 1);
        let messages = history.messages();
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn test_empty_reply_is_refused() {
        let mut history = History::new();
        assert!(!history.record_turn(Message::user("hi"), Message::assistant("")));
        assert!(history.is_empty());
    }

    #[test]
    fn test_wrong_roles_are_refused() {
        let mut history = History::new();
        assert!(!history.record_turn(Message::assistant("a"), Message::user("b")));
        assert!(!history.record_turn(Message::system("s"), Message::assistant("b")));
        assert!(history.is_empty());
    }

    #[test]
    fn test_messages_are_copies() {
        let mut history = History::new();
        history.record_turn(Message::user("q"), Message::assistant("a"));
        let mut copy = history.messages();
        copy[0].content.push_str(" mutated");
        copy.push(Message::user("extra"));
        assert_eq!(history.messages()[0].content, "q");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut history = History::new();
        history.record_turn(Message::user("q"), Message::assistant("a"));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.turns(), 0);
    }
}
