use bonescope_client::{HistoryRole, HistoryTurn};

use crate::message::{Message, Sender};

pub const WELCOME_TEXT: &str = "Hello! I'm your orthopedic assistant. Upload an X-ray image \
or ask me anything about bone fractures.";

/// Append-only message sequence for the lifetime of one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn seeded(welcome: Message) -> Self {
        Self {
            messages: vec![welcome],
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent `limit` messages with text, oldest first.
    pub fn recent_turns(&self, limit: usize) -> Vec<HistoryTurn> {
        let mut turns = self
            .messages
            .iter()
            .rev()
            .filter_map(|message| {
                let text = message.text.as_deref()?.trim();
                if text.is_empty() {
                    return None;
                }

                let role = match message.sender {
                    Sender::User => HistoryRole::User,
                    Sender::Bot => HistoryRole::Assistant,
                };
                Some(HistoryTurn::new(role, text))
            })
            .take(limit)
            .collect::<Vec<_>>();

        turns.reverse();
        turns
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::message::MessageIdAllocator;

    fn conversation_with(texts: &[(Sender, Option<&str>)]) -> Conversation {
        let mut ids = MessageIdAllocator::default();
        let now = Utc::now();
        let mut conversation = Conversation::seeded(Message::bot(
            ids.allocate(Sender::Bot, now),
            Some(WELCOME_TEXT.to_string()),
            None,
            now,
        ));

        for (sender, text) in texts {
            let id = ids.allocate(*sender, now);
            let text = text.map(str::to_string);
            conversation.append(match sender {
                Sender::User => Message::user(id, text, now),
                Sender::Bot => Message::bot(id, text, None, now),
            });
        }

        conversation
    }

    #[test]
    fn append_keeps_insertion_order() {
        let conversation = conversation_with(&[
            (Sender::User, Some("one")),
            (Sender::Bot, Some("two")),
            (Sender::User, Some("three")),
        ]);

        let texts = conversation
            .messages()
            .iter()
            .map(Message::text_or_empty)
            .collect::<Vec<_>>();
        assert_eq!(texts, [WELCOME_TEXT, "one", "two", "three"]);
        assert_eq!(
            conversation.messages().last().map(|m| m.sender),
            Some(Sender::User)
        );
    }

    #[test]
    fn recent_turns_skip_textless_messages_and_keep_order() {
        let conversation = conversation_with(&[
            (Sender::User, Some("wrist x-ray")),
            (Sender::Bot, None),
            (Sender::Bot, Some("looks mild")),
            (Sender::User, Some("   ")),
        ]);

        let turns = conversation.recent_turns(2);
        assert_eq!(
            turns,
            vec![
                HistoryTurn::new(HistoryRole::User, "wrist x-ray"),
                HistoryTurn::new(HistoryRole::Assistant, "looks mild"),
            ]
        );
        assert!(conversation.recent_turns(0).is_empty());
    }
}
