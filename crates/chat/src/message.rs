use std::fmt;

use chrono::{DateTime, Utc};

/// Opaque rendering key for one message. Never used for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Chat speaker. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    fn id_suffix(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub text: Option<String>,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Server-relative path of an annotated image.
    pub image_url: Option<String>,
}

impl Message {
    pub fn user(id: MessageId, text: Option<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            sender: Sender::User,
            timestamp,
            image_url: None,
        }
    }

    pub fn bot(
        id: MessageId,
        text: Option<String>,
        image_url: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            text,
            sender: Sender::Bot,
            timestamp,
            image_url,
        }
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// Hands out ids of the form `<millis>-<seq>-<role>`.
///
/// The sequence number keeps ids unique when two messages share a millisecond.
#[derive(Debug, Default)]
pub struct MessageIdAllocator {
    next_sequence: u64,
}

impl MessageIdAllocator {
    pub fn allocate(&mut self, sender: Sender, created_at: DateTime<Utc>) -> MessageId {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        MessageId(format!(
            "{}-{sequence}-{}",
            created_at.timestamp_millis(),
            sender.id_suffix()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_timestamp_and_role_and_stay_unique() {
        let created_at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let mut ids = MessageIdAllocator::default();

        let user = ids.allocate(Sender::User, created_at);
        let bot = ids.allocate(Sender::Bot, created_at);
        let second_user = ids.allocate(Sender::User, created_at);

        assert_eq!(user.as_str(), "1700000000123-0-user");
        assert_eq!(bot.as_str(), "1700000000123-1-bot");
        assert_ne!(user, second_user);
    }
}
