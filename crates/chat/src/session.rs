use bonescope_client::{AnalysisReply, AnalysisRequest, AnalysisResult, ReplyOutcome};
use chrono::{DateTime, Utc};

use crate::conversation::{Conversation, WELCOME_TEXT};
use crate::draft::Draft;
use crate::message::{Message, MessageId, MessageIdAllocator, Sender};

pub const SERVER_ERROR_PREFIX: &str = "⚠ Error: ";
pub const TRANSPORT_FAILURE_TEXT: &str = "⚠ Failed to connect to the server.";

/// Identifies one dispatched submission so its settlement can be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    AwaitingResponse(SubmissionTicket),
}

/// Work handed to the network layer after the user message was appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub ticket: SubmissionTicket,
    pub user_message_id: MessageId,
    pub request: AnalysisRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    EmptyDraft,
    InFlight,
}

/// Result of applying a settled network call to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Answered(MessageId),
    DeclaredError(MessageId),
    TransportFailed(MessageId),
    /// The reply carried none of the recognized fields; nothing was appended.
    NoReply,
    /// The ticket does not belong to the active submission; nothing changed.
    Stale,
}

impl Settlement {
    pub fn appended(&self) -> Option<&MessageId> {
        match self {
            Self::Answered(id) | Self::DeclaredError(id) | Self::TransportFailed(id) => Some(id),
            Self::NoReply | Self::Stale => None,
        }
    }
}

/// Conversation, draft and in-flight state for one chat view.
///
/// All mutation goes through `begin_submission`/`settle`, so the session moves
/// between exactly two phases: idle and awaiting a response.
#[derive(Debug)]
pub struct ChatSession {
    conversation: Conversation,
    draft: Draft,
    phase: SubmissionPhase,
    ids: MessageIdAllocator,
    next_ticket: u64,
    history_turns: usize,
}

impl ChatSession {
    pub fn new(now: DateTime<Utc>) -> Self {
        let mut ids = MessageIdAllocator::default();
        let welcome = Message::bot(
            ids.allocate(Sender::Bot, now),
            Some(WELCOME_TEXT.to_string()),
            None,
            now,
        );

        Self {
            conversation: Conversation::seeded(welcome),
            draft: Draft::default(),
            phase: SubmissionPhase::Idle,
            ids,
            next_ticket: 1,
            history_turns: 0,
        }
    }

    /// Forwards up to `turns` earlier text messages with each request. Zero disables it.
    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.phase, SubmissionPhase::AwaitingResponse(_))
    }

    /// Appends the user message, clears the draft text and enters the
    /// awaiting-response phase. The attachment stays staged until settlement.
    pub fn begin_submission(&mut self, now: DateTime<Utc>) -> Result<Submission, SubmitRejection> {
        if self.is_in_flight() {
            return Err(SubmitRejection::InFlight);
        }
        if !self.draft.is_submittable() {
            return Err(SubmitRejection::EmptyDraft);
        }

        let history = if self.history_turns > 0 {
            self.conversation.recent_turns(self.history_turns)
        } else {
            Vec::new()
        };

        let text = self.draft.text().to_string();
        let request = AnalysisRequest::new(&text, self.draft.attachment().cloned())
            .with_history(history);

        let user_message_id = self.ids.allocate(Sender::User, now);
        self.conversation.append(Message::user(
            user_message_id.clone(),
            (!text.is_empty()).then_some(text),
            now,
        ));
        self.draft.clear_text();

        let ticket = SubmissionTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.saturating_add(1);
        self.phase = SubmissionPhase::AwaitingResponse(ticket);

        tracing::debug!(
            ticket = ticket.0,
            message_id = %user_message_id,
            has_image = request.attachment.is_some(),
            "submission dispatched"
        );

        Ok(Submission {
            ticket,
            user_message_id,
            request,
        })
    }

    /// Applies the settled network call. Returns to idle and drops the staged
    /// attachment on every path except a stale ticket.
    pub fn settle(
        &mut self,
        ticket: SubmissionTicket,
        result: AnalysisResult<AnalysisReply>,
        now: DateTime<Utc>,
    ) -> Settlement {
        if self.phase != SubmissionPhase::AwaitingResponse(ticket) {
            tracing::warn!(ticket = ticket.0, "ignoring settlement for inactive submission");
            return Settlement::Stale;
        }

        let settlement = match result {
            Ok(reply) => match reply.outcome() {
                ReplyOutcome::Answer { text, image_url } => {
                    Settlement::Answered(self.append_bot(text, image_url, now))
                }
                ReplyOutcome::DeclaredError(error) => Settlement::DeclaredError(self.append_bot(
                    Some(format!("{SERVER_ERROR_PREFIX}{error}")),
                    None,
                    now,
                )),
                ReplyOutcome::Empty => {
                    tracing::warn!(ticket = ticket.0, "reply carried no recognized fields");
                    Settlement::NoReply
                }
            },
            Err(error) => {
                tracing::error!(ticket = ticket.0, error = %error, "analysis request failed");
                Settlement::TransportFailed(self.append_bot(
                    Some(TRANSPORT_FAILURE_TEXT.to_string()),
                    None,
                    now,
                ))
            }
        };

        self.phase = SubmissionPhase::Idle;
        self.draft.clear_attachment();
        settlement
    }

    fn append_bot(
        &mut self,
        text: Option<String>,
        image_url: Option<String>,
        now: DateTime<Utc>,
    ) -> MessageId {
        let id = self.ids.allocate(Sender::Bot, now);
        self.conversation
            .append(Message::bot(id.clone(), text, image_url, now));
        id
    }
}
