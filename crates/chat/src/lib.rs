//! Chat domain for the fracture analysis widget.
//!
//! Nothing here touches the GUI: the view layer feeds user events into a
//! [`ChatSession`] and draws the [`ConversationFrame`] it projects.
pub mod conversation;
pub mod draft;
pub mod message;
/// Side-effect-free projection of session state into drawable rows.
pub mod render;
/// Submission pipeline and the idle/awaiting-response state machine.
pub mod session;

pub use conversation::{Conversation, WELCOME_TEXT};
pub use draft::{Draft, DraftError, image_attachment};
pub use message::{Message, MessageId, MessageIdAllocator, Sender};
pub use render::{ConversationFrame, MessageRow, RowAlignment, RowBody, project};
pub use session::{
    ChatSession, SERVER_ERROR_PREFIX, Settlement, Submission, SubmissionPhase, SubmissionTicket,
    SubmitRejection, TRANSPORT_FAILURE_TEXT,
};
