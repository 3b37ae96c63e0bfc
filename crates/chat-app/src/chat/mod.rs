/// Event contracts between the input and the coordinating view.
pub mod events;
pub mod images;
pub mod message_input;
pub mod message_list;
pub mod scroll_manager;
pub mod view;

pub use events::{AttachRequested, AttachmentRemoved, DraftEdited, Submit};
pub use message_input::MessageInput;
pub use message_list::{ImageSlot, MessageList};
pub use scroll_manager::ScrollManager;
pub use view::ChatView;
