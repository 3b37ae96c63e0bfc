/// Emitted when the user asks to send the current draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Submit;

/// Emitted whenever the input text diverges from the last reported draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftEdited {
    pub text: String,
}

/// Emitted when the attach control is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachRequested;

/// Emitted when the user drops the staged image before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentRemoved;

impl DraftEdited {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
