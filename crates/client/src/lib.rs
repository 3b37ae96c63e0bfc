//! HTTP client for the fracture analysis service.
//!
//! One request per submission: a multipart `POST` carrying optional text and an
//! optional image, answered by a small JSON object.
pub mod client;
pub mod error;
pub mod types;

pub use client::{AnalysisClient, HttpAnalysisClient};
pub use error::{AnalysisError, AnalysisResult};
pub use types::{
    AnalysisReply, AnalysisRequest, Attachment, DEFAULT_CHAT_PATH, DEFAULT_SERVER_ORIGIN,
    HISTORY_FIELD, HistoryRole, HistoryTurn, IMAGE_FIELD, MESSAGE_FIELD, ReplyOutcome,
    ServiceEndpoint,
};
