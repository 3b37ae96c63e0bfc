use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AnalysisError {
    #[snafu(display("failed to read attachment at {path:?} on `{stage}`: {source}"))]
    ReadAttachment {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("attachment mime type '{mime}' was rejected on `{stage}`: {source}"))]
    AttachmentMime {
        stage: &'static str,
        mime: String,
        source: reqwest::Error,
    },
    #[snafu(display("failed to encode chat history on `{stage}`: {source}"))]
    EncodeHistory {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {url} failed on `{stage}`: {source}"))]
    SendRequest {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("failed to read response body on `{stage}`: {source}"))]
    ReadBody {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("response with status {status} is not valid JSON: {source}"))]
    DecodeBody {
        stage: &'static str,
        status: u16,
        source: serde_json::Error,
    },
    #[snafu(display("image download from {url} returned status {status}"))]
    FetchImageStatus {
        stage: &'static str,
        url: String,
        status: u16,
    },
    #[snafu(display("request worker stopped before settling: {details}"))]
    Interrupted {
        stage: &'static str,
        details: String,
    },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl AnalysisError {
    /// Wraps a failure that happened outside the request itself, such as a
    /// runtime worker being torn down before the call settled.
    pub fn interrupted(stage: &'static str, details: impl Into<String>) -> Self {
        Self::Interrupted {
            stage,
            details: details.into(),
        }
    }
}
