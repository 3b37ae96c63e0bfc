use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_SERVER_ORIGIN: &str = "http://127.0.0.1:5000";
pub const DEFAULT_CHAT_PATH: &str = "/chat";

/// Multipart field carrying the trimmed user text.
pub const MESSAGE_FIELD: &str = "message";
/// Multipart field carrying the raw image bytes.
pub const IMAGE_FIELD: &str = "image";
/// Multipart field carrying recent turns as a JSON array.
pub const HISTORY_FIELD: &str = "chat_history";

/// Fixed origin plus chat path of the analysis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    origin: String,
    chat_path: String,
}

impl ServiceEndpoint {
    pub fn new(origin: impl Into<String>, chat_path: impl Into<String>) -> Self {
        let origin = origin.into();
        let origin = origin.trim().trim_end_matches('/');
        let chat_path = chat_path.into();
        let chat_path = chat_path.trim();

        Self {
            origin: if origin.is_empty() {
                DEFAULT_SERVER_ORIGIN.to_string()
            } else {
                origin.to_string()
            },
            chat_path: match chat_path {
                "" => DEFAULT_CHAT_PATH.to_string(),
                path if path.starts_with('/') => path.to_string(),
                path => format!("/{path}"),
            },
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn chat_path(&self) -> &str {
        &self.chat_path
    }

    pub fn chat_url(&self) -> String {
        format!("{}{}", self.origin, self.chat_path)
    }

    /// Resolves a server-relative path by plain concatenation onto the origin.
    ///
    /// No normalization happens here: the service hands out paths such as
    /// `/get_annotated/scan.png` and they are used verbatim.
    pub fn resolve(&self, relative: &str) -> String {
        format!("{}{}", self.origin, relative)
    }
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_ORIGIN, DEFAULT_CHAT_PATH)
    }
}

/// An image file staged for upload. Bytes are read only when the request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: String,
}

impl Attachment {
    pub fn new(path: impl Into<PathBuf>, file_name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
            mime: mime.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

/// One earlier turn forwarded to the service for context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub content: String,
}

impl HistoryTurn {
    pub fn new(role: HistoryRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisRequest {
    pub message: Option<String>,
    pub attachment: Option<Attachment>,
    pub history: Vec<HistoryTurn>,
}

impl AnalysisRequest {
    /// Builds a request from raw draft text; whitespace-only text is dropped.
    pub fn new(text: &str, attachment: Option<Attachment>) -> Self {
        let trimmed = text.trim();
        Self {
            message: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            attachment,
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.attachment.is_none()
    }
}

/// Decoded reply body. Empty strings are treated the same as missing fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisReply {
    pub response: Option<String>,
    pub annotated_image_url: Option<String>,
    pub error: Option<String>,
    pub report_summary: Option<String>,
}

/// What a reply means for the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Answer {
        text: Option<String>,
        image_url: Option<String>,
    },
    DeclaredError(String),
    Empty,
}

impl AnalysisReply {
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        Ok(Self::from_value(&value))
    }

    /// Reads the recognized string fields. Anything that is not a JSON object
    /// yields a reply with no fields set.
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        };

        Self {
            response: field("response"),
            annotated_image_url: field("annotated_image_url"),
            error: field("error"),
            report_summary: field("report_summary"),
        }
    }

    /// Success fields win over the error field; a reply with neither is empty.
    pub fn outcome(&self) -> ReplyOutcome {
        if self.response.is_some() || self.annotated_image_url.is_some() {
            return ReplyOutcome::Answer {
                text: self.response.clone(),
                image_url: self.annotated_image_url.clone(),
            };
        }

        match &self.error {
            Some(error) => ReplyOutcome::DeclaredError(error.clone()),
            None => ReplyOutcome::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_only_reply_is_an_answer_without_image() {
        let reply = AnalysisReply::from_value(&json!({ "response": "R" }));
        assert_eq!(
            reply.outcome(),
            ReplyOutcome::Answer {
                text: Some("R".to_string()),
                image_url: None,
            }
        );
    }

    #[test]
    fn success_fields_take_precedence_over_error() {
        let reply = AnalysisReply::from_value(&json!({
            "annotated_image_url": "/get_annotated/leg.png",
            "error": "ignored",
        }));
        assert_eq!(
            reply.outcome(),
            ReplyOutcome::Answer {
                text: None,
                image_url: Some("/get_annotated/leg.png".to_string()),
            }
        );
    }

    #[test]
    fn empty_strings_do_not_count_as_answers() {
        // The service always sends both keys, blank when there was no image.
        let reply = AnalysisReply::from_value(&json!({
            "response": "",
            "annotated_image_url": "",
            "error": "bad image",
        }));
        assert_eq!(
            reply.outcome(),
            ReplyOutcome::DeclaredError("bad image".to_string())
        );
    }

    #[test]
    fn unrecognized_shapes_are_empty() {
        assert_eq!(AnalysisReply::from_value(&json!({})).outcome(), ReplyOutcome::Empty);
        assert_eq!(
            AnalysisReply::from_value(&json!(["response"])).outcome(),
            ReplyOutcome::Empty
        );
        assert_eq!(
            AnalysisReply::from_value(&json!({ "response": 42 })).outcome(),
            ReplyOutcome::Empty
        );
    }

    #[test]
    fn report_summary_is_kept_but_not_an_answer() {
        let reply = AnalysisReply::from_value(&json!({ "report_summary": "## Severity" }));
        assert_eq!(reply.report_summary.as_deref(), Some("## Severity"));
        assert_eq!(reply.outcome(), ReplyOutcome::Empty);
    }

    #[test]
    fn non_json_body_fails_to_decode() {
        assert!(AnalysisReply::from_json(b"<html>502</html>").is_err());
    }

    #[test]
    fn endpoint_normalizes_origin_and_path() {
        let endpoint = ServiceEndpoint::new(" http://scanner.local:5000/ ", "chat");
        assert_eq!(endpoint.origin(), "http://scanner.local:5000");
        assert_eq!(endpoint.chat_url(), "http://scanner.local:5000/chat");

        let fallback = ServiceEndpoint::new("  ", "");
        assert_eq!(fallback, ServiceEndpoint::default());
    }

    #[test]
    fn resolve_concatenates_verbatim() {
        let endpoint = ServiceEndpoint::new("http://127.0.0.1:5000", "/chat");
        assert_eq!(
            endpoint.resolve("/get_annotated/a b.png"),
            "http://127.0.0.1:5000/get_annotated/a b.png"
        );
        assert_eq!(endpoint.resolve("x.png"), "http://127.0.0.1:5000x.png");
    }

    #[test]
    fn request_trims_text_and_drops_blank_messages() {
        let request = AnalysisRequest::new("  my wrist hurts \n", None);
        assert_eq!(request.message.as_deref(), Some("my wrist hurts"));
        assert!(!request.is_empty());

        let blank = AnalysisRequest::new(" \t\n", None);
        assert!(blank.message.is_none());
        assert!(blank.is_empty());

        let image_only = AnalysisRequest::new(
            "",
            Some(Attachment::new("/tmp/xray.png", "xray.png", "image/png")),
        );
        assert!(image_only.message.is_none());
        assert!(!image_only.is_empty());
    }

    #[test]
    fn history_turns_serialize_with_lowercase_roles() {
        let turns = vec![
            HistoryTurn::new(HistoryRole::User, "hi"),
            HistoryTurn::new(HistoryRole::Assistant, "hello"),
        ];
        let encoded = serde_json::to_value(&turns).unwrap();
        assert_eq!(
            encoded,
            json!([
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" },
            ])
        );
    }
}
