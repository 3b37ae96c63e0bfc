use bonescope_client::ServiceEndpoint;

use crate::message::{Message, MessageId, Sender};
use crate::session::ChatSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAlignment {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowBody {
    /// Rendered verbatim, whitespace and newlines included.
    Plain(String),
    Markdown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub key: MessageId,
    pub alignment: RowAlignment,
    pub body: Option<RowBody>,
    /// Absolute image URL, already resolved against the server origin.
    pub image_url: Option<String>,
}

/// Everything the message list needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationFrame {
    pub rows: Vec<MessageRow>,
    pub typing_indicator: bool,
}

impl ConversationFrame {
    /// One download per row that shows an image, keyed by the owning message.
    pub fn image_requests(&self) -> impl Iterator<Item = (&MessageId, &str)> {
        self.rows
            .iter()
            .filter_map(|row| Some((&row.key, row.image_url.as_deref()?)))
    }
}

pub fn project(session: &ChatSession, endpoint: &ServiceEndpoint) -> ConversationFrame {
    ConversationFrame {
        rows: session
            .conversation()
            .messages()
            .iter()
            .map(|message| project_message(message, endpoint))
            .collect(),
        typing_indicator: session.is_in_flight(),
    }
}

fn project_message(message: &Message, endpoint: &ServiceEndpoint) -> MessageRow {
    let (alignment, body) = match message.sender {
        Sender::User => (
            RowAlignment::End,
            Some(RowBody::Plain(message.text_or_empty().to_string())),
        ),
        Sender::Bot => (
            RowAlignment::Start,
            message
                .text
                .as_ref()
                .filter(|text| !text.is_empty())
                .map(|text| RowBody::Markdown(text.clone())),
        ),
    };

    MessageRow {
        key: message.id.clone(),
        alignment,
        body,
        image_url: message
            .image_url
            .as_deref()
            .map(|relative| endpoint.resolve(relative)),
    }
}

#[cfg(test)]
mod tests {
    use bonescope_client::AnalysisReply;
    use chrono::Utc;

    use super::*;

    #[test]
    fn rows_follow_sender_alignment_and_resolve_images() {
        let endpoint = ServiceEndpoint::new("http://10.0.0.5:5000", "/chat");
        let mut session = ChatSession::new(Utc::now());
        session.draft_mut().set_text("line one\n  line two");
        let submission = session.begin_submission(Utc::now()).unwrap();

        let frame = project(&session, &endpoint);
        assert!(frame.typing_indicator);
        assert_eq!(frame.rows.len(), 2);
        assert_eq!(frame.rows[0].alignment, RowAlignment::Start);
        assert_eq!(frame.rows[1].alignment, RowAlignment::End);
        assert_eq!(
            frame.rows[1].body,
            Some(RowBody::Plain("line one\n  line two".to_string()))
        );

        session.settle(
            submission.ticket,
            Ok(AnalysisReply {
                response: Some("**Mild** fracture".to_string()),
                annotated_image_url: Some("/get_annotated/wrist.png".to_string()),
                ..AnalysisReply::default()
            }),
            Utc::now(),
        );

        let frame = project(&session, &endpoint);
        assert!(!frame.typing_indicator);
        let bot = frame.rows.last().unwrap();
        assert_eq!(bot.alignment, RowAlignment::Start);
        assert_eq!(
            bot.body,
            Some(RowBody::Markdown("**Mild** fracture".to_string()))
        );
        assert_eq!(
            bot.image_url.as_deref(),
            Some("http://10.0.0.5:5000/get_annotated/wrist.png")
        );
        assert_eq!(
            frame.image_requests().collect::<Vec<_>>(),
            [(&bot.key, "http://10.0.0.5:5000/get_annotated/wrist.png")]
        );
    }

    #[test]
    fn image_only_bot_row_has_no_body() {
        let endpoint = ServiceEndpoint::default();
        let mut session = ChatSession::new(Utc::now());
        session.draft_mut().set_text("scan");
        let submission = session.begin_submission(Utc::now()).unwrap();
        session.settle(
            submission.ticket,
            Ok(AnalysisReply {
                annotated_image_url: Some("/get_annotated/scan.png".to_string()),
                ..AnalysisReply::default()
            }),
            Utc::now(),
        );

        let frame = project(&session, &endpoint);
        let bot = frame.rows.last().unwrap();
        assert_eq!(bot.body, None);
        assert!(bot.image_url.is_some());
    }

    #[test]
    fn replies_reusing_an_image_path_request_separate_downloads() {
        let endpoint = ServiceEndpoint::default();
        let mut session = ChatSession::new(Utc::now());

        for _ in 0..2 {
            session.draft_mut().set_text("same file name");
            let submission = session.begin_submission(Utc::now()).unwrap();
            session.settle(
                submission.ticket,
                Ok(AnalysisReply {
                    annotated_image_url: Some("/get_annotated/xray.png".to_string()),
                    ..AnalysisReply::default()
                }),
                Utc::now(),
            );
        }

        let frame = project(&session, &endpoint);
        let requests = frame.image_requests().collect::<Vec<_>>();
        assert_eq!(requests.len(), 2);
        assert_ne!(requests[0].0, requests[1].0);
        assert_eq!(requests[0].1, requests[1].1);
    }
}
