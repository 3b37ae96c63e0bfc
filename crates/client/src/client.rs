use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use snafu::{ResultExt, ensure};

use crate::error::{
    AnalysisResult, AttachmentMimeSnafu, BuildClientSnafu, DecodeBodySnafu, EncodeHistorySnafu,
    FetchImageStatusSnafu, ReadAttachmentSnafu, ReadBodySnafu, SendRequestSnafu,
};
use crate::types::{
    AnalysisReply, AnalysisRequest, Attachment, HISTORY_FIELD, IMAGE_FIELD, MESSAGE_FIELD,
    ServiceEndpoint,
};

/// Boundary between the chat pipeline and the remote analysis service.
pub trait AnalysisClient: Send + Sync {
    fn endpoint(&self) -> &ServiceEndpoint;

    /// Sends one submission and decodes the reply body.
    fn analyze(&self, request: AnalysisRequest) -> BoxFuture<'_, AnalysisResult<AnalysisReply>>;

    /// Downloads an annotated image by absolute URL.
    fn fetch_image(&self, url: String) -> BoxFuture<'_, AnalysisResult<Vec<u8>>>;
}

/// `reqwest`-backed client. No request timeout is configured.
pub struct HttpAnalysisClient {
    http: reqwest::Client,
    endpoint: ServiceEndpoint,
}

impl HttpAnalysisClient {
    pub fn new(endpoint: ServiceEndpoint) -> AnalysisResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context(BuildClientSnafu {
                stage: "build-client",
            })?;

        Ok(Self { http, endpoint })
    }

    async fn build_form(request: &AnalysisRequest) -> AnalysisResult<Form> {
        let mut form = Form::new();

        if let Some(message) = &request.message {
            form = form.text(MESSAGE_FIELD, message.clone());
        }

        if let Some(attachment) = &request.attachment {
            form = form.part(IMAGE_FIELD, Self::attachment_part(attachment).await?);
        }

        if !request.history.is_empty() {
            let history = serde_json::to_string(&request.history).context(EncodeHistorySnafu {
                stage: "encode-chat-history",
            })?;
            form = form.text(HISTORY_FIELD, history);
        }

        Ok(form)
    }

    async fn attachment_part(attachment: &Attachment) -> AnalysisResult<Part> {
        let bytes = tokio::fs::read(&attachment.path)
            .await
            .context(ReadAttachmentSnafu {
                stage: "read-attachment",
                path: attachment.path.clone(),
            })?;

        tracing::debug!(
            file_name = %attachment.file_name,
            mime = %attachment.mime,
            size = bytes.len(),
            "attaching image to analysis request"
        );

        Part::bytes(bytes)
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.mime)
            .context(AttachmentMimeSnafu {
                stage: "attachment-mime",
                mime: attachment.mime.clone(),
            })
    }

    async fn post_chat(&self, request: AnalysisRequest) -> AnalysisResult<AnalysisReply> {
        let url = self.endpoint.chat_url();
        let form = Self::build_form(&request).await?;

        tracing::info!(
            url = %url,
            has_message = request.message.is_some(),
            has_image = request.attachment.is_some(),
            history_turns = request.history.len(),
            "sending analysis request"
        );

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-chat-request",
                url: url.clone(),
            })?;

        let status = response.status();
        let body = response.bytes().await.context(ReadBodySnafu {
            stage: "read-chat-response",
        })?;

        // The service reports declared errors with a 500 and a JSON body, so the
        // body is decoded regardless of status.
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "analysis service returned non-success status");
        }

        AnalysisReply::from_json(&body).context(DecodeBodySnafu {
            stage: "decode-chat-response",
            status: status.as_u16(),
        })
    }

    async fn download(&self, url: String) -> AnalysisResult<Vec<u8>> {
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-image-request",
                url: url.clone(),
            })?;

        let status = response.status();
        ensure!(
            status.is_success(),
            FetchImageStatusSnafu {
                stage: "image-http-status",
                url,
                status: status.as_u16(),
            }
        );

        let bytes = response.bytes().await.context(ReadBodySnafu {
            stage: "read-image-response",
        })?;
        Ok(bytes.to_vec())
    }
}

impl AnalysisClient for HttpAnalysisClient {
    fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    fn analyze(&self, request: AnalysisRequest) -> BoxFuture<'_, AnalysisResult<AnalysisReply>> {
        self.post_chat(request).boxed()
    }

    fn fetch_image(&self, url: String) -> BoxFuture<'_, AnalysisResult<Vec<u8>>> {
        self.download(url).boxed()
    }
}
