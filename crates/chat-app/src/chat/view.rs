use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use bonescope_chat::{
    ChatSession, MessageId, Settlement, SubmissionTicket, SubmitRejection, project,
};
use bonescope_client::{
    AnalysisClient, AnalysisError, AnalysisReply, AnalysisResult, ServiceEndpoint,
};
use chrono::Utc;
use gpui::*;
use gpui_component::{ActiveTheme, v_flex};
use gpui_tokio_bridge::Tokio;

use crate::chat::events::{AttachRequested, AttachmentRemoved, DraftEdited, Submit};
use crate::chat::images::image_from_download;
use crate::chat::message_list::ImageSlot;
use crate::chat::{MessageInput, MessageList};

/// Coordinator between the chat session, the analysis client and the two
/// child views. All session mutation happens here on the UI thread.
pub struct ChatView {
    message_list: Entity<MessageList>,
    message_input: Entity<MessageInput>,
    session: ChatSession,
    client: Arc<dyn AnalysisClient>,
    endpoint: ServiceEndpoint,
    submission_task: Option<Task<()>>,
    picker_task: Option<Task<()>>,
    image_tasks: HashMap<MessageId, Task<()>>,
}

impl ChatView {
    pub fn new(
        client: Arc<dyn AnalysisClient>,
        history_turns: usize,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let message_list = cx.new(MessageList::new);
        let message_input = cx.new(|cx| MessageInput::new(window, cx));
        let endpoint = client.endpoint().clone();

        cx.subscribe(&message_input, |this, _, event: &DraftEdited, _cx| {
            this.session.draft_mut().set_text(event.text.clone());
        })
        .detach();

        cx.subscribe_in(&message_input, window, |this, _, _event: &Submit, window, cx| {
            this.handle_submit(window, cx);
        })
        .detach();

        cx.subscribe(&message_input, |this, _, _event: &AttachRequested, cx| {
            this.pick_attachment(cx);
        })
        .detach();

        cx.subscribe(&message_input, |this, _, _event: &AttachmentRemoved, cx| {
            this.session.draft_mut().clear_attachment();
            this.sync_input(cx);
        })
        .detach();

        let mut this = Self {
            message_list,
            message_input,
            session: ChatSession::new(Utc::now()).with_history_turns(history_turns),
            client,
            endpoint,
            submission_task: None,
            picker_task: None,
            image_tasks: HashMap::new(),
        };
        this.sync_conversation(cx);
        this
    }

    pub fn focus_input(&self, window: &mut Window, cx: &mut Context<Self>) {
        self.message_input.update(cx, |input, cx| input.focus(window, cx));
    }

    /// Opens the system file picker and stages the chosen image.
    pub fn pick_attachment(&mut self, cx: &mut Context<Self>) {
        if self.picker_task.is_some() {
            return;
        }

        let paths = cx.prompt_for_paths(PathPromptOptions {
            files: true,
            directories: false,
            multiple: false,
            prompt: Some("Attach".into()),
        });

        self.picker_task = Some(cx.spawn(async move |this, cx| {
            let picked = match paths.await {
                Ok(Ok(Some(paths))) => paths.into_iter().next(),
                Ok(Ok(None)) => None,
                Ok(Err(error)) => {
                    tracing::warn!(error = %error, "file picker failed");
                    None
                }
                Err(_) => None,
            };

            let _ = this.update(cx, |this, cx| {
                this.picker_task = None;
                if let Some(path) = picked {
                    this.stage_attachment(path, cx);
                }
            });
        }));
    }

    fn stage_attachment(&mut self, path: PathBuf, cx: &mut Context<Self>) {
        match bonescope_chat::image_attachment(path) {
            Ok(attachment) => {
                tracing::info!(path = ?attachment.path, mime = %attachment.mime, "image attached");
                self.session.draft_mut().select_attachment(attachment);
                self.message_input
                    .update(cx, |input, cx| input.set_notice(None, cx));
            }
            Err(error) => {
                tracing::info!(error = %error, "attachment rejected");
                self.message_input
                    .update(cx, |input, cx| input.set_notice(Some(error.to_string()), cx));
            }
        }
        self.sync_input(cx);
    }

    fn handle_submit(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let submission = match self.session.begin_submission(Utc::now()) {
            Ok(submission) => submission,
            Err(SubmitRejection::EmptyDraft) => return,
            Err(SubmitRejection::InFlight) => {
                tracing::debug!("submission ignored while a request is in flight");
                return;
            }
        };

        self.message_input.update(cx, |input, cx| {
            input.clear(window, cx);
            input.set_notice(None, cx);
        });
        self.sync_conversation(cx);

        let ticket = submission.ticket;
        let request = submission.request;
        let client = self.client.clone();
        let worker = Tokio::spawn(cx, async move { client.analyze(request).await });

        self.submission_task = Some(cx.spawn(async move |this, cx| {
            let result = match worker.await {
                Ok(result) => result,
                Err(error) => Err(AnalysisError::interrupted(
                    "join-analysis-task",
                    error.to_string(),
                )),
            };

            let _ = this.update(cx, |this, cx| {
                this.handle_settlement(ticket, result, cx);
            });
        }));
    }

    fn handle_settlement(
        &mut self,
        ticket: SubmissionTicket,
        result: AnalysisResult<AnalysisReply>,
        cx: &mut Context<Self>,
    ) {
        let settlement = self.session.settle(ticket, result, Utc::now());
        if settlement == Settlement::Stale {
            return;
        }

        self.submission_task = None;
        self.sync_conversation(cx);
    }

    fn sync_conversation(&mut self, cx: &mut Context<Self>) {
        let frame = project(&self.session, &self.endpoint);
        let images = frame
            .image_requests()
            .map(|(message, url)| (message.clone(), url.to_string()))
            .collect::<Vec<_>>();

        self.message_list
            .update(cx, |list, cx| list.set_frame(frame, cx));
        for (message, url) in images {
            self.load_image(message, url, cx);
        }
        self.sync_input(cx);
    }

    fn sync_input(&mut self, cx: &mut Context<Self>) {
        let in_flight = self.session.is_in_flight();
        let label = self
            .session
            .draft()
            .attachment()
            .map(|attachment| attachment.file_name.clone());

        self.message_input.update(cx, |input, cx| {
            input.set_in_flight(in_flight, cx);
            input.set_attachment_label(label, cx);
        });
    }

    /// Downloads the annotated image of one bot message. Each message gets
    /// its own copy, since the server reuses file names across uploads.
    fn load_image(&mut self, message: MessageId, url: String, cx: &mut Context<Self>) {
        let should_fetch = self
            .message_list
            .update(cx, |list, _| list.begin_image_load(&message));
        if !should_fetch {
            return;
        }

        let client = self.client.clone();
        let fetch_url = url.clone();
        let worker = Tokio::spawn(cx, async move { client.fetch_image(fetch_url).await });

        let task = cx.spawn({
            let message = message.clone();
            async move |this, cx| {
                let slot = match worker.await {
                    Ok(Ok(bytes)) => ImageSlot::Ready(image_from_download(&url, bytes)),
                    Ok(Err(error)) => {
                        tracing::warn!(url = %url, error = %error, "annotated image failed to load");
                        ImageSlot::Failed
                    }
                    Err(error) => {
                        tracing::warn!(url = %url, error = %error, "image download task was interrupted");
                        ImageSlot::Failed
                    }
                };

                let _ = this.update(cx, |this, cx| {
                    this.image_tasks.remove(&message);
                    this.message_list
                        .update(cx, |list, cx| list.finish_image_load(message, slot, cx));
                });
            }
        });
        self.image_tasks.insert(message, task);
    }
}

impl Render for ChatView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .size_full()
            .min_h_0()
            .bg(theme.background)
            .child(
                div()
                    .flex_1()
                    .min_h_0()
                    .w_full()
                    .child(self.message_list.clone()),
            )
            .child(
                div()
                    .w_full()
                    .border_t_1()
                    .border_color(theme.border)
                    .child(self.message_input.clone()),
            )
    }
}
