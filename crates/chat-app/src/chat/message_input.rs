use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{
    ActiveTheme, Disableable, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
    label::Label,
    v_flex,
};

use crate::chat::events::{AttachRequested, AttachmentRemoved, DraftEdited, Submit};

pub struct MessageInput {
    input_state: Entity<InputState>,
    last_reported_text: String,
    attachment_label: Option<SharedString>,
    notice: Option<SharedString>,
    in_flight: bool,
    pending_newline: bool,
}

impl EventEmitter<Submit> for MessageInput {}
impl EventEmitter<DraftEdited> for MessageInput {}
impl EventEmitter<AttachRequested> for MessageInput {}
impl EventEmitter<AttachmentRemoved> for MessageInput {}

impl MessageInput {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let input_state = cx.new(|cx| {
            InputState::new(window, cx)
                .placeholder("Describe the injury or attach an X-ray...")
                .clean_on_escape()
                .auto_grow(1, 8)
        });

        cx.subscribe_in(
            &input_state,
            window,
            |this, _, event: &InputEvent, window, cx| match event {
                InputEvent::PressEnter { secondary } => {
                    if *secondary {
                        this.pending_newline = false;
                        return;
                    }

                    if this.pending_newline {
                        // Shift+Enter already inserted the newline; this enter is its echo.
                        this.pending_newline = false;
                        this.report_draft(cx);
                    } else {
                        this.trim_trailing_newline(window, cx);
                        this.report_draft(cx);
                        this.handle_submit(cx);
                    }
                }
                _ => this.report_draft(cx),
            },
        )
        .detach();

        Self {
            input_state,
            last_reported_text: String::new(),
            attachment_label: None,
            notice: None,
            in_flight: false,
            pending_newline: false,
        }
    }

    pub fn set_in_flight(&mut self, in_flight: bool, cx: &mut Context<Self>) {
        self.in_flight = in_flight;
        cx.notify();
    }

    pub fn set_attachment_label(&mut self, label: Option<String>, cx: &mut Context<Self>) {
        self.attachment_label = label.map(SharedString::from);
        cx.notify();
    }

    pub fn set_notice(&mut self, notice: Option<String>, cx: &mut Context<Self>) {
        self.notice = notice.map(SharedString::from);
        cx.notify();
    }

    pub fn focus(&self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            state.focus(window, cx);
        });
    }

    /// Empties the text box without reporting an edit; the session already
    /// cleared its draft when the submission was dispatched.
    pub fn clear(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            state.set_value("", window, cx);
        });
        self.last_reported_text.clear();
        self.pending_newline = false;
    }

    fn report_draft(&mut self, cx: &mut Context<Self>) {
        let text = self.input_state.read(cx).value().to_string();
        if text == self.last_reported_text {
            return;
        }

        self.last_reported_text = text.clone();
        if self.notice.is_some() {
            self.notice = None;
            cx.notify();
        }
        cx.emit(DraftEdited::new(text));
    }

    fn handle_shift_enter(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.pending_newline = true;
        self.input_state.update(cx, |state, cx| {
            state.insert("\n", window, cx);
        });
        cx.notify();
    }

    fn trim_trailing_newline(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            let value = state.value().to_string();
            if let Some(trimmed) = value.strip_suffix('\n') {
                state.set_value(trimmed.to_string(), window, cx);
            }
        });
    }

    fn handle_submit(&mut self, cx: &mut Context<Self>) {
        if self.in_flight {
            return;
        }

        cx.emit(Submit);
    }
}

impl Render for MessageInput {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let in_flight = self.in_flight;

        let attachment_chip = self.attachment_label.clone().map(|label| {
            h_flex()
                .gap_1()
                .px_2()
                .py_1()
                .rounded_md()
                .bg(theme.secondary)
                .child(Label::new(label).text_xs())
                .child(
                    Button::new("remove-attachment")
                        .ghost()
                        .xsmall()
                        .icon(IconName::Close)
                        .on_click(cx.listener(|_, _, _window, cx| {
                            cx.emit(AttachmentRemoved);
                        })),
                )
        });

        v_flex()
            .bg(theme.background)
            .gap_2()
            .p_3()
            .when_some(self.notice.clone(), |column, notice| {
                column.child(Label::new(notice).text_xs().text_color(theme.danger))
            })
            .child(
                div()
                    .w_full()
                    .px_3()
                    .py_2()
                    .rounded_lg()
                    .border_1()
                    .border_color(theme.border)
                    .bg(theme.background)
                    .on_key_down(cx.listener(|this, event: &KeyDownEvent, window, cx| {
                        if event.keystroke.key == "enter" && event.keystroke.modifiers.shift {
                            this.handle_shift_enter(window, cx);
                        }
                    }))
                    .child(Input::new(&self.input_state).w_full()),
            )
            .child(
                h_flex()
                    .w_full()
                    .gap_2()
                    .items_center()
                    .child(
                        Button::new("attach-image")
                            .small()
                            .ghost()
                            .icon(IconName::Plus)
                            .child("Image")
                            .on_click(cx.listener(|_, _, _window, cx| {
                                cx.emit(AttachRequested);
                            })),
                    )
                    .children(attachment_chip)
                    .child(div().flex_1())
                    .child(
                        Button::new("send")
                            .small()
                            .primary()
                            .icon(IconName::ArrowUp)
                            .child("Send")
                            .loading(in_flight)
                            .disabled(in_flight)
                            .on_click(cx.listener(|this, _, _window, cx| {
                                this.handle_submit(cx);
                            })),
                    ),
            )
    }
}
