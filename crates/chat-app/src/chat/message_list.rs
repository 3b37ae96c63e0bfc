use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::Hasher;
use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use bonescope_chat::{ConversationFrame, MessageId, MessageRow, RowAlignment, RowBody};
use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    label::Label,
    text::TextView,
    v_flex, v_virtual_list,
};

use crate::chat::scroll_manager::ScrollManager;

const DEFAULT_CONTENT_WIDTH: Pixels = px(680.);
const LIST_HORIZONTAL_PADDING: Pixels = px(16.);
const CONTENT_WIDTH_CHANGE_EPSILON: f32 = 1.0;
const USER_BUBBLE_MAX_WIDTH: Pixels = px(540.);
const USER_BUBBLE_PADDING_X: Pixels = px(14.);
const USER_BUBBLE_PADDING_Y: Pixels = px(10.);
const BOT_IMAGE_HEIGHT: Pixels = px(320.);
const BOT_IMAGE_GAP: Pixels = px(8.);
const TYPING_INDICATOR_HEIGHT: Pixels = px(20.);
const ESTIMATED_TEXT_LINE_HEIGHT: Pixels = px(18.);
const ESTIMATED_CHAR_WIDTH: f32 = 7.0;
const MARKDOWN_SAFE_FALLBACK_THRESHOLD_BYTES: usize = 128 * 1024;

/// Download state of the annotated image attached to one bot message.
#[derive(Clone)]
pub enum ImageSlot {
    Loading,
    Ready(Arc<Image>),
    Failed,
}

/// One entry of the virtual list.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ListItem {
    Message(MessageRow),
    TypingIndicator,
}

impl ListItem {
    fn key(&self) -> &str {
        match self {
            ListItem::Message(row) => row.key.as_str(),
            ListItem::TypingIndicator => "typing-indicator",
        }
    }
}

struct SizeCacheEntry {
    layout_hash: u64,
    height: Pixels,
    measured: bool,
}

pub struct MessageList {
    items: Vec<ListItem>,
    images: HashMap<MessageId, ImageSlot>,
    item_sizes: Rc<Vec<Size<Pixels>>>,
    scroll_manager: ScrollManager,
    size_cache: HashMap<String, SizeCacheEntry>,
    content_width: Option<Pixels>,
}

impl MessageList {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self::empty()
    }

    fn empty() -> Self {
        Self {
            items: Vec::new(),
            images: HashMap::new(),
            item_sizes: Rc::new(Vec::new()),
            scroll_manager: ScrollManager::new(),
            size_cache: HashMap::new(),
            content_width: None,
        }
    }

    pub fn set_frame(&mut self, frame: ConversationFrame, cx: &mut Context<Self>) {
        if self.replace_items(frame) {
            cx.notify();
        }
    }

    /// Swaps in the rows of `frame`. Any difference, including a row whose
    /// content changed in place, scrolls the list back to its tail.
    fn replace_items(&mut self, frame: ConversationFrame) -> bool {
        let mut items = frame
            .rows
            .into_iter()
            .map(ListItem::Message)
            .collect::<Vec<_>>();
        if frame.typing_indicator {
            items.push(ListItem::TypingIndicator);
        }

        if items == self.items {
            return false;
        }

        self.items = items;
        self.rebuild_item_sizes();
        self.scroll_manager.request_scroll_to_bottom();
        true
    }

    /// Marks the image of `message` as loading unless it was requested
    /// before. Returns `true` when the caller should start a download.
    pub fn begin_image_load(&mut self, message: &MessageId) -> bool {
        if self.images.contains_key(message) {
            return false;
        }

        self.images.insert(message.clone(), ImageSlot::Loading);
        true
    }

    pub fn finish_image_load(
        &mut self,
        message: MessageId,
        slot: ImageSlot,
        cx: &mut Context<Self>,
    ) {
        self.images.insert(message, slot);
        self.rebuild_item_sizes();
        self.scroll_manager.request_scroll_to_bottom();
        cx.notify();
    }

    fn image_slot(&self, row: &MessageRow) -> Option<&ImageSlot> {
        row.image_url.as_ref()?;
        self.images.get(&row.key)
    }

    fn update_content_width(&mut self, cx: &mut Context<Self>) {
        let list_width = self.scroll_manager.bounds().size.width;
        if list_width <= Pixels::ZERO {
            return;
        }

        let next_content_width = max_pixels(px(1.), list_width - LIST_HORIZONTAL_PADDING * 2);
        let width_changed = self.content_width.is_none_or(|current| {
            (f32::from(current) - f32::from(next_content_width)).abs()
                > CONTENT_WIDTH_CHANGE_EPSILON
        });

        if width_changed {
            self.content_width = Some(next_content_width);

            for entry in self.size_cache.values_mut() {
                entry.measured = false;
            }

            self.rebuild_item_sizes();
            cx.notify();
        }
    }

    fn rebuild_item_sizes(&mut self) {
        let content_width = self.content_width.unwrap_or(DEFAULT_CONTENT_WIDTH);
        let mut active_keys = HashSet::with_capacity(self.items.len());
        let mut sizes = Vec::with_capacity(self.items.len());

        for item in &self.items {
            let next_hash = self.layout_hash(item);
            let estimated_height = self.estimate_item_height(item, content_width);

            let entry = self
                .size_cache
                .entry(item.key().to_string())
                .or_insert(SizeCacheEntry {
                    layout_hash: next_hash,
                    height: estimated_height,
                    measured: false,
                });

            if entry.layout_hash != next_hash {
                entry.layout_hash = next_hash;
                entry.height = estimated_height;
                entry.measured = false;
            } else if !entry.measured {
                entry.height = estimated_height;
            }

            sizes.push(size(px(0.), entry.height));
            active_keys.insert(item.key().to_string());
        }

        self.size_cache.retain(|key, _| active_keys.contains(key));
        self.item_sizes = Rc::new(sizes);
    }

    fn measure_visible_items(
        &mut self,
        visible_range: Range<usize>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        let content_width = self.content_width.unwrap_or(DEFAULT_CONTENT_WIDTH);
        let available_space = size(
            AvailableSpace::Definite(content_width),
            AvailableSpace::MinContent,
        );
        let mut updated = false;

        for index in visible_range {
            let Some(item) = self.items.get(index).cloned() else {
                continue;
            };

            let next_hash = self.layout_hash(&item);
            let mut row = self.render_item(&item, cx);
            let measured_height = row.layout_as_root(available_space, window, cx).height;
            let Some(entry) = self.size_cache.get_mut(item.key()) else {
                continue;
            };

            if entry.layout_hash != next_hash {
                entry.layout_hash = next_hash;
                entry.measured = false;
            }

            if !entry.measured || pixels_changed(entry.height, measured_height) {
                entry.height = measured_height;
                updated = true;
            }
            entry.measured = true;
        }

        if updated {
            self.rebuild_item_sizes();
            self.scroll_manager.request_scroll_to_bottom_if_following();
            cx.notify();
        }
    }

    fn render_item(&self, item: &ListItem, cx: &mut Context<Self>) -> AnyElement {
        match item {
            ListItem::Message(row) => self.render_message_row(row, cx),
            ListItem::TypingIndicator => render_typing_indicator(cx),
        }
    }

    fn render_message_row(&self, row: &MessageRow, cx: &mut Context<Self>) -> AnyElement {
        let theme = cx.theme();

        if row.alignment == RowAlignment::End {
            let content = match &row.body {
                Some(RowBody::Plain(text)) | Some(RowBody::Markdown(text)) if !text.is_empty() => {
                    text.clone()
                }
                _ => " ".to_string(),
            };

            return v_flex()
                .w_full()
                .items_end()
                .child(
                    div()
                        .max_w(USER_BUBBLE_MAX_WIDTH)
                        .px(USER_BUBBLE_PADDING_X)
                        .py(USER_BUBBLE_PADDING_Y)
                        .rounded_lg()
                        .bg(theme.accent)
                        .text_color(theme.accent_foreground)
                        .child(Label::new(content).text_sm()),
                )
                .into_any_element();
        }

        let image = match self.image_slot(row) {
            Some(ImageSlot::Ready(image)) => Some(image.clone()),
            _ => None,
        };

        v_flex()
            .w_full()
            .items_start()
            .gap(BOT_IMAGE_GAP)
            .when_some(row.body.as_ref(), |column, body| {
                column.child(render_bot_body(row, body))
            })
            .when_some(image, |column, image| {
                column.child(
                    img(image)
                        .h(BOT_IMAGE_HEIGHT)
                        .max_w_full()
                        .rounded_md()
                        .object_fit(ObjectFit::Contain),
                )
            })
            .into_any_element()
    }

    fn layout_hash(&self, item: &ListItem) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write(item.key().as_bytes());

        if let ListItem::Message(row) = item {
            match &row.body {
                Some(RowBody::Plain(text)) => {
                    hasher.write_u8(1);
                    hasher.write(text.as_bytes());
                }
                Some(RowBody::Markdown(text)) => {
                    hasher.write_u8(2);
                    hasher.write(text.as_bytes());
                }
                None => hasher.write_u8(0),
            }
            hasher.write_u8(u8::from(self.has_ready_image(row)));
        }

        hasher.finish()
    }

    fn estimate_item_height(&self, item: &ListItem, content_width: Pixels) -> Pixels {
        let ListItem::Message(row) = item else {
            return TYPING_INDICATOR_HEIGHT;
        };

        match (&row.alignment, &row.body) {
            (RowAlignment::End, body) => {
                let text = match body {
                    Some(RowBody::Plain(text)) | Some(RowBody::Markdown(text)) => text.as_str(),
                    None => "",
                };
                let bubble_width = min_pixels(content_width, USER_BUBBLE_MAX_WIDTH);
                let text_width = max_pixels(px(1.), bubble_width - USER_BUBBLE_PADDING_X * 2);
                estimate_text_height(text, text_width) + USER_BUBBLE_PADDING_Y * 2
            }
            (RowAlignment::Start, body) => {
                let mut total_height = match body {
                    Some(RowBody::Plain(text)) | Some(RowBody::Markdown(text)) => {
                        estimate_text_height(text, content_width)
                    }
                    None => Pixels::ZERO,
                };
                if self.has_ready_image(row) {
                    if body.is_some() {
                        total_height += BOT_IMAGE_GAP;
                    }
                    total_height += BOT_IMAGE_HEIGHT;
                }
                max_pixels(total_height, px(1.))
            }
        }
    }

    fn has_ready_image(&self, row: &MessageRow) -> bool {
        matches!(self.image_slot(row), Some(ImageSlot::Ready(_)))
    }
}

fn render_bot_body(row: &MessageRow, body: &RowBody) -> AnyElement {
    let text = match body {
        RowBody::Plain(text) => return Label::new(text.clone()).text_sm().into_any_element(),
        RowBody::Markdown(text) => text,
    };

    if text.len() > MARKDOWN_SAFE_FALLBACK_THRESHOLD_BYTES {
        return Label::new(text.clone()).text_sm().into_any_element();
    }

    let markdown_id = ElementId::Name(SharedString::from(format!(
        "bot-markdown-{}",
        row.key.as_str()
    )));

    TextView::markdown(markdown_id, text.clone())
        .code_block_actions(|code_block, _window, _cx| {
            let code = code_block.code().to_string();
            let mut hasher = DefaultHasher::new();
            hasher.write(code.as_bytes());
            let copy_button_id = format!("copy-code-{}", hasher.finish());

            h_flex().w_full().justify_end().child(
                Button::new(copy_button_id)
                    .ghost()
                    .small()
                    .icon(IconName::Copy)
                    .child("Copy")
                    .on_click(move |_, _, cx| {
                        cx.write_to_clipboard(ClipboardItem::new_string(code.clone()));
                    }),
            )
        })
        .selectable(true)
        .into_any_element()
}

fn render_typing_indicator(cx: &mut Context<MessageList>) -> AnyElement {
    let theme = cx.theme();
    let dot_color = theme.primary;

    h_flex()
        .w_full()
        .h(TYPING_INDICATOR_HEIGHT)
        .gap_1()
        .items_center()
        .children((0..3).map(move |index| {
            div()
                .size(px(8.))
                .rounded_full()
                .bg(dot_color)
                .with_animation(
                    ("typing-dot", index),
                    Animation::new(Duration::from_millis(900))
                        .repeat()
                        .with_easing(pulsating_between(0.25, 1.0)),
                    |dot, delta| dot.opacity(delta),
                )
        }))
        .child(
            Label::new("Analyzing...")
                .text_xs()
                .text_color(theme.foreground.opacity(0.65)),
        )
        .into_any_element()
}

impl Render for MessageList {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        self.update_content_width(cx);
        self.scroll_manager.update_follow_state();
        self.scroll_manager.apply_pending_scroll();

        v_flex().size_full().min_h_0().child(
            v_virtual_list(
                cx.entity().clone(),
                "message-list",
                self.item_sizes.clone(),
                |this, visible_range, window, cx| {
                    this.update_content_width(cx);
                    this.measure_visible_items(visible_range.clone(), window, cx);
                    visible_range
                        .filter_map(|index| {
                            this.items
                                .get(index)
                                .cloned()
                                .map(|item| this.render_item(&item, cx))
                        })
                        .collect::<Vec<_>>()
                },
            )
            .size_full()
            .px_4()
            .py_3()
            .gap_4()
            .track_scroll(self.scroll_manager.handle()),
        )
    }
}

fn estimate_text_height(content: &str, width: Pixels) -> Pixels {
    if content.is_empty() {
        return ESTIMATED_TEXT_LINE_HEIGHT;
    }

    let width_as_f32 = f32::from(width);
    let chars_per_line = (width_as_f32 / ESTIMATED_CHAR_WIDTH).floor().max(1.0) as usize;

    let mut line_count = 0usize;
    for line in content.lines() {
        let char_count = line.chars().count().max(1);
        line_count += char_count.div_ceil(chars_per_line);
    }

    if content.ends_with('\n') {
        line_count += 1;
    }

    ESTIMATED_TEXT_LINE_HEIGHT * line_count.max(1)
}

fn max_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) >= f32::from(b) { a } else { b }
}

fn min_pixels(a: Pixels, b: Pixels) -> Pixels {
    if f32::from(a) <= f32::from(b) { a } else { b }
}

fn pixels_changed(a: Pixels, b: Pixels) -> bool {
    (f32::from(a) - f32::from(b)).abs() > 0.5
}
