use gpui::{Bounds, Pixels, point, px};
use gpui_component::VirtualListScrollHandle;

/// Distance from the tail that still counts as "at the bottom".
const TAIL_SNAP_DISTANCE: Pixels = px(24.);
const SCROLL_JITTER: f32 = 1.0;

/// Keeps the message list pinned to its tail.
///
/// The list follows the tail until the user scrolls up. Any change to the
/// conversation re-engages following, and following stays on across the
/// renders it takes for measured row heights to settle.
pub struct ScrollManager {
    scroll_handle: VirtualListScrollHandle,
    pending_scroll_to_bottom: bool,
    following: bool,
    previous_offset: Pixels,
    previous_max_offset: Pixels,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self {
            scroll_handle: VirtualListScrollHandle::new(),
            pending_scroll_to_bottom: false,
            following: true,
            previous_offset: Pixels::ZERO,
            previous_max_offset: Pixels::ZERO,
        }
    }

    pub fn handle(&self) -> &VirtualListScrollHandle {
        &self.scroll_handle
    }

    pub fn request_scroll_to_bottom(&mut self) {
        self.pending_scroll_to_bottom = true;
        self.following = true;
    }

    /// Re-applies the tail scroll after a layout change, unless the user
    /// has scrolled away from the tail.
    pub fn request_scroll_to_bottom_if_following(&mut self) {
        if self.following || at_tail(self.previous_offset, self.previous_max_offset) {
            self.pending_scroll_to_bottom = true;
        }
    }

    /// Reads the scroll metrics produced by the last layout pass.
    pub fn update_follow_state(&mut self) {
        let offset = self.scroll_handle.offset().y;
        let max_offset = self.scroll_handle.max_offset().height;
        self.observe_scroll(offset, max_offset);
    }

    pub(crate) fn observe_scroll(&mut self, offset: Pixels, max_offset: Pixels) {
        let moved_by = f32::from(offset) - f32::from(self.previous_offset);
        let content_resized =
            (f32::from(max_offset) - f32::from(self.previous_max_offset)).abs() > SCROLL_JITTER;
        // Positive deltas move toward the head of the list.
        let scrolled_up = moved_by > SCROLL_JITTER && !content_resized;
        let scrolled_down = moved_by < -SCROLL_JITTER && !content_resized;

        if self.pending_scroll_to_bottom
            || (content_resized && at_tail(self.previous_offset, self.previous_max_offset))
        {
            self.following = true;
        } else if self.following && scrolled_up {
            self.following = false;
        } else if !self.following && scrolled_down && at_tail(offset, max_offset) {
            self.following = true;
        }

        self.previous_offset = offset;
        self.previous_max_offset = max_offset;
    }

    /// Scrolls to the tail when following or asked to. Returns whether a
    /// scroll was issued.
    pub fn apply_pending_scroll(&mut self) -> bool {
        let should_scroll = self.following || self.pending_scroll_to_bottom;
        if should_scroll {
            let max_offset = self.scroll_handle.max_offset().height;
            let current_x = self.scroll_handle.offset().x;
            let target_y = if max_offset > Pixels::ZERO {
                -max_offset
            } else {
                Pixels::ZERO
            };
            self.scroll_handle.set_offset(point(current_x, target_y));
        }

        self.pending_scroll_to_bottom = false;
        should_scroll
    }

    pub fn bounds(&self) -> Bounds<Pixels> {
        self.scroll_handle.bounds()
    }
}

impl Default for ScrollManager {
    fn default() -> Self {
        Self::new()
    }
}

// GPUI scrolls down with negative Y offsets, so the tail is at `-max_offset`.
fn at_tail(offset: Pixels, max_offset: Pixels) -> bool {
    if max_offset <= Pixels::ZERO {
        return true;
    }
    (offset + max_offset).abs() <= TAIL_SNAP_DISTANCE
}
