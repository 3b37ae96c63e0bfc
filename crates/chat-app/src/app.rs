use std::path::PathBuf;
use std::sync::Arc;

use bonescope_client::AnalysisClient;
use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::notification::{Notification, NotificationList};
use gpui_component::{
    ActiveTheme, IconName, Sizable, ThemeMode,
    button::{Button, ButtonVariants},
    h_flex, v_flex,
};

use crate::chat::ChatView;
use crate::settings::{AppSettings, SettingsStore};

/// Returns the default themes directory path.
pub fn default_themes_path() -> PathBuf {
    PathBuf::from("./themes")
}

#[cfg(target_os = "macos")]
const WINDOW_TOOLBAR_LEFT_SAFE_PADDING: f32 = 78.0;
#[cfg(not(target_os = "macos"))]
const WINDOW_TOOLBAR_LEFT_SAFE_PADDING: f32 = 16.0;
#[cfg(target_os = "windows")]
const WINDOW_TOOLBAR_RIGHT_SAFE_PADDING: f32 = 120.0;
#[cfg(not(target_os = "windows"))]
const WINDOW_TOOLBAR_RIGHT_SAFE_PADDING: f32 = 16.0;

fn window_toolbar_height(window: &Window) -> Pixels {
    (1.75 * window.rem_size()).max(px(34.0))
}

gpui::actions!(shell, [Quit, AttachImage]);

/// Main window content: a draggable title bar above the chat view.
pub struct AppShell {
    notification_list: Entity<NotificationList>,
    chat_view: Entity<ChatView>,
    settings_store: Arc<SettingsStore>,
    focus_handle: FocusHandle,
}

impl AppShell {
    pub fn new(
        settings_store: Arc<SettingsStore>,
        client: Arc<dyn AnalysisClient>,
        notification_list: Entity<NotificationList>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let history_turns = settings_store.settings().history_turns;
        let chat_view = cx.new(|cx| ChatView::new(client, history_turns, window, cx));
        chat_view.update(cx, |chat_view, cx| chat_view.focus_input(window, cx));

        Self {
            notification_list,
            chat_view,
            settings_store,
            focus_handle: cx.focus_handle(),
        }
    }

    fn attach_image(&mut self, cx: &mut Context<Self>) {
        self.chat_view
            .update(cx, |chat_view, cx| chat_view.pick_attachment(cx));
    }

    fn toggle_theme_mode(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let next = with_flipped_mode(&self.settings_store.settings(), cx.theme().mode);
        next.apply_theme(Some(window), cx);
        if let Err(error) = self.settings_store.update(next) {
            tracing::error!(error = %error, "failed to save theme preference");
            self.notification_list.update(cx, |list, cx| {
                list.push(
                    Notification::error(format!("Could not save settings: {error}")),
                    window,
                    cx,
                );
            });
        }
        cx.notify();
    }
}

/// Settings after the light/dark toggle. An explicit mode switch overrides a
/// named theme.
fn with_flipped_mode(current: &AppSettings, showing: ThemeMode) -> AppSettings {
    AppSettings {
        theme_mode: if showing.is_dark() {
            ThemeMode::Light
        } else {
            ThemeMode::Dark
        },
        theme_name: String::new(),
        ..current.clone()
    }
}

impl Render for AppShell {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let toolbar_height = window_toolbar_height(window);

        div()
            .id("app-shell")
            .key_context("AppShell")
            .track_focus(&self.focus_handle)
            .on_action(cx.listener(|this, _: &AttachImage, _window, cx| {
                this.attach_image(cx);
            }))
            .size_full()
            .relative()
            .bg(theme.background)
            .child(
                v_flex().size_full().pt(toolbar_height).child(
                    v_flex()
                        .id("main-content")
                        .flex_1()
                        .w_full()
                        .min_h_0()
                        .overflow_hidden()
                        .child(self.chat_view.clone()),
                ),
            )
            .child(
                div()
                    .absolute()
                    .top_0()
                    .left_0()
                    .right_0()
                    .child(self.render_top_bar(window, toolbar_height, cx)),
            )
            .child(self.notification_list.clone())
    }
}

impl AppShell {
    fn render_top_bar(
        &self,
        window: &Window,
        toolbar_height: Pixels,
        cx: &Context<Self>,
    ) -> impl IntoElement {
        let theme = cx.theme();
        let origin = self.settings_store.settings().server_origin.clone();
        let theme_icon = if theme.mode.is_dark() {
            IconName::Sun
        } else {
            IconName::Moon
        };

        h_flex()
            .id("app-top-bar")
            .window_control_area(WindowControlArea::Drag)
            .w_full()
            .h(toolbar_height)
            .flex_shrink_0()
            .pl(px(WINDOW_TOOLBAR_LEFT_SAFE_PADDING))
            .pr(px(WINDOW_TOOLBAR_RIGHT_SAFE_PADDING))
            .items_center()
            .justify_between()
            .bg(theme.background)
            .border_b_1()
            .border_color(theme.border)
            .child(
                div()
                    .text_sm()
                    .font_weight(FontWeight::SEMIBOLD)
                    .child("Fracture Analysis"),
            )
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .child(
                        div()
                            .id("analysis-server-origin")
                            .px_2()
                            .py_1()
                            .rounded_full()
                            .bg(theme.muted)
                            .border_1()
                            .border_color(theme.border)
                            .text_xs()
                            .text_color(theme.muted_foreground)
                            .child(origin),
                    )
                    .child(
                        div()
                            .on_mouse_down(MouseButton::Left, |_, _, cx| cx.stop_propagation())
                            .child(
                                Button::new("toggle-theme-mode")
                                    .ghost()
                                    .small()
                                    .icon(theme_icon)
                                    .on_click(cx.listener(|this, _, window, cx| {
                                        this.toggle_theme_mode(window, cx);
                                    })),
                            ),
                    )
                    .child(render_client_side_controls(window)),
            )
            // Client-side decorations have no native drag area or window menu.
            .when(cfg!(target_os = "linux"), |title_bar| {
                title_bar.on_mouse_down(MouseButton::Left, |_, window, _| {
                    window.start_window_move();
                })
            })
            .when(
                cfg!(target_os = "linux") && window.window_controls().window_menu,
                |title_bar| {
                    title_bar.on_mouse_down(MouseButton::Right, |event, window, _| {
                        window.show_window_menu(event.position);
                    })
                },
            )
    }
}

#[cfg(target_os = "linux")]
fn render_client_side_controls(window: &Window) -> AnyElement {
    let zoom_icon = if window.is_maximized() {
        IconName::WindowRestore
    } else {
        IconName::WindowMaximize
    };
    let controls: [(&'static str, IconName, fn(&mut Window)); 3] = [
        ("window-minimize", IconName::WindowMinimize, |window| {
            window.minimize_window()
        }),
        ("window-zoom", zoom_icon, |window| window.zoom_window()),
        ("window-close", IconName::WindowClose, |window| window.remove_window()),
    ];

    h_flex()
        .id("window-controls")
        .items_center()
        .gap_1()
        .ml_2()
        .on_mouse_down(MouseButton::Left, |_, _, cx| cx.stop_propagation())
        .on_mouse_down(MouseButton::Right, |_, _, cx| cx.stop_propagation())
        .children(controls.into_iter().map(|(id, icon, press)| {
            Button::new(id)
                .ghost()
                .small()
                .icon(icon)
                .on_click(move |_, window, _| press(window))
        }))
        .into_any_element()
}

#[cfg(not(target_os = "linux"))]
fn render_client_side_controls(_window: &Window) -> AnyElement {
    div().into_any_element()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[::core::prelude::v1::test]
    fn theme_toggle_flips_mode_and_drops_named_theme() {
        let current = AppSettings {
            theme_mode: ThemeMode::Dark,
            theme_name: "Catppuccin Mocha".to_string(),
            server_origin: "http://10.0.0.5:5000".to_string(),
            history_turns: 4,
            ..AppSettings::default()
        };

        let next = with_flipped_mode(&current, ThemeMode::Dark);
        assert_eq!(next.theme_mode, ThemeMode::Light);
        assert!(next.theme_name.is_empty());
        assert_eq!(next.server_origin, current.server_origin);
        assert_eq!(next.history_turns, 4);

        let back = with_flipped_mode(&next, ThemeMode::Light);
        assert_eq!(back.theme_mode, ThemeMode::Dark);
    }
}
