//! Tauri-facing pieces: the concrete main window, the tray, and the reminder
//! toast shown on `--reminder` launches.

use anyhow::Result;
use tauri::{
    menu::{MenuBuilder, MenuItemBuilder},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    AppHandle, Emitter, Manager, WebviewWindow,
};
use tauri_plugin_notification::NotificationExt;

use crate::{
    launch::{DeepLinkAction, MainWindow},
    notifications::NotificationConfig,
    AppState,
};

pub const MAIN_WINDOW_LABEL: &str = "main";
pub const DEEP_LINK_EVENT: &str = "deep-link";

const REMINDER_TITLE: &str = "Time to practice";

pub struct TauriMainWindow {
    window: WebviewWindow,
}

impl TauriMainWindow {
    pub fn new(window: WebviewWindow) -> Self {
        Self { window }
    }
}

impl MainWindow for TauriMainWindow {
    fn reveal(&self) -> Result<()> {
        self.window.show()?;
        self.window.unminimize()?;
        self.window.set_focus()?;
        Ok(())
    }

    fn dispatch(&self, action: &DeepLinkAction) -> Result<()> {
        self.window.emit(DEEP_LINK_EVENT, action)?;
        Ok(())
    }
}

pub fn show_reminder(app: &AppHandle, config: Option<&NotificationConfig>) -> Result<()> {
    let fallback = NotificationConfig::default();
    let config = config.unwrap_or(&fallback);

    app.notification()
        .builder()
        .title(REMINDER_TITLE)
        .body(config.message.clone())
        .show()?;
    log::info!("Posted practice reminder ({} min session)", config.duration);
    Ok(())
}

fn reveal_main_window(app: &AppHandle) {
    if let Some(state) = app.try_state::<AppState>() {
        state.launch.reveal();
    }
}

pub fn setup_tray(app: &AppHandle) -> tauri::Result<()> {
    let open = MenuItemBuilder::with_id("open", "Open Touch Typer").build(app)?;
    let quit = MenuItemBuilder::with_id("quit", "Quit").build(app)?;
    let menu = MenuBuilder::new(app).items(&[&open, &quit]).build()?;

    let mut tray = TrayIconBuilder::new()
        .menu(&menu)
        .tooltip("Touch Typer")
        .on_menu_event(|app, event| match event.id.as_ref() {
            "open" => reveal_main_window(app),
            "quit" => app.exit(0),
            _ => {}
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                reveal_main_window(tray.app_handle());
            }
        });

    if let Some(icon) = app.default_window_icon() {
        tray = tray.icon(icon.clone());
    }
    tray.build(app)?;

    Ok(())
}
