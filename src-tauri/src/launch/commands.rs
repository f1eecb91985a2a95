use serde::Serialize;
use tauri::{AppHandle, State};
use tauri_plugin_autostart::ManagerExt;

use crate::{notifications::ScheduleResult, AppState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginItemSettings {
    pub open_at_login: bool,
    /// Whether this process was started by the login item.
    pub open_as_hidden: bool,
    pub start_minimized: bool,
}

#[tauri::command]
pub fn get_login_item_settings(
    app: AppHandle,
    state: State<AppState>,
) -> Result<LoginItemSettings, String> {
    let open_at_login = app.autolaunch().is_enabled().map_err(|e| e.to_string())?;
    Ok(LoginItemSettings {
        open_at_login,
        open_as_hidden: state.launch.was_auto_launched(),
        start_minimized: state.settings.startup().start_minimized,
    })
}

#[tauri::command]
pub fn set_launch_at_startup(app: AppHandle, state: State<AppState>, enabled: bool) -> ScheduleResult {
    let autolaunch = app.autolaunch();
    let toggled = if enabled {
        autolaunch.enable()
    } else {
        autolaunch.disable()
    };
    if let Err(err) = toggled {
        log::error!("Failed to update login item: {err}");
        return ScheduleResult::failure(err);
    }

    state
        .settings
        .set_launch_at_startup(enabled)
        .map_err(|e| format!("{e:#}"))
        .into()
}

#[tauri::command]
pub fn set_start_minimized(state: State<AppState>, enabled: bool) -> ScheduleResult {
    state
        .settings
        .set_start_minimized(enabled)
        .map_err(|e| format!("{e:#}"))
        .into()
}

#[tauri::command]
pub fn get_start_minimized(state: State<AppState>) -> bool {
    state.settings.startup().start_minimized
}

/// Sent by the renderer once its deep-link listener is registered.
#[tauri::command]
pub fn frontend_ready(state: State<AppState>) {
    state.launch.window_ready();
}
