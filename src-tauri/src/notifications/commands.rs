use tauri::{AppHandle, State};
use tauri_plugin_notification::{NotificationExt, PermissionState};

use super::{NotificationConfig, ScheduleResult};
use crate::AppState;

#[tauri::command]
pub async fn schedule_notification(
    state: State<'_, AppState>,
    config: NotificationConfig,
) -> Result<ScheduleResult, String> {
    if let Err(err) = state.settings.update_notification(config.clone()) {
        return Ok(ScheduleResult::failure(format!("{err:#}")));
    }
    Ok(state.scheduler.apply(&config).await)
}

#[tauri::command]
pub async fn cancel_notification(state: State<'_, AppState>) -> Result<ScheduleResult, String> {
    if let Err(err) = state.settings.disable_notification() {
        return Ok(ScheduleResult::failure(format!("{err:#}")));
    }
    Ok(state.scheduler.remove().await)
}

#[tauri::command]
pub async fn get_notification_status(state: State<'_, AppState>) -> Result<bool, String> {
    Ok(state.scheduler.is_installed().await)
}

#[tauri::command]
pub fn get_notification_config(state: State<AppState>) -> Option<NotificationConfig> {
    state.settings.notification()
}

#[tauri::command]
pub fn request_notification_permission(app: AppHandle) -> Result<bool, String> {
    let notifications = app.notification();
    let current = notifications
        .permission_state()
        .map_err(|e| e.to_string())?;

    let resolved = match current {
        PermissionState::Prompt | PermissionState::PromptWithRationale => notifications
            .request_permission()
            .map_err(|e| e.to_string())?,
        other => other,
    };
    Ok(matches!(resolved, PermissionState::Granted))
}
