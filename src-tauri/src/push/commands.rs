use std::collections::HashMap;

use tauri::State;

use super::{parse_wns_launch_args as parse_args, PushChannel};
use crate::AppState;

#[tauri::command]
pub async fn register_push_channel(state: State<'_, AppState>) -> Result<PushChannel, String> {
    state.push.provision().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub fn parse_wns_launch_args(args: String) -> HashMap<String, String> {
    parse_args(&args)
}
