mod launch;
mod notifications;
mod push;
mod settings;
mod shell;
mod utils;

use std::sync::Arc;

use launch::{
    commands::{
        frontend_ready, get_login_item_settings, get_start_minimized, set_launch_at_startup,
        set_start_minimized,
    },
    AppContext, LaunchContext, LaunchCoordinator, AUTOSTART_FLAG,
};
use log::{error, info, warn};
use notifications::{
    commands::{
        cancel_notification, get_notification_config, get_notification_status,
        request_notification_permission, schedule_notification,
    },
    graphical_session_env, NotificationScheduler, ScheduleResult, SchedulerEnv,
    SystemCommandRunner, REMINDER_FLAG,
};
use push::{
    commands::{parse_wns_launch_args, register_push_channel},
    PushChannelProvisioner,
};
use settings::SettingsStore;
use shell::{TauriMainWindow, MAIN_WINDOW_LABEL};
use tauri::{AppHandle, Manager, RunEvent};
use tauri_plugin_autostart::MacosLauncher;
use tauri_plugin_deep_link::DeepLinkExt;

pub(crate) struct AppState {
    pub(crate) settings: SettingsStore,
    pub(crate) scheduler: NotificationScheduler,
    pub(crate) launch: Arc<LaunchCoordinator>,
    pub(crate) push: PushChannelProvisioner,
}

fn is_reminder_launch(argv: &[String]) -> bool {
    argv.iter().any(|arg| arg == REMINDER_FLAG)
}

fn on_second_instance(app: &AppHandle, argv: Vec<String>) {
    let Some(state) = app.try_state::<AppState>() else {
        warn!("Second instance signalled before startup finished; ignoring");
        return;
    };

    if is_reminder_launch(&argv) {
        if let Err(err) = shell::show_reminder(app, state.settings.notification().as_ref()) {
            error!("Failed to post reminder: {err:#}");
        }
    }
    state
        .launch
        .handle(LaunchContext::SecondInstance(argv), &state.settings.startup());
}

/// Re-installs the stored reminder if its OS artifact went missing while the
/// app was not running.
async fn reconcile_reminder(app: AppHandle) {
    let state = app.state::<AppState>();
    let stored = state.settings.notification();
    if let Some(ScheduleResult {
        error: Some(err), ..
    }) = state.scheduler.reconcile(stored.as_ref()).await
    {
        error!("Could not restore reminder: {err}");
    }
}

#[cfg(target_os = "macos")]
fn handle_run_event(app: &AppHandle, event: RunEvent) {
    if let RunEvent::Reopen { .. } = event {
        if let Some(state) = app.try_state::<AppState>() {
            state.launch.reveal();
        }
    }
}

#[cfg(not(target_os = "macos"))]
fn handle_run_event(_app: &AppHandle, _event: RunEvent) {}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Touch Typer starting up...");

    let argv: Vec<String> = std::env::args().collect();

    tauri::Builder::default()
        // Must be registered first so later launches are redirected here.
        .plugin(tauri_plugin_single_instance::init(|app, argv, _cwd| {
            on_second_instance(app, argv);
        }))
        .plugin(tauri_plugin_deep_link::init())
        .plugin(tauri_plugin_autostart::init(
            MacosLauncher::LaunchAgent,
            Some(vec![AUTOSTART_FLAG]),
        ))
        .plugin(tauri_plugin_notification::init())
        .setup(move |app| {
            let result = (|| -> anyhow::Result<()> {
                let config_dir = app
                    .path()
                    .app_config_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                let data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&config_dir)?;
                std::fs::create_dir_all(&data_dir)?;

                let settings = SettingsStore::new(config_dir.join("settings.json"))?;
                let startup = settings.startup();
                let stored_reminder = settings.notification();

                let scheduler = NotificationScheduler::new(
                    Arc::new(SystemCommandRunner),
                    SchedulerEnv {
                        executable: std::env::current_exe()?,
                        home_dir: app.path().home_dir()?,
                        scratch_dir: data_dir,
                        session_env: graphical_session_env(),
                    },
                );

                let context = Arc::new(AppContext::new());
                match app.get_webview_window(MAIN_WINDOW_LABEL) {
                    Some(window) => context.set_main_window(Arc::new(TauriMainWindow::new(window))),
                    None => warn!("Main window '{MAIN_WINDOW_LABEL}' not found"),
                }
                let launch = Arc::new(LaunchCoordinator::new(context));

                app.manage(AppState {
                    settings,
                    scheduler,
                    launch: launch.clone(),
                    push: PushChannelProvisioner::for_host(),
                });

                {
                    let launch = launch.clone();
                    app.deep_link().on_open_url(move |event| {
                        for url in event.urls() {
                            launch.handle(
                                LaunchContext::ProtocolActivation(url.to_string()),
                                &startup,
                            );
                        }
                    });
                }

                #[cfg(any(target_os = "linux", all(debug_assertions, windows)))]
                app.deep_link().register_all()?;

                // macOS hands the launching URL to the plugin instead of argv.
                #[cfg(target_os = "macos")]
                if let Some(urls) = app.deep_link().get_current()? {
                    for url in urls {
                        launch.open_url(url.as_str());
                    }
                }

                shell::setup_tray(app.handle())?;

                launch.handle(LaunchContext::classify(&argv), &startup);

                if is_reminder_launch(&argv) {
                    if let Err(err) = shell::show_reminder(app.handle(), stored_reminder.as_ref()) {
                        error!("Failed to post reminder: {err:#}");
                    }
                }

                tauri::async_runtime::spawn(reconcile_reminder(app.handle().clone()));

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            schedule_notification,
            cancel_notification,
            request_notification_permission,
            get_notification_status,
            get_notification_config,
            get_login_item_settings,
            set_launch_at_startup,
            set_start_minimized,
            get_start_minimized,
            frontend_ready,
            register_push_channel,
            parse_wns_launch_args,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app, event| handle_run_event(app, event));
}
