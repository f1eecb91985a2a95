//! Practice-reminder scheduling.
//!
//! One [`NotificationConfig`] is translated into exactly one OS-native
//! recurring artifact: a LaunchAgent on macOS, a Scheduled Task on Windows,
//! or marked crontab lines on Linux. The installed artifact is the only
//! durable record of an active reminder; nothing is cached in-process.
//!
//! Every adapter is compiled on every host so it can be exercised against a
//! fake [`CommandRunner`]; [`Platform`] only decides which one runs.

pub mod commands;
mod config;
mod cron;
mod error;
mod launch_agent;
mod runner;
mod scheduled_task;

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;

pub use config::{NotificationConfig, ReminderTime, ScheduleResult, Weekday};
pub use cron::{graphical_session_env, CronScheduler};
pub use error::SchedulerError;
pub use launch_agent::LaunchAgentScheduler;
pub use runner::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use scheduled_task::ScheduledTaskScheduler;

use crate::{log_error, log_info};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "scheduler";

/// Argument the installed artifacts pass when they launch the app.
pub const REMINDER_FLAG: &str = "--reminder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    pub fn detect() -> Option<Self> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "macos" => Some(Platform::MacOs),
            "windows" => Some(Platform::Windows),
            "linux" => Some(Platform::Linux),
            _ => None,
        }
    }
}

/// Install, query and remove one OS-native recurring reminder.
///
/// Implementations must make `install` an idempotent replace and `remove` an
/// idempotent delete-if-exists.
#[async_trait]
pub trait PlatformScheduler: Send + Sync {
    async fn install(&self, config: &NotificationConfig) -> Result<(), SchedulerError>;
    async fn remove(&self) -> Result<(), SchedulerError>;
    async fn is_installed(&self) -> Result<bool, SchedulerError>;
}

/// Host facts the adapters need to build their artifacts.
#[derive(Debug, Clone)]
pub struct SchedulerEnv {
    /// Binary the artifact launches with [`REMINDER_FLAG`].
    pub executable: PathBuf,
    pub home_dir: PathBuf,
    /// Writable per-user directory for transient files.
    pub scratch_dir: PathBuf,
    /// Display/session variables the cron job is launched with.
    pub session_env: Vec<(String, String)>,
}

pub struct NotificationScheduler {
    runner: Arc<dyn CommandRunner>,
    env: SchedulerEnv,
    detect: fn() -> Option<Platform>,
}

impl NotificationScheduler {
    pub fn new(runner: Arc<dyn CommandRunner>, env: SchedulerEnv) -> Self {
        Self {
            runner,
            env,
            detect: Platform::detect,
        }
    }

    /// Overrides host detection; detection still runs on every call.
    pub fn with_platform_detector(mut self, detect: fn() -> Option<Platform>) -> Self {
        self.detect = detect;
        self
    }

    fn adapter(&self) -> Result<Box<dyn PlatformScheduler>, SchedulerError> {
        let runner = self.runner.clone();
        let executable = self.env.executable.clone();
        match (self.detect)() {
            Some(Platform::MacOs) => Ok(Box::new(LaunchAgentScheduler::new(
                runner,
                &self.env.home_dir,
                executable,
            ))),
            Some(Platform::Windows) => Ok(Box::new(ScheduledTaskScheduler::new(
                runner,
                &self.env.scratch_dir,
                executable,
            ))),
            Some(Platform::Linux) => Ok(Box::new(CronScheduler::new(
                runner,
                executable,
                self.env.session_env.clone(),
            ))),
            None => Err(SchedulerError::UnsupportedPlatform),
        }
    }

    /// Brings the OS artifact in line with `config`: installs it when the
    /// config can fire, removes it otherwise.
    pub async fn apply(&self, config: &NotificationConfig) -> ScheduleResult {
        self.install(config).await
    }

    pub async fn install(&self, config: &NotificationConfig) -> ScheduleResult {
        if !config.fires() {
            return self.remove().await;
        }

        let result = async {
            let adapter = self.adapter()?;
            adapter.install(config).await
        }
        .await;

        match result {
            Ok(()) => {
                log_info!("reminder scheduled at {} ({} day(s))", config.time, config.days.len());
                ScheduleResult::ok()
            }
            Err(err) => {
                log_error!("failed to schedule reminder: {err}");
                ScheduleResult::failure(err)
            }
        }
    }

    pub async fn remove(&self) -> ScheduleResult {
        let result = async { self.adapter()?.remove().await }.await;

        match result {
            Ok(()) => ScheduleResult::ok(),
            Err(err) => {
                log_error!("failed to cancel reminder: {err}");
                ScheduleResult::failure(err)
            }
        }
    }

    /// Re-installs `stored` when it should fire but its OS artifact is gone.
    /// Returns `None` when nothing needed doing.
    pub async fn reconcile(&self, stored: Option<&NotificationConfig>) -> Option<ScheduleResult> {
        let config = stored.filter(|config| config.fires())?;
        if self.is_installed().await {
            return None;
        }

        log_info!("stored reminder is not installed; re-applying");
        Some(self.install(config).await)
    }

    /// Read-only; any failure to query reads as "not installed".
    pub async fn is_installed(&self) -> bool {
        let result = async { self.adapter()?.is_installed().await }.await;

        result.unwrap_or_else(|err| {
            log_error!("failed to query reminder status: {err}");
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::cron::CRON_MARKER;
    use super::runner::fake::FakeRunner;
    use tempfile::TempDir;

    fn all_platforms() -> [fn() -> Option<Platform>; 3] {
        [
            || Some(Platform::MacOs),
            || Some(Platform::Windows),
            || Some(Platform::Linux),
        ]
    }

    struct Harness {
        home: TempDir,
        runner: FakeRunner,
        scheduler: NotificationScheduler,
    }

    fn harness(detect: fn() -> Option<Platform>) -> Harness {
        let home = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let env = SchedulerEnv {
            executable: PathBuf::from("/opt/touch-typer/touch-typer"),
            home_dir: home.path().to_path_buf(),
            scratch_dir: home.path().join("scratch"),
            session_env: Vec::new(),
        };
        let scheduler =
            NotificationScheduler::new(Arc::new(runner.clone()), env).with_platform_detector(detect);
        Harness {
            home,
            runner,
            scheduler,
        }
    }

    fn enabled_config() -> NotificationConfig {
        NotificationConfig {
            enabled: true,
            time: ReminderTime::new(20, 15).unwrap(),
            days: [Weekday::Mon, Weekday::Wed, Weekday::Fri].into_iter().collect(),
            message: "Keep your streak going".into(),
            duration: 10,
        }
    }

    #[test]
    fn platform_from_os_is_closed() {
        assert_eq!(Platform::from_os("macos"), Some(Platform::MacOs));
        assert_eq!(Platform::from_os("windows"), Some(Platform::Windows));
        assert_eq!(Platform::from_os("linux"), Some(Platform::Linux));
        assert_eq!(Platform::from_os("freebsd"), None);
    }

    #[tokio::test]
    async fn enabled_config_is_installed_on_every_platform() {
        for detect in all_platforms() {
            let h = harness(detect);
            let result = h.scheduler.apply(&enabled_config()).await;
            assert_eq!(result, ScheduleResult::ok(), "{:?}", detect());
            assert!(h.scheduler.is_installed().await, "{:?}", detect());
        }
    }

    #[tokio::test]
    async fn disabled_config_leaves_nothing_installed() {
        for detect in all_platforms() {
            let h = harness(detect);
            h.scheduler.apply(&enabled_config()).await;

            let disabled = NotificationConfig {
                enabled: false,
                ..enabled_config()
            };
            assert!(h.scheduler.apply(&disabled).await.success);
            assert!(!h.scheduler.is_installed().await, "{:?}", detect());
        }
    }

    #[tokio::test]
    async fn enabled_without_days_behaves_as_disabled() {
        let h = harness(|| Some(Platform::Linux));
        h.scheduler.apply(&enabled_config()).await;

        let no_days = NotificationConfig {
            days: Default::default(),
            ..enabled_config()
        };
        assert!(h.scheduler.apply(&no_days).await.success);
        assert!(!h.scheduler.is_installed().await);
    }

    #[tokio::test]
    async fn applying_twice_keeps_a_single_artifact() {
        let linux = harness(|| Some(Platform::Linux));
        linux.scheduler.apply(&enabled_config()).await;
        linux.scheduler.apply(&enabled_config()).await;
        let table = linux.runner.crontab().unwrap();
        assert_eq!(table.matches(CRON_MARKER).count(), 3);

        let windows = harness(|| Some(Platform::Windows));
        windows.scheduler.apply(&enabled_config()).await;
        windows.scheduler.apply(&enabled_config()).await;
        assert_eq!(windows.runner.task_count(), 1);

        let macos = harness(|| Some(Platform::MacOs));
        macos.scheduler.apply(&enabled_config()).await;
        macos.scheduler.apply(&enabled_config()).await;
        assert_eq!(macos.runner.loaded_agents(), 1);
        assert!(macos
            .runner
            .calls_to("launchctl")
            .iter()
            .any(|call| call[0] == "remove"));
    }

    #[tokio::test]
    async fn reconcile_restores_a_missing_artifact() {
        for detect in all_platforms() {
            let h = harness(detect);

            let restored = h.scheduler.reconcile(Some(&enabled_config())).await;
            assert_eq!(restored, Some(ScheduleResult::ok()), "{:?}", detect());
            assert!(h.scheduler.is_installed().await, "{:?}", detect());
            assert_eq!(h.scheduler.reconcile(Some(&enabled_config())).await, None);
        }
    }

    #[tokio::test]
    async fn reconcile_heals_launch_agent_after_plist_deleted() {
        let h = harness(|| Some(Platform::MacOs));
        h.scheduler.apply(&enabled_config()).await;

        let plist = h
            .home
            .path()
            .join("Library/LaunchAgents/io.kochie.touch-typer-reminder.plist");
        std::fs::remove_file(plist).unwrap();

        let restored = h.scheduler.reconcile(Some(&enabled_config())).await;
        assert_eq!(restored, Some(ScheduleResult::ok()));
        assert!(h.scheduler.is_installed().await);
        assert_eq!(h.runner.loaded_agents(), 1);
    }

    #[tokio::test]
    async fn reconcile_ignores_inactive_or_missing_config() {
        for detect in all_platforms() {
            let h = harness(detect);
            let disabled = NotificationConfig {
                enabled: false,
                ..enabled_config()
            };

            assert_eq!(h.scheduler.reconcile(None).await, None);
            assert_eq!(h.scheduler.reconcile(Some(&disabled)).await, None);
            assert!(h.runner.invocations().is_empty(), "{:?}", detect());
        }
    }

    #[tokio::test]
    async fn remove_when_nothing_installed_succeeds() {
        for detect in all_platforms() {
            let h = harness(detect);
            assert_eq!(h.scheduler.remove().await, ScheduleResult::ok());
        }
    }

    #[tokio::test]
    async fn unsupported_platform_never_reaches_an_adapter() {
        let h = harness(|| None);

        let result = h.scheduler.apply(&enabled_config()).await;
        assert_eq!(result.error.as_deref(), Some("Unsupported platform"));
        assert_eq!(
            h.scheduler.remove().await.error.as_deref(),
            Some("Unsupported platform")
        );
        assert!(!h.scheduler.is_installed().await);
        assert!(h.runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn tool_failure_becomes_a_result() {
        let home = TempDir::new().unwrap();
        let runner = FakeRunner::new().failing("schtasks");
        let env = SchedulerEnv {
            executable: PathBuf::from("touch-typer.exe"),
            home_dir: home.path().to_path_buf(),
            scratch_dir: home.path().to_path_buf(),
            session_env: Vec::new(),
        };
        let scheduler = NotificationScheduler::new(Arc::new(runner), env)
            .with_platform_detector(|| Some(Platform::Windows));

        let result = scheduler.apply(&enabled_config()).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("schtasks exited with status 1: simulated failure")
        );
    }
}
