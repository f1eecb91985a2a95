use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;

use super::{
    runner::args, CommandRunner, NotificationConfig, PlatformScheduler, SchedulerError,
    REMINDER_FLAG,
};
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "cron";

/// Trailing comment identifying the lines this app owns in the user's crontab.
pub const CRON_MARKER: &str = "# touch-typer-reminder";

/// Variables a GUI process needs to reach the user's display and session
/// bus. cron starts jobs without them.
const SESSION_VARS: [&str; 4] = [
    "DISPLAY",
    "WAYLAND_DISPLAY",
    "XDG_RUNTIME_DIR",
    "DBUS_SESSION_BUS_ADDRESS",
];

/// Snapshot of [`SESSION_VARS`] from the current process, in that order.
pub fn graphical_session_env() -> Vec<(String, String)> {
    SESSION_VARS
        .iter()
        .filter_map(|name| {
            let value = std::env::var(name).ok()?;
            (!value.is_empty()).then(|| (name.to_string(), value))
        })
        .collect()
}

pub struct CronScheduler {
    runner: Arc<dyn CommandRunner>,
    executable: PathBuf,
    session_env: Vec<(String, String)>,
}

impl CronScheduler {
    /// `session_env` is written in front of the command so the reminder can
    /// open a window and post a notification in the user's session.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        executable: PathBuf,
        session_env: Vec<(String, String)>,
    ) -> Self {
        Self {
            runner,
            executable,
            session_env,
        }
    }

    async fn read_table(&self) -> Result<String, SchedulerError> {
        let output = self.runner.run("crontab", &args(["-l"]), None).await?;
        if output.success() {
            return Ok(output.stdout);
        }
        // A user without a crontab yet is an empty table, not a failure.
        if output.stderr.to_ascii_lowercase().contains("no crontab") {
            log_debug!("no crontab installed for this user yet");
            return Ok(String::new());
        }
        output.require_success("crontab").map(|output| output.stdout)
    }

    async fn write_table(&self, lines: &[String]) -> Result<(), SchedulerError> {
        let mut table = lines.join("\n");
        if !table.is_empty() {
            table.push('\n');
        }
        self.runner
            .run("crontab", &args(["-"]), Some(&table))
            .await?
            .require_success("crontab")?;
        Ok(())
    }
}

#[async_trait]
impl PlatformScheduler for CronScheduler {
    async fn install(&self, config: &NotificationConfig) -> Result<(), SchedulerError> {
        let current = self.read_table().await?;
        let mut lines = foreign_lines(&current);
        let ours = cron_lines(&self.executable, &self.session_env, config);
        let count = ours.len();
        lines.extend(ours);

        self.write_table(&lines).await?;
        log_info!("installed {count} crontab line(s) at {}", config.time);
        Ok(())
    }

    async fn remove(&self) -> Result<(), SchedulerError> {
        let current = self.read_table().await?;
        if !current.lines().any(is_ours) {
            return Ok(());
        }

        self.write_table(&foreign_lines(&current)).await?;
        log_info!("removed reminder lines from crontab");
        Ok(())
    }

    async fn is_installed(&self) -> Result<bool, SchedulerError> {
        Ok(self.read_table().await?.lines().any(is_ours))
    }
}

fn is_ours(line: &str) -> bool {
    line.trim_end().ends_with(CRON_MARKER)
}

fn foreign_lines(table: &str) -> Vec<String> {
    table
        .lines()
        .filter(|line| !is_ours(line))
        .map(str::to_string)
        .collect()
}

pub fn cron_lines(
    executable: &std::path::Path,
    session_env: &[(String, String)],
    config: &NotificationConfig,
) -> Vec<String> {
    let mut command = String::new();
    if !session_env.is_empty() {
        command.push_str("env ");
        for (name, value) in session_env {
            command.push_str(&format!("{name}={} ", shell_quote(value)));
        }
    }
    command.push_str(&shell_quote(&executable.to_string_lossy()));
    // An unescaped `%` ends the command field in crontab syntax.
    let command = command.replace('%', r"\%");
    config
        .days
        .iter()
        .map(|day| {
            format!(
                "{} {} * * {} {command} {REMINDER_FLAG} {CRON_MARKER}",
                config.time.minute(),
                config.time.hour(),
                day.sunday_based()
            )
        })
        .collect()
}

fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+".contains(c))
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
