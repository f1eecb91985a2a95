//! LaunchAgent adapter.
//!
//! `is_installed` only checks that the plist exists. Our own install/remove
//! keep the file and the loaded agent in step; if something outside the app
//! unloads the agent or deletes the file, the two signals can disagree.
//! `install` removes by label before loading, so re-applying always heals
//! either half.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;

use super::{
    runner::args, CommandOutput, CommandRunner, NotificationConfig, PlatformScheduler,
    SchedulerError, REMINDER_FLAG,
};
use crate::{log_debug, log_info, utils::fs::write_atomically};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "launch_agent";

pub const LAUNCH_AGENT_LABEL: &str = "io.kochie.touch-typer-reminder";

pub struct LaunchAgentScheduler {
    runner: Arc<dyn CommandRunner>,
    plist_path: PathBuf,
    executable: PathBuf,
}

impl LaunchAgentScheduler {
    pub fn new(runner: Arc<dyn CommandRunner>, home: &Path, executable: PathBuf) -> Self {
        Self {
            runner,
            plist_path: home
                .join("Library/LaunchAgents")
                .join(format!("{LAUNCH_AGENT_LABEL}.plist")),
            executable,
        }
    }

    pub fn plist_path(&self) -> &Path {
        &self.plist_path
    }
}

#[async_trait]
impl PlatformScheduler for LaunchAgentScheduler {
    async fn install(&self, config: &NotificationConfig) -> Result<(), SchedulerError> {
        let path = self.plist_path.to_string_lossy().into_owned();

        // Drop any registration under our label, including one whose plist
        // was deleted behind our back.
        let output = self
            .runner
            .run("launchctl", &args(["remove", LAUNCH_AGENT_LABEL]), None)
            .await?;
        if !output.success() {
            log_debug!("no previous agent: {}", output.stderr.trim());
        }

        if let Some(parent) = self.plist_path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomically(
            &self.plist_path,
            render_plist(LAUNCH_AGENT_LABEL, &self.executable, config).as_bytes(),
        )?;

        let output = self
            .runner
            .run("launchctl", &args(["load", &path]), None)
            .await?;
        if already_loaded(&output) {
            log_debug!("agent already loaded: {}", output.stderr.trim());
        } else {
            output.require_success("launchctl")?;
        }

        log_info!(
            "loaded {} for {} day(s) at {}",
            self.plist_path.display(),
            config.days.len(),
            config.time
        );
        Ok(())
    }

    async fn remove(&self) -> Result<(), SchedulerError> {
        let output = self
            .runner
            .run("launchctl", &args(["remove", LAUNCH_AGENT_LABEL]), None)
            .await?;
        if !output.success() {
            log_debug!("agent was not loaded: {}", output.stderr.trim());
        }

        match fs::remove_file(&self.plist_path) {
            Ok(()) => log_info!("removed {}", self.plist_path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    async fn is_installed(&self) -> Result<bool, SchedulerError> {
        Ok(self.plist_path.exists())
    }
}

fn already_loaded(output: &CommandOutput) -> bool {
    !output.success() && output.stderr.to_ascii_lowercase().contains("already loaded")
}

pub fn render_plist(label: &str, executable: &Path, config: &NotificationConfig) -> String {
    let intervals: String = config
        .days
        .iter()
        .map(|day| {
            format!(
                "    <dict>\n      <key>Weekday</key>\n      <integer>{}</integer>\n      <key>Hour</key>\n      <integer>{}</integer>\n      <key>Minute</key>\n      <integer>{}</integer>\n    </dict>\n",
                day.sunday_based(),
                config.time.hour(),
                config.time.minute()
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>Label</key>
  <string>{label}</string>
  <key>ProgramArguments</key>
  <array>
    <string>{executable}</string>
    <string>{flag}</string>
  </array>
  <key>StartCalendarInterval</key>
  <array>
{intervals}  </array>
  <key>RunAtLoad</key>
  <false/>
</dict>
</plist>
"#,
        label = xml_escape(label),
        executable = xml_escape(&executable.to_string_lossy()),
        flag = REMINDER_FLAG,
    )
}

pub(crate) fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
