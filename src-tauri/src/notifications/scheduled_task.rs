use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{Local, NaiveDate};

use super::{
    launch_agent::xml_escape, runner::args, CommandOutput, CommandRunner, NotificationConfig,
    PlatformScheduler, SchedulerError, REMINDER_FLAG,
};
use crate::{log_debug, log_info, log_warn, utils::fs::write_atomically};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "scheduled_task";

pub const TASK_NAME: &str = "TouchTyperReminder";

pub struct ScheduledTaskScheduler {
    runner: Arc<dyn CommandRunner>,
    executable: PathBuf,
    /// Scratch location for the task definition handed to `schtasks /XML`.
    definition_path: PathBuf,
}

impl ScheduledTaskScheduler {
    pub fn new(runner: Arc<dyn CommandRunner>, scratch_dir: &Path, executable: PathBuf) -> Self {
        Self {
            runner,
            executable,
            definition_path: scratch_dir.join(format!("{TASK_NAME}.xml")),
        }
    }

    async fn query(&self) -> Result<bool, SchedulerError> {
        let output = self
            .runner
            .run("schtasks", &args(["/Query", "/TN", TASK_NAME]), None)
            .await?;
        if task_missing(&output) {
            return Ok(false);
        }
        output.require_success("schtasks")?;
        Ok(true)
    }
}

#[async_trait]
impl PlatformScheduler for ScheduledTaskScheduler {
    async fn install(&self, config: &NotificationConfig) -> Result<(), SchedulerError> {
        let definition =
            render_task_xml(&self.executable, config, Local::now().date_naive());

        if let Some(parent) = self.definition_path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomically(&self.definition_path, &utf16_with_bom(&definition))?;

        let path = self.definition_path.to_string_lossy().into_owned();
        // `/F` overwrites an existing task of the same name.
        let result = self
            .runner
            .run(
                "schtasks",
                &args(["/Create", "/TN", TASK_NAME, "/XML", &path, "/F"]),
                None,
            )
            .await
            .and_then(|output| output.require_success("schtasks"));

        if let Err(err) = fs::remove_file(&self.definition_path) {
            log_warn!("could not remove {}: {err}", self.definition_path.display());
        }
        result?;

        log_info!("registered task {TASK_NAME} at {}", config.time);
        Ok(())
    }

    async fn remove(&self) -> Result<(), SchedulerError> {
        let output = self
            .runner
            .run("schtasks", &args(["/Delete", "/TN", TASK_NAME, "/F"]), None)
            .await?;
        if task_missing(&output) {
            log_debug!("task {TASK_NAME} not present");
            return Ok(());
        }

        output.require_success("schtasks")?;
        log_info!("deleted task {TASK_NAME}");
        Ok(())
    }

    async fn is_installed(&self) -> Result<bool, SchedulerError> {
        self.query().await
    }
}

/// `schtasks` exits 1 for every failure; only the message tells a missing
/// task apart from access or service errors.
fn task_missing(output: &CommandOutput) -> bool {
    !output.success() && output.stderr.to_ascii_lowercase().contains("cannot find")
}

/// Task Scheduler 1.2 definition with a single weekly calendar trigger
/// covering every configured day.
pub fn render_task_xml(executable: &Path, config: &NotificationConfig, start: NaiveDate) -> String {
    let days: String = config
        .days
        .iter()
        .map(|day| format!("<{} />", day.full_name()))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-16"?>
<Task version="1.2" xmlns="http://schemas.microsoft.com/windows/2004/02/mit/task">
  <RegistrationInfo>
    <Description>Touch Typer practice reminder</Description>
  </RegistrationInfo>
  <Triggers>
    <CalendarTrigger>
      <StartBoundary>{start}T{hour:02}:{minute:02}:00</StartBoundary>
      <Enabled>true</Enabled>
      <ScheduleByWeek>
        <DaysOfWeek>{days}</DaysOfWeek>
        <WeeksInterval>1</WeeksInterval>
      </ScheduleByWeek>
    </CalendarTrigger>
  </Triggers>
  <Principals>
    <Principal id="Author">
      <LogonType>InteractiveToken</LogonType>
      <RunLevel>LeastPrivilege</RunLevel>
    </Principal>
  </Principals>
  <Settings>
    <MultipleInstancesPolicy>IgnoreNew</MultipleInstancesPolicy>
    <DisallowStartIfOnBatteries>false</DisallowStartIfOnBatteries>
    <StopIfGoingOnBatteries>false</StopIfGoingOnBatteries>
    <StartWhenAvailable>true</StartWhenAvailable>
    <ExecutionTimeLimit>PT1H</ExecutionTimeLimit>
    <Enabled>true</Enabled>
  </Settings>
  <Actions Context="Author">
    <Exec>
      <Command>{command}</Command>
      <Arguments>{flag}</Arguments>
    </Exec>
  </Actions>
</Task>
"#,
        start = start.format("%Y-%m-%d"),
        hour = config.time.hour(),
        minute = config.time.minute(),
        command = xml_escape(&executable.to_string_lossy()),
        flag = REMINDER_FLAG,
    )
}

/// `schtasks /XML` expects the file in the encoding the declaration names.
fn utf16_with_bom(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}
