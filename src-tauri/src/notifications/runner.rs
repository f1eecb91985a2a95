use std::process::Stdio;

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command};

use super::SchedulerError;

/// Captured result of one external command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turns a non-zero exit into a `CommandFailed` error.
    pub fn require_success(self, program: &str) -> Result<Self, SchedulerError> {
        if self.success() {
            Ok(self)
        } else {
            Err(SchedulerError::CommandFailed {
                program: program.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs the OS scheduling tools (`launchctl`, `schtasks`, `crontab`).
///
/// Only a failure to start the process is an `Err`; exit status is left to the
/// caller, since several adapters treat specific non-zero exits as success.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, SchedulerError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, SchedulerError> {
        let spawn_error = |source| SchedulerError::Spawn {
            program: program.to_string(),
            source,
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(target_os = "windows")]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = command.spawn().map_err(spawn_error)?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
            // Dropping the pipe closes it so tools like `crontab -` see EOF.
            drop(pipe);
        }

        let output = child.wait_with_output().await?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub(crate) fn args<const N: usize>(values: [&str; N]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Scripted stand-in for the OS tools, keeping just enough state to answer
/// the adapters' queries the way the real tools would.
#[cfg(test)]
pub(crate) mod fake {
    use std::{
        collections::HashSet,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;

    use super::{CommandOutput, CommandRunner};
    use crate::notifications::SchedulerError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Invocation {
        pub program: String,
        pub args: Vec<String>,
        pub stdin: Option<String>,
    }

    #[derive(Default)]
    struct FakeState {
        invocations: Vec<Invocation>,
        crontab: Option<String>,
        tasks: HashSet<String>,
        loaded_agents: HashSet<String>,
        failing_program: Option<String>,
        /// `(program, first argument, stderr)`
        scripted_failures: Vec<(String, String, String)>,
    }

    #[derive(Clone, Default)]
    pub struct FakeRunner {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_crontab(self, table: &str) -> Self {
            self.state.lock().unwrap().crontab = Some(table.to_string());
            self
        }

        /// Every invocation of `program` exits non-zero.
        pub fn failing(self, program: &str) -> Self {
            self.state.lock().unwrap().failing_program = Some(program.to_string());
            self
        }

        /// Calls to `program` whose first argument is `verb` exit 1 with
        /// `stderr`, whatever the simulated state.
        pub fn failing_call(self, program: &str, verb: &str, stderr: &str) -> Self {
            self.state.lock().unwrap().scripted_failures.push((
                program.to_string(),
                verb.to_string(),
                stderr.to_string(),
            ));
            self
        }

        pub fn invocations(&self) -> Vec<Invocation> {
            self.state.lock().unwrap().invocations.clone()
        }

        pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
            self.invocations()
                .into_iter()
                .filter(|call| call.program == program)
                .map(|call| call.args)
                .collect()
        }

        pub fn crontab(&self) -> Option<String> {
            self.state.lock().unwrap().crontab.clone()
        }

        pub fn task_count(&self) -> usize {
            self.state.lock().unwrap().tasks.len()
        }

        pub fn loaded_agents(&self) -> usize {
            self.state.lock().unwrap().loaded_agents.len()
        }
    }

    fn ok(stdout: impl Into<String>) -> CommandOutput {
        CommandOutput {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    fn fail(stderr: &str) -> CommandOutput {
        CommandOutput {
            code: Some(1),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(
            &self,
            program: &str,
            args: &[String],
            stdin: Option<&str>,
        ) -> Result<CommandOutput, SchedulerError> {
            let mut state = self.state.lock().unwrap();
            state.invocations.push(Invocation {
                program: program.to_string(),
                args: args.to_vec(),
                stdin: stdin.map(str::to_string),
            });

            if state.failing_program.as_deref() == Some(program) {
                return Ok(fail("simulated failure"));
            }
            let verb = args.first().map(String::as_str);
            if let Some((_, _, stderr)) = state
                .scripted_failures
                .iter()
                .find(|(p, v, _)| p == program && Some(v.as_str()) == verb)
            {
                return Ok(fail(stderr));
            }

            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let output = match (program, args.as_slice()) {
                ("crontab", ["-l"]) => match &state.crontab {
                    Some(table) => ok(table.clone()),
                    None => fail("no crontab for tester"),
                },
                ("crontab", ["-"]) => {
                    state.crontab = Some(stdin.unwrap_or_default().to_string());
                    ok("")
                }
                ("schtasks", ["/Create", "/TN", name, ..]) => {
                    if !args.contains(&"/F") && state.tasks.contains(*name) {
                        fail("ERROR: Cannot create a file when that file already exists.")
                    } else {
                        state.tasks.insert(name.to_string());
                        ok("SUCCESS: The scheduled task has successfully been created.")
                    }
                }
                ("schtasks", ["/Query", "/TN", name]) => {
                    if state.tasks.contains(*name) {
                        ok(format!("TaskName {name} Ready"))
                    } else {
                        fail("ERROR: The system cannot find the file specified.")
                    }
                }
                ("schtasks", ["/Delete", "/TN", name, "/F"]) => {
                    if state.tasks.remove(*name) {
                        ok("SUCCESS")
                    } else {
                        fail("ERROR: The system cannot find the file specified.")
                    }
                }
                ("launchctl", ["load", path]) => {
                    if state.loaded_agents.insert(path.to_string()) {
                        ok("")
                    } else {
                        fail("service already loaded")
                    }
                }
                ("launchctl", ["unload", path]) => {
                    if state.loaded_agents.remove(*path) {
                        ok("")
                    } else {
                        fail("Could not find specified service")
                    }
                }
                ("launchctl", ["remove", _label]) => {
                    if state.loaded_agents.is_empty() {
                        fail("Could not find service in domain")
                    } else {
                        state.loaded_agents.clear();
                        ok("")
                    }
                }
                _ => fail("unexpected command"),
            };
            Ok(output)
        }
    }
}
