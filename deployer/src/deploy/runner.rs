//! External command execution

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::DeployError;

/// An external command invocation.
///
/// Secrets only travel through `stdin` and never show up in the rendered
/// command line.
#[derive(Debug)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<SecretString>,
    pub capture_stdout: bool,
    pub quiet: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
            capture_stdout: false,
            quiet: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin_secret(mut self, secret: SecretString) -> Self {
        self.stdin = Some(secret);
        self
    }

    pub fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    /// Discard stdout and stderr
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains(['"', '\'', ';']) {
                write!(f, " '{}'", arg.replace('\'', "'\\''"))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutcome {
    pub success: bool,
    pub code: Option<i32>,
    /// Captured stdout, empty unless capture was requested
    pub stdout: String,
}

/// Runs external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion. A non-zero exit is reported through
    /// the outcome; only failing to start the program is an error.
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutcome, DeployError>;
}

/// Runs commands on the host through `tokio::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome, DeployError> {
        debug!("Running: {}", spec);

        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        command.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });
        command.stdout(if spec.capture_stdout {
            Stdio::piped()
        } else if spec.quiet {
            Stdio::null()
        } else {
            Stdio::inherit()
        });
        command.stderr(if spec.quiet {
            Stdio::null()
        } else {
            Stdio::inherit()
        });

        let mut child = command.spawn().map_err(|source| DeployError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let mut stdin_error = None;
        if let Some(secret) = &spec.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = write_secret(&mut stdin, secret).await {
                    stdin_error = Some(e);
                }
            }
        }

        // The child is always reaped, even when it closed stdin early
        let output = child.wait_with_output().await?;
        debug!("{} exited with {:?}", spec.program, output.status.code());

        if let Some(e) = stdin_error {
            if output.status.success() {
                return Err(e.into());
            }
            warn!("Failed to pass secret to {}: {}", spec.program, e);
        }

        Ok(CommandOutcome {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
        })
    }
}

async fn write_secret(stdin: &mut ChildStdin, secret: &SecretString) -> std::io::Result<()> {
    stdin.write_all(secret.expose_secret().as_bytes()).await?;
    stdin.shutdown().await
}

/// Records commands instead of running them.
///
/// Every command succeeds unless its rendering contains a configured failure
/// pattern. Captured commands return a placeholder stdout.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    recorded: Mutex<Vec<String>>,
    fail_patterns: Vec<String>,
    missing_programs: Vec<String>,
    echo: bool,
}

impl DryRunRunner {
    pub const PLACEHOLDER_STDOUT: &'static str = "dry-run";

    pub fn new() -> Self {
        Self::default()
    }

    /// Log each command as it is recorded
    pub fn echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Exit non-zero for commands whose rendering contains `pattern`
    pub fn fail_on(mut self, pattern: impl Into<String>) -> Self {
        self.fail_patterns.push(pattern.into());
        self
    }

    /// Report `program` as not installed
    pub fn missing_program(mut self, program: impl Into<String>) -> Self {
        self.missing_programs.push(program.into());
        self
    }

    /// Rendered commands in invocation order
    pub async fn recorded(&self) -> Vec<String> {
        self.recorded.lock().await.clone()
    }
}

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome, DeployError> {
        let rendered = spec.to_string();
        if self.echo {
            info!("[dry-run] {}", rendered);
        }
        self.recorded.lock().await.push(rendered.clone());

        if self.missing_programs.iter().any(|p| p == &spec.program) {
            return Err(DeployError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "program not found"),
            });
        }

        if self.fail_patterns.iter().any(|p| rendered.contains(p.as_str())) {
            return Ok(CommandOutcome {
                success: false,
                code: Some(1),
                stdout: String::new(),
            });
        }

        Ok(CommandOutcome {
            success: true,
            code: Some(0),
            stdout: if spec.capture_stdout {
                Self::PLACEHOLDER_STDOUT.to_string()
            } else {
                String::new()
            },
        })
    }
}
