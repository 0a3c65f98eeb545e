//! Shell command runner

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Error, Debug)]
pub enum CommandError {
    /// The command ran and exited unsuccessfully
    #[error("command exited with {}: {}", exit_label(*code), stderr.trim())]
    Exited {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The command could not be started or waited on
    #[error("failed to launch command: {0}")]
    Launch(#[from] std::io::Error),

    #[error("command is empty")]
    Empty,
}

impl CommandError {
    /// Stderr captured from the command, empty when it never ran
    pub fn stderr(&self) -> &str {
        match self {
            CommandError::Exited { stderr, .. } => stderr,
            _ => "",
        }
    }

    pub fn stdout(&self) -> &str {
        match self {
            CommandError::Exited { stdout, .. } => stdout,
            _ => "",
        }
    }
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs a command line to completion
    async fn run(&self, command: &str) -> Result<CommandOutput, CommandError>;
}

/// Runs command lines through a shell (`sh -c` by default)
pub struct ShellRunner {
    shell: String,
    working_dir: PathBuf,
}

impl ShellRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            shell: "sh".to_string(),
            working_dir: working_dir.into(),
        }
    }

    #[cfg(test)]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
        if command.trim().is_empty() {
            return Err(CommandError::Empty);
        }

        debug!(shell = %self.shell, "Running command: {}", command);

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(CommandError::Exited {
                code: output.status.code(),
                stdout,
                stderr,
            })
        }
    }
}
