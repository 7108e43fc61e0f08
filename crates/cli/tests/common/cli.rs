//! CLI command execution helpers with automatic timing
//!
//! Wraps the `pw` binary, measures how long each run takes, and kills runs
//! that exceed their timeout. Long-running commands (`pw watch`) can be
//! started in the background and finished once the test has touched the
//! filesystem.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// CLI command builder with timing
pub struct PwCommand {
    binary_path: PathBuf,
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    timeout: Duration,
}

impl PwCommand {
    /// Create a new command in the given working directory
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_pw")),
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Set command timeout
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Start the command without waiting for it
    pub fn spawn(&self) -> Result<RunningCommand> {
        let child = Command::new(&self.binary_path)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn command")?;

        Ok(RunningCommand {
            child,
            args: self.args.clone(),
            started: Instant::now(),
            timeout: self.timeout,
        })
    }

    /// Execute command and return result with timing
    pub fn execute(&self) -> Result<CommandResult> {
        self.spawn()?.finish()
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// A command started with [`PwCommand::spawn`]
pub struct RunningCommand {
    child: Child,
    args: Vec<String>,
    started: Instant,
    timeout: Duration,
}

impl RunningCommand {
    /// Wait for exit, killing the process once the timeout is exceeded
    pub fn finish(mut self) -> Result<CommandResult> {
        loop {
            if self.child.try_wait()?.is_some() {
                break;
            }
            if self.started.elapsed() > self.timeout {
                let _ = self.child.kill();
                let output = self.child.wait_with_output()?;
                anyhow::bail!(
                    "Command timed out after {:?}:\nArgs: {:?}\nStdout: {}\nStderr: {}",
                    self.timeout,
                    self.args,
                    String::from_utf8_lossy(&output.stdout),
                    String::from_utf8_lossy(&output.stderr)
                );
            }
            thread::sleep(Duration::from_millis(20));
        }

        let output = self
            .child
            .wait_with_output()
            .context("Failed to collect command output")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: self.started.elapsed(),
        })
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if stdout contains text
    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    /// Check if stderr contains text
    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Parse every stdout line as a JSON object
    pub fn json_lines(&self) -> Result<Vec<serde_json::Value>> {
        self.stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).with_context(|| format!("Not JSON: {line}")))
            .collect()
    }
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// pw!(dir, "config", "app.yaml", "--once").assert_success()?;
/// ```
#[macro_export]
macro_rules! pw {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::PwCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
