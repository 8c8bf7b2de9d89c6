//! Subprocess execution for backend multiplexer verbs.
//!
//! Every multiplexer interaction is a synchronous command invocation returning
//! stdout or a structured failure; no streaming is assumed (§5, §9).

use std::path::Path;
use std::process::{Command, Output};
use tracing::{debug, trace};

/// A failed subprocess invocation, carrying enough detail to populate
/// `TERMINAL_COMMAND_FAILED`'s `details` (command vector + stderr).
#[derive(Debug, thiserror::Error)]
#[error("command failed: {} {}\n{stderr}", program, args.join(" "))]
pub struct CmdError {
    pub program: String,
    pub args: Vec<String>,
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// A builder for executing shell commands with unified error handling.
pub struct Cmd<'a> {
    command: &'a str,
    args: Vec<&'a str>,
    workdir: Option<&'a Path>,
}

impl<'a> Cmd<'a> {
    /// Create a new command builder.
    pub fn new(command: &'a str) -> Self {
        Self {
            command,
            args: Vec::new(),
            workdir: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: &'a str) -> Self {
        self.args.push(arg);
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: &[&'a str]) -> Self {
        self.args.extend_from_slice(args);
        self
    }

    /// Set the working directory for the command.
    pub fn workdir(mut self, path: &'a Path) -> Self {
        self.workdir = Some(path);
        self
    }

    /// Execute the command and return the output.
    /// Returns `CmdError` if the command fails (non-zero exit code) or can't spawn.
    pub fn run(self) -> Result<Output, CmdError> {
        let Cmd {
            command,
            args,
            workdir,
        } = self;
        let workdir_display = workdir.map(|p| p.display().to_string());

        trace!(command, args = ?args, workdir = ?workdir_display, "cmd:run start");

        let mut cmd = Command::new(command);
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }
        let output = cmd.args(&args).output().map_err(|e| CmdError {
            program: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            status: None,
            stdout: String::new(),
            stderr: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(
                command,
                args = ?args,
                status = ?output.status.code(),
                stderr = %stderr,
                "cmd:run failure"
            );
            return Err(CmdError {
                program: command.to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr,
            });
        }
        trace!(command, "cmd:run success");
        Ok(output)
    }

    /// Execute the command and return stdout as a trimmed string.
    pub fn run_and_capture_stdout(self) -> Result<String, CmdError> {
        let output = self.run()?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Execute the command, returning `Ok(true)`/`Ok(false)` on success/failure exit
    /// status rather than propagating a `CmdError` — used for environment probes.
    pub fn run_as_check(self) -> bool {
        let Cmd {
            command,
            args,
            workdir,
        } = self;
        let mut cmd = Command::new(command);
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }
        let success = cmd.args(&args).output().is_ok_and(|o| o.status.success());
        trace!(command, success, "cmd:check result");
        success
    }
}
