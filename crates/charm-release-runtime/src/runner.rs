use crate::RuntimeError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// A single external command: program, arguments, and optional working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Raw exit code; `-1` when the process was terminated by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Exit code suitable for propagating as this process's own exit status.
    ///
    /// Codes outside `1..=255` (signals, negative Windows codes) map to 1 so a
    /// failed tool never turns into a successful exit.
    pub fn exit_code(&self) -> u8 {
        u8::try_from(self.code)
            .ok()
            .filter(|c| *c != 0)
            .unwrap_or(1)
    }

    /// Last non-empty line of stderr, for diagnostics.
    pub fn stderr_tail(&self) -> &str {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }
}

/// Executes external tools on behalf of the release pipeline.
pub trait ToolRunner: Send + Sync {
    fn name(&self) -> &str;

    /// Run the invocation to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is not an error at this layer; only failing to spawn
    /// the process is.
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, RuntimeError>;
}

/// Runs tools as real child processes. Blocks until each one exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for SystemRunner {
    fn name(&self) -> &'static str {
        "system"
    }

    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, RuntimeError> {
        debug!("running {invocation}");
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(ref dir) = invocation.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RuntimeError::ToolUnavailable(invocation.program.clone())
            } else {
                RuntimeError::ExecFailed {
                    command: invocation.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let result = ToolOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("{} exited with {}", invocation.program, result.code);
        Ok(result)
    }
}
