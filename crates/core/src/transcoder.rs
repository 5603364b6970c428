use std::{
    ffi::{OsStr, OsString},
    fmt,
    io::ErrorKind,
    process::Stdio,
};

use tokio::process::Command;
use tracing::{debug, error};

use crate::{
    config::ToolPaths,
    error::{ClipError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Ffmpeg => f.write_str("ffmpeg"),
            Tool::Ffprobe => f.write_str("ffprobe"),
        }
    }
}

/// What a finished tool process left behind
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "signal".to_string(),
        }
    }
}

/// Runs one external tool invocation to completion.
///
/// Implementations receive the argument vector as discrete items and never go
/// through a shell. Steps are awaited one at a time on the caller's task, so
/// the returned futures carry no `Send` bound.
#[allow(async_fn_in_trait)]
pub trait Transcoder {
    async fn run(&self, tool: Tool, args: &[OsString]) -> Result<ToolOutput>;

    /// Run and turn a non-zero exit into [`ClipError::ToolFailed`], logging
    /// the tool's stderr verbatim.
    async fn run_checked(&self, tool: Tool, args: &[OsString]) -> Result<ToolOutput> {
        let output = self.run(tool, args).await?;
        if output.success {
            return Ok(output);
        }

        let status = output.status_text();
        error!(%tool, %status, "{}", output.stderr.trim_end());
        Err(ClipError::ToolFailed {
            tool: tool.to_string(),
            status,
            reason: output.stderr.trim().to_string(),
        })
    }
}

/// Render an argument vector as a copy-pasteable command line for logs
pub fn render_command(program: &OsStr, args: &[OsString]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(OsString::as_os_str))
        .map(|arg| {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains([' ', '\'', '"', '[', ']', ';']) {
                format!("'{}'", arg.replace('\'', r"'\''"))
            } else {
                arg.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spawns the real ffmpeg/ffprobe binaries
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    tools: ToolPaths,
}

impl FfmpegRunner {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }

    fn program(&self, tool: Tool) -> &OsStr {
        match tool {
            Tool::Ffmpeg => self.tools.ffmpeg.as_os_str(),
            Tool::Ffprobe => self.tools.ffprobe.as_os_str(),
        }
    }
}

impl Transcoder for FfmpegRunner {
    async fn run(&self, tool: Tool, args: &[OsString]) -> Result<ToolOutput> {
        let program = self.program(tool);
        debug!(command = %render_command(program, args), "running");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ClipError::ToolMissing {
                    tool: program.to_string_lossy().into_owned(),
                },
                _ => ClipError::IoError(e),
            })?;

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
