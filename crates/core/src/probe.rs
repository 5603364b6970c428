use std::{ffi::OsString, path::Path};

use tracing::debug;

use crate::{
    error::{ClipError, Result},
    transcoder::{Tool, Transcoder},
};

/// ffprobe arguments that print only the container duration
pub fn duration_args(input: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(input.as_os_str().to_owned());
    args
}

/// Parse ffprobe's plain-text duration output
pub fn parse_duration(input: &Path, stdout: &str) -> Result<f64> {
    let text = stdout.trim();
    match text.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(seconds),
        _ => Err(ClipError::ProbeParse {
            path: input.to_path_buf(),
            output: text.to_string(),
        }),
    }
}

/// Container duration of `input` in fractional seconds
pub async fn probe_duration<T: Transcoder>(transcoder: &T, input: &Path) -> Result<f64> {
    let output = transcoder
        .run_checked(Tool::Ffprobe, &duration_args(input))
        .await?;
    let seconds = parse_duration(input, &output.stdout)?;
    debug!(path = %input.display(), seconds, "probed duration");
    Ok(seconds)
}
