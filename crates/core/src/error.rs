use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipError {
    #[error("{tool} not found; is it installed and on PATH?")]
    ToolMissing { tool: String },

    #[error("{tool} exited with {status}: {reason}")]
    ToolFailed {
        tool: String,
        status: String,
        reason: String,
    },

    #[error("Could not read a duration for {path} from ffprobe output {output:?}")]
    ProbeParse { path: PathBuf, output: String },

    #[error("Invalid timecode {value:?}, expected SS, MM:SS or HH:MM:SS")]
    InvalidTimecode { value: String },

    #[error("Fade of {fade}s does not fit {path} ({duration}s long)")]
    InvalidFade {
        path: PathBuf,
        fade: f64,
        duration: f64,
    },

    #[error("{step} step failed")]
    StepFailed {
        step: &'static str,
        #[source]
        source: Box<ClipError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ClipError {
    /// Innermost error, past any step wrappers.
    pub fn root(&self) -> &ClipError {
        match self {
            ClipError::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClipError>;
