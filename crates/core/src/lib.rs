//! Clipsmith Core Library
//!
//! Trimming, fading, music overlay, rotation, scaling and device-compatible
//! re-encoding by driving the external `ffmpeg`/`ffprobe` tools, plus the
//! fixed short-form and long-form recipes that chain them.

pub mod config;
pub mod edit;
pub mod error;
pub mod format;
pub mod operation;
pub mod probe;
pub mod recipe;
pub mod scratch;
pub mod transcoder;

// Re-export commonly used items at crate root
pub use config::{DeviceProfile, EditorConfig, MusicMode, Rotation, SilenceConfig, ToolPaths};
pub use edit::Editor;
pub use error::{ClipError, Result};
pub use format::{format_seconds, format_timestamp, parse_timecode};
pub use operation::{FadeDirection, Operation, concat_manifest};
pub use probe::probe_duration;
pub use recipe::{PipelineObserver, Recipe, RecipeReport, Step, StepTiming};
pub use scratch::{ScratchFile, ScratchSpace};
pub use transcoder::{FfmpegRunner, Tool, ToolOutput, Transcoder};
