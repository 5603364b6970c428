//! Editor configuration
//!
//! Every option an operation or recipe reads lives here, with its default.
//! Loaded from JSON; fields missing from the file keep their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{error::Result, format::parse_timecode};

/// External binaries and the flags shared by every ffmpeg invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    /// Passed as `-loglevel` when set
    pub loglevel: Option<String>,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            loglevel: None,
        }
    }
}

/// How the music track is combined with the video's own audio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicMode {
    /// Mix both tracks; length follows the video's audio
    #[default]
    Mix,
    /// Drop the original audio and use the music only
    Replace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    /// Value for ffmpeg's `transpose` filter
    pub fn transpose(self) -> u8 {
        match self {
            Rotation::Clockwise => 1,
            Rotation::CounterClockwise => 2,
        }
    }
}

/// Synthetic silent track muxed under a video before music is added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceConfig {
    pub channel_layout: String,
    pub sample_rate: u32,
    /// Length of the generated source; `-shortest` trims it to the video
    pub seconds: u32,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            channel_layout: "stereo".to_string(),
            sample_rate: 48_000,
            seconds: 9999,
        }
    }
}

/// Encoding settings for the device-compatible transcode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub video_codec: String,
    pub profile: String,
    pub level: String,
    pub pix_fmt: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Move the moov atom to the front for progressive download
    pub faststart: bool,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            profile: "baseline".to_string(),
            level: "3.0".to_string(),
            pix_fmt: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            faststart: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub tools: ToolPaths,
    /// Scratch files go here; relative final names resolve against it
    pub work_dir: PathBuf,
    pub music: PathBuf,
    pub music_mode: MusicMode,
    pub rotation: Rotation,
    pub fade_seconds: f64,
    /// Timecode the short recipe trims to
    pub short_cutoff: String,
    pub short_name: PathBuf,
    pub long_name: PathBuf,
    pub silence: SilenceConfig,
    pub device: DeviceProfile,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            work_dir: PathBuf::from("."),
            music: PathBuf::from("music.mp3"),
            music_mode: MusicMode::default(),
            rotation: Rotation::default(),
            fade_seconds: 3.0,
            short_cutoff: "00:00:59".to_string(),
            short_name: PathBuf::from("Short.mp4"),
            long_name: PathBuf::from("Long.mp4"),
            silence: SilenceConfig::default(),
            device: DeviceProfile::default(),
        }
    }
}

impl EditorConfig {
    /// Load configuration from file, falling back to defaults when it is absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn short_cutoff_seconds(&self) -> Result<f64> {
        parse_timecode(&self.short_cutoff)
    }

    /// Resolve a final output name against the working directory
    pub fn resolve(&self, name: &Path) -> PathBuf {
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.work_dir.join(name)
        }
    }
}
