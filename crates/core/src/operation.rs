//! Operation descriptors and the ffmpeg argument vectors they render to

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    config::{DeviceProfile, MusicMode, Rotation, SilenceConfig, ToolPaths},
    format::format_seconds,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

impl FadeDirection {
    fn as_str(self) -> &'static str {
        match self {
            FadeDirection::In => "in",
            FadeDirection::Out => "out",
        }
    }
}

/// One ffmpeg invocation, described by what it does
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Keep the first `cutoff` seconds, stream copy
    Trim {
        input: PathBuf,
        output: PathBuf,
        cutoff: f64,
    },
    /// Cut `seconds` from `start` and fade video and audio over all of it
    FadeSegment {
        input: PathBuf,
        output: PathBuf,
        direction: FadeDirection,
        start: f64,
        seconds: f64,
    },
    /// Stream copy everything after `start`
    CopyFrom {
        input: PathBuf,
        output: PathBuf,
        start: f64,
    },
    /// Stream copy everything before `end`
    CopyUntil {
        input: PathBuf,
        output: PathBuf,
        end: f64,
    },
    /// Join the files listed in a concat manifest without re-encoding
    Concat { manifest: PathBuf, output: PathBuf },
    /// Mux a synthetic silent track under the video
    PadSilence {
        input: PathBuf,
        output: PathBuf,
        silence: SilenceConfig,
    },
    MuxMusic {
        video: PathBuf,
        music: PathBuf,
        output: PathBuf,
        mode: MusicMode,
    },
    Rotate {
        input: PathBuf,
        output: PathBuf,
        rotation: Rotation,
    },
    ScaleHalf { input: PathBuf, output: PathBuf },
    DeviceTranscode {
        input: PathBuf,
        output: PathBuf,
        profile: DeviceProfile,
    },
}

struct Args(Vec<OsString>);

impl Args {
    fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.0.push(arg.into());
        self
    }

    fn opt(&mut self, flag: &str, value: impl Into<OsString>) -> &mut Self {
        self.arg(flag).arg(value)
    }

    fn path(&mut self, path: &Path) -> &mut Self {
        self.arg(path.as_os_str())
    }
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Trim { .. } => "trim",
            Operation::FadeSegment {
                direction: FadeDirection::In,
                ..
            } => "fade-in segment",
            Operation::FadeSegment {
                direction: FadeDirection::Out,
                ..
            } => "fade-out segment",
            Operation::CopyFrom { .. } | Operation::CopyUntil { .. } => "copy range",
            Operation::Concat { .. } => "concat",
            Operation::PadSilence { .. } => "pad silence",
            Operation::MuxMusic { .. } => "mux music",
            Operation::Rotate { .. } => "rotate",
            Operation::ScaleHalf { .. } => "scale",
            Operation::DeviceTranscode { .. } => "device transcode",
        }
    }

    pub fn output(&self) -> &Path {
        match self {
            Operation::Trim { output, .. }
            | Operation::FadeSegment { output, .. }
            | Operation::CopyFrom { output, .. }
            | Operation::CopyUntil { output, .. }
            | Operation::Concat { output, .. }
            | Operation::PadSilence { output, .. }
            | Operation::MuxMusic { output, .. }
            | Operation::Rotate { output, .. }
            | Operation::ScaleHalf { output, .. }
            | Operation::DeviceTranscode { output, .. } => output,
        }
    }

    /// Full ffmpeg argument vector, output path last
    pub fn args(&self, tools: &ToolPaths) -> Vec<OsString> {
        let mut a = Args(Vec::new());
        a.arg("-hide_banner");
        if let Some(level) = &tools.loglevel {
            a.opt("-loglevel", level);
        }
        a.arg("-y");

        match self {
            Operation::Trim { input, cutoff, .. } => {
                a.arg("-i").path(input);
                a.opt("-t", format_seconds(*cutoff)).opt("-c", "copy");
            }
            Operation::FadeSegment {
                input,
                direction,
                start,
                seconds,
                ..
            } => {
                if *direction == FadeDirection::Out {
                    a.opt("-ss", format_seconds(*start));
                }
                let d = format_seconds(*seconds);
                let t = direction.as_str();
                a.arg("-i").path(input);
                a.opt("-t", &d);
                a.opt("-vf", format!("fade=t={t}:st=0:d={d}"));
                a.opt("-af", format!("afade=t={t}:st=0:d={d}"));
            }
            Operation::CopyFrom { input, start, .. } => {
                a.opt("-ss", format_seconds(*start));
                a.arg("-i").path(input).opt("-c", "copy");
            }
            Operation::CopyUntil { input, end, .. } => {
                a.opt("-t", format_seconds(*end));
                a.arg("-i").path(input).opt("-c", "copy");
            }
            Operation::Concat { manifest, .. } => {
                a.opt("-f", "concat").opt("-safe", "0");
                a.arg("-i").path(manifest).opt("-c", "copy");
            }
            Operation::PadSilence { input, silence, .. } => {
                a.arg("-i").path(input);
                a.opt("-f", "lavfi").opt("-t", silence.seconds.to_string());
                a.opt(
                    "-i",
                    format!(
                        "anullsrc=channel_layout={}:sample_rate={}",
                        silence.channel_layout, silence.sample_rate
                    ),
                );
                a.arg("-shortest").opt("-c:v", "copy").opt("-c:a", "aac");
            }
            Operation::MuxMusic {
                video, music, mode, ..
            } => {
                a.arg("-i").path(video).arg("-i").path(music);
                match mode {
                    MusicMode::Mix => {
                        a.opt(
                            "-filter_complex",
                            "[0:a][1:a]amix=inputs=2:duration=first:dropout_transition=2",
                        );
                    }
                    MusicMode::Replace => {
                        a.opt("-map", "0:v:0").opt("-map", "1:a:0");
                    }
                }
                a.opt("-c:v", "copy").arg("-shortest");
            }
            Operation::Rotate {
                input, rotation, ..
            } => {
                a.arg("-i").path(input);
                a.opt("-vf", format!("transpose={}", rotation.transpose()));
                a.opt("-c:a", "copy");
            }
            Operation::ScaleHalf { input, .. } => {
                a.arg("-i").path(input);
                a.opt("-vf", "scale=iw/2:ih/2").opt("-c:a", "copy");
            }
            Operation::DeviceTranscode { input, profile, .. } => {
                a.arg("-i").path(input);
                a.opt("-c:v", &profile.video_codec)
                    .opt("-profile:v", &profile.profile)
                    .opt("-level", &profile.level)
                    .opt("-pix_fmt", &profile.pix_fmt)
                    .opt("-c:a", &profile.audio_codec)
                    .opt("-b:a", &profile.audio_bitrate);
                if profile.faststart {
                    a.opt("-movflags", "+faststart");
                }
            }
        }

        a.path(self.output());
        a.0
    }
}

/// Concat demuxer manifest listing `segments` in order. ffmpeg resolves
/// relative entries against the directory holding the manifest.
pub fn concat_manifest(segments: &[&Path]) -> String {
    segments
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', r"'\''")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(op: &Operation) -> Vec<String> {
        op.args(&ToolPaths::default())
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn trim_honours_cutoff_and_copies_streams() {
        let op = Operation::Trim {
            input: p("out.mp4"),
            output: p("one.mp4"),
            cutoff: 59.0,
        };
        assert_eq!(
            rendered(&op),
            [
                "-hide_banner", "-y", "-i", "out.mp4", "-t", "59.000", "-c", "copy", "one.mp4"
            ]
        );
    }

    #[test]
    fn fade_out_segment_seeks_before_input() {
        let op = Operation::FadeSegment {
            input: p("in.mp4"),
            output: p("fade_part.mp4"),
            direction: FadeDirection::Out,
            start: 87.0,
            seconds: 3.0,
        };
        assert_eq!(
            rendered(&op),
            [
                "-hide_banner",
                "-y",
                "-ss",
                "87.000",
                "-i",
                "in.mp4",
                "-t",
                "3.000",
                "-vf",
                "fade=t=out:st=0:d=3.000",
                "-af",
                "afade=t=out:st=0:d=3.000",
                "fade_part.mp4"
            ]
        );
    }

    #[test]
    fn fade_in_segment_starts_at_zero() {
        let op = Operation::FadeSegment {
            input: p("in.mp4"),
            output: p("fade_part.mp4"),
            direction: FadeDirection::In,
            start: 0.0,
            seconds: 2.5,
        };
        let args = rendered(&op);
        assert!(!args.contains(&"-ss".to_string()));
        assert!(args.contains(&"fade=t=in:st=0:d=2.500".to_string()));
        assert!(args.contains(&"afade=t=in:st=0:d=2.500".to_string()));
    }

    #[test]
    fn music_modes_differ_only_in_audio_routing() {
        let mix = rendered(&Operation::MuxMusic {
            video: p("v.mp4"),
            music: p("music.mp3"),
            output: p("o.mp4"),
            mode: MusicMode::Mix,
        });
        assert_eq!(
            mix,
            [
                "-hide_banner",
                "-y",
                "-i",
                "v.mp4",
                "-i",
                "music.mp3",
                "-filter_complex",
                "[0:a][1:a]amix=inputs=2:duration=first:dropout_transition=2",
                "-c:v",
                "copy",
                "-shortest",
                "o.mp4"
            ]
        );

        let replace = rendered(&Operation::MuxMusic {
            video: p("v.mp4"),
            music: p("music.mp3"),
            output: p("o.mp4"),
            mode: MusicMode::Replace,
        });
        assert_eq!(
            &replace[6..10],
            ["-map", "0:v:0", "-map", "1:a:0"]
        );
    }

    #[test]
    fn silence_uses_lavfi_source() {
        let args = rendered(&Operation::PadSilence {
            input: p("v.mp4"),
            output: p("s.mp4"),
            silence: SilenceConfig::default(),
        });
        assert_eq!(
            args,
            [
                "-hide_banner",
                "-y",
                "-i",
                "v.mp4",
                "-f",
                "lavfi",
                "-t",
                "9999",
                "-i",
                "anullsrc=channel_layout=stereo:sample_rate=48000",
                "-shortest",
                "-c:v",
                "copy",
                "-c:a",
                "aac",
                "s.mp4"
            ]
        );
    }

    #[test]
    fn rotation_direction_selects_transpose() {
        for (rotation, filter) in [
            (Rotation::Clockwise, "transpose=1"),
            (Rotation::CounterClockwise, "transpose=2"),
        ] {
            let args = rendered(&Operation::Rotate {
                input: p("a.mp4"),
                output: p("b.mp4"),
                rotation,
            });
            assert_eq!(&args[4..8], ["-vf", filter, "-c:a", "copy"]);
        }
    }

    #[test]
    fn device_profile_renders_every_option() {
        let args = rendered(&Operation::DeviceTranscode {
            input: p("scaled_down.mp4"),
            output: p("iphone_ready.mp4"),
            profile: DeviceProfile::default(),
        });
        assert_eq!(
            &args[4..],
            [
                "-c:v",
                "libx264",
                "-profile:v",
                "baseline",
                "-level",
                "3.0",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-b:a",
                "128k",
                "-movflags",
                "+faststart",
                "iphone_ready.mp4"
            ]
        );
    }

    #[test]
    fn loglevel_is_inserted_when_configured() {
        let tools = ToolPaths {
            loglevel: Some("warning".to_string()),
            ..Default::default()
        };
        let op = Operation::ScaleHalf {
            input: p("a.mp4"),
            output: p("b.mp4"),
        };
        let args: Vec<String> = op
            .args(&tools)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(&args[..4], ["-hide_banner", "-loglevel", "warning", "-y"]);
        assert!(args.contains(&"scale=iw/2:ih/2".to_string()));
    }

    #[test]
    fn manifest_lists_segments_in_order_and_escapes_quotes() {
        let manifest = concat_manifest(&[Path::new("/w/fade_part.mp4"), Path::new("/w/it's.mp4")]);
        assert_eq!(
            manifest,
            "file '/w/fade_part.mp4'\nfile '/w/it'\\''s.mp4'\n"
        );
    }
}
