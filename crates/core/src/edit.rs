use std::path::Path;

use tracing::{debug, instrument};

use crate::{
    config::{EditorConfig, MusicMode, Rotation},
    error::{ClipError, Result},
    operation::{FadeDirection, Operation, concat_manifest},
    probe::probe_duration,
    scratch::ScratchSpace,
    transcoder::{Tool, Transcoder},
};

/// Runs editing operations through a [`Transcoder`] using one configuration
pub struct Editor<T> {
    transcoder: T,
    config: EditorConfig,
}

impl<T: Transcoder> Editor<T> {
    pub fn new(transcoder: T, config: EditorConfig) -> Self {
        Self { transcoder, config }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    pub(crate) fn scratch(&self) -> ScratchSpace {
        ScratchSpace::new(&self.config.work_dir)
    }

    pub(crate) async fn execute(&self, op: &Operation) -> Result<()> {
        debug!(operation = op.name(), output = %op.output().display(), "transcoding");
        self.transcoder
            .run_checked(Tool::Ffmpeg, &op.args(&self.config.tools))
            .await?;
        Ok(())
    }

    pub async fn probe_duration(&self, input: &Path) -> Result<f64> {
        probe_duration(&self.transcoder, input).await
    }

    /// Keep the first `cutoff` seconds. A cutoff past the end keeps everything.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub async fn trim(&self, input: &Path, output: &Path, cutoff: f64) -> Result<()> {
        self.execute(&Operation::Trim {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            cutoff,
        })
        .await
    }

    /// Fade the first `seconds` in and stream copy the rest.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub async fn fade_in(&self, input: &Path, output: &Path, seconds: f64) -> Result<()> {
        check_fade(input, seconds, None)?;

        let scratch = self.scratch();
        let fade_part = scratch.file("fade_part.mp4");
        let rest = scratch.file("clip_no_fade.mp4");

        self.execute(&Operation::FadeSegment {
            input: input.to_path_buf(),
            output: fade_part.path().to_path_buf(),
            direction: FadeDirection::In,
            start: 0.0,
            seconds,
        })
        .await?;
        self.execute(&Operation::CopyFrom {
            input: input.to_path_buf(),
            output: rest.path().to_path_buf(),
            start: seconds,
        })
        .await?;

        self.concat(&scratch, &[fade_part.path(), rest.path()], output)
            .await
    }

    /// Fade the last `seconds` out. The source is probed first; nothing is
    /// transcoded if that fails.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub async fn fade_out(&self, input: &Path, output: &Path, seconds: f64) -> Result<()> {
        let duration = self.probe_duration(input).await?;
        check_fade(input, seconds, Some(duration))?;
        let fade_start = duration - seconds;

        let scratch = self.scratch();
        let fade_part = scratch.file("fade_part.mp4");
        let before = scratch.file("clip_before_fade.mp4");

        self.execute(&Operation::FadeSegment {
            input: input.to_path_buf(),
            output: fade_part.path().to_path_buf(),
            direction: FadeDirection::Out,
            start: fade_start,
            seconds,
        })
        .await?;
        self.execute(&Operation::CopyUntil {
            input: input.to_path_buf(),
            output: before.path().to_path_buf(),
            end: fade_start,
        })
        .await?;

        self.concat(&scratch, &[before.path(), fade_part.path()], output)
            .await
    }

    async fn concat(&self, scratch: &ScratchSpace, segments: &[&Path], output: &Path) -> Result<()> {
        let manifest = scratch.file("concat_list.txt");
        // the concat demuxer resolves entries against the manifest's directory,
        // which every segment shares
        let entries: Vec<&Path> = segments
            .iter()
            .map(|&p| p.file_name().map(Path::new).unwrap_or(p))
            .collect();
        tokio::fs::write(manifest.path(), concat_manifest(&entries)).await?;

        self.execute(&Operation::Concat {
            manifest: manifest.path().to_path_buf(),
            output: output.to_path_buf(),
        })
        .await
    }

    /// Give the video a silent track, then mix in or swap to `music`.
    #[instrument(skip_all, fields(video = %video.display(), music = %music.display()))]
    pub async fn overlay_music(
        &self,
        video: &Path,
        music: &Path,
        output: &Path,
        mode: MusicMode,
    ) -> Result<()> {
        let scratch = self.scratch();
        let with_silence = scratch.file("temp_with_silence.mp4");

        self.execute(&Operation::PadSilence {
            input: video.to_path_buf(),
            output: with_silence.path().to_path_buf(),
            silence: self.config.silence.clone(),
        })
        .await?;

        self.execute(&Operation::MuxMusic {
            video: with_silence.path().to_path_buf(),
            music: music.to_path_buf(),
            output: output.to_path_buf(),
            mode,
        })
        .await
    }

    #[instrument(skip_all, fields(input = %input.display()))]
    pub async fn rotate(&self, input: &Path, output: &Path, rotation: Rotation) -> Result<()> {
        self.execute(&Operation::Rotate {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            rotation,
        })
        .await
    }

    #[instrument(skip_all, fields(input = %input.display()))]
    pub async fn scale_half(&self, input: &Path, output: &Path) -> Result<()> {
        self.execute(&Operation::ScaleHalf {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        })
        .await
    }

    /// Re-encode into the configured device profile
    #[instrument(skip_all, fields(input = %input.display()))]
    pub async fn make_device_compatible(&self, input: &Path, output: &Path) -> Result<()> {
        self.execute(&Operation::DeviceTranscode {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            profile: self.config.device.clone(),
        })
        .await
    }
}

fn check_fade(path: &Path, fade: f64, duration: Option<f64>) -> Result<()> {
    let fits = fade.is_finite() && fade > 0.0 && duration.is_none_or(|d| fade < d);
    if fits {
        return Ok(());
    }
    Err(ClipError::InvalidFade {
        path: path.to_path_buf(),
        fade,
        duration: duration.unwrap_or(f64::NAN),
    })
}
