//! Fixed multi-step recipes
//!
//! A recipe threads one "current artifact" through its steps. Each step writes
//! a fresh scratch file; once it succeeds that file becomes the current
//! artifact and the previous intermediate is released. The source file handed
//! in is never touched.

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use tracing::{info, instrument};

use crate::{
    edit::Editor,
    error::{ClipError, Result},
    scratch::{ScratchFile, ScratchSpace},
    transcoder::Transcoder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Trim,
    Rotate,
    AddMusic,
    ScaleDown,
    DeviceCompat,
    FadeIn,
    FadeOut,
    Finalize,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::Trim => "trim",
            Step::Rotate => "rotate",
            Step::AddMusic => "add_music",
            Step::ScaleDown => "scale_down",
            Step::DeviceCompat => "device_compat",
            Step::FadeIn => "fade_in",
            Step::FadeOut => "fade_out",
            Step::Finalize => "finalize",
        }
    }

    /// Progress message shown while the step runs
    pub fn describe(self) -> &'static str {
        match self {
            Step::Trim => "Cutting",
            Step::Rotate => "Rotating",
            Step::AddMusic => "Adding music",
            Step::ScaleDown => "Scaling down by half",
            Step::DeviceCompat => "Making device compatible",
            Step::FadeIn => "Fading in",
            Step::FadeOut => "Fading out",
            Step::Finalize => "Moving into place",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipe {
    Short,
    Long,
}

impl Recipe {
    pub fn name(self) -> &'static str {
        match self {
            Recipe::Short => "make_short",
            Recipe::Long => "make_long",
        }
    }

    pub fn steps(self) -> &'static [Step] {
        match self {
            Recipe::Short => &[
                Step::Trim,
                Step::Rotate,
                Step::AddMusic,
                Step::ScaleDown,
                Step::DeviceCompat,
                Step::Finalize,
            ],
            Recipe::Long => &[Step::FadeIn, Step::FadeOut, Step::AddMusic, Step::Finalize],
        }
    }
}

/// Hooks for reporting recipe progress
pub trait PipelineObserver {
    fn step_started(&mut self, _step: Step) {}
    fn step_finished(&mut self, _step: Step, _elapsed: Duration) {}
    fn step_failed(&mut self, _step: Step, _error: &ClipError) {}
}

impl PipelineObserver for () {}

#[derive(Debug, Clone, PartialEq)]
pub struct StepTiming {
    pub step: Step,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeReport {
    pub recipe: Recipe,
    pub output: PathBuf,
    pub steps: Vec<StepTiming>,
}

impl RecipeReport {
    pub fn total(&self) -> Duration {
        self.steps.iter().map(|s| s.elapsed).sum()
    }
}

enum Artifact {
    Source(PathBuf),
    Intermediate(ScratchFile),
}

impl Artifact {
    fn path(&self) -> &Path {
        match self {
            Artifact::Source(path) => path,
            Artifact::Intermediate(file) => file.path(),
        }
    }
}

struct PipelineRun<'a, O: ?Sized> {
    scratch: ScratchSpace,
    current: Artifact,
    observer: &'a mut O,
    steps: Vec<StepTiming>,
    started: Instant,
}

impl<'a, O: PipelineObserver + ?Sized> PipelineRun<'a, O> {
    fn new(scratch: ScratchSpace, input: &Path, observer: &'a mut O) -> Self {
        Self {
            scratch,
            current: Artifact::Source(input.to_path_buf()),
            observer,
            steps: Vec::new(),
            started: Instant::now(),
        }
    }

    /// The artifact the next step reads
    fn input(&self) -> &Path {
        self.current.path()
    }

    fn begin(&mut self, step: Step) {
        info!(step = step.name(), "{}", step.describe());
        self.observer.step_started(step);
        self.started = Instant::now();
    }

    /// Start a step that writes `file_name` in the scratch space
    fn begin_with_output(&mut self, step: Step, file_name: &str) -> ScratchFile {
        self.begin(step);
        self.scratch.file(file_name)
    }

    fn end(&mut self, step: Step, result: Result<()>) -> Result<()> {
        let elapsed = self.started.elapsed();
        match result {
            Ok(()) => {
                self.observer.step_finished(step, elapsed);
                self.steps.push(StepTiming { step, elapsed });
                Ok(())
            }
            Err(e) => {
                self.observer.step_failed(step, &e);
                Err(ClipError::StepFailed {
                    step: step.name(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Record a step's outcome; on success its output becomes current
    fn advance(&mut self, step: Step, output: ScratchFile, result: Result<()>) -> Result<()> {
        self.end(step, result)?;
        // the replaced intermediate is dropped, and removed, here
        self.current = Artifact::Intermediate(output);
        Ok(())
    }

    async fn finish(mut self, recipe: Recipe, dest: &Path) -> Result<RecipeReport> {
        self.begin(Step::Finalize);
        let current = std::mem::replace(&mut self.current, Artifact::Source(PathBuf::new()));
        let result = match current {
            Artifact::Intermediate(file) => file.persist(dest).await.map(drop),
            Artifact::Source(path) => tokio::fs::copy(&path, dest)
                .await
                .map(drop)
                .map_err(ClipError::from),
        };
        self.end(Step::Finalize, result)?;

        Ok(RecipeReport {
            recipe,
            output: dest.to_path_buf(),
            steps: self.steps,
        })
    }
}

impl<T: Transcoder> Editor<T> {
    /// Trim, rotate, add music, halve the resolution, re-encode for devices,
    /// then move the result to the configured short name.
    #[instrument(skip_all, fields(recipe = "make_short", input = %input.display()))]
    pub async fn make_short<O>(&self, input: &Path, observer: &mut O) -> Result<RecipeReport>
    where
        O: PipelineObserver + ?Sized,
    {
        let config = self.config();
        let cutoff = config.short_cutoff_seconds()?;
        let dest = config.resolve(&config.short_name);
        let mut run = PipelineRun::new(self.scratch(), input, observer);

        let out = run.begin_with_output(Step::Trim, "one.mp4");
        let result = self.trim(run.input(), out.path(), cutoff).await;
        run.advance(Step::Trim, out, result)?;

        let out = run.begin_with_output(Step::Rotate, "rotated.mp4");
        let result = self.rotate(run.input(), out.path(), config.rotation).await;
        run.advance(Step::Rotate, out, result)?;

        let out = run.begin_with_output(Step::AddMusic, "with_music.mp4");
        let result = self
            .overlay_music(run.input(), &config.music, out.path(), config.music_mode)
            .await;
        run.advance(Step::AddMusic, out, result)?;

        let out = run.begin_with_output(Step::ScaleDown, "scaled_down.mp4");
        let result = self.scale_half(run.input(), out.path()).await;
        run.advance(Step::ScaleDown, out, result)?;

        let out = run.begin_with_output(Step::DeviceCompat, "iphone_ready.mp4");
        let result = self.make_device_compatible(run.input(), out.path()).await;
        run.advance(Step::DeviceCompat, out, result)?;

        run.finish(Recipe::Short, &dest).await
    }

    /// Fade in, fade out, add music, then move the result to the configured
    /// long name.
    #[instrument(skip_all, fields(recipe = "make_long", input = %input.display()))]
    pub async fn make_long<O>(&self, input: &Path, observer: &mut O) -> Result<RecipeReport>
    where
        O: PipelineObserver + ?Sized,
    {
        let config = self.config();
        let fade = config.fade_seconds;
        let dest = config.resolve(&config.long_name);
        let mut run = PipelineRun::new(self.scratch(), input, observer);

        let out = run.begin_with_output(Step::FadeIn, "fade_in.mp4");
        let result = self.fade_in(run.input(), out.path(), fade).await;
        run.advance(Step::FadeIn, out, result)?;

        let out = run.begin_with_output(Step::FadeOut, "fade_out.mp4");
        let result = self.fade_out(run.input(), out.path(), fade).await;
        run.advance(Step::FadeOut, out, result)?;

        let out = run.begin_with_output(Step::AddMusic, "with_music.mp4");
        let result = self
            .overlay_music(run.input(), &config.music, out.path(), config.music_mode)
            .await;
        run.advance(Step::AddMusic, out, result)?;

        run.finish(Recipe::Long, &dest).await
    }
}
