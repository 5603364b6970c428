use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use clipsmith_core::{
    ClipError, Editor, EditorConfig, FfmpegRunner, MusicMode, PipelineObserver, RecipeReport,
    Rotation, Step, format_timestamp,
};

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

#[derive(Args)]
struct MusicArgs {
    /// Music track to overlay
    #[arg(short, long)]
    music: Option<PathBuf>,

    /// Replace the original audio instead of mixing the music under it
    #[arg(long)]
    replace: bool,
}

#[derive(Parser)]
#[command(name = "clipsmith", version)]
#[command(about = "Trim, fade, rotate, score and re-encode videos with ffmpeg")]
struct Cli {
    /// JSON config file; fields it leaves out keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for scratch files and relative output names
    #[arg(short = 'C', long, global = true)]
    work_dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trim, rotate, add music, halve and re-encode into a short
    Short {
        input: PathBuf,

        /// Keep this much from the start (SS, MM:SS or HH:MM:SS)
        #[arg(long)]
        cutoff: Option<String>,

        /// Rotate counter-clockwise
        #[arg(long)]
        ccw: bool,

        #[command(flatten)]
        music: MusicArgs,

        /// Final file name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fade in, fade out and add music
    Long {
        input: PathBuf,

        /// Fade length in seconds
        #[arg(long)]
        fade: Option<f64>,

        #[command(flatten)]
        music: MusicArgs,

        /// Final file name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Keep the start of a video up to a cutoff, without re-encoding
    Trim {
        input: PathBuf,
        output: PathBuf,
        /// Defaults to the configured short cutoff
        #[arg(long)]
        cutoff: Option<String>,
    },
    /// Fade the first seconds in
    FadeIn {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        fade: Option<f64>,
    },
    /// Fade the last seconds out
    FadeOut {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        fade: Option<f64>,
    },
    /// Add a music track
    Music {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        music: MusicArgs,
    },
    /// Rotate by 90 degrees
    Rotate {
        input: PathBuf,
        output: PathBuf,
        /// Rotate counter-clockwise
        #[arg(long)]
        ccw: bool,
    },
    /// Halve width and height
    Scale { input: PathBuf, output: PathBuf },
    /// Re-encode for playback on phones and other constrained devices
    Compat { input: PathBuf, output: PathBuf },
    /// Print a file's duration
    Probe { input: PathBuf },
    /// Print the effective configuration as JSON
    Config,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// One spinner per recipe step
#[derive(Default)]
struct SpinnerObserver {
    spinner: Option<ProgressBar>,
}

impl PipelineObserver for SpinnerObserver {
    fn step_started(&mut self, step: Step) {
        self.spinner = Some(create_spinner(&format!("{}...", step.describe())));
    }

    fn step_finished(&mut self, step: Step, elapsed: Duration) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!(
                "{} {} {}",
                style("✓").green().bold(),
                step.describe(),
                style(format!("[{}]", format_duration(elapsed))).dim()
            ));
        }
    }

    fn step_failed(&mut self, step: Step, _error: &ClipError) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!(
                "{} {}",
                style("✗").red().bold(),
                step.describe()
            ));
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "clipsmith=warn,clipsmith_core=warn",
        1 => "clipsmith=info,clipsmith_core=info",
        _ => "clipsmith=debug,clipsmith_core=debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn apply_music(config: &mut EditorConfig, music: MusicArgs) {
    if let Some(path) = music.music {
        config.music = path;
    }
    if music.replace {
        config.music_mode = MusicMode::Replace;
    }
}

fn load_config(cli: &Cli) -> Result<EditorConfig> {
    let mut config = match &cli.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    if let Some(dir) = &cli.work_dir {
        config.work_dir = dir.clone();
    }
    Ok(config)
}

/// Seconds to keep for `trim`, falling back to the configured short cutoff
fn trim_cutoff(config: &mut EditorConfig, cutoff: Option<String>) -> Result<f64> {
    if let Some(cutoff) = cutoff {
        config.short_cutoff = cutoff;
    }
    Ok(config.short_cutoff_seconds()?)
}

async fn single_step<F>(msg: &str, done: &str, fut: F) -> Result<()>
where
    F: Future<Output = clipsmith_core::Result<()>>,
{
    let step_start = Instant::now();
    let spinner = create_spinner(msg);
    match fut.await {
        Ok(()) => {
            spinner.finish_with_message(format!(
                "{} {} {}",
                style("✓").green().bold(),
                done,
                style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
            ));
            Ok(())
        }
        Err(e) => {
            spinner.finish_with_message(format!("{} {}", style("✗").red().bold(), msg));
            Err(e.into())
        }
    }
}

fn print_report(report: &RecipeReport) {
    println!(
        "\n{} {}",
        style("Total time:").dim(),
        style(format_duration(report.total())).cyan().bold()
    );
    println!(
        "{} {}\n",
        style("Saved:").dim(),
        style(report.output.display()).cyan()
    );
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Short {
            input,
            cutoff,
            ccw,
            music,
            output,
        } => {
            if let Some(cutoff) = cutoff {
                config.short_cutoff = cutoff;
            }
            if ccw {
                config.rotation = Rotation::CounterClockwise;
            }
            if let Some(output) = output {
                config.short_name = output;
            }
            apply_music(&mut config, music);

            let editor = Editor::new(FfmpegRunner::new(config.tools.clone()), config);
            let report = editor
                .make_short(&input, &mut SpinnerObserver::default())
                .await?;
            print_report(&report);
        }
        Commands::Long {
            input,
            fade,
            music,
            output,
        } => {
            if let Some(fade) = fade {
                config.fade_seconds = fade;
            }
            if let Some(output) = output {
                config.long_name = output;
            }
            apply_music(&mut config, music);

            let editor = Editor::new(FfmpegRunner::new(config.tools.clone()), config);
            let report = editor
                .make_long(&input, &mut SpinnerObserver::default())
                .await?;
            print_report(&report);
        }
        Commands::Trim {
            input,
            output,
            cutoff,
        } => {
            let cutoff = trim_cutoff(&mut config, cutoff)?;
            let editor = Editor::new(FfmpegRunner::new(config.tools.clone()), config);
            single_step(
                "Cutting...",
                "Cut",
                editor.trim(&input, &output, cutoff),
            )
            .await?;
        }
        Commands::FadeIn {
            input,
            output,
            fade,
        } => {
            let fade = fade.unwrap_or(config.fade_seconds);
            let editor = Editor::new(FfmpegRunner::new(config.tools.clone()), config);
            single_step(
                "Fading in...",
                "Faded in",
                editor.fade_in(&input, &output, fade),
            )
            .await?;
        }
        Commands::FadeOut {
            input,
            output,
            fade,
        } => {
            let fade = fade.unwrap_or(config.fade_seconds);
            let editor = Editor::new(FfmpegRunner::new(config.tools.clone()), config);
            single_step(
                "Fading out...",
                "Faded out",
                editor.fade_out(&input, &output, fade),
            )
            .await?;
        }
        Commands::Music {
            input,
            output,
            music,
        } => {
            apply_music(&mut config, music);
            let track = config.music.clone();
            let mode = config.music_mode;
            let editor = Editor::new(FfmpegRunner::new(config.tools.clone()), config);
            single_step(
                "Adding music...",
                "Music added",
                editor.overlay_music(&input, &track, &output, mode),
            )
            .await?;
        }
        Commands::Rotate { input, output, ccw } => {
            let rotation = if ccw {
                Rotation::CounterClockwise
            } else {
                config.rotation
            };
            let editor = Editor::new(FfmpegRunner::new(config.tools.clone()), config);
            single_step(
                "Rotating...",
                "Rotated",
                editor.rotate(&input, &output, rotation),
            )
            .await?;
        }
        Commands::Scale { input, output } => {
            let editor = Editor::new(FfmpegRunner::new(config.tools.clone()), config);
            single_step(
                "Scaling down by half...",
                "Scaled down",
                editor.scale_half(&input, &output),
            )
            .await?;
        }
        Commands::Compat { input, output } => {
            let editor = Editor::new(FfmpegRunner::new(config.tools.clone()), config);
            single_step(
                "Making device compatible...",
                "Device compatible",
                editor.make_device_compatible(&input, &output),
            )
            .await?;
        }
        Commands::Probe { input } => {
            let editor = Editor::new(FfmpegRunner::new(config.tools.clone()), config);
            let seconds = editor.probe_duration(&input).await?;
            println!(
                "{} {:.3}s {}",
                style(input.display()).cyan(),
                seconds,
                style(format!("({})", format_timestamp(seconds))).dim()
            );
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if !matches!(cli.command, Commands::Probe { .. } | Commands::Config) {
        println!(
            "\n{}  {}\n",
            style("clipsmith").cyan().bold(),
            style("Video Editor").dim()
        );
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn short_flags_override_config() {
        let cli = Cli::parse_from([
            "clipsmith",
            "-C",
            "/videos",
            "short",
            "out.mp4",
            "--cutoff",
            "00:00:30",
            "--replace",
            "-m",
            "song.mp3",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("/videos"));

        let Commands::Short { cutoff, music, .. } = cli.command else {
            panic!("expected short");
        };
        assert_eq!(cutoff.as_deref(), Some("00:00:30"));
        let mut config = config;
        apply_music(&mut config, music);
        assert_eq!(config.music, PathBuf::from("song.mp3"));
        assert_eq!(config.music_mode, MusicMode::Replace);
    }

    #[test]
    fn trim_cutoff_defaults_to_configured_short_cutoff() {
        let cli = Cli::parse_from(["clipsmith", "trim", "in.mp4", "cut.mp4"]);
        let Commands::Trim { cutoff, .. } = cli.command else {
            panic!("expected trim");
        };
        assert_eq!(cutoff, None);

        let mut config = EditorConfig {
            short_cutoff: "00:00:30".to_string(),
            ..Default::default()
        };
        assert_eq!(trim_cutoff(&mut config, cutoff).unwrap(), 30.0);
        assert_eq!(
            trim_cutoff(&mut config, Some("1:15".to_string())).unwrap(),
            75.0
        );
        assert!(trim_cutoff(&mut config, Some("soon".to_string())).is_err());
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
