use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context as _;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use panoframe::orientation::feed::spawn_quaternion_feed;
use panoframe::orientation::{DEFAULT_ORIENTATION, SharedOrientation, open_orientation};
use panoframe::{
    CpuBackend, CpuSettings, FfmpegVideoSinkFactory, ImageStillSink, OperationMode, OutputMode,
    Outputs, PanoError, Pipeline, PipelineConfig, ReplayPlaylist, RequestOptions, Size,
    StdinChannel,
};

/// Composite fisheye camera images into oriented views, driven by line commands on stdin.
#[derive(Parser, Debug)]
#[command(name = "panoframe", version, disable_help_flag = true)]
struct Cli {
    /// Camera image width.
    #[arg(short = 'w', default_value_t = 1024)]
    cam_width: u32,

    /// Camera image height.
    #[arg(short = 'h', default_value_t = 1024)]
    cam_height: u32,

    /// Number of cameras.
    #[arg(short = 'n', default_value_t = 1)]
    num_cameras: usize,

    /// Show the foreground request on the display surface.
    #[arg(short = 'p')]
    preview: bool,

    /// Side-by-side stereo display.
    #[arg(short = 's')]
    stereo: bool,

    /// Replay still images from this directory instead of the cameras; exits when used up.
    #[arg(short = 'i')]
    input_dir: Option<PathBuf>,

    /// Dump raw camera frames to `<path>.cam<i>.rgb`.
    #[arg(short = 'r')]
    raw_output: Option<PathBuf>,

    /// Startup request width.
    #[arg(short = 'W', default_value_t = panoframe::DEFAULT_RENDER_SIZE)]
    width: u32,

    /// Startup request height.
    #[arg(short = 'H', default_value_t = panoframe::DEFAULT_RENDER_SIZE)]
    height: u32,

    /// Equirectangular projection.
    #[arg(short = 'E')]
    equirectangular: bool,

    /// Calibration view.
    #[arg(short = 'C')]
    calibration: bool,

    /// Fisheye projection.
    #[arg(short = 'F')]
    fisheye: bool,

    /// Record the startup request to this video file.
    #[arg(short = 'o')]
    output: Option<PathBuf>,

    /// Replay device orientation from a file of `x y z w` lines.
    #[arg(long)]
    orientation_feed: Option<PathBuf>,

    /// Calibration document.
    #[arg(long, default_value = "config.json")]
    calibration_path: PathBuf,

    /// Display width.
    #[arg(long, default_value_t = 1920)]
    screen_width: u32,

    /// Display height.
    #[arg(long, default_value_t = 1080)]
    screen_height: u32,

    /// Minimum milliseconds per tick.
    #[arg(long, default_value_t = 0)]
    tick_ms: u64,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    fn mode(&self) -> OperationMode {
        if self.equirectangular {
            OperationMode::Equirectangular
        } else if self.calibration {
            OperationMode::Calibration
        } else if self.fisheye {
            OperationMode::Fisheye
        } else {
            OperationMode::Window
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            num_cameras: self.num_cameras,
            camera_size: Size {
                width: self.cam_width,
                height: self.cam_height,
            },
            screen_size: Size {
                width: self.screen_width,
                height: self.screen_height,
            },
            frame_sync: self.input_dir.is_some(),
            preview: self.preview,
            stereo: self.stereo,
            min_tick_interval: Duration::from_millis(self.tick_ms),
            calibration_path: self.calibration_path.clone(),
            exit_on_replay_end: self.input_dir.is_some(),
            ..PipelineConfig::default()
        }
    }

    fn startup_request(&self) -> (RequestOptions, OutputMode) {
        let options = RequestOptions {
            width: self.width,
            height: self.height,
            mode: self.mode(),
            output_path: self.output.clone(),
            ..RequestOptions::default()
        };
        let output = if self.output.is_some() {
            OutputMode::Video
        } else {
            OutputMode::None
        };
        (options, output)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.pipeline_config();

    let backend = CpuBackend::with_settings(
        config.screen_size,
        CpuSettings {
            threads: cli.threads,
            ..CpuSettings::default()
        },
    )?;
    let outputs = Outputs::new(Box::new(ImageStillSink), Box::new(FfmpegVideoSinkFactory));

    let shared = Arc::new(SharedOrientation::new(DEFAULT_ORIENTATION));
    let feed_stop = Arc::new(AtomicBool::new(false));
    let (tracker, feed_thread) = match cli.orientation_feed.as_deref() {
        Some(path) => match spawn_quaternion_feed(path, Arc::clone(&shared), Arc::clone(&feed_stop))
        {
            Ok(handle) => (Ok(Arc::clone(&shared)), Some(handle)),
            Err(err) => (Err(err), None),
        },
        None => (Err(PanoError::init("no orientation feed configured")), None),
    };
    let control = StdinChannel::spawn()?;

    let mut pipeline = Pipeline::new(
        config,
        Box::new(backend),
        outputs,
        open_orientation(tracker),
        Box::new(control),
    )?;

    if let Some(dir) = cli.input_dir.as_deref() {
        let playlist = ReplayPlaylist::from_dir(dir, cli.num_cameras)
            .with_context(|| format!("load replay '{}'", dir.display()))?;
        pipeline.input().use_playlist(playlist);
    }
    if let Some(path) = cli.raw_output.clone() {
        pipeline.input().start_raw_output(path);
    }

    pipeline.spawn_capture_threads()?;

    let (options, output) = cli.startup_request();
    let id = pipeline.create_request(&options, output);
    tracing::info!(%id, ?output, "startup request created");

    pipeline.run()?;

    feed_stop.store(true, Ordering::Relaxed);
    if let Some(handle) = feed_thread {
        if handle.join().is_err() {
            tracing::warn!("orientation feed thread panicked");
        }
    }
    Ok(())
}
