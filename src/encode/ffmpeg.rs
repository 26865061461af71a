use std::io::{Read as _, Write as _};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::encode::sink::{VideoSink, VideoSinkConfig, VideoSinkFactory};
use crate::foundation::error::{PanoError, PanoResult};
use crate::render::backend::FrameRGB;

/// Recording sink that spawns the system `ffmpeg` and streams rgb24 frames to stdin.
///
/// Output is H.264 (`libx264`, yuv420p) at the configured bitrate.
#[derive(Default)]
pub struct FfmpegVideoSink {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    cfg: Option<VideoSinkConfig>,
}

impl FfmpegVideoSink {
    /// Sink with no ffmpeg process yet; `begin` spawns it.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VideoSink for FfmpegVideoSink {
    fn begin(&mut self, cfg: VideoSinkConfig) -> PanoResult<()> {
        if cfg.fps == 0 {
            return Err(PanoError::configuration("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(PanoError::configuration(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(PanoError::configuration(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }

        ensure_parent_dir(&cfg.path)?;
        if !is_ffmpeg_on_path() {
            return Err(PanoError::resource(
                "ffmpeg is required for recording, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args([
                "-y",
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                &format!("{}x{}", cfg.width, cfg.height),
                "-r",
                &cfg.fps.to_string(),
                "-i",
                "pipe:0",
                "-an",
                "-c:v",
                "libx264",
                "-b:v",
                &format!("{}k", cfg.bitrate_kbps),
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(&cfg.path);

        let mut child = cmd.spawn().map_err(|e| {
            PanoError::resource(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PanoError::resource("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| PanoError::resource("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRGB) -> PanoResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| PanoError::encode("ffmpeg sink not started"))?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(PanoError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(PanoError::encode("ffmpeg sink is already finalized"));
        };
        stdin
            .write_all(&frame.data)
            .map_err(|e| PanoError::encode(format!("failed to write frame to ffmpeg stdin: {e}")))
    }

    fn end(&mut self) -> PanoResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| PanoError::encode("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| PanoError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PanoError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| PanoError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        self.cfg = None;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(PanoError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Creates one [`FfmpegVideoSink`] per recording.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegVideoSinkFactory;

impl VideoSinkFactory for FfmpegVideoSinkFactory {
    fn create(&mut self, _cfg: &VideoSinkConfig) -> Box<dyn VideoSink> {
        Box::new(FfmpegVideoSink::new())
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> PanoResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
