use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::foundation::error::{PanoError, PanoResult};
use crate::render::backend::FrameRGB;

/// Configuration handed to a [`VideoSink`] when a recording starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSinkConfig {
    /// Full output width, including both halves of a double-size frame.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Target bitrate.
    pub bitrate_kbps: u32,
    /// Output file.
    pub path: PathBuf,
}

/// Sink contract for one recording.
///
/// `begin` is called once before any frame, `end` once after the last.
pub trait VideoSink: Send {
    /// Open the output.
    fn begin(&mut self, cfg: VideoSinkConfig) -> PanoResult<()>;
    /// Append one frame.
    fn push_frame(&mut self, frame: &FrameRGB) -> PanoResult<()>;
    /// Flush and close the output.
    fn end(&mut self) -> PanoResult<()>;
}

/// Creates a sink per recording.
pub trait VideoSinkFactory {
    /// New sink for one recording.
    fn create(&mut self, cfg: &VideoSinkConfig) -> Box<dyn VideoSink>;
}

/// Synchronous still-image writer.
pub trait StillSink {
    /// Encode `frame` to `path`.
    fn save(&mut self, frame: &FrameRGB, path: &Path, quality: u8) -> PanoResult<()>;
}

/// What an [`InMemoryVideoSink`] observed.
#[derive(Debug, Clone, Default)]
pub struct RecordedVideo {
    /// Configuration passed to `begin`.
    pub cfg: Option<VideoSinkConfig>,
    /// Every pushed frame.
    pub frames: Vec<FrameRGB>,
    /// `end` was called.
    pub ended: bool,
}

/// Shared log of every recording made through an [`InMemoryVideoFactory`].
pub type VideoLog = Arc<Mutex<Vec<RecordedVideo>>>;

/// In-memory sink for tests and debugging.
#[derive(Debug)]
pub struct InMemoryVideoSink {
    log: VideoLog,
    index: usize,
    fail_begin: bool,
}

impl VideoSink for InMemoryVideoSink {
    fn begin(&mut self, cfg: VideoSinkConfig) -> PanoResult<()> {
        if self.fail_begin {
            return Err(PanoError::resource(format!(
                "cannot open '{}'",
                cfg.path.display()
            )));
        }
        self.with_entry(|v| v.cfg = Some(cfg));
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRGB) -> PanoResult<()> {
        let mut started = true;
        self.with_entry(|v| {
            started = v.cfg.is_some() && !v.ended;
            if started {
                v.frames.push(frame.clone());
            }
        });
        if !started {
            return Err(PanoError::encode("in-memory sink is not recording"));
        }
        Ok(())
    }

    fn end(&mut self) -> PanoResult<()> {
        self.with_entry(|v| v.ended = true);
        Ok(())
    }
}

impl InMemoryVideoSink {
    fn with_entry(&self, f: impl FnOnce(&mut RecordedVideo)) {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = log.get_mut(self.index) {
            f(entry);
        }
    }
}

/// Hands out [`InMemoryVideoSink`]s that all record into one [`VideoLog`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryVideoFactory {
    log: VideoLog,
    fail_begin: bool,
}

impl InMemoryVideoFactory {
    /// Factory whose sinks all succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose sinks all fail in `begin`.
    pub fn failing() -> Self {
        Self {
            fail_begin: true,
            ..Self::default()
        }
    }

    /// Shared log of every recording.
    pub fn log(&self) -> VideoLog {
        Arc::clone(&self.log)
    }

    /// Snapshot of all recordings so far.
    pub fn videos(&self) -> Vec<RecordedVideo> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recordings begun but not yet ended.
    pub fn open_count(&self) -> usize {
        self.videos()
            .iter()
            .filter(|v| v.cfg.is_some() && !v.ended)
            .count()
    }
}

impl VideoSinkFactory for InMemoryVideoFactory {
    fn create(&mut self, _cfg: &VideoSinkConfig) -> Box<dyn VideoSink> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.push(RecordedVideo::default());
        Box::new(InMemoryVideoSink {
            log: Arc::clone(&self.log),
            index: log.len() - 1,
            fail_begin: self.fail_begin,
        })
    }
}

/// In-memory still sink. Clones share the saved list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStillSink {
    saved: Arc<Mutex<Vec<(PathBuf, FrameRGB)>>>,
    fail: bool,
}

impl InMemoryStillSink {
    /// Sink that keeps every save.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every save.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every saved path and frame, in order.
    pub fn saved(&self) -> Vec<(PathBuf, FrameRGB)> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StillSink for InMemoryStillSink {
    fn save(&mut self, frame: &FrameRGB, path: &Path, _quality: u8) -> PanoResult<()> {
        if self.fail {
            return Err(PanoError::encode(format!(
                "cannot write '{}'",
                path.display()
            )));
        }
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.to_path_buf(), frame.clone()));
        Ok(())
    }
}
