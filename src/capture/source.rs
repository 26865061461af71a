use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context as _;

use crate::capture::image::CameraImage;
use crate::foundation::error::{PanoError, PanoResult};

const REPLAY_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "ppm", "tga"];

/// Frames replayed from a directory of still images.
///
/// Files are sorted by name and dealt to cameras round-robin, so a directory recorded from a
/// multiplexed stream (`0000.jpg` = cam0, `0001.jpg` = cam1, ...) replays in lockstep.
#[derive(Debug)]
pub struct ReplayPlaylist {
    queues: Vec<Mutex<VecDeque<PathBuf>>>,
    total: usize,
    finished: AtomicUsize,
}

impl ReplayPlaylist {
    /// Scan `dir` and deal its image files to `num_cameras` queues.
    pub fn from_dir(dir: &Path, num_cameras: usize) -> PanoResult<Self> {
        if num_cameras == 0 {
            return Err(PanoError::configuration("replay needs at least one camera"));
        }
        let mut files = std::fs::read_dir(dir)
            .with_context(|| format!("read replay directory '{}'", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| REPLAY_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            })
            .collect::<Vec<_>>();
        if files.is_empty() {
            return Err(PanoError::configuration(format!(
                "replay directory '{}' holds no images",
                dir.display()
            )));
        }
        files.sort();

        let mut queues = vec![VecDeque::new(); num_cameras];
        let total = files.len();
        for (i, f) in files.into_iter().enumerate() {
            queues[i % num_cameras].push_back(f);
        }
        Ok(Self {
            queues: queues.into_iter().map(Mutex::new).collect(),
            total,
            finished: AtomicUsize::new(0),
        })
    }

    /// Total number of frames across all cameras.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Take the next file destined for `slot`.
    pub fn next_for(&self, slot: usize) -> Option<PathBuf> {
        self.queues
            .get(slot)?
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Mark one taken frame as delivered (or dropped after a decode failure).
    pub fn finish_one(&self) {
        self.finished.fetch_add(1, Ordering::Release);
    }

    /// Percentage of frames delivered, 0..=100.
    pub fn progress_percent(&self) -> i32 {
        let done = self.finished.load(Ordering::Relaxed).min(self.total);
        (done * 100 / self.total.max(1)) as i32
    }

    /// Return `true` once every frame was delivered.
    pub fn is_exhausted(&self) -> bool {
        self.finished.load(Ordering::Acquire) >= self.total
    }
}

/// Where capture threads draw their frames from.
#[derive(Clone, Debug)]
pub enum InputSource {
    /// Live cameras.
    Camera,
    /// File replay.
    File(Arc<ReplayPlaylist>),
}

#[derive(Debug)]
struct InputState {
    source: InputSource,
    raw_output: Option<PathBuf>,
}

/// Input selection shared between the control loop and the capture threads.
#[derive(Debug)]
pub struct InputControl {
    state: Mutex<InputState>,
}

impl Default for InputControl {
    fn default() -> Self {
        Self::new()
    }
}

impl InputControl {
    /// Start on live cameras with raw dumping off.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InputState {
                source: InputSource::Camera,
                raw_output: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, InputState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current input source.
    pub fn source(&self) -> InputSource {
        self.state().source.clone()
    }

    /// Switch to live cameras.
    pub fn use_camera(&self) {
        self.state().source = InputSource::Camera;
    }

    /// Switch to replaying `playlist`.
    pub fn use_playlist(&self, playlist: ReplayPlaylist) {
        self.state().source = InputSource::File(Arc::new(playlist));
    }

    /// Replay progress in percent, or `-1` when no replay is active.
    pub fn loading_pos(&self) -> i32 {
        match &self.state().source {
            InputSource::File(p) => p.progress_percent(),
            InputSource::Camera => -1,
        }
    }

    /// Return `true` when replaying and every frame was delivered.
    pub fn replay_exhausted(&self) -> bool {
        matches!(&self.state().source, InputSource::File(p) if p.is_exhausted())
    }

    /// Raw dump base path, if enabled.
    pub fn raw_output(&self) -> Option<PathBuf> {
        self.state().raw_output.clone()
    }

    /// Enable raw dumping. Returns `false` if it was already enabled.
    pub fn start_raw_output(&self, path: PathBuf) -> bool {
        let mut state = self.state();
        if state.raw_output.is_some() {
            return false;
        }
        state.raw_output = Some(path);
        true
    }

    /// Disable raw dumping.
    pub fn stop_raw_output(&self) {
        self.state().raw_output = None;
    }
}

/// Synthetic stand-in for a live sensor: vertical colour bars that scroll one step per frame,
/// tinted per camera so seams are visible.
#[derive(Debug, Clone)]
pub struct TestPattern {
    width: u32,
    height: u32,
    frame: u64,
}

const BARS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

impl TestPattern {
    /// Pattern of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: 0,
        }
    }

    /// Next frame for camera `slot`.
    pub fn next_image(&mut self, slot: usize) -> CameraImage {
        let w = self.width.max(1) as usize;
        let h = self.height.max(1) as usize;
        let bar_w = (w / BARS.len()).max(1);
        let shift = self.frame as usize;
        let tint = (slot as u8).wrapping_mul(40);

        let mut row = Vec::with_capacity(w * 3);
        for x in 0..w {
            let [r, g, b] = BARS[((x + shift) / bar_w) % BARS.len()];
            row.extend_from_slice(&[r.wrapping_sub(tint), g, b.wrapping_add(tint)]);
        }
        let mut data = Vec::with_capacity(w * h * 3);
        for _ in 0..h {
            data.extend_from_slice(&row);
        }

        self.frame = self.frame.wrapping_add(1);
        CameraImage {
            width: w as u32,
            height: h as u32,
            data: Arc::new(data),
        }
    }
}

/// Decode an image file into RGB8.
pub fn load_image_file(path: &Path) -> PanoResult<CameraImage> {
    let img = image::open(path)
        .with_context(|| format!("decode replay frame '{}'", path.display()))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    CameraImage::from_rgb8(w, h, img.into_raw())
}

#[cfg(test)]
#[path = "../../tests/unit/capture/source.rs"]
mod tests;
