use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context as _;
use tracing::{debug, warn};

use crate::capture::image::CameraImage;
use crate::capture::source::{InputControl, InputSource, TestPattern, load_image_file};
use crate::foundation::core::Size;
use crate::foundation::error::{PanoError, PanoResult};
use crate::sync::barrier::CaptureHandle;

/// How long a capture thread waits for a frame request before re-checking its stop flag.
const REQUEST_POLL: Duration = Duration::from_millis(10);

/// Start the capture thread for one camera slot.
///
/// The thread follows the slot handshake: wait for a frame request, produce an image from the
/// current input source, deposit it. It exits when `stop` is raised.
pub fn spawn_capture_thread(
    handle: CaptureHandle,
    input: Arc<InputControl>,
    size: Size,
    stop: Arc<AtomicBool>,
) -> PanoResult<JoinHandle<()>> {
    let slot = handle.slot();
    std::thread::Builder::new()
        .name(format!("capture-{slot}"))
        .spawn(move || capture_loop(&handle, &input, size, &stop))
        .with_context(|| format!("spawn capture thread {slot}"))
        .map_err(PanoError::from)
}

fn capture_loop(handle: &CaptureHandle, input: &InputControl, size: Size, stop: &AtomicBool) {
    let slot = handle.slot();
    let mut pattern = TestPattern::new(size.width, size.height);
    let mut raw = RawDump::default();

    while !stop.load(Ordering::Relaxed) {
        if !handle.wait_request(REQUEST_POLL) {
            continue;
        }

        let (image, playlist) = match input.source() {
            InputSource::Camera => (pattern.next_image(slot), None),
            InputSource::File(playlist) => {
                let Some(path) = playlist.next_for(slot) else {
                    std::thread::sleep(REQUEST_POLL);
                    continue;
                };
                match load_image_file(&path) {
                    Ok(image) => (image, Some(playlist)),
                    Err(err) => {
                        warn!(slot, error = %err, "skipping undecodable replay frame");
                        playlist.finish_one();
                        continue;
                    }
                }
            }
        };

        raw.write(input.raw_output(), slot, &image);
        if !handle.deposit(image) {
            debug!(slot, "frame request withdrawn before deposit");
        }
        if let Some(playlist) = playlist {
            playlist.finish_one();
        }
    }
}

/// Appends raw RGB8 camera frames to `<base>.cam<slot>.rgb` while enabled.
#[derive(Default)]
struct RawDump {
    base: Option<PathBuf>,
    out: Option<BufWriter<File>>,
}

impl RawDump {
    fn write(&mut self, base: Option<PathBuf>, slot: usize, image: &CameraImage) {
        if base != self.base {
            if let Some(mut out) = self.out.take()
                && let Err(err) = out.flush()
            {
                warn!(slot, error = %err, "flushing raw dump failed");
            }
            self.out = base.as_ref().and_then(|b| match open_raw(b, slot) {
                Ok(f) => Some(f),
                Err(err) => {
                    warn!(slot, error = %err, "raw dump disabled");
                    None
                }
            });
            self.base = base;
        }

        if let Some(out) = self.out.as_mut()
            && let Err(err) = out.write_all(&image.data)
        {
            warn!(slot, error = %err, "raw dump write failed, disabling");
            self.out = None;
        }
    }
}

fn open_raw(base: &std::path::Path, slot: usize) -> PanoResult<BufWriter<File>> {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".cam{slot}.rgb"));
    let path = PathBuf::from(name);
    crate::encode::ffmpeg::ensure_parent_dir(&path)?;
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open raw dump '{}'", path.display()))?;
    Ok(BufWriter::new(file))
}
