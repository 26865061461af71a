use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::encode::sink::VideoSink;
use crate::foundation::core::{EulerAngles, FrameId, OperationMode};
use crate::foundation::error::{PanoError, PanoResult};
use crate::render::backend::RenderTarget;

/// Requested widths above this are rendered as two half-width passes.
pub const DOUBLE_SIZE_THRESHOLD: u32 = 2048;

/// Field of view of a new request, degrees.
pub const DEFAULT_FOV_DEG: f32 = 120.0;
/// Width and height of a new request.
pub const DEFAULT_RENDER_SIZE: u32 = 512;

/// Destination of a request's composited pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Composite only for the display.
    #[default]
    None,
    /// Save one still, then retire.
    Still,
    /// Record until stopped.
    Video,
}

/// Per-pass render geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    /// Width of one composite pass.
    pub width: u32,
    /// Pass height.
    pub height: u32,
    /// Two passes (left, right) interleaved into a frame of twice `width`.
    pub double_size: bool,
}

impl Geometry {
    /// Split `width` into passes when it exceeds [`DOUBLE_SIZE_THRESHOLD`].
    pub fn from_requested(width: u32, height: u32) -> Self {
        if width > DOUBLE_SIZE_THRESHOLD {
            Self {
                width: width / 2,
                height,
                double_size: true,
            }
        } else {
            Self {
                width,
                height,
                double_size: false,
            }
        }
    }

    /// Width of the finished frame handed to sinks.
    pub fn output_width(&self) -> u32 {
        if self.double_size {
            self.width * 2
        } else {
            self.width
        }
    }
}

/// Where a request's view orientation comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewSource {
    /// Follow the orientation source.
    DeviceTracked,
    /// Fixed angles.
    Explicit(EulerAngles),
}

/// Recording bookkeeping for Video requests.
#[derive(Default)]
pub struct RecordingState {
    pub(crate) active: bool,
    pub(crate) frame_count: u64,
    pub(crate) elapsed: Duration,
    pub(crate) sink: Option<Box<dyn VideoSink>>,
}

impl std::fmt::Debug for RecordingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingState")
            .field("active", &self.active)
            .field("frame_count", &self.frame_count)
            .field("elapsed", &self.elapsed)
            .field("sink_open", &self.sink.is_some())
            .finish()
    }
}

/// One independently scheduled render and output job.
#[derive(Debug)]
pub struct FrameRequest {
    pub(crate) id: FrameId,
    pub(crate) mode: OperationMode,
    pub(crate) output: OutputMode,
    pub(crate) output_path: Option<PathBuf>,
    pub(crate) geometry: Geometry,
    pub(crate) view: ViewSource,
    pub(crate) fov_deg: f32,
    pub(crate) recording: RecordingState,
    pub(crate) delete_after_processed: bool,
    pub(crate) target: Option<RenderTarget>,
}

impl FrameRequest {
    /// Request id.
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Projection family.
    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    /// Current output mode.
    pub fn output(&self) -> OutputMode {
        self.output
    }

    /// Still or video path.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Render geometry.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// View orientation source.
    pub fn view(&self) -> ViewSource {
        self.view
    }

    /// Field of view, degrees.
    pub fn fov_deg(&self) -> f32 {
        self.fov_deg
    }

    /// A recording sink is open.
    pub fn is_recording(&self) -> bool {
        self.recording.active
    }

    /// Frames appended so far.
    pub fn frames_recorded(&self) -> u64 {
        self.recording.frame_count
    }

    /// False once target allocation failed; the request then produces no pixels.
    pub fn display_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Switch to an explicit view.
    pub fn set_view(&mut self, angles: EulerAngles) {
        self.view = ViewSource::Explicit(angles);
    }

    /// Set the field of view, degrees.
    pub fn set_fov(&mut self, fov_deg: f32) {
        self.fov_deg = fov_deg;
    }

    /// Revert output to None. A running recording is closed on the next tick.
    pub fn stop_output(&mut self) {
        self.output = OutputMode::None;
    }
}

/// Options of `snap`, `start_record`, and the startup request.
///
/// Accepts `-W <width>`, `-H <height>`, one of `-E`/`-C`/`-F`, `-f <fov>`, `-v <p,y,r>`, and
/// `-o <path>`. Values may also be attached (`-W1024`).
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOptions {
    /// Requested width.
    pub width: u32,
    /// Requested height.
    pub height: u32,
    /// Projection family.
    pub mode: OperationMode,
    /// Field of view, degrees.
    pub fov_deg: f32,
    /// Explicit view; `None` follows the device.
    pub view: Option<EulerAngles>,
    /// Still or video path.
    pub output_path: Option<PathBuf>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_RENDER_SIZE,
            height: DEFAULT_RENDER_SIZE,
            mode: OperationMode::Window,
            fov_deg: DEFAULT_FOV_DEG,
            view: None,
            output_path: None,
        }
    }
}

impl RequestOptions {
    /// Parse option tokens.
    pub fn parse<'a>(args: impl IntoIterator<Item = &'a str>) -> PanoResult<Self> {
        let mut out = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let Some(flag) = arg.strip_prefix('-').and_then(|f| f.chars().next()) else {
                return Err(PanoError::configuration(format!(
                    "unexpected argument '{arg}'"
                )));
            };
            let attached = &arg[1 + flag.len_utf8()..];

            match flag {
                'E' | 'C' | 'F' if attached.is_empty() => {
                    out.mode = match flag {
                        'E' => OperationMode::Equirectangular,
                        'C' => OperationMode::Calibration,
                        _ => OperationMode::Fisheye,
                    };
                    continue;
                }
                'W' | 'H' | 'f' | 'v' | 'o' => {}
                _ => {
                    return Err(PanoError::configuration(format!(
                        "unknown option '{arg}'"
                    )));
                }
            }

            let value = if attached.is_empty() {
                args.next().ok_or_else(|| {
                    PanoError::configuration(format!("option '-{flag}' needs a value"))
                })?
            } else {
                attached
            };

            match flag {
                'W' => out.width = parse_dimension(flag, value)?,
                'H' => out.height = parse_dimension(flag, value)?,
                'f' => out.fov_deg = parse_fov(value)?,
                'v' => out.view = Some(EulerAngles::parse_degrees(value)?),
                _ => out.output_path = Some(PathBuf::from(value)),
            }
        }
        Ok(out)
    }
}

fn parse_dimension(flag: char, value: &str) -> PanoResult<u32> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(PanoError::configuration(format!(
            "option '-{flag}' expects a positive integer, got '{value}'"
        ))),
    }
}

/// Field of view in degrees, strictly between 0 and 180.
pub fn parse_fov(value: &str) -> PanoResult<f32> {
    match value.parse::<f32>() {
        Ok(v) if v > 0.0 && v < 180.0 => Ok(v),
        _ => Err(PanoError::configuration(format!(
            "field of view must be in (0, 180) degrees, got '{value}'"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/request.rs"]
mod tests;
