//! Panoframe composites the images of up to four fisheye cameras into oriented views.
//!
//! One render loop drives everything:
//!
//! - Capture threads deposit camera images into a [`CaptureBarrier`]
//! - A [`ControlChannel`] delivers line commands that create and steer [`FrameRequest`]s
//! - Each tick the [`FrameSessionManager`] composites every request through a
//!   [`RenderBackend`] and routes the result to a still, a video recording, or the display
//!
//! [`Pipeline`] wires these together; the `panoframe` binary is a thin CLI over it.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod capture;
pub(crate) mod command;
pub(crate) mod compose;
pub(crate) mod config;
pub(crate) mod encode;
pub mod orientation;
pub(crate) mod pipeline;
pub(crate) mod render;
pub(crate) mod session;
pub(crate) mod sync;

pub use crate::foundation::core::{EulerAngles, FrameId, OperationMode, Size};
pub use crate::foundation::error::{PanoError, PanoResult};

pub use crate::capture::image::CameraImage;
pub use crate::capture::source::{
    InputControl, InputSource, ReplayPlaylist, TestPattern, load_image_file,
};
pub use crate::capture::thread::spawn_capture_thread;
pub use crate::command::apply::{Applied, apply};
pub use crate::command::channel::{ControlChannel, StdinChannel};
pub use crate::command::parse::{CalibrationCommand, Command, DEFAULT_CAPTURE_VIEW};
pub use crate::compose::compositor::{
    CameraUniform, ComposeInputs, DrawParams, Split, ViewOrientation, compose, euler_matrix,
    view_matrix, world_alignment,
};
pub use crate::config::calibration::{
    CalibrationOptions, CameraCalibration, DEFAULT_HORIZON_R, MAX_CAMERAS,
};
pub use crate::config::pipeline::PipelineConfig;
pub use crate::encode::ffmpeg::{
    FfmpegVideoSink, FfmpegVideoSinkFactory, ensure_parent_dir, is_ffmpeg_on_path,
};
pub use crate::encode::sink::{
    InMemoryStillSink, InMemoryVideoFactory, InMemoryVideoSink, RecordedVideo, StillSink,
    VideoLog, VideoSink, VideoSinkConfig, VideoSinkFactory,
};
pub use crate::encode::still::ImageStillSink;
pub use crate::pipeline::context::{DEFAULT_CALIBRATION_STEP, GlobalViewState, PipelineContext};
pub use crate::pipeline::driver::Pipeline;
pub use crate::render::backend::{FrameRGB, RenderBackend, RenderTarget, Viewport, blit_half};
pub use crate::render::cpu::{CpuBackend, CpuSettings};
pub use crate::render::layout::display_viewports;
pub use crate::session::manager::{FrameSessionManager, Outputs, TickInputs, TickReport};
pub use crate::session::request::{
    DEFAULT_FOV_DEG, DEFAULT_RENDER_SIZE, DOUBLE_SIZE_THRESHOLD, FrameRequest, Geometry,
    OutputMode, RecordingState, RequestOptions, ViewSource, parse_fov,
};
pub use crate::sync::barrier::{CaptureBarrier, CaptureHandle, SyncLease};
