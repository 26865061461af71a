use std::collections::VecDeque;
use std::time::Instant;

use glam::Quat;
use tracing::{info, warn};

use crate::capture::image::CameraImage;
use crate::compose::compositor::{ComposeInputs, DrawParams, Split, ViewOrientation, compose};
use crate::config::calibration::CalibrationOptions;
use crate::encode::sink::{StillSink, VideoSinkConfig, VideoSinkFactory};
use crate::foundation::core::{FrameId, OperationMode};
use crate::foundation::error::PanoResult;
use crate::pipeline::context::GlobalViewState;
use crate::render::backend::{FrameRGB, RenderBackend, blit_half};
use crate::render::layout::display_viewports;
use crate::session::request::{
    FrameRequest, Geometry, OutputMode, RecordingState, RequestOptions, ViewSource,
};

/// Shader used to put an off-screen target on the display.
const DISPLAY_PROGRAM: OperationMode = OperationMode::Board;

/// Still and video destinations plus their encoding settings.
pub struct Outputs {
    /// Still writer.
    pub still: Box<dyn StillSink>,
    /// Video sink factory.
    pub video: Box<dyn VideoSinkFactory>,
    /// JPEG quality for stills.
    pub jpeg_quality: u8,
    /// Recording frame rate.
    pub video_fps: u32,
    /// Bitrate of a single-width recording.
    pub video_bitrate_kbps: u32,
}

impl Outputs {
    /// Outputs with the default encoding settings.
    pub fn new(still: Box<dyn StillSink>, video: Box<dyn VideoSinkFactory>) -> Self {
        Self {
            still,
            video,
            jpeg_quality: 70,
            video_fps: 15,
            video_bitrate_kbps: 4000,
        }
    }
}

/// Read-only state a manager pass composites from.
#[derive(Clone, Copy)]
pub struct TickInputs<'a> {
    /// Camera images leased for this tick, one per slot.
    pub cameras: &'a [CameraImage],
    /// Global view flags.
    pub view: &'a GlobalViewState,
    /// Live calibration.
    pub calibration: &'a CalibrationOptions,
    /// Device orientation sampled this tick.
    pub device: Quat,
    /// Camera image width.
    pub camera_width: u32,
}

impl TickInputs<'_> {
    fn draw_params(&self, req: &FrameRequest, split: Split) -> DrawParams {
        compose(&ComposeInputs {
            calibration: self.calibration,
            mount: self.view.camera_mount,
            view: match req.view {
                ViewSource::DeviceTracked => ViewOrientation::Device(self.device),
                ViewSource::Explicit(angles) => ViewOrientation::Explicit(angles),
            },
            mode: req.mode,
            active_camera: self.view.active_camera,
            num_cameras: self.cameras.len(),
            split,
            fov_deg: req.fov_deg,
            width: req.geometry.width,
            height: req.geometry.height,
            camera_width: self.camera_width,
        })
    }
}

/// Counters for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The barrier timed out; no composite pass ran.
    pub skipped_sync: bool,
    /// Render passes performed.
    pub composite_passes: u32,
    /// Stills written.
    pub stills_saved: u32,
    /// Frames appended to recordings.
    pub frames_appended: u32,
    /// Display presents.
    pub presents: u32,
    /// Recordings opened.
    pub recordings_started: u32,
    /// Recordings closed.
    pub recordings_stopped: u32,
    /// Requests removed.
    pub retired: u32,
}

/// Ordered collection of frame requests, newest first.
#[derive(Debug, Default)]
pub struct FrameSessionManager {
    requests: VecDeque<FrameRequest>,
    next_id: u64,
}

impl FrameSessionManager {
    /// Empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request at the front of the collection.
    ///
    /// A failed target allocation leaves the request in place with its display disabled.
    pub fn create(
        &mut self,
        options: &RequestOptions,
        output: OutputMode,
        backend: &mut dyn RenderBackend,
    ) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;

        let geometry = Geometry::from_requested(options.width, options.height);
        let target = match backend.allocate_target(geometry.width, geometry.height) {
            Ok(target) => Some(target),
            Err(err) => {
                warn!(%id, error = %err, "render target allocation failed, display disabled");
                None
            }
        };

        self.requests.push_front(FrameRequest {
            id,
            mode: options.mode,
            output,
            output_path: options.output_path.clone(),
            geometry,
            view: options
                .view
                .map_or(ViewSource::DeviceTracked, ViewSource::Explicit),
            fov_deg: options.fov_deg,
            recording: RecordingState::default(),
            delete_after_processed: false,
            target,
        });
        id
    }

    /// Number of live requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// No live requests.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Requests, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &FrameRequest> {
        self.requests.iter()
    }

    /// Ids, newest first.
    pub fn ids(&self) -> Vec<FrameId> {
        self.requests.iter().map(|r| r.id).collect()
    }

    /// Request with `id`.
    pub fn find(&self, id: FrameId) -> Option<&FrameRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    /// Mutable request with `id`.
    pub fn find_mut(&mut self, id: FrameId) -> Option<&mut FrameRequest> {
        self.requests.iter_mut().find(|r| r.id == id)
    }

    /// The most recently created request.
    pub fn foreground(&self) -> Option<&FrameRequest> {
        self.requests.front()
    }

    /// One pass over every request, newest first: recording transitions, composite, output
    /// dispatch, lifecycle. The foreground request also goes to the display when preview is on.
    #[tracing::instrument(level = "trace", skip_all, fields(requests = self.requests.len()))]
    pub fn tick(
        &mut self,
        backend: &mut dyn RenderBackend,
        outputs: &mut Outputs,
        inputs: &TickInputs<'_>,
    ) -> TickReport {
        let mut report = TickReport::default();
        let preview = inputs.view.preview;
        let mut i = 0;

        while i < self.requests.len() {
            let foreground = i == 0;
            let req = &mut self.requests[i];
            let started = Instant::now();

            update_recording(req, outputs, &mut report);

            match req.output {
                OutputMode::Still | OutputMode::Video => {
                    dispatch_output(req, backend, outputs, inputs, started, &mut report);
                }
                OutputMode::None if foreground && preview => {
                    let params = inputs.draw_params(req, Split::None);
                    if let Some(target) = req.target.as_mut() {
                        match backend.render(target, &params, inputs.cameras) {
                            Ok(()) => report.composite_passes += 1,
                            Err(err) => warn!(id = %req.id, error = %err, "preview render failed"),
                        }
                    }
                }
                OutputMode::None => {}
            }

            if req.delete_after_processed {
                if let Some(done) = self.requests.remove(i) {
                    release(done, backend);
                    report.retired += 1;
                }
                continue;
            }

            if foreground
                && preview
                && let Some(target) = req.target.as_ref()
            {
                let viewports = display_viewports(
                    backend.screen_size(),
                    target.size(),
                    req.mode,
                    inputs.view.stereo,
                );
                match backend.present(target, &viewports, DISPLAY_PROGRAM) {
                    Ok(()) => report.presents += 1,
                    Err(err) => warn!(id = %req.id, error = %err, "present failed"),
                }
            }
            i += 1;
        }
        report
    }

    /// Best-effort finalization: open recordings are closed and every target released.
    pub fn shutdown(&mut self, backend: &mut dyn RenderBackend) {
        for mut req in self.requests.drain(..) {
            if req.recording.active {
                finish_recording(&mut req);
            }
            release(req, backend);
        }
    }
}

/// Open or close the request's recording when its output mode changed since the last tick.
fn update_recording(req: &mut FrameRequest, outputs: &mut Outputs, report: &mut TickReport) {
    if req.recording.active && req.output == OutputMode::None {
        finish_recording(req);
        req.delete_after_processed = true;
        report.recordings_stopped += 1;
    }
    if req.recording.active || req.output != OutputMode::Video {
        return;
    }

    let Some(path) = req.output_path.clone() else {
        warn!(id = %req.id, "recording has no output path, dropping request");
        retire(req);
        return;
    };
    if req.target.is_none() {
        warn!(id = %req.id, "recording has no render target, dropping request");
        retire(req);
        return;
    }

    let ratio = if req.geometry.double_size { 2 } else { 1 };
    let cfg = VideoSinkConfig {
        width: req.geometry.output_width(),
        height: req.geometry.height,
        fps: outputs.video_fps,
        bitrate_kbps: outputs.video_bitrate_kbps * ratio,
        path,
    };
    let mut sink = outputs.video.create(&cfg);
    match sink.begin(cfg) {
        Ok(()) => {
            info!(id = %req.id, path = ?req.output_path, "start_record");
            req.recording = RecordingState {
                active: true,
                frame_count: 0,
                elapsed: Default::default(),
                sink: Some(sink),
            };
            report.recordings_started += 1;
        }
        Err(err) => {
            warn!(id = %req.id, error = %err, "cannot open recording sink, dropping request");
            retire(req);
        }
    }
}

fn finish_recording(req: &mut FrameRequest) {
    let rec = &mut req.recording;
    if let Some(mut sink) = rec.sink.take()
        && let Err(err) = sink.end()
    {
        warn!(id = %req.id, error = %err, "closing recording failed");
    }
    let avg_ms = if rec.frame_count > 0 {
        rec.elapsed.as_secs_f64() * 1000.0 / rec.frame_count as f64
    } else {
        0.0
    };
    let fps = if avg_ms > 0.0 { 1000.0 / avg_ms } else { 0.0 };
    info!(id = %req.id, frames = rec.frame_count, fps = %format!("{fps:.3}"), "stop record");
    rec.active = false;
}

/// Composite the request and hand the pixels to its sink.
fn dispatch_output(
    req: &mut FrameRequest,
    backend: &mut dyn RenderBackend,
    outputs: &mut Outputs,
    inputs: &TickInputs<'_>,
    started: Instant,
    report: &mut TickReport,
) {
    if req.target.is_none() {
        warn!(id = %req.id, "no render target, dropping request");
        retire(req);
        return;
    }

    let interleaved = match composite(req, backend, inputs, report) {
        Ok(buf) => buf,
        Err(err) => {
            warn!(id = %req.id, error = %err, "composite failed, disabling output");
            match req.output {
                OutputMode::Still => retire(req),
                // The open sink is closed and the request retired on the next tick.
                OutputMode::Video => req.output = OutputMode::None,
                OutputMode::None => {}
            }
            return;
        }
    };
    let pixels = match (&interleaved, req.target.as_ref()) {
        (Some(buf), _) => buf,
        (None, Some(target)) => target.frame(),
        (None, None) => return,
    };

    match req.output {
        OutputMode::Still => {
            if let Some(path) = req.output_path.as_deref() {
                match outputs.still.save(pixels, path, outputs.jpeg_quality) {
                    Ok(()) => {
                        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                        info!(id = %req.id, path = %path.display(), elapsed_ms, "snap saved");
                        report.stills_saved += 1;
                    }
                    Err(err) => warn!(id = %req.id, error = %err, "saving snapshot failed"),
                }
            } else {
                warn!(id = %req.id, "snapshot has no output path");
            }
            req.output = OutputMode::None;
            req.delete_after_processed = true;
        }
        OutputMode::Video => {
            let rec = &mut req.recording;
            let Some(sink) = rec.sink.as_mut() else {
                return;
            };
            match sink.push_frame(pixels) {
                Ok(()) => {
                    rec.frame_count += 1;
                    rec.elapsed += started.elapsed();
                    report.frames_appended += 1;
                }
                Err(err) => {
                    warn!(id = %req.id, error = %err, "recording append failed, stopping");
                    req.output = OutputMode::None;
                }
            }
        }
        OutputMode::None => {}
    }
}

/// Run the composite pass(es). Double-size requests return the interleaved frame; otherwise the
/// pixels stay in the request's target.
fn composite(
    req: &mut FrameRequest,
    backend: &mut dyn RenderBackend,
    inputs: &TickInputs<'_>,
    report: &mut TickReport,
) -> PanoResult<Option<FrameRGB>> {
    if !req.geometry.double_size {
        let params = inputs.draw_params(req, Split::None);
        if let Some(target) = req.target.as_mut() {
            backend.render(target, &params, inputs.cameras)?;
            report.composite_passes += 1;
        }
        return Ok(None);
    }

    let mut out = FrameRGB::try_new(req.geometry.output_width(), req.geometry.height)?;
    for split in [Split::Left, Split::Right] {
        let params = inputs.draw_params(req, split);
        if let Some(target) = req.target.as_mut() {
            backend.render(target, &params, inputs.cameras)?;
            report.composite_passes += 1;
            blit_half(&mut out, target.frame(), split == Split::Right)?;
        }
    }
    Ok(Some(out))
}

fn retire(req: &mut FrameRequest) {
    req.output = OutputMode::None;
    req.delete_after_processed = true;
}

fn release(req: FrameRequest, backend: &mut dyn RenderBackend) {
    if let Some(target) = req.target {
        backend.release_target(target);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/manager.rs"]
mod tests;
