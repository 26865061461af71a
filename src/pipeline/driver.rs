use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::capture::image::CameraImage;
use crate::capture::source::InputControl;
use crate::capture::thread::spawn_capture_thread;
use crate::command::apply::{Applied, apply};
use crate::command::channel::ControlChannel;
use crate::command::parse::Command;
use crate::config::calibration::CalibrationOptions;
use crate::config::pipeline::PipelineConfig;
use crate::foundation::core::FrameId;
use crate::foundation::error::PanoResult;
use crate::orientation::OrientationSource;
use crate::pipeline::context::PipelineContext;
use crate::render::backend::RenderBackend;
use crate::session::manager::{Outputs, TickInputs, TickReport};
use crate::session::request::{OutputMode, RequestOptions};
use crate::sync::barrier::CaptureBarrier;

/// The single-threaded render/control loop.
///
/// Each tick polls at most one control line, waits on the capture barrier when frame sync is
/// on, runs one manager pass, then re-arms the capture threads.
pub struct Pipeline {
    config: PipelineConfig,
    ctx: PipelineContext,
    barrier: CaptureBarrier,
    backend: Box<dyn RenderBackend>,
    outputs: Outputs,
    orientation: Box<dyn OrientationSource>,
    control: Box<dyn ControlChannel>,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    exit_requested: bool,
}

impl Pipeline {
    /// Validate `config`, load the calibration, and build the barrier.
    ///
    /// No threads start until [`Pipeline::spawn_capture_threads`].
    pub fn new(
        config: PipelineConfig,
        backend: Box<dyn RenderBackend>,
        mut outputs: Outputs,
        orientation: Box<dyn OrientationSource>,
        control: Box<dyn ControlChannel>,
    ) -> PanoResult<Self> {
        config.validate()?;

        let calibration = CalibrationOptions::load_or_default(&config.calibration_path);
        let mut ctx = PipelineContext::new(
            config.num_cameras,
            calibration,
            config.calibration_path.clone(),
            Arc::new(InputControl::new()),
        );
        ctx.view.frame_sync = config.frame_sync;
        ctx.view.preview = config.preview;
        ctx.view.stereo = config.stereo;

        outputs.jpeg_quality = config.jpeg_quality;
        outputs.video_fps = config.video_fps;
        outputs.video_bitrate_kbps = config.video_bitrate_kbps;

        let size = config.camera_size;
        Ok(Self {
            barrier: CaptureBarrier::new(
                config.num_cameras,
                CameraImage::blank(size.width, size.height),
            ),
            config,
            ctx,
            backend,
            outputs,
            orientation,
            control,
            stop: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
            exit_requested: false,
        })
    }

    /// Settings this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Loop state.
    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Mutable loop state.
    pub fn context_mut(&mut self) -> &mut PipelineContext {
        &mut self.ctx
    }

    /// Barrier between capture threads and the loop.
    pub fn barrier(&self) -> &CaptureBarrier {
        &self.barrier
    }

    /// Input selection shared with capture threads.
    pub fn input(&self) -> Arc<InputControl> {
        Arc::clone(&self.ctx.input)
    }

    /// Raised on shutdown; background threads poll it.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Start one capture thread per camera slot.
    pub fn spawn_capture_threads(&mut self) -> PanoResult<()> {
        for slot in 0..self.barrier.len() {
            let Some(handle) = self.barrier.handle(slot) else {
                continue;
            };
            let join = spawn_capture_thread(
                handle,
                Arc::clone(&self.ctx.input),
                self.config.camera_size,
                Arc::clone(&self.stop),
            )?;
            self.workers.push(join);
        }
        Ok(())
    }

    /// Join `handle` on shutdown. It must exit once [`Pipeline::stop_flag`] is raised.
    pub fn attach_worker(&mut self, handle: JoinHandle<()>) {
        self.workers.push(handle);
    }

    /// Create a request outside the control channel, e.g. at startup.
    pub fn create_request(&mut self, options: &RequestOptions, output: OutputMode) -> FrameId {
        self.ctx
            .manager
            .create(options, output, self.backend.as_mut())
    }

    /// Decode and apply one control line. Blank lines yield `Ok(None)`.
    pub fn apply_line(&mut self, line: &str) -> PanoResult<Option<Applied>> {
        let Some(cmd) = Command::parse(line)? else {
            return Ok(None);
        };
        apply(cmd, &mut self.ctx, self.backend.as_mut()).map(Some)
    }

    /// True once `exit` was received.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// One loop iteration: poll a command, wait for cameras, run the manager pass.
    pub fn tick(&mut self) -> TickReport {
        if let Some(line) = self.control.poll_line() {
            self.handle_line(&line);
        }

        let lease = if self.ctx.view.frame_sync {
            match self.barrier.wait_arrived(self.config.sync_timeout) {
                Some(lease) => lease,
                None => {
                    debug!("camera frames not ready, skipping composite");
                    return TickReport {
                        skipped_sync: true,
                        ..TickReport::default()
                    };
                }
            }
        } else {
            self.barrier.lease_unsynced()
        };

        let cameras = lease.images();
        let inputs = TickInputs {
            cameras: &cameras,
            view: &self.ctx.view,
            calibration: &self.ctx.calibration,
            device: self.orientation.sample(),
            camera_width: self.config.camera_size.width,
        };
        let report = self
            .ctx
            .manager
            .tick(self.backend.as_mut(), &mut self.outputs, &inputs);
        drop(lease);
        report
    }

    /// Tick until `exit` or, when configured, until a file replay is used up. Then shut down.
    pub fn run(&mut self) -> PanoResult<()> {
        info!(
            cameras = self.config.num_cameras,
            frame_sync = self.ctx.view.frame_sync,
            "pipeline running"
        );
        loop {
            let replay_done = self.config.exit_on_replay_end && self.ctx.input.replay_exhausted();
            let started = Instant::now();
            self.tick();
            if self.exit_requested || replay_done {
                break;
            }
            if let Some(rest) = self.config.min_tick_interval.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        self.shutdown();
        Ok(())
    }

    /// Finalize open recordings, stop background threads, and join them.
    pub fn shutdown(&mut self) {
        self.ctx.manager.shutdown(self.backend.as_mut());
        self.stop.store(true, Ordering::Relaxed);
        let joined = self.workers.len();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("background thread panicked");
            }
        }
        if joined > 0 {
            info!(threads = joined, "pipeline stopped");
        }
    }

    fn handle_line(&mut self, line: &str) {
        match self.apply_line(line) {
            Ok(Some(applied)) => {
                if let Some(reply) = applied.reply.as_deref() {
                    self.control.reply(reply);
                }
                self.exit_requested |= applied.exit;
            }
            Ok(None) => {}
            Err(err) => warn!(line = line.trim(), error = %err, "command ignored"),
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/driver.rs"]
mod tests;
