use tracing::info;

use crate::capture::source::ReplayPlaylist;
use crate::command::parse::{CalibrationCommand, Command, unknown};
use crate::foundation::core::{FrameId, OperationMode};
use crate::foundation::error::{PanoError, PanoResult};
use crate::pipeline::context::PipelineContext;
use crate::render::backend::RenderBackend;
use crate::session::request::{FrameRequest, OutputMode};

/// Result of applying one command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Applied {
    /// Line to send back on the control channel.
    pub reply: Option<String>,
    /// The request created by `snap` or `start_record`.
    pub created: Option<FrameId>,
    /// Stop the loop after this tick.
    pub exit: bool,
}

impl Applied {
    fn reply(line: impl Into<String>) -> Self {
        Self {
            reply: Some(line.into()),
            ..Self::default()
        }
    }
}

/// Apply `cmd` to the loop context.
///
/// Every check happens before the first mutation, so an `Err` leaves the context untouched.
pub fn apply(
    cmd: Command,
    ctx: &mut PipelineContext,
    backend: &mut dyn RenderBackend,
) -> PanoResult<Applied> {
    let applied = match cmd {
        Command::Exit => Applied {
            reply: Some("exit".to_owned()),
            exit: true,
            ..Applied::default()
        },
        Command::SelectCamera(index) => {
            if index >= ctx.num_cameras {
                return Err(PanoError::configuration(format!(
                    "camera {index} out of range (have {})",
                    ctx.num_cameras
                )));
            }
            ctx.view.active_camera = index;
            Applied::default()
        }
        Command::Snap(options) => {
            let id = ctx.manager.create(&options, OutputMode::Still, backend);
            Applied {
                created: Some(id),
                ..Applied::default()
            }
        }
        Command::StartRecord(options) => {
            let id = ctx.manager.create(&options, OutputMode::Video, backend);
            Applied {
                reply: Some(format!("start_record id={id}")),
                created: Some(id),
                exit: false,
            }
        }
        Command::StopRecord(id) => {
            request_mut(ctx, id)?.stop_output();
            Applied::reply("stop_record")
        }
        Command::StartRecordRaw(path) => {
            let shown = path.display().to_string();
            if !ctx.input.start_raw_output(path) {
                return Err(PanoError::configuration("raw recording already active"));
            }
            Applied::reply(format!("start_record_raw saved to {shown}"))
        }
        Command::StopRecordRaw => {
            ctx.input.stop_raw_output();
            Applied::reply("stop_record_raw")
        }
        Command::LoadFile(dir) => {
            let playlist = ReplayPlaylist::from_dir(&dir, ctx.num_cameras)?;
            info!(dir = %dir.display(), frames = playlist.total(), "replay loaded");
            ctx.input.use_playlist(playlist);
            Applied::reply(format!("load_file from {}", dir.display()))
        }
        Command::CamMode => {
            ctx.input.use_camera();
            Applied::default()
        }
        Command::GetLoadingPos => Applied::reply(ctx.input.loading_pos().to_string()),
        Command::SetCameraOrientation(angles) => {
            ctx.view.camera_mount = angles;
            Applied::reply("set_camera_orientation")
        }
        Command::SetViewOrientation(id, angles) => {
            request_mut(ctx, id)?.set_view(angles);
            Applied::reply("set_view_orientation")
        }
        Command::SetFov(id, fov) => {
            request_mut(ctx, id)?.set_fov(fov);
            Applied::reply("set_fov")
        }
        Command::SetStereo(on) => {
            ctx.view.stereo = on;
            Applied::reply(format!("set_stereo {}", u8::from(on)))
        }
        Command::SetPreview(on) => {
            ctx.view.preview = on;
            Applied::reply(format!("set_preview {}", u8::from(on)))
        }
        Command::SetFrameSync(on) => {
            ctx.view.frame_sync = on;
            Applied::reply(format!("set_frame_sync {}", u8::from(on)))
        }
        Command::Calibration(cal) => apply_calibration(cal, ctx)?,
    };
    Ok(applied)
}

fn request_mut(ctx: &mut PipelineContext, id: FrameId) -> PanoResult<&mut FrameRequest> {
    ctx.manager
        .find_mut(id)
        .ok_or_else(|| PanoError::configuration(format!("no request with id {id}")))
}

fn apply_calibration(cmd: CalibrationCommand, ctx: &mut PipelineContext) -> PanoResult<Applied> {
    let in_calibration = ctx
        .manager
        .foreground()
        .is_some_and(|r| r.mode() == OperationMode::Calibration);
    if !in_calibration {
        return Err(unknown(calibration_token(cmd)));
    }

    let step = ctx.view.calibration_step;
    let active = ctx.view.active_camera;
    match cmd {
        CalibrationCommand::Step(step) => {
            ctx.view.calibration_step = step;
            return Ok(Applied::default());
        }
        CalibrationCommand::Sharpen => ctx.calibration.sharpness_gain += step,
        CalibrationCommand::Soften => ctx.calibration.sharpness_gain -= step,
        CalibrationCommand::Save => {
            ctx.calibration.save(&ctx.calibration_path)?;
            info!(path = %ctx.calibration_path.display(), "calibration saved");
            return Ok(Applied::reply("save"));
        }
        CalibrationCommand::Up
        | CalibrationCommand::Down
        | CalibrationCommand::Left
        | CalibrationCommand::Right => {
            let cam = ctx.calibration.camera_mut(active).ok_or_else(|| {
                PanoError::configuration(format!("camera {active} has no calibration slot"))
            })?;
            match cmd {
                CalibrationCommand::Up => cam.offset_y -= step,
                CalibrationCommand::Down => cam.offset_y += step,
                CalibrationCommand::Left => cam.offset_x += step,
                _ => cam.offset_x -= step,
            }
        }
    }
    Ok(Applied::default())
}

fn calibration_token(cmd: CalibrationCommand) -> &'static str {
    match cmd {
        CalibrationCommand::Step(_) => "step",
        CalibrationCommand::Up => "u",
        CalibrationCommand::Down => "d",
        CalibrationCommand::Left => "l",
        CalibrationCommand::Right => "r",
        CalibrationCommand::Sharpen => "s",
        CalibrationCommand::Soften => "w",
        CalibrationCommand::Save => "save",
    }
}

#[cfg(test)]
#[path = "../../tests/unit/command/apply.rs"]
mod tests;
