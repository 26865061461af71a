use std::path::PathBuf;

use crate::foundation::core::{EulerAngles, FrameId};
use crate::foundation::error::{PanoError, PanoResult};
use crate::session::request::{RequestOptions, parse_fov};

/// View of `snap` and `start_record` requests when `-v` is not given: level with the horizon.
pub const DEFAULT_CAPTURE_VIEW: EulerAngles = EulerAngles::new(std::f32::consts::FRAC_PI_2, 0.0, 0.0);

/// One decoded control line.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// `exit`
    Exit,
    /// `<n>`: select the active camera.
    SelectCamera(usize),
    /// `snap [options] -o <path>`
    Snap(RequestOptions),
    /// `start_record [options] -o <path>`
    StartRecord(RequestOptions),
    /// `stop_record <id>`
    StopRecord(FrameId),
    /// `start_record_raw <path>`
    StartRecordRaw(PathBuf),
    /// `stop_record_raw`
    StopRecordRaw,
    /// `load_file <dir>`
    LoadFile(PathBuf),
    /// `cam_mode`: back to live cameras.
    CamMode,
    /// `get_loading_pos`
    GetLoadingPos,
    /// `set_camera_orientation p,y,r`
    SetCameraOrientation(EulerAngles),
    /// `set_view_orientation <id>=p,y,r`
    SetViewOrientation(FrameId, EulerAngles),
    /// `set_fov <id>=<deg>`
    SetFov(FrameId, f32),
    /// `set_stereo 0|1`
    SetStereo(bool),
    /// `set_preview 0|1`
    SetPreview(bool),
    /// `set_frame_sync 0|1`
    SetFrameSync(bool),
    /// Only valid while the foreground request is in Calibration mode.
    Calibration(CalibrationCommand),
}

/// Calibration sub-vocabulary. Nudges act on the active camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationCommand {
    /// `step <f>`: nudge size for the commands below.
    Step(f32),
    /// `u`/`t`: offset_y minus one step.
    Up,
    /// `d`/`b`: offset_y plus one step.
    Down,
    /// `l`: offset_x plus one step.
    Left,
    /// `r`: offset_x minus one step.
    Right,
    /// `s`: sharpness gain plus one step.
    Sharpen,
    /// `w`: sharpness gain minus one step.
    Soften,
    /// `save`: write the calibration document.
    Save,
}

impl Command {
    /// Decode one line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> PanoResult<Option<Self>> {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = tokens.collect();

        let cmd = match name {
            "exit" => no_args(name, &args, Self::Exit)?,
            "snap" => Self::Snap(capture_options(name, &args)?),
            "start_record" => Self::StartRecord(capture_options(name, &args)?),
            "stop_record" => Self::StopRecord(parse_id(one_arg(name, &args)?)?),
            "start_record_raw" => Self::StartRecordRaw(PathBuf::from(one_arg(name, &args)?)),
            "stop_record_raw" => no_args(name, &args, Self::StopRecordRaw)?,
            "load_file" => Self::LoadFile(PathBuf::from(one_arg(name, &args)?)),
            "cam_mode" => no_args(name, &args, Self::CamMode)?,
            "get_loading_pos" => no_args(name, &args, Self::GetLoadingPos)?,
            "set_camera_orientation" => {
                Self::SetCameraOrientation(EulerAngles::parse_degrees(one_arg(name, &args)?)?)
            }
            "set_view_orientation" => {
                let (id, angles) = split_assignment(one_arg(name, &args)?)?;
                Self::SetViewOrientation(parse_id(id)?, EulerAngles::parse_degrees(angles)?)
            }
            "set_fov" => {
                let (id, fov) = split_assignment(one_arg(name, &args)?)?;
                Self::SetFov(parse_id(id)?, parse_fov(fov)?)
            }
            "set_stereo" => Self::SetStereo(parse_flag(one_arg(name, &args)?)?),
            "set_preview" => Self::SetPreview(parse_flag(one_arg(name, &args)?)?),
            "set_frame_sync" => Self::SetFrameSync(parse_flag(one_arg(name, &args)?)?),
            "step" => {
                let value = one_arg(name, &args)?;
                match value.parse::<f32>() {
                    Ok(step) if step.is_finite() => {
                        Self::Calibration(CalibrationCommand::Step(step))
                    }
                    _ => {
                        return Err(PanoError::configuration(format!(
                            "step must be a finite number, got '{value}'"
                        )));
                    }
                }
            }
            "u" | "t" => no_args(name, &args, Self::Calibration(CalibrationCommand::Up))?,
            "d" | "b" => no_args(name, &args, Self::Calibration(CalibrationCommand::Down))?,
            "l" => no_args(name, &args, Self::Calibration(CalibrationCommand::Left))?,
            "r" => no_args(name, &args, Self::Calibration(CalibrationCommand::Right))?,
            "s" => no_args(name, &args, Self::Calibration(CalibrationCommand::Sharpen))?,
            "w" => no_args(name, &args, Self::Calibration(CalibrationCommand::Soften))?,
            "save" => no_args(name, &args, Self::Calibration(CalibrationCommand::Save))?,
            n if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => {
                let index = n
                    .parse::<usize>()
                    .map_err(|e| PanoError::configuration(format!("bad camera index '{n}': {e}")))?;
                no_args(name, &args, Self::SelectCamera(index))?
            }
            _ => return Err(unknown(line)),
        };
        Ok(Some(cmd))
    }
}

pub(crate) fn unknown(line: &str) -> PanoError {
    PanoError::configuration(format!("unknown command : {}", line.trim()))
}

fn no_args(name: &str, args: &[&str], cmd: Command) -> PanoResult<Command> {
    if args.is_empty() {
        Ok(cmd)
    } else {
        Err(PanoError::configuration(format!(
            "'{name}' takes no arguments"
        )))
    }
}

fn one_arg<'a>(name: &str, args: &[&'a str]) -> PanoResult<&'a str> {
    match args {
        [arg] => Ok(arg),
        _ => Err(PanoError::configuration(format!(
            "'{name}' takes exactly one argument"
        ))),
    }
}

fn capture_options(name: &str, args: &[&str]) -> PanoResult<RequestOptions> {
    let mut options = RequestOptions::parse(args.iter().copied())?;
    if options.output_path.is_none() {
        return Err(PanoError::configuration(format!(
            "'{name}' requires -o <path>"
        )));
    }
    options.view.get_or_insert(DEFAULT_CAPTURE_VIEW);
    Ok(options)
}

fn split_assignment(arg: &str) -> PanoResult<(&str, &str)> {
    arg.split_once('=')
        .ok_or_else(|| PanoError::configuration(format!("expected <id>=<value>, got '{arg}'")))
}

fn parse_id(s: &str) -> PanoResult<FrameId> {
    s.parse::<u64>()
        .map(FrameId)
        .map_err(|e| PanoError::configuration(format!("bad request id '{s}': {e}")))
}

fn parse_flag(s: &str) -> PanoResult<bool> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(PanoError::configuration(format!(
            "expected 0 or 1, got '{s}'"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/command/parse.rs"]
mod tests;
