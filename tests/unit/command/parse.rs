use super::*;
use crate::foundation::core::OperationMode;
use std::path::Path;

fn ok(line: &str) -> Command {
    Command::parse(line).unwrap().unwrap()
}

fn err(line: &str) -> PanoError {
    Command::parse(line).unwrap_err()
}

#[test]
fn blank_lines_are_not_commands() {
    assert_eq!(Command::parse("").unwrap(), None);
    assert_eq!(Command::parse("   \n").unwrap(), None);
}

#[test]
fn simple_commands() {
    assert_eq!(ok("exit"), Command::Exit);
    assert_eq!(ok("1"), Command::SelectCamera(1));
    assert_eq!(ok("  0 \n"), Command::SelectCamera(0));
    assert_eq!(ok("stop_record 7"), Command::StopRecord(FrameId(7)));
    assert_eq!(
        ok("start_record_raw /tmp/raw"),
        Command::StartRecordRaw(PathBuf::from("/tmp/raw"))
    );
    assert_eq!(ok("stop_record_raw"), Command::StopRecordRaw);
    assert_eq!(ok("load_file frames"), Command::LoadFile(PathBuf::from("frames")));
    assert_eq!(ok("cam_mode"), Command::CamMode);
    assert_eq!(ok("get_loading_pos"), Command::GetLoadingPos);
    assert_eq!(ok("set_stereo 1"), Command::SetStereo(true));
    assert_eq!(ok("set_preview 0"), Command::SetPreview(false));
    assert_eq!(ok("set_frame_sync 1"), Command::SetFrameSync(true));
}

#[test]
fn orientation_and_fov_commands_take_degrees() {
    assert_eq!(
        ok("set_camera_orientation 10,20,30"),
        Command::SetCameraOrientation(EulerAngles::from_degrees(10.0, 20.0, 30.0))
    );
    assert_eq!(
        ok("set_view_orientation 3=0,90,0"),
        Command::SetViewOrientation(FrameId(3), EulerAngles::from_degrees(0.0, 90.0, 0.0))
    );
    assert_eq!(ok("set_fov 2=75"), Command::SetFov(FrameId(2), 75.0));
}

#[test]
fn snap_defaults_to_a_level_explicit_view() {
    let Command::Snap(o) = ok("snap -W 1024 -H 512 -E -o out.jpg") else {
        panic!("expected snap");
    };
    assert_eq!((o.width, o.height), (1024, 512));
    assert_eq!(o.mode, OperationMode::Equirectangular);
    assert_eq!(o.view, Some(DEFAULT_CAPTURE_VIEW));
    assert_eq!(o.output_path.as_deref(), Some(Path::new("out.jpg")));

    let Command::StartRecord(o) = ok("start_record -v 0,45,0 -o rec.mp4") else {
        panic!("expected start_record");
    };
    assert_eq!(o.view, Some(EulerAngles::from_degrees(0.0, 45.0, 0.0)));
}

#[test]
fn calibration_vocabulary() {
    use CalibrationCommand::*;
    for (line, want) in [
        ("step 0.5", Step(0.5)),
        ("step -0.25", Step(-0.25)),
        ("step 0", Step(0.0)),
        ("u", Up),
        ("t", Up),
        ("d", Down),
        ("b", Down),
        ("l", Left),
        ("r", Right),
        ("s", Sharpen),
        ("w", Soften),
        ("save", Save),
    ] {
        assert_eq!(ok(line), Command::Calibration(want), "{line}");
    }
}

#[test]
fn malformed_lines_are_configuration_errors() {
    for line in [
        "bogus",
        "snap",
        "snap -W 100",
        "start_record -o",
        "stop_record",
        "stop_record x",
        "set_stereo yes",
        "set_fov 1",
        "set_fov 1=0",
        "set_view_orientation 1=1,2",
        "set_camera_orientation",
        "step nan",
        "step inf",
        "step x",
        "exit now",
        "1 2",
        "99999999999999999999999",
    ] {
        assert!(matches!(err(line), PanoError::Configuration(_)), "{line}");
    }
}

#[test]
fn unknown_command_names_the_line() {
    let msg = err("frobnicate 1 2").to_string();
    assert!(msg.contains("unknown command : frobnicate 1 2"), "{msg}");
}
