use super::*;
use crate::capture::source::{InputControl, InputSource};
use crate::config::calibration::CalibrationOptions;
use crate::foundation::core::{EulerAngles, Size};
use crate::render::cpu::CpuBackend;
use crate::session::request::{RequestOptions, ViewSource};
use std::path::PathBuf;
use std::sync::Arc;

struct Fixture {
    ctx: PipelineContext,
    backend: CpuBackend,
    _dir: tempfile::TempDir,
}

impl Fixture {
    fn new(num_cameras: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PipelineContext::new(
            num_cameras,
            CalibrationOptions::default(),
            dir.path().join("config.json"),
            Arc::new(InputControl::new()),
        );
        Self {
            ctx,
            backend: CpuBackend::new(Size {
                width: 32,
                height: 32,
            })
            .unwrap(),
            _dir: dir,
        }
    }

    fn run(&mut self, line: &str) -> PanoResult<Applied> {
        let cmd = Command::parse(line)?.ok_or_else(|| PanoError::configuration("blank"))?;
        apply(cmd, &mut self.ctx, &mut self.backend)
    }

    fn calibration_foreground(&mut self) {
        let options = RequestOptions::parse(["-C", "-W", "4", "-H", "4"]).unwrap();
        self.ctx
            .manager
            .create(&options, OutputMode::None, &mut self.backend);
    }
}

#[test]
fn camera_selection_is_range_checked() {
    let mut f = Fixture::new(2);
    f.run("1").unwrap();
    assert_eq!(f.ctx.view.active_camera, 1);
    assert!(f.run("2").is_err());
    assert_eq!(f.ctx.view.active_camera, 1);
}

#[test]
fn start_and_stop_record_by_id() {
    let mut f = Fixture::new(1);
    let applied = f.run("start_record -W 8 -H 8 -o rec.mp4").unwrap();
    let id = applied.created.unwrap();
    assert_eq!(applied.reply.as_deref(), Some(format!("start_record id={id}").as_str()));

    let req = f.ctx.manager.find(id).unwrap();
    assert_eq!(req.output(), OutputMode::Video);
    assert!(matches!(req.view(), ViewSource::Explicit(_)));

    assert!(f.run("stop_record 99").is_err());
    assert_eq!(f.ctx.manager.find(id).unwrap().output(), OutputMode::Video);

    f.run(&format!("stop_record {id}")).unwrap();
    assert_eq!(f.ctx.manager.find(id).unwrap().output(), OutputMode::None);
}

#[test]
fn snap_creates_a_still_request_at_the_front() {
    let mut f = Fixture::new(1);
    f.run("start_record -W 8 -H 8 -o rec.mp4").unwrap();
    let id = f.run("snap -W 8 -H 8 -o snap.jpg").unwrap().created.unwrap();
    assert_eq!(f.ctx.manager.foreground().map(FrameRequest::id), Some(id));
    assert_eq!(
        f.ctx.manager.foreground().map(FrameRequest::output),
        Some(OutputMode::Still)
    );
}

#[test]
fn per_request_view_and_fov() {
    let mut f = Fixture::new(1);
    let id = f.run("snap -o a.jpg").unwrap().created.unwrap();

    f.run(&format!("set_view_orientation {id}=10,20,30")).unwrap();
    f.run(&format!("set_fov {id}=60")).unwrap();

    let req = f.ctx.manager.find(id).unwrap();
    assert_eq!(
        req.view(),
        ViewSource::Explicit(EulerAngles::from_degrees(10.0, 20.0, 30.0))
    );
    assert_eq!(req.fov_deg(), 60.0);
    assert!(f.run("set_fov 42=60").is_err());
}

#[test]
fn global_flags_and_mount_orientation() {
    let mut f = Fixture::new(1);
    assert_eq!(
        f.run("set_stereo 1").unwrap().reply.as_deref(),
        Some("set_stereo 1")
    );
    f.run("set_preview 1").unwrap();
    f.run("set_frame_sync 1").unwrap();
    f.run("set_camera_orientation 0,90,0").unwrap();

    let v = &f.ctx.view;
    assert!(v.stereo && v.preview && v.frame_sync);
    assert_eq!(v.camera_mount, EulerAngles::from_degrees(0.0, 90.0, 0.0));
    assert!(f.run("exit").unwrap().exit);
}

#[test]
fn calibration_tokens_are_unknown_outside_calibration_mode() {
    let mut f = Fixture::new(1);
    f.run("snap -o a.jpg").unwrap();
    let before = f.ctx.calibration.clone();
    let err = f.run("u").unwrap_err();
    assert!(err.to_string().contains("unknown command"));
    assert!(f.run("save").is_err());
    assert_eq!(f.ctx.calibration, before);
    assert!(!f.ctx.calibration_path.exists());
}

#[test]
fn calibration_nudges_act_on_the_active_camera() {
    let mut f = Fixture::new(2);
    f.calibration_foreground();
    f.run("1").unwrap();

    f.run("u").unwrap();
    assert!((f.ctx.calibration.cameras[1].offset_y + 0.01).abs() < 1e-6);
    f.run("b").unwrap();
    assert!(f.ctx.calibration.cameras[1].offset_y.abs() < 1e-6);

    f.run("step 0.5").unwrap();
    f.run("l").unwrap();
    f.run("l").unwrap();
    f.run("r").unwrap();
    assert!((f.ctx.calibration.cameras[1].offset_x - 0.5).abs() < 1e-6);
    f.run("s").unwrap();
    f.run("s").unwrap();
    f.run("w").unwrap();
    assert!((f.ctx.calibration.sharpness_gain - 0.5).abs() < 1e-6);
    assert_eq!(f.ctx.calibration.cameras[0], Default::default());
}

#[test]
fn negative_step_reverses_the_nudge_direction() {
    let mut f = Fixture::new(1);
    f.calibration_foreground();
    f.run("step -0.1").unwrap();
    assert!((f.ctx.view.calibration_step + 0.1).abs() < 1e-6);

    f.run("u").unwrap();
    assert!((f.ctx.calibration.cameras[0].offset_y - 0.1).abs() < 1e-6);
    f.run("s").unwrap();
    assert!((f.ctx.calibration.sharpness_gain + 0.1).abs() < 1e-6);
}

#[test]
fn calibration_is_persisted_only_on_save() {
    let mut f = Fixture::new(1);
    f.calibration_foreground();
    f.run("d").unwrap();
    assert!(!f.ctx.calibration_path.exists());

    assert_eq!(f.run("save").unwrap().reply.as_deref(), Some("save"));
    let loaded = CalibrationOptions::load(&f.ctx.calibration_path).unwrap();
    assert!((loaded.cameras[0].offset_y - 0.01).abs() < 1e-6);
}

#[test]
fn input_source_commands() {
    let mut f = Fixture::new(1);
    assert_eq!(f.run("get_loading_pos").unwrap().reply.as_deref(), Some("-1"));

    assert!(f.run("load_file /definitely/not/here").is_err());
    assert!(matches!(f.ctx.input.source(), InputSource::Camera));

    let dir = tempfile::tempdir().unwrap();
    image::save_buffer_with_format(
        dir.path().join("a.png"),
        &[0u8; 12],
        2,
        2,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .unwrap();
    f.run(&format!("load_file {}", dir.path().display())).unwrap();
    assert!(matches!(f.ctx.input.source(), InputSource::File(_)));
    assert_eq!(f.run("get_loading_pos").unwrap().reply.as_deref(), Some("0"));

    f.run("cam_mode").unwrap();
    assert!(matches!(f.ctx.input.source(), InputSource::Camera));
}

#[test]
fn raw_recording_cannot_be_started_twice() {
    let mut f = Fixture::new(1);
    f.run("start_record_raw /tmp/raw-a").unwrap();
    assert!(f.run("start_record_raw /tmp/raw-b").is_err());
    assert_eq!(f.ctx.input.raw_output(), Some(PathBuf::from("/tmp/raw-a")));
    f.run("stop_record_raw").unwrap();
    assert_eq!(f.ctx.input.raw_output(), None);
}
