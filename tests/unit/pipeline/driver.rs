use super::*;
use crate::encode::sink::{InMemoryStillSink, InMemoryVideoFactory};
use crate::foundation::core::Size;
use crate::orientation::FixedOrientation;
use crate::render::cpu::CpuBackend;
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

struct Rig {
    pipeline: Pipeline,
    tx: Sender<String>,
    stills: InMemoryStillSink,
    _dir: tempfile::TempDir,
}

fn rig(num_cameras: usize, frame_sync: bool) -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        num_cameras,
        camera_size: Size {
            width: 8,
            height: 8,
        },
        screen_size: Size {
            width: 32,
            height: 16,
        },
        frame_sync,
        sync_timeout: Duration::from_millis(5),
        calibration_path: dir.path().join("config.json"),
        ..PipelineConfig::default()
    };
    let stills = InMemoryStillSink::new();
    let outputs = Outputs::new(
        Box::new(stills.clone()),
        Box::new(InMemoryVideoFactory::new()),
    );
    let (tx, rx) = mpsc::channel::<String>();
    let backend = CpuBackend::new(config.screen_size).unwrap();
    let pipeline = Pipeline::new(
        config,
        Box::new(backend),
        outputs,
        Box::new(FixedOrientation::default()),
        Box::new(rx),
    )
    .unwrap();
    Rig {
        pipeline,
        tx,
        stills,
        _dir: dir,
    }
}

#[test]
fn invalid_config_is_rejected() {
    let config = PipelineConfig {
        num_cameras: 0,
        ..PipelineConfig::default()
    };
    let (_tx, rx) = mpsc::channel::<String>();
    let backend = CpuBackend::new(config.screen_size).unwrap();
    let result = Pipeline::new(
        config,
        Box::new(backend),
        Outputs::new(
            Box::new(InMemoryStillSink::new()),
            Box::new(InMemoryVideoFactory::new()),
        ),
        Box::new(FixedOrientation::default()),
        Box::new(rx),
    );
    assert!(result.is_err());
}

#[test]
fn unsynced_tick_composites_and_saves_snap() {
    let mut r = rig(1, false);
    r.tx.send("snap -W 4 -H 4 -o shot.jpg".to_owned()).unwrap();

    let report = r.pipeline.tick();

    assert!(!report.skipped_sync);
    assert_eq!(report.stills_saved, 1);
    assert_eq!(r.stills.saved().len(), 1);
    assert!(r.pipeline.context().manager.is_empty());
}

#[test]
fn synced_tick_skips_until_every_camera_deposits() {
    let mut r = rig(2, true);
    let first = r.pipeline.barrier().handle(0).unwrap();
    let second = r.pipeline.barrier().handle(1).unwrap();
    r.pipeline.context_mut().view.preview = true;
    r.pipeline
        .create_request(&RequestOptions::default(), OutputMode::None);

    assert!(first.wait_request(Duration::ZERO));
    assert!(first.deposit(CameraImage::solid(8, 8, [9, 9, 9])));
    let report = r.pipeline.tick();
    assert!(report.skipped_sync);
    assert_eq!(report.composite_passes, 0);

    assert!(second.wait_request(Duration::ZERO));
    assert!(second.deposit(CameraImage::solid(8, 8, [9, 9, 9])));
    let report = r.pipeline.tick();
    assert!(!report.skipped_sync);
    assert_eq!(report.composite_passes, 1);
    assert_eq!(report.presents, 1);
}

#[test]
fn commands_apply_while_sync_stalls() {
    let mut r = rig(2, true);
    r.tx.send("set_stereo 1".to_owned()).unwrap();

    let report = r.pipeline.tick();

    assert!(report.skipped_sync);
    assert!(r.pipeline.context().view.stereo);
}

#[test]
fn exit_command_stops_run() {
    let mut r = rig(1, false);
    r.tx.send("exit".to_owned()).unwrap();
    r.pipeline.run().unwrap();
    assert!(r.pipeline.exit_requested());
}

#[test]
fn malformed_line_is_rejected_without_side_effects() {
    let mut r = rig(1, false);
    let before = format!("{:?}", r.pipeline.context().view);
    assert!(r.pipeline.apply_line("set_fov 1").is_err());
    assert!(r.pipeline.apply_line("warp 9").is_err());
    assert!(r.pipeline.apply_line("   ").unwrap().is_none());
    assert_eq!(format!("{:?}", r.pipeline.context().view), before);
}

#[test]
fn shutdown_joins_attached_workers() {
    let mut r = rig(1, false);
    let stop = r.pipeline.stop_flag();
    r.pipeline.attach_worker(std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(1));
        }
    }));
    r.pipeline.shutdown();
    assert!(r.pipeline.stop_flag().load(Ordering::Relaxed));
    r.pipeline.shutdown();
}
