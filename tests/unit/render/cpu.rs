use super::*;
use crate::compose::compositor::{ComposeInputs, ViewOrientation, compose};
use crate::config::calibration::CalibrationOptions;
use crate::foundation::core::{EulerAngles, OperationMode};

fn params(active_camera: usize, split: Split, width: u32, height: u32) -> DrawParams {
    let cal = CalibrationOptions::default();
    compose(&ComposeInputs {
        calibration: &cal,
        mount: EulerAngles::default(),
        view: ViewOrientation::Explicit(EulerAngles::default()),
        mode: OperationMode::Window,
        active_camera,
        num_cameras: 2,
        split,
        fov_deg: 120.0,
        width,
        height,
        camera_width: 8,
    })
}

fn half_and_half(width: u32, height: u32, left: [u8; 3], right: [u8; 3]) -> CameraImage {
    let mut data = Vec::new();
    for _ in 0..height {
        for x in 0..width {
            data.extend_from_slice(if x < width / 2 { &left } else { &right });
        }
    }
    CameraImage::from_rgb8(width, height, data).unwrap()
}

fn backend() -> CpuBackend {
    CpuBackend::new(Size {
        width: 16,
        height: 8,
    })
    .unwrap()
}

#[test]
fn render_scales_the_active_camera() {
    let mut be = backend();
    let mut target = be.allocate_target(4, 2).unwrap();
    let cams = [
        CameraImage::solid(8, 8, [10, 20, 30]),
        CameraImage::solid(8, 8, [200, 0, 0]),
    ];

    be.render(&mut target, &params(1, Split::None, 4, 2), &cams)
        .unwrap();

    assert!(target.frame().data.chunks_exact(3).all(|p| p == [200, 0, 0]));
}

#[test]
fn split_passes_sample_their_source_half() {
    let mut be = backend();
    let mut target = be.allocate_target(4, 4).unwrap();
    let cams = [half_and_half(8, 8, [255, 0, 0], [0, 0, 255])];

    be.render(&mut target, &params(0, Split::Left, 4, 4), &cams)
        .unwrap();
    assert!(target.frame().data.chunks_exact(3).all(|p| p == [255, 0, 0]));

    be.render(&mut target, &params(0, Split::Right, 4, 4), &cams)
        .unwrap();
    assert!(target.frame().data.chunks_exact(3).all(|p| p == [0, 0, 255]));
}

#[test]
fn missing_camera_renders_black() {
    let mut be = backend();
    let mut target = be.allocate_target(2, 2).unwrap();
    be.render(&mut target, &params(3, Split::None, 2, 2), &[])
        .unwrap();
    assert!(target.frame().data.iter().all(|&b| b == 0));
}

#[test]
fn allocation_limit_is_a_resource_error() {
    let mut be = CpuBackend::with_settings(
        Size {
            width: 4,
            height: 4,
        },
        CpuSettings {
            threads: Some(2),
            max_target_pixels: Some(100),
        },
    )
    .unwrap();
    assert!(be.allocate_target(10, 10).is_ok());
    let err = be.allocate_target(11, 10).unwrap_err();
    assert!(matches!(err, PanoError::ResourceAllocation(_)));
    assert!(be.allocate_target(0, 10).is_err());
}

#[test]
fn zero_threads_is_rejected() {
    let settings = CpuSettings {
        threads: Some(0),
        max_target_pixels: None,
    };
    assert!(
        CpuBackend::with_settings(
            Size {
                width: 1,
                height: 1
            },
            settings
        )
        .is_err()
    );
}

#[test]
fn present_clips_viewports_to_the_screen() {
    let mut be = backend();
    let mut target = be.allocate_target(4, 4).unwrap();
    let cams = [CameraImage::solid(4, 4, [7, 7, 7])];
    be.render(&mut target, &params(0, Split::None, 4, 4), &cams)
        .unwrap();

    let vps = [
        Viewport {
            x: -2,
            y: 0,
            width: 4,
            height: 4,
        },
        Viewport {
            x: 14,
            y: 6,
            width: 4,
            height: 4,
        },
    ];
    be.present(&target, &vps, OperationMode::Board).unwrap();

    let screen = be.screen();
    assert_eq!(screen.pixel(0, 0), [7, 7, 7]);
    assert_eq!(screen.pixel(1, 3), [7, 7, 7]);
    assert_eq!(screen.pixel(2, 0), [0, 0, 0]);
    assert_eq!(screen.pixel(15, 7), [7, 7, 7]);
    assert_eq!(screen.pixel(13, 7), [0, 0, 0]);
    assert_eq!(be.present_count(), 1);
}

#[test]
fn present_only_draws_through_the_board_program() {
    let mut be = backend();
    let target = be.allocate_target(4, 4).unwrap();
    let vps = [Viewport {
        x: 0,
        y: 0,
        width: 4,
        height: 4,
    }];

    assert!(be.present(&target, &vps, OperationMode::Window).is_err());
    assert_eq!(be.present_count(), 0);
    assert_eq!(be.last_present_program(), None);

    be.present(&target, &vps, OperationMode::Board).unwrap();
    assert_eq!(be.last_present_program(), Some(OperationMode::Board));
}
