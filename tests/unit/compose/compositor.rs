use super::*;
use glam::Vec3;

fn approx_eq(a: Mat4, b: Mat4) -> bool {
    a.abs_diff_eq(b, 1e-5)
}

fn inputs(cal: &CalibrationOptions, view: ViewOrientation) -> ComposeInputs<'_> {
    ComposeInputs {
        calibration: cal,
        mount: EulerAngles::default(),
        view,
        mode: OperationMode::Window,
        active_camera: 0,
        num_cameras: 2,
        split: Split::None,
        fov_deg: 90.0,
        width: 1024,
        height: 512,
        camera_width: 2048,
    }
}

fn offset_calibration() -> CalibrationOptions {
    let mut cal = CalibrationOptions::default();
    cal.cameras[0].offset_pitch = 5f32.to_radians();
    cal.cameras[0].offset_roll = 3f32.to_radians();
    cal.cameras[0].offset_yaw = -2f32.to_radians();
    cal
}

#[test]
fn euler_applies_yaw_then_pitch_then_roll_to_a_vertex() {
    let a = EulerAngles::from_degrees(30.0, 45.0, 60.0);
    let v = Vec3::new(0.3, -0.2, 0.9);
    let stepwise = Mat4::from_rotation_z(a.roll)
        .transform_vector3(Mat4::from_rotation_x(a.pitch).transform_vector3(
            Mat4::from_rotation_y(a.yaw).transform_vector3(v),
        ));
    let got = euler_matrix(a).transform_vector3(v);
    assert!(got.abs_diff_eq(stepwise, 1e-5));
}

#[test]
fn zero_rotations_leave_only_world_alignment() {
    let cal = CalibrationOptions::default();
    let params = compose(&inputs(
        &cal,
        ViewOrientation::Explicit(EulerAngles::default()),
    ));
    assert!(approx_eq(params.matrix, world_alignment().transpose()));
}

#[test]
fn identity_device_quaternion_matches_zero_explicit_view() {
    let cal = offset_calibration();
    let device = compose(&inputs(&cal, ViewOrientation::Device(Quat::IDENTITY)));
    let explicit = compose(&inputs(
        &cal,
        ViewOrientation::Explicit(EulerAngles::default()),
    ));
    assert!(approx_eq(device.matrix, explicit.matrix));
}

#[test]
fn device_quaternion_is_transposed_before_use() {
    let cal = CalibrationOptions::default();
    let theta = 0.7;
    let device = compose(&inputs(
        &cal,
        ViewOrientation::Device(Quat::from_rotation_y(theta)),
    ));
    let inverse = compose(&inputs(
        &cal,
        ViewOrientation::Explicit(EulerAngles::new(0.0, -theta, 0.0)),
    ));
    assert!(approx_eq(device.matrix, inverse.matrix));
}

#[test]
fn swapping_view_and_mount_changes_the_matrix() {
    let cal = offset_calibration();
    let q = Quat::from_rotation_y(90f32.to_radians());
    let mut input = inputs(&cal, ViewOrientation::Device(q));
    input.mount = EulerAngles::from_degrees(10.0, 0.0, 4.0);

    let params = compose(&input);

    let offset = euler_matrix(EulerAngles::new(
        cal.cameras[0].offset_pitch,
        cal.cameras[0].offset_yaw,
        cal.cameras[0].offset_roll,
    ));
    let view = Mat4::from_quat(q).transpose();
    let mount = euler_matrix(input.mount);
    let expected = (world_alignment() * view * mount * offset).transpose();
    let misordered = (world_alignment() * mount * view * offset).transpose();

    assert!(approx_eq(params.matrix, expected));
    assert!(!approx_eq(params.matrix, misordered));
}

#[test]
fn offset_rotation_uses_reference_camera_only() {
    let mut cal = CalibrationOptions::default();
    cal.cameras[1].offset_pitch = 0.4;
    let mut input = inputs(&cal, ViewOrientation::Explicit(EulerAngles::default()));
    input.active_camera = 1;
    let params = compose(&input);
    assert!(approx_eq(params.matrix, world_alignment().transpose()));
}

#[test]
fn scalar_parameters() {
    let mut cal = CalibrationOptions::default();
    cal.sharpness_gain = 1.5;
    cal.cameras[1].offset_x = 0.25;
    cal.cameras[1].offset_yaw = 0.1;
    let mut input = inputs(&cal, ViewOrientation::Device(Quat::IDENTITY));
    input.active_camera = 1;
    input.split = Split::Right;
    input.mode = OperationMode::Equirectangular;

    let params = compose(&input);

    assert!((params.scale - 1.0).abs() < 1e-6);
    assert_eq!(params.aspect, 2.0);
    assert_eq!(params.pixel_size, 1.0 / 2048.0);
    assert_eq!(params.sharpness_gain, 1.5);
    assert_eq!(params.split.selector(), 2);
    assert_eq!(params.mode.shader_index(), 1);
    assert_eq!(params.cameras.len(), 2);
    assert_eq!(params.active, params.cameras[1]);
    assert_eq!(params.active.x, 0.25);
    assert_eq!(params.active.yaw, 0.1);
    assert_eq!(params.cameras[0].horizon_r, 0.8);
}

#[test]
fn narrower_fov_zooms_in() {
    let cal = CalibrationOptions::default();
    let mut input = inputs(&cal, ViewOrientation::Device(Quat::IDENTITY));
    input.fov_deg = 60.0;
    let narrow = compose(&input).scale;
    input.fov_deg = 120.0;
    let wide = compose(&input).scale;
    assert!(narrow > wide);
    assert!((wide - 1.0 / 3f32.sqrt()).abs() < 1e-5);
}
