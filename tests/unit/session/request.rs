use super::*;

fn parse(line: &str) -> PanoResult<RequestOptions> {
    RequestOptions::parse(line.split_whitespace())
}

#[test]
fn empty_options_are_defaults() {
    assert_eq!(parse("").unwrap(), RequestOptions::default());
}

#[test]
fn parses_every_option() {
    let o = parse("-W 4096 -H2048 -E -f 90 -v 90,0,0 -o out/a.mp4").unwrap();
    assert_eq!(o.width, 4096);
    assert_eq!(o.height, 2048);
    assert_eq!(o.mode, OperationMode::Equirectangular);
    assert_eq!(o.fov_deg, 90.0);
    assert_eq!(o.view, Some(EulerAngles::from_degrees(90.0, 0.0, 0.0)));
    assert_eq!(o.output_path.as_deref(), Some(Path::new("out/a.mp4")));
}

#[test]
fn last_mode_flag_wins() {
    assert_eq!(parse("-E -C").unwrap().mode, OperationMode::Calibration);
    assert_eq!(parse("-C -F").unwrap().mode, OperationMode::Fisheye);
}

#[test]
fn malformed_options_are_configuration_errors() {
    for line in [
        "-W",
        "-W abc",
        "-W 0",
        "-H -1",
        "-f 0",
        "-f 200",
        "-v 1,2",
        "-X",
        "stray",
        "-Ex",
    ] {
        let err = parse(line).unwrap_err();
        assert!(matches!(err, PanoError::Configuration(_)), "{line}");
    }
}

#[test]
fn wide_requests_become_double_size() {
    let g = Geometry::from_requested(4096, 2048);
    assert_eq!(
        g,
        Geometry {
            width: 2048,
            height: 2048,
            double_size: true
        }
    );
    assert_eq!(g.output_width(), 4096);

    let g = Geometry::from_requested(DOUBLE_SIZE_THRESHOLD, 512);
    assert!(!g.double_size);
    assert_eq!(g.output_width(), DOUBLE_SIZE_THRESHOLD);
}
