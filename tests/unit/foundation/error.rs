use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        PanoError::configuration("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        PanoError::resource("x")
            .to_string()
            .contains("resource allocation error:")
    );
    assert!(PanoError::init("x").to_string().contains("init error:"));
    assert!(PanoError::encode("x").to_string().contains("encode error:"));
    assert!(
        PanoError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = PanoError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
