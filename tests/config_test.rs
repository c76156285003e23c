use camhal::config::{ConfigError, Facing, SessionConfig, WhiteBalanceMode};
use camhal::params::keys;
use camhal::ParameterSet;
use tempfile::tempdir;

#[test]
fn test_save_and_load_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("camhal.toml");

    let mut config = SessionConfig::default();
    config.camera.facing = Facing::Front;
    config.camera.preview_size = [1280, 720];
    config.picture.jpeg_quality = 70;
    config.white_balance.push(WhiteBalanceMode::new("cloudy", 1.2, 0.8));
    config.save_to_file(&path).unwrap();

    let loaded = SessionConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.camera.facing, Facing::Front);
    assert_eq!(loaded.camera.preview_size, [1280, 720]);
    assert_eq!(loaded.picture.jpeg_quality, 70);
    assert_eq!(loaded.white_balance.len(), 5);
    assert_eq!(loaded.white_balance[4].mode, "cloudy");
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = SessionConfig::load_from_file(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.camera.preview_fps, 20);
}

#[test]
fn test_malformed_file_is_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[camera\npreview_fps = ").unwrap();
    assert!(matches!(
        SessionConfig::load_from_file(&path),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_invalid_values_are_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("odd.toml");
    let mut config = SessionConfig::default();
    config.picture.jpeg_quality = 0;
    config.save_to_file(&path).unwrap();
    assert!(matches!(
        SessionConfig::load_from_file(&path),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_config_seeds_parameter_set() {
    let mut config = SessionConfig::default();
    config.camera.preview_size = [320, 240];
    config.exposure.min = -3;
    config.exposure.max = 3;
    let params = ParameterSet::from_config(&config);

    assert_eq!(params.preview_size(), Some((320, 240)));
    assert_eq!(params.get_int(keys::MIN_EXPOSURE_COMPENSATION), Some(-3));
    assert_eq!(params.get_int(keys::MAX_EXPOSURE_COMPENSATION), Some(3));
    assert_eq!(params.get(keys::WHITE_BALANCE), Some("auto"));
    assert_eq!(
        params.get_list(keys::SUPPORTED_WHITE_BALANCE),
        vec!["auto", "incandescent", "daylight", "twilight"]
    );
    assert_eq!(params.get(keys::FACING), Some("back"));
}
