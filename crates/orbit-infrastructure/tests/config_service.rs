use orbit_core::config::{BackendKind, DeliveryMode, OrbitConfig};
use orbit_core::session::TrackEncoding;
use orbit_core::slash_command::Command;
use orbit_infrastructure::{ConfigService, OrbitPaths};
use tempfile::TempDir;

fn service(temp: &TempDir) -> ConfigService {
    ConfigService::with_paths(OrbitPaths::new(Some(temp.path().to_path_buf())))
}

#[test]
fn missing_file_is_created_with_defaults() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);

    let config = service.get_config();

    assert_eq!(config, OrbitConfig::default());
    assert!(temp.path().join("config.toml").exists());
}

#[test]
fn partial_file_fills_in_defaults() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("config.toml"),
        r#"
[backend]
kind = "http"
delivery = "single_shot"
track_encoding = "json"

[[commands]]
name = "/stems"
description = "Export stems"
"#,
    )
    .unwrap();

    let config = service(&temp).get_config();

    assert_eq!(config.backend.kind, BackendKind::Http);
    assert_eq!(config.backend.delivery, DeliveryMode::SingleShot);
    assert_eq!(config.backend.track_encoding, TrackEncoding::Json);
    assert_eq!(config.backend.url, "http://127.0.0.1:7878");
    assert_eq!(config.log_level, "info");
    assert_eq!(config.commands, vec![Command::new("/stems", "Export stems")]);
}

#[test]
fn malformed_file_falls_back_without_overwriting() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "backend = [").unwrap();

    let service = service(&temp);
    assert!(service.load().unwrap_err().is_serialization());
    assert_eq!(service.get_config(), OrbitConfig::default());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "backend = [");
}

#[test]
fn cache_survives_file_changes_until_invalidated() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);
    assert_eq!(service.get_config().log_level, "info");

    std::fs::write(temp.path().join("config.toml"), "log_level = \"debug\"\n").unwrap();
    assert_eq!(service.get_config().log_level, "info");

    service.invalidate_cache();
    assert_eq!(service.get_config().log_level, "debug");
}

#[test]
fn save_round_trips_through_disk() {
    let temp = TempDir::new().unwrap();
    let service = service(&temp);

    let mut config = OrbitConfig::default();
    config.backend.timeout_secs = 30;
    config.commands.push(Command::new("/mixdown", "Bounce the mix"));
    service.save(&config).unwrap();

    let reloaded = ConfigService::with_paths(OrbitPaths::new(Some(temp.path().to_path_buf())));
    assert_eq!(reloaded.get_config(), config);
}

#[test]
fn save_replaces_the_file_without_leaving_temporaries() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "log_level = \"trace\"\n").unwrap();
    let service = service(&temp);

    let mut config = OrbitConfig::default();
    config.log_level = "warn".to_string();
    service.save(&config).unwrap();

    let entries: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["config.toml".to_string()]);
    assert!(std::fs::read_to_string(&path).unwrap().contains("log_level = \"warn\""));
}
