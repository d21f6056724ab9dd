//! Configuration file and environment layering into a session
use catalog_harvester::application::SessionConfig;
use catalog_harvester::infrastructure::{ConfigManager, OutputFormat};
use std::time::Duration;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> config::Map<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn file_and_environment_shape_the_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "session": {"start_url": "https://shop.example.com/c/bags", "delay_min_secs": 0.5, "max_attempts": 9},
            "selectors": {"listing": {"page_size": 48}},
            "output": {"basename": "bags", "timestamp_outputs": true}
        }"#,
    )
    .unwrap();

    let config = ConfigManager::with_path(&path)
        .with_env_source(env(&[("HARVESTER__SESSION__MAX_PRODUCTS", "5")]))
        .load()
        .unwrap();
    assert_eq!(config.output.basename, "bags");
    assert_eq!(config.output.formats, vec![OutputFormat::Json, OutputFormat::Jsonl, OutputFormat::Csv]);

    let session = SessionConfig::from_app_config(&config).unwrap();
    assert_eq!(session.start_url(), "https://shop.example.com/c/bags");
    assert_eq!(session.max_products(), 5);
    assert_eq!(session.delay_min(), Duration::from_millis(500));
    assert_eq!(session.delay_max(), Duration::from_secs(3));
    assert_eq!(session.max_attempts(), 5);
    assert_eq!(session.page_size(), 48);
    assert!(session.timestamp_outputs());
}

#[test]
fn invalid_file_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"session": {"max_products": 0}}"#).unwrap();

    let result = ConfigManager::with_path(&path).with_env_source(env(&[])).load();
    assert!(result.is_err());
}
