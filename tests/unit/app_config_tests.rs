/*!
 * Configuration loading and validation tests.
 */

use scitrans::app_config::{Config, FormulaCompareMode, LogLevel, RetryGranularity};

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_load_full_config_from_file() {
    let dir = create_temp_dir().unwrap();
    let content = r#"{
        "source_language": "ru",
        "target_language": "en",
        "provider": {
            "model": "gpt-4o",
            "endpoint": "https://router.example/v1",
            "api_key": "sk-test",
            "concurrent_requests": 2
        },
        "translation": {
            "max_retries": 3,
            "formula_compare": "strict",
            "retry_granularity": "paragraph"
        },
        "terminology": {
            "similarity_threshold": 0.9
        },
        "output": {
            "mark_color": "orange"
        },
        "log_level": "debug"
    }"#;
    let path = create_test_file(&dir.path().to_path_buf(), "conf.json", content).unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.provider.model, "gpt-4o");
    assert_eq!(config.provider.concurrent_requests, 2);
    assert_eq!(config.translation.max_retries, 3);
    assert_eq!(config.translation.formula_compare, FormulaCompareMode::Strict);
    assert_eq!(
        config.translation.retry_granularity,
        RetryGranularity::Paragraph
    );
    assert_eq!(config.terminology.similarity_threshold, 0.9);
    assert_eq!(config.output.mark_color, "orange");
    assert_eq!(config.log_level, LogLevel::Debug);
    // Untouched fields keep their defaults
    assert_eq!(config.provider.timeout_secs, 120);
}

#[test]
fn test_invalid_threshold_fails_load() {
    let dir = create_temp_dir().unwrap();
    let content = r#"{
        "source_language": "ru",
        "target_language": "en",
        "terminology": {"similarity_threshold": 1.5}
    }"#;
    let path = create_test_file(&dir.path().to_path_buf(), "conf.json", content).unwrap();
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_save_then_load_roundtrip() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("saved.json");

    let mut config = Config::default();
    config.target_language = "de".to_string();
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.target_language, "de");
    assert_eq!(loaded.provider.model, config.provider.model);
}

#[test]
fn test_api_key_placeholder_expands_from_environment() {
    let mut config = Config::default();
    config.provider.api_key = "${SCITRANS_TEST_KEY}".to_string();

    // SAFETY: no other test in this binary touches the environment.
    unsafe { std::env::set_var("SCITRANS_TEST_KEY", "sk-from-env") };
    assert_eq!(config.provider.resolved_api_key().unwrap(), "sk-from-env");
    unsafe { std::env::remove_var("SCITRANS_TEST_KEY") };
    assert!(config.provider.resolved_api_key().is_err());
}

#[test]
fn test_literal_api_key_passes_through() {
    let mut config = Config::default();
    config.provider.api_key = "sk-literal".to_string();
    assert_eq!(config.provider.resolved_api_key().unwrap(), "sk-literal");
}
