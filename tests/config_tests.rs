//! Configuration module unit tests

use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;
use weatherproxy::config::settings::DEFAULT_WEATHER_API_URL;
use weatherproxy::config::{FileConfig, Settings, UpstreamFailureMode};

/// Build an environment lookup from fixed pairs
fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_settings_from_env_only() {
    let settings = Settings::from_sources(
        None,
        env_from(&[
            ("WEATHER_API_KEY", "env-key"),
            ("SERVER_HOST", "127.0.0.1"),
            ("SERVER_PORT", "8080"),
            ("UPSTREAM_TIMEOUT", "15"),
            ("UPSTREAM_FAILURE_MODE", "report"),
            ("LOG_FORMAT", "json"),
        ]),
    )
    .unwrap();

    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.upstream.api_key, "env-key");
    assert_eq!(settings.upstream.base_url, DEFAULT_WEATHER_API_URL);
    assert_eq!(settings.upstream.timeout, 15);
    assert_eq!(settings.upstream.failure_mode, UpstreamFailureMode::Report);
    assert_eq!(settings.logging.format, "json");
}

#[test]
fn test_settings_from_file_only() {
    let file = write_config(
        r#"{
            "server": {"port": 9000},
            "upstream": {
                "baseUrl": "https://weather.example.com/onecall",
                "apiKey": "file-key",
                "apiKeyParam": "key"
            }
        }"#,
    );
    let config = FileConfig::load(file.path()).unwrap();

    let settings = Settings::from_sources(Some(&config), env_from(&[])).unwrap();

    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 9000);
    assert_eq!(settings.upstream.base_url, "https://weather.example.com/onecall");
    assert_eq!(settings.upstream.api_key, "file-key");
    assert_eq!(settings.upstream.api_key_param, "key");
    assert_eq!(settings.upstream.failure_mode, UpstreamFailureMode::Hang);
}

#[test]
fn test_env_overrides_file() {
    let file = write_config(
        r#"{
            "server": {"port": 9000},
            "upstream": {"apiKey": "file-key", "failureMode": "report"}
        }"#,
    );
    let config = FileConfig::load(file.path()).unwrap();

    let settings = Settings::from_sources(
        Some(&config),
        env_from(&[("WEATHER_API_KEY", "env-key"), ("SERVER_PORT", "9100"), ("UPSTREAM_FAILURE_MODE", "hang")]),
    )
    .unwrap();

    assert_eq!(settings.server.port, 9100);
    assert_eq!(settings.upstream.api_key, "env-key");
    assert_eq!(settings.upstream.failure_mode, UpstreamFailureMode::Hang);
}

#[test]
fn test_settings_missing_api_key() {
    let error = Settings::from_sources(None, env_from(&[("SERVER_PORT", "8080")])).unwrap_err();
    assert!(error.to_string().contains("WEATHER_API_KEY"));
}

#[test]
fn test_settings_validation_failures() {
    let cases: &[(&[(&str, &str)], &str)] = &[
        (&[("WEATHER_API_KEY", "k"), ("SERVER_PORT", "0")], "Port number cannot be 0"),
        (&[("WEATHER_API_KEY", "k"), ("SERVER_PORT", "not-a-port")], "Invalid port number"),
        (&[("WEATHER_API_KEY", "")], "cannot be empty"),
        (&[("WEATHER_API_KEY", "has space")], "whitespace"),
        (&[("WEATHER_API_KEY", "k"), ("WEATHER_API_URL", "ftp://x")], "should start with 'http'"),
        (&[("WEATHER_API_KEY", "k"), ("WEATHER_API_KEY_PARAM", " ")], "parameter name cannot be empty"),
        (&[("WEATHER_API_KEY", "k"), ("UPSTREAM_TIMEOUT", "-1")], "Invalid upstream timeout"),
        (&[("WEATHER_API_KEY", "k"), ("UPSTREAM_FAILURE_MODE", "retry")], "Invalid upstream failure mode"),
        (&[("WEATHER_API_KEY", "k"), ("RUST_LOG", "verbose")], "Invalid log level"),
        (&[("WEATHER_API_KEY", "k"), ("LOG_FORMAT", "xml")], "Invalid log format"),
    ];

    for (vars, expected) in cases {
        let error = Settings::from_sources(None, env_from(vars)).unwrap_err();
        let message = format!("{:#}", error);
        assert!(message.contains(expected), "expected '{}' in '{}'", expected, message);
    }
}

#[test]
fn test_settings_serialization() {
    let settings = Settings::from_sources(None, env_from(&[("WEATHER_API_KEY", "k")])).unwrap();

    let json = serde_json::to_string(&settings).unwrap();
    let restored: Settings = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.server.port, settings.server.port);
    assert_eq!(restored.upstream.failure_mode, settings.upstream.failure_mode);
    assert!(json.contains(r#""failure_mode":"hang""#));
}
