// Configuration loading tests

use imgate::config::Config;
use imgate::fetcher::FetchPolicy;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_example_config_matches_defaults() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.yaml");
    let config = Config::from_file(path).unwrap();

    assert_eq!(config, Config::default());
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_config_keeps_other_defaults() {
    let file = write_config(
        r#"
fetch:
  max_file_size: 2048
logging:
  excluded_host: "healthcheck.internal"
"#,
    );
    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.fetch.max_file_size, 2048);
    assert_eq!(config.fetch.timeout_secs, 15);
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.logging.excluded_host, "healthcheck.internal");
    assert!(!config.logging.disabled);
}

#[test]
fn test_fetch_policy_reflects_config() {
    let file = write_config(
        r#"
fetch:
  allowed_schemes: ["https"]
  allowed_content_types: ["image/webp"]
  max_file_size: 4096
  timeout_secs: 2
"#,
    );
    let policy = Config::from_file(file.path()).unwrap().fetch_policy();

    assert_eq!(
        policy,
        FetchPolicy {
            allowed_schemes: vec!["https".to_string()],
            allowed_content_types: vec!["image/webp".to_string()],
            max_size: 4096,
            timeout: Duration::from_secs(2),
        }
    );
}

#[test]
fn test_env_substitution_in_file() {
    std::env::set_var("IMGATE_IT_PORT_NUMBER", "9191");
    let file = write_config("server:\n  port: ${IMGATE_IT_PORT_NUMBER}\n");

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.server.port, 9191);
    std::env::remove_var("IMGATE_IT_PORT_NUMBER");
}

#[test]
fn test_invalid_config_fails_validation() {
    let file = write_config(
        r#"
transcode:
  allowed_output_formats: ["PNG"]
  default_format: "WEBP"
"#,
    );
    let config = Config::from_file(file.path()).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.contains("default_format"), "unexpected error: {}", err);
}

#[test]
fn test_unknown_field_type_is_load_error() {
    let file = write_config("server:\n  port: \"not-a-port\"\n");
    assert!(Config::from_file(file.path()).is_err());
}
