//! File and environment loading against the real filesystem and process
//! environment.

use std::io::Write;
use std::time::Duration;

use mooring_config::{ConfigError, ConfigLoader, LogFormat};
use tempfile::NamedTempFile;

fn file_with(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_toml_file() {
    let file = file_with(
        ".toml",
        r#"
        [http]
        address = "127.0.0.1:8081"
        shutdown_timeout_secs = 5

        [grpc]
        address = "127.0.0.1:50052"
        concurrency_limit_per_connection = 128

        [logging]
        level = "mooring_server=debug,info"
        format = "pretty"
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.http.address, "127.0.0.1:8081");
    assert_eq!(config.http.shutdown_timeout(), Duration::from_secs(5));
    assert_eq!(
        config.grpc.to_grpc_config().concurrency_limit_per_connection(),
        Some(128)
    );
    let log = config.logging.to_log_config();
    assert_eq!(log.level, "mooring_server=debug,info");
    assert!(!log.json_format);
}

#[test]
fn test_json_file_over_toml_file() {
    let base = file_with(".toml", "[http]\naddress = \"127.0.0.1:8081\"\nread_timeout_secs = 30");
    let local = file_with(".json", r#"{"http": {"read_timeout_secs": 45}}"#);

    let config = ConfigLoader::new()
        .with_file(base.path())
        .unwrap()
        .with_optional_file(local.path())
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.http.address, "127.0.0.1:8081");
    assert_eq!(
        config.http.to_http_config().read_timeout(),
        Duration::from_secs(45)
    );
}

#[test]
fn test_file_with_unknown_key() {
    let file = file_with(".toml", "[grpc]\nnodelay = true");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::Toml(_))));
}

#[test]
fn test_file_with_unsupported_extension() {
    let file = file_with(".yaml", "http: {}");
    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
}

#[test]
fn test_process_environment_overrides_file() {
    let file = file_with(".toml", "[http]\naddress = \"127.0.0.1:8081\"");
    // Prefix unique to this test; the environment is shared across tests.
    std::env::set_var("MOORING_LOADING_TEST__HTTP__ADDRESS", "127.0.0.1:9091");
    std::env::set_var("MOORING_LOADING_TEST__LOGGING__FORMAT", "pretty");

    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .with_env_prefix("mooring_loading_test")
        .load()
        .unwrap();

    assert_eq!(config.http.address, "127.0.0.1:9091");
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_dotenv_file_feeds_overrides() {
    let env_file = file_with(".env", "MOORING_DOTENV_TEST__GRPC__TCP_NODELAY=false\n");

    let config = ConfigLoader::new()
        .with_dotenv_file(env_file.path())
        .unwrap()
        .with_env_prefix("MOORING_DOTENV_TEST")
        .load()
        .unwrap();

    assert!(!config.grpc.tcp_nodelay);
}
