use second_thought::config::{self, Config};
use std::io::Write;
use std::time::Duration;

#[tokio::test]
async fn loads_overrides_from_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[timing]
debounce_ms = 400
auto_hide_ms = 5000

[service]
api_url = "http://localhost:8080/v1/chat/completions"
temperature = 0.2
"#
    )
    .unwrap();

    let cfg = config::load(file.path()).await.unwrap();
    assert_eq!(cfg.timing.debounce(), Duration::from_millis(400));
    assert_eq!(cfg.timing.auto_hide(), Duration::from_secs(5));
    assert_eq!(cfg.timing.mutation_throttle(), Duration::from_millis(500));
    assert_eq!(cfg.service.api_url, "http://localhost:8080/v1/chat/completions");
    assert_eq!(cfg.service.temperature, 0.2);
    assert_eq!(cfg.service.max_tokens, 1000);
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(config::load(dir.path().join("absent.toml")).await.is_err());
}

#[tokio::test]
async fn malformed_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[timing]\ndebounce_ms = \"soon\"\n").unwrap();
    assert!(config::load(file.path()).await.is_err());
}

#[test]
fn defaults_match_the_documented_timers() {
    let cfg = Config::default();
    assert_eq!(cfg.timing.debounce_ms, 1000);
    assert_eq!(cfg.timing.request_timeout_ms, 15_000);
    assert_eq!(cfg.timing.cue_delay_ms, 600);
    assert_eq!(cfg.service.default_model, "mistralai/devstral-2512:free");
}
