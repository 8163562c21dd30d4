//! Configuration loading and validation tests
//!
//! Tests focus on observable behavior of loading TOML files, defaults,
//! validation errors and credential resolution.

use market_digest::config::{ConfigError, Credentials, PipelineConfig};
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_from_valid_toml() {
    let temp_file = write_config(
        r#"
[llm]
provider = "groq"
model = "llama-3.1-8b-instant"
temperature = 0.2

[search]
max_results = 5
default_query = "European markets today"

[telegram]
timeout_secs = 15

[pipeline]
summary_max_attempts = 3
backoff_base_ms = 250
"#,
    );

    let config = PipelineConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.llm.model, "llama-3.1-8b-instant");
    assert_eq!(config.llm.temperature, Some(0.2));
    assert_eq!(config.search.max_results, 5);
    assert_eq!(config.search.default_query, "European markets today");
    assert_eq!(config.telegram.timeout_secs, 15);
    assert_eq!(config.pipeline.summary_max_attempts, 3);
    assert_eq!(config.pipeline.backoff_base(), Duration::from_millis(250));
}

#[test]
fn test_missing_sections_use_defaults() {
    let temp_file = write_config("[llm]\nmodel = \"custom-model\"\n");

    let config = PipelineConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.llm.model, "custom-model");
    assert_eq!(config.llm.base_url, "https://api.groq.com/openai/v1");
    assert_eq!(config.search.timeout_secs, 10);
    assert_eq!(config.telegram.timeout_secs, 30);
    assert_eq!(config.telegram.api_base, "https://api.telegram.org");
    assert_eq!(config.pipeline.max_charts, 5);
    assert_eq!(config.pipeline.message_limit, 4000);
    assert_eq!(config.pipeline.summary_word_limit, 200);
}

#[test]
fn test_invalid_toml_is_rejected() {
    let temp_file = write_config("[llm\nmodel = ");

    let result = PipelineConfig::load_from_file(temp_file.path());

    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_invalid_url_is_rejected() {
    let temp_file = write_config("[telegram]\napi_base = \"ftp://api.telegram.org\"\n");

    let result = PipelineConfig::load_from_file(temp_file.path());

    assert!(matches!(
        result,
        Err(ConfigError::InvalidConfig(ref msg)) if msg.contains("telegram.api_base")
    ));
}

#[test]
fn test_zero_attempts_is_rejected() {
    let temp_file = write_config("[pipeline]\nsummary_max_attempts = 0\n");

    assert!(matches!(
        PipelineConfig::load_from_file(temp_file.path()),
        Err(ConfigError::InvalidConfig(_))
    ));
}

#[test]
fn test_missing_file_is_read_error() {
    let result = PipelineConfig::load_from_file(std::path::Path::new("/nonexistent/market.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = PipelineConfig::default();
    let rendered = toml::to_string_pretty(&config).unwrap();

    assert!(rendered.contains("api_key_env = \"GROQ_API_KEY\""));
    assert_eq!(PipelineConfig::from_toml_str(&rendered).unwrap(), config);
}

#[test]
fn test_credentials_resolve_with_custom_env_names() {
    let temp_file = write_config(
        r#"
[llm]
api_key_env = "MY_LLM_KEY"

[telegram]
bot_token_env = "MY_BOT"
chat_id_env = "MY_CHAT"
"#,
    );
    let config = PipelineConfig::load_from_file(temp_file.path()).unwrap();
    let env: HashMap<&str, &str> = [
        ("MY_LLM_KEY", "llm"),
        ("MY_BOT", "1:abc"),
        ("MY_CHAT", "99"),
        ("SERPER_API_KEY", "serper"),
    ]
    .into_iter()
    .collect();

    let credentials =
        Credentials::resolve_with(&config, |name| env.get(name).map(|v| v.to_string())).unwrap();

    assert_eq!(credentials.llm_api_key, "llm");
    assert_eq!(credentials.telegram_chat_id, "99");
    assert_eq!(credentials.tavily_api_key, None);
    assert_eq!(credentials.serper_api_key.as_deref(), Some("serper"));
    assert!(credentials.has_search_provider());
}

#[test]
fn test_missing_required_credential() {
    let config = PipelineConfig::default();

    let result = Credentials::resolve_with(&config, |name| {
        (name != "TELEGRAM_CHAT_ID").then(|| "value".to_string())
    });

    assert!(matches!(
        result,
        Err(ConfigError::EnvVarNotFound(ref name)) if name == "TELEGRAM_CHAT_ID"
    ));
}
