use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use toml::Value;
use zeroclick_core::config::{AppConfig, LlmProvider, LoadOptions};

/// One reported setting: dotted key, rendered value, and the env variables
/// that can set it (first match wins).
struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let llm_key_env: &'static [&'static str] = match config.llm.provider {
        LlmProvider::Anthropic => &["ZEROCLICK_LLM_API_KEY", "ANTHROPIC_API_KEY"],
        LlmProvider::OpenAi => &["ZEROCLICK_LLM_API_KEY", "OPENAI_API_KEY"],
        LlmProvider::Google => &["ZEROCLICK_LLM_API_KEY", "GOOGLE_API_KEY"],
        LlmProvider::Ollama => &["ZEROCLICK_LLM_API_KEY"],
    };

    vec![
        Field {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["ZEROCLICK_DATABASE_URL"],
        },
        Field {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["ZEROCLICK_DATABASE_MAX_CONNECTIONS"],
        },
        Field {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["ZEROCLICK_DATABASE_TIMEOUT_SECS"],
        },
        Field {
            key: "llm.provider",
            value: config.llm.provider.as_str().to_string(),
            env_keys: &["ZEROCLICK_LLM_PROVIDER"],
        },
        Field {
            key: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["ZEROCLICK_LLM_MODEL"],
        },
        Field {
            key: "llm.base_url",
            value: config.llm.effective_base_url().to_string(),
            env_keys: &["ZEROCLICK_LLM_BASE_URL"],
        },
        Field {
            key: "llm.api_key",
            value: redact_secret(&config.llm.api_key),
            env_keys: llm_key_env,
        },
        Field {
            key: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["ZEROCLICK_LLM_TIMEOUT_SECS"],
        },
        Field {
            key: "speech.base_url",
            value: config.speech.base_url.clone(),
            env_keys: &["ZEROCLICK_SPEECH_BASE_URL"],
        },
        Field {
            key: "speech.api_key",
            value: redact_secret(&config.speech.api_key),
            env_keys: &["ZEROCLICK_SPEECH_API_KEY", "OPENAI_API_KEY"],
        },
        Field {
            key: "speech.model",
            value: config.speech.model.clone(),
            env_keys: &["ZEROCLICK_SPEECH_MODEL"],
        },
        Field {
            key: "speech.language",
            value: config.speech.language.clone().unwrap_or_else(|| "<auto>".to_string()),
            env_keys: &["ZEROCLICK_SPEECH_LANGUAGE"],
        },
        Field {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["ZEROCLICK_SERVER_BIND_ADDRESS"],
        },
        Field {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["ZEROCLICK_SERVER_PORT", "BACKEND_PORT"],
        },
        Field {
            key: "server.max_upload_bytes",
            value: config.server.max_upload_bytes.to_string(),
            env_keys: &["ZEROCLICK_SERVER_MAX_UPLOAD_BYTES"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["ZEROCLICK_LOGGING_LEVEL", "ZEROCLICK_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_lowercase(),
            env_keys: &["ZEROCLICK_LOGGING_FORMAT", "ZEROCLICK_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("zeroclick.toml"), PathBuf::from("config/zeroclick.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a recognizable key prefix (`sk-ant-***`) and hides the rest.
fn redact_secret(secret: &Option<SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.rsplit_once('-') {
        Some((prefix, _)) if prefix.len() <= 8 => format!("{prefix}-***"),
        _ => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn redaction_never_reveals_key_material() {
        let key = Some(SecretString::from("sk-ant-abcdef123456".to_string()));
        assert_eq!(redact_secret(&key), "sk-ant-***");

        let opaque = Some(SecretString::from("AIzaSyExampleKeyMaterial".to_string()));
        assert_eq!(redact_secret(&opaque), "<redacted>");

        assert_eq!(redact_secret(&None), "<unset>");
    }

    #[test]
    fn dotted_paths_resolve_against_toml_tables() {
        let doc: Value = "[llm]\nprovider = \"openai\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "llm.provider"));
        assert!(!contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
