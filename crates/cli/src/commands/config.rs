use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use lendrelay_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::CommandResult;

struct Sources {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: 2,
                output: format!("config validation failed: {error}"),
            };
        }
    };

    let sources = Sources {
        doc: load_config_file_doc(config_file_path.as_deref()),
        path: config_file_path,
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(sources.line("database.url", &config.database.url, "LENDRELAY_DATABASE_URL"));
    lines.push(sources.line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        "LENDRELAY_DATABASE_MAX_CONNECTIONS",
    ));
    lines.push(sources.line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        "LENDRELAY_DATABASE_TIMEOUT_SECS",
    ));

    lines.push(sources.line(
        "submission.bank_timeout_secs",
        &config.submission.bank_timeout_secs.to_string(),
        "LENDRELAY_SUBMISSION_BANK_TIMEOUT_SECS",
    ));
    lines.push(sources.line(
        "submission.settle_delay_secs",
        &config.submission.settle_delay_secs.to_string(),
        "LENDRELAY_SUBMISSION_SETTLE_DELAY_SECS",
    ));
    lines.push(sources.line(
        "submission.token_safety_margin_secs",
        &config.submission.token_safety_margin_secs.to_string(),
        "LENDRELAY_SUBMISSION_TOKEN_SAFETY_MARGIN_SECS",
    ));

    for (name, bank) in &config.banks {
        let env_prefix = format!("LENDRELAY_BANK_{}", name.to_ascii_uppercase());
        lines.push(sources.line(
            &format!("banks.{name}.base_url"),
            &bank.base_url,
            &format!("{env_prefix}_BASE_URL"),
        ));
        lines.push(sources.line(&format!("banks.{name}.token_url"), &bank.token_url, ""));
        lines.push(sources.line(
            &format!("banks.{name}.client_id"),
            &bank.client_id,
            &format!("{env_prefix}_CLIENT_ID"),
        ));
        lines.push(sources.line(
            &format!("banks.{name}.client_secret"),
            redact_secret(bank.client_secret.expose_secret()),
            &format!("{env_prefix}_CLIENT_SECRET"),
        ));
        lines.push(sources.line(
            &format!("banks.{name}.scope"),
            bank.scope.as_deref().unwrap_or("<unset>"),
            "",
        ));
    }

    lines.push(sources.line("logging.level", &config.logging.level, "LENDRELAY_LOGGING_LEVEL"));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        "LENDRELAY_LOGGING_FORMAT",
    ));

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

impl Sources {
    fn line(&self, key_path: &str, value: &str, env_key: &str) -> String {
        format!("- {key_path} = {value} (source: {})", self.field_source(key_path, env_key))
    }

    fn field_source(&self, key_path: &str, env_key: &str) -> String {
        if !env_key.is_empty() && env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("lendrelay.toml"), PathBuf::from("config/lendrelay.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
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

fn redact_secret(secret: &str) -> &'static str {
    if secret.trim().is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}
