use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::proposal::BankName;
use crate::policy::BankPolicyTable;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub submission: SubmissionConfig,
    pub banks: BTreeMap<String, BankEndpointConfig>,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SubmissionConfig {
    pub bank_timeout_secs: u64,
    pub settle_delay_secs: u64,
    pub token_safety_margin_secs: u64,
}

impl SubmissionConfig {
    pub fn bank_timeout(&self) -> Duration {
        Duration::from_secs(self.bank_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn token_safety_margin(&self) -> Duration {
        Duration::from_secs(self.token_safety_margin_secs)
    }
}

#[derive(Clone, Debug)]
pub struct BankEndpointConfig {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub scope: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bank_timeout_secs: Option<u64>,
    pub settle_delay_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://lendrelay.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            submission: SubmissionConfig {
                bank_timeout_secs: 30,
                settle_delay_secs: 5,
                token_safety_margin_secs: 60,
            },
            banks: BTreeMap::new(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("lendrelay.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Bank names with configured endpoints, parsed into domain names.
    pub fn configured_banks(&self) -> Vec<BankName> {
        self.banks.keys().map(|name| BankName(name.clone())).collect()
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(submission) = patch.submission {
            if let Some(bank_timeout_secs) = submission.bank_timeout_secs {
                self.submission.bank_timeout_secs = bank_timeout_secs;
            }
            if let Some(settle_delay_secs) = submission.settle_delay_secs {
                self.submission.settle_delay_secs = settle_delay_secs;
            }
            if let Some(token_safety_margin_secs) = submission.token_safety_margin_secs {
                self.submission.token_safety_margin_secs = token_safety_margin_secs;
            }
        }

        for (name, bank) in patch.banks {
            let name = BankName::parse(&name)
                .map_err(|error| ConfigError::Validation(format!("banks: {error}")))?;
            self.banks.insert(
                name.0,
                BankEndpointConfig {
                    base_url: bank.base_url,
                    token_url: bank.token_url,
                    client_id: bank.client_id.unwrap_or_default(),
                    client_secret: secret_value(bank.client_secret.unwrap_or_default()),
                    scope: bank.scope,
                },
            );
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LENDRELAY_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("LENDRELAY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("LENDRELAY_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("LENDRELAY_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("LENDRELAY_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LENDRELAY_SUBMISSION_BANK_TIMEOUT_SECS") {
            self.submission.bank_timeout_secs =
                parse_u64("LENDRELAY_SUBMISSION_BANK_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("LENDRELAY_SUBMISSION_SETTLE_DELAY_SECS") {
            self.submission.settle_delay_secs =
                parse_u64("LENDRELAY_SUBMISSION_SETTLE_DELAY_SECS", &value)?;
        }
        if let Some(value) = read_env("LENDRELAY_SUBMISSION_TOKEN_SAFETY_MARGIN_SECS") {
            self.submission.token_safety_margin_secs =
                parse_u64("LENDRELAY_SUBMISSION_TOKEN_SAFETY_MARGIN_SECS", &value)?;
        }

        for (name, bank) in &mut self.banks {
            let prefix = format!("LENDRELAY_BANK_{}", name.to_ascii_uppercase());
            if let Some(value) = read_env(&format!("{prefix}_BASE_URL")) {
                bank.base_url = value;
            }
            if let Some(value) = read_env(&format!("{prefix}_CLIENT_ID")) {
                bank.client_id = value;
            }
            if let Some(value) = read_env(&format!("{prefix}_CLIENT_SECRET")) {
                bank.client_secret = secret_value(value);
            }
        }

        let log_level =
            read_env("LENDRELAY_LOGGING_LEVEL").or_else(|| read_env("LENDRELAY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LENDRELAY_LOGGING_FORMAT").or_else(|| read_env("LENDRELAY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bank_timeout_secs) = overrides.bank_timeout_secs {
            self.submission.bank_timeout_secs = bank_timeout_secs;
        }
        if let Some(settle_delay_secs) = overrides.settle_delay_secs {
            self.submission.settle_delay_secs = settle_delay_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_submission(&self.submission)?;
        validate_banks(&self.banks)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("lendrelay.toml"), PathBuf::from("config/lendrelay.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_submission(submission: &SubmissionConfig) -> Result<(), ConfigError> {
    if submission.bank_timeout_secs == 0 || submission.bank_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "submission.bank_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if submission.settle_delay_secs > 120 {
        return Err(ConfigError::Validation(
            "submission.settle_delay_secs must be at most 120".to_string(),
        ));
    }

    if submission.token_safety_margin_secs > 3600 {
        return Err(ConfigError::Validation(
            "submission.token_safety_margin_secs must be at most 3600".to_string(),
        ));
    }

    Ok(())
}

fn validate_banks(banks: &BTreeMap<String, BankEndpointConfig>) -> Result<(), ConfigError> {
    let policies = BankPolicyTable::standard();

    for (name, bank) in banks {
        if !policies.contains(&BankName(name.clone())) {
            let known: Vec<&str> = policies.banks().map(BankName::as_str).collect();
            return Err(ConfigError::Validation(format!(
                "banks.{name} has no underwriting policy (known banks: {})",
                known.join("|")
            )));
        }

        for (field, url) in [("base_url", &bank.base_url), ("token_url", &bank.token_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "banks.{name}.{field} must start with http:// or https://"
                )));
            }
        }

        if bank.client_id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "banks.{name}.client_id is required (or set LENDRELAY_BANK_{}_CLIENT_ID)",
                name.to_ascii_uppercase()
            )));
        }
        if bank.client_secret.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "banks.{name}.client_secret is required (or set LENDRELAY_BANK_{}_CLIENT_SECRET)",
                name.to_ascii_uppercase()
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    submission: Option<SubmissionPatch>,
    #[serde(default)]
    banks: BTreeMap<String, BankPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SubmissionPatch {
    bank_timeout_secs: Option<u64>,
    settle_delay_secs: Option<u64>,
    token_safety_margin_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BankPatch {
    base_url: String,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
