pub mod config;
pub mod migrate;
pub mod policies;
pub mod simulate;
pub mod submit;
pub mod validate;

use std::fs;
use std::path::Path;

use anyhow::Context;
use lendrelay_core::domain::proposal::{BankName, Proposal};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with_data(command, error_class, message, exit_code, None)
    }

    pub fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn to_data(value: &impl Serialize) -> Option<Value> {
    serde_json::to_value(value).ok()
}

pub(crate) fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

pub(crate) fn load_proposal(path: &Path) -> anyhow::Result<Proposal> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read proposal file `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse proposal file `{}`", path.display()))
}

/// Explicit `--bank` values win, then the proposal's own selection, then `fallback`.
pub(crate) fn resolve_banks(
    requested: &[String],
    proposal: &Proposal,
    fallback: impl FnOnce() -> Vec<BankName>,
) -> anyhow::Result<Vec<BankName>> {
    if !requested.is_empty() {
        return requested
            .iter()
            .map(|raw| BankName::parse(raw).with_context(|| format!("invalid bank `{raw}`")))
            .collect();
    }
    if !proposal.selected_banks.is_empty() {
        return Ok(proposal.selected_banks.iter().cloned().collect());
    }
    Ok(fallback())
}

pub(crate) fn input_failure(command: &str, error: &anyhow::Error) -> CommandResult {
    CommandResult::failure(command, "proposal_input", format!("{error:#}"), 2)
}
