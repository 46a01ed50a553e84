use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use lendrelay_cli::commands::{config, migrate, policies, submit, validate};
use lendrelay_core::config::LoadOptions;
use serde_json::{json, Value};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROPOSAL: &str = r#"{
    "applicant": {
        "name": "Ana Souza",
        "document": "123.456.789-09",
        "email": "ana@example.com",
        "birth_date": "1990-03-15"
    },
    "property_value": "500000",
    "financed_value": "450000",
    "term_months": 300,
    "property_type": "residential",
    "marital_status": "single",
    "monthly_income": "15000",
    "flow_type": "new",
    "selected_banks": ["itau", "caixa"]
}"#;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("LENDRELAY_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("LENDRELAY_DATABASE_URL", "postgres://localhost/lendrelay")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn policies_lists_every_partner_bank() {
    let result = policies::run(None);
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    let banks: Vec<&str> = payload["data"]
        .as_array()
        .expect("policy array")
        .iter()
        .map(|policy| policy["bank"].as_str().expect("bank name"))
        .collect();
    assert_eq!(banks, vec!["bradesco", "caixa", "inter", "itau", "santander"]);
}

#[test]
fn policies_rejects_unknown_bank() {
    let result = policies::run(Some("nubank"));
    assert_eq!(result.exit_code, 2);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "unknown_bank");
}

#[test]
fn validate_reports_adjustments_and_best_bank() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_proposal(dir.path(), PROPOSAL);

    let result = validate::run(&path, &[]);
    assert_eq!(result.exit_code, 0, "output: {}", result.output);

    let payload = parse_payload(&result.output);
    let validation = &payload["data"]["validation"];
    assert_eq!(validation["summary"]["approved"], 2);
    assert_eq!(validation["summary"]["adjusted"], 2);
    assert!(payload["data"]["best_bank"]["bank"].is_string());
}

#[test]
fn validate_fails_cleanly_on_unreadable_proposal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_proposal(dir.path(), "{ not json");

    let result = validate::run(&path, &["itau".to_string()]);
    assert_eq!(result.exit_code, 2);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "proposal_input");
}

#[test]
fn submit_without_configured_banks_stores_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_proposal(dir.path(), PROPOSAL);
    let db_url = format!("sqlite://{}", dir.path().join("lendrelay.db").display());

    with_env(
        &[("LENDRELAY_DATABASE_URL", &db_url), ("LENDRELAY_SUBMISSION_SETTLE_DELAY_SECS", "0")],
        || {
            let result = submit::run(LoadOptions::default(), &path, &[], false);
            assert_eq!(result.exit_code, 1, "output: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "no_bank_accepted");
            let results = payload["data"]["results"].as_array().expect("per-bank results");
            assert_eq!(results.len(), 2);
            assert!(results.iter().all(|result| result["error"]["kind"] == "unavailable"));
            assert!(payload["data"]["client_id"].is_null());
        },
    );
}

#[test]
fn dry_run_submit_reaches_banks_without_touching_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_proposal(dir.path(), PROPOSAL);
    let db_path = dir.path().join("lendrelay.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let bank_runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("bank runtime");
    let server = bank_runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "tok-1", "expires_in": 900 })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::path("/api/proposals"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "proposalId": "CX-1", "proposalNumber": "0001" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::path("/api/proposals/CX-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "CX-1", "status": "em_analise" })),
            )
            .mount(&server)
            .await;
        server
    });

    let config_path = dir.path().join("lendrelay.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[banks.caixa]
base_url = "{uri}/api/"
token_url = "{uri}/oauth/token"
client_id = "lendrelay"
client_secret = "s3cret"
"#,
            uri = server.uri()
        ),
    )
    .expect("write config");

    with_env(
        &[("LENDRELAY_DATABASE_URL", &db_url), ("LENDRELAY_SUBMISSION_SETTLE_DELAY_SECS", "0")],
        || {
            let options = LoadOptions {
                config_path: Some(config_path.clone()),
                require_file: true,
                ..LoadOptions::default()
            };
            let result = submit::run(options, &path, &["caixa".to_string()], true);
            assert_eq!(result.exit_code, 0, "output: {}", result.output);

            let payload = parse_payload(&result.output);
            assert!(payload["message"].as_str().expect("message").contains("dry run"));
            assert_eq!(payload["data"]["summary"]["succeeded"], 1);
            assert!(payload["data"]["client_id"].is_string());
            assert_eq!(payload["data"]["results"][0]["proposal_id"], "CX-1");
        },
    );

    assert!(!db_path.exists(), "dry run must not create the database file");
    drop(server);
}

#[test]
fn config_redacts_bank_secrets() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("lendrelay.toml");
    fs::write(
        &config_path,
        r#"
[banks.caixa]
base_url = "https://api.caixa.example.com"
token_url = "https://api.caixa.example.com/oauth/token"
client_id = "lendrelay"
client_secret = "super-secret-value"
"#,
    )
    .expect("write config");

    with_env(&[], || {
        let result = config::run(LoadOptions {
            config_path: Some(config_path.clone()),
            require_file: true,
            ..LoadOptions::default()
        });
        assert_eq!(result.exit_code, 0, "output: {}", result.output);
        assert!(result.output.contains("banks.caixa.client_secret = <redacted>"));
        assert!(!result.output.contains("super-secret-value"));
        assert!(result.output.contains("banks.caixa.base_url = https://api.caixa.example.com"));
    });
}

fn write_proposal(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("proposal.json");
    fs::write(&path, contents).expect("write proposal");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid json")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "LENDRELAY_DATABASE_URL",
        "LENDRELAY_DATABASE_MAX_CONNECTIONS",
        "LENDRELAY_DATABASE_TIMEOUT_SECS",
        "LENDRELAY_SUBMISSION_BANK_TIMEOUT_SECS",
        "LENDRELAY_SUBMISSION_SETTLE_DELAY_SECS",
        "LENDRELAY_SUBMISSION_TOKEN_SAFETY_MARGIN_SECS",
        "LENDRELAY_BANK_CAIXA_BASE_URL",
        "LENDRELAY_BANK_CAIXA_CLIENT_ID",
        "LENDRELAY_BANK_CAIXA_CLIENT_SECRET",
        "LENDRELAY_LOGGING_LEVEL",
        "LENDRELAY_LOGGING_FORMAT",
        "LENDRELAY_LOG_LEVEL",
        "LENDRELAY_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
