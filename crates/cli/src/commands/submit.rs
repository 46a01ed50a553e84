use std::path::Path;
use std::sync::Arc;

use lendrelay_banks::build_gateways;
use lendrelay_core::config::{AppConfig, LoadOptions};
use lendrelay_core::ports::{ClientRepository, ProposalDetailRepository};
use lendrelay_core::submission::{SubmissionError, SubmissionOutcome, SubmissionSettings};
use lendrelay_core::validation::ValidationManager;
use lendrelay_core::{BankGateways, SubmissionOrchestrator};
use lendrelay_db::connection::connect_from_config;
use lendrelay_db::{
    migrations, InMemoryClientRepository, InMemoryProposalDetailRepository, SqlClientRepository,
    SqlProposalDetailRepository,
};
use tracing::info;

use crate::commands::{input_failure, load_proposal, resolve_banks, runtime, to_data, CommandResult};

/// Submits the proposal. With `dry_run` the banks are still called, but clients and proposal
/// records are kept in memory and the database is never opened.
pub fn run(
    options: LoadOptions,
    proposal_path: &Path,
    requested: &[String],
    dry_run: bool,
) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "submit",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let proposal = match load_proposal(proposal_path) {
        Ok(proposal) => proposal,
        Err(error) => return input_failure("submit", &error),
    };
    let banks = match resolve_banks(requested, &proposal, || config.configured_banks()) {
        Ok(banks) => banks,
        Err(error) => return input_failure("submit", &error),
    };

    let gateways = match build_gateways(&config) {
        Ok(gateways) => Arc::new(gateways),
        Err(error) => {
            return CommandResult::failure("submit", "bank_adapter", error.to_string(), 4);
        }
    };

    let runtime = match runtime("submit") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let settings = SubmissionSettings { settle_delay: config.submission.settle_delay() };

    runtime.block_on(async {
        if dry_run {
            let clients = Arc::new(InMemoryClientRepository::default());
            let details = Arc::new(InMemoryProposalDetailRepository::default());
            let orchestrator = orchestrator(gateways, clients, details.clone(), settings);
            let outcome = orchestrator.submit(&proposal, &banks).await;

            if let Ok(SubmissionOutcome { client_id: Some(client_id), .. }) = &outcome {
                info!(
                    event_name = "cli.submit.dry_run",
                    records = details.list_for_client(client_id).await.len(),
                    "dry run kept submitted proposals in memory"
                );
            }
            return report(outcome, true);
        }

        let pool = match connect_from_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return CommandResult::failure("submit", "db_connectivity", error.to_string(), 4);
            }
        };
        if let Err(error) = migrations::run_pending(&pool).await {
            return CommandResult::failure("submit", "migration", error.to_string(), 5);
        }

        let orchestrator = orchestrator(
            gateways,
            Arc::new(SqlClientRepository::new(pool.clone())),
            Arc::new(SqlProposalDetailRepository::new(pool.clone())),
            settings,
        );
        let outcome = orchestrator.submit(&proposal, &banks).await;
        pool.close().await;

        report(outcome, false)
    })
}

fn orchestrator(
    gateways: Arc<BankGateways>,
    clients: Arc<dyn ClientRepository>,
    details: Arc<dyn ProposalDetailRepository>,
    settings: SubmissionSettings,
) -> SubmissionOrchestrator {
    SubmissionOrchestrator::new(
        Arc::new(ValidationManager::standard()),
        gateways,
        clients,
        details,
        settings,
    )
}

fn report(outcome: Result<SubmissionOutcome, SubmissionError>, dry_run: bool) -> CommandResult {
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(error) => return submission_failure(error),
    };

    let mut message = format!(
        "{} of {} banks accepted the proposal",
        outcome.summary.succeeded, outcome.summary.requested
    );
    if dry_run {
        message.push_str(" (dry run, nothing stored)");
    }
    info!(
        event_name = "cli.submit.completed",
        correlation_id = %outcome.correlation_id,
        succeeded = outcome.summary.succeeded,
        dry_run,
        "submit command completed"
    );
    if outcome.success {
        CommandResult::success_with_data("submit", message, to_data(&outcome))
    } else {
        CommandResult::failure_with_data("submit", "no_bank_accepted", message, 1, to_data(&outcome))
    }
}

fn submission_failure(error: SubmissionError) -> CommandResult {
    let message = error.to_string();
    match error {
        SubmissionError::Persistence { results, .. } => CommandResult::failure_with_data(
            "submit",
            "persistence",
            message,
            5,
            to_data(&results),
        ),
        SubmissionError::Repository(_) => CommandResult::failure("submit", "storage", message, 4),
        SubmissionError::NoBanksRequested
        | SubmissionError::NoStrategyRegistered(_)
        | SubmissionError::DuplicateApplication(_)
        | SubmissionError::ClientNotFound(_) => {
            CommandResult::failure("submit", "submission_precondition", message, 6)
        }
    }
}
