//! Multi-bank proposal submission.
//!
//! Preconditions are checked before any bank is contacted. Banks are then processed one after
//! another; a failure at one bank never stops the others. Storage is only touched when at least
//! one bank accepted the proposal.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::proposal::{BankName, FlowType, IdentityKey, Proposal};
use crate::domain::submission::{
    ClientId, ClientRecord, ProposalDetailRecord, ProposalResult, SubmissionFailure,
};
use crate::domain::validation::Adjustment;
use crate::errors::RepositoryError;
use crate::gateway::{BankGateway, BankGateways};
use crate::ports::{BankSubmission, ClientRepository, ProposalDetailRepository, ProposalDetails};
use crate::validation::ValidationManager;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmissionSettings {
    /// Wait before fetching details of freshly created proposals.
    pub settle_delay: Duration,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self { settle_delay: Duration::from_secs(5) }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub adjusted: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub correlation_id: Uuid,
    pub success: bool,
    pub results: Vec<ProposalResult>,
    pub client_id: Option<ClientId>,
    pub summary: SubmissionSummary,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("no banks were requested")]
    NoBanksRequested,
    #[error("none of the requested banks has a validation strategy: {}", join(.0))]
    NoStrategyRegistered(Vec<BankName>),
    #[error("a client with identity `{0}` already exists; use the resend or add_bank flow")]
    DuplicateApplication(IdentityKey),
    #[error("no client with identity `{0}` exists; use the new flow")]
    ClientNotFound(IdentityKey),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("proposals were submitted but could not be stored: {source}")]
    Persistence { source: RepositoryError, results: Vec<ProposalResult> },
}

fn join(banks: &[BankName]) -> String {
    banks.iter().map(BankName::as_str).collect::<Vec<_>>().join(", ")
}

struct Accepted {
    gateway: Arc<BankGateway>,
    submission: BankSubmission,
    adjustments: Vec<Adjustment>,
}

pub struct SubmissionOrchestrator {
    validation: Arc<ValidationManager>,
    gateways: Arc<BankGateways>,
    clients: Arc<dyn ClientRepository>,
    details: Arc<dyn ProposalDetailRepository>,
    settings: SubmissionSettings,
}

impl SubmissionOrchestrator {
    pub fn new(
        validation: Arc<ValidationManager>,
        gateways: Arc<BankGateways>,
        clients: Arc<dyn ClientRepository>,
        details: Arc<dyn ProposalDetailRepository>,
        settings: SubmissionSettings,
    ) -> Self {
        Self { validation, gateways, clients, details, settings }
    }

    pub async fn submit(
        &self,
        proposal: &Proposal,
        banks: &[BankName],
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let banks = distinct(banks);
        if banks.is_empty() {
            return Err(SubmissionError::NoBanksRequested);
        }
        if !banks.iter().any(|bank| self.validation.has_strategy(bank)) {
            return Err(SubmissionError::NoStrategyRegistered(banks));
        }

        let identity = proposal.identity_key();
        let existing = self.clients.find_by_identity(&identity).await?;
        match (proposal.flow_type, &existing) {
            (FlowType::New, Some(_)) => return Err(SubmissionError::DuplicateApplication(identity)),
            (FlowType::Resend | FlowType::AddBank, None) => {
                return Err(SubmissionError::ClientNotFound(identity))
            }
            _ => {}
        }

        let correlation_id = Uuid::new_v4();
        info!(
            event_name = "submission.started",
            correlation_id = %correlation_id,
            flow_type = proposal.flow_type.as_str(),
            banks = banks.len(),
            "proposal submission started"
        );

        let mut results = Vec::with_capacity(banks.len());
        let mut accepted = Vec::new();
        for bank in &banks {
            let (result, submitted) = self.submit_to_bank(correlation_id, proposal, bank).await;
            results.push(result);
            if let Some(submitted) = submitted {
                accepted.push(submitted);
            }
        }

        let summary = SubmissionSummary {
            requested: banks.len(),
            succeeded: accepted.len(),
            failed: banks.len() - accepted.len(),
            adjusted: results.iter().filter(|result| !result.adjustments.is_empty()).count(),
        };

        if accepted.is_empty() {
            info!(
                event_name = "submission.completed",
                correlation_id = %correlation_id,
                succeeded = 0,
                failed = summary.failed,
                "no bank accepted the proposal; nothing persisted"
            );
            return Ok(SubmissionOutcome {
                correlation_id,
                success: false,
                results,
                client_id: existing.map(|client| client.id),
                summary,
            });
        }

        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }
        let details = self.fetch_details(correlation_id, &accepted).await;

        let client = match existing {
            Some(client) => client,
            None => match self.create_client(correlation_id, proposal, &identity).await {
                Ok(client) => client,
                Err(source) => return Err(self.persistence_failed(correlation_id, source, results)),
            },
        };

        for (submitted, detail) in accepted.iter().zip(details) {
            if let Err(source) = self.persist(&client, &identity, submitted, detail).await {
                return Err(self.persistence_failed(correlation_id, source, results));
            }
        }

        info!(
            event_name = "submission.completed",
            correlation_id = %correlation_id,
            client_id = %client.id.0,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "proposal submission completed"
        );

        Ok(SubmissionOutcome {
            correlation_id,
            success: true,
            results,
            client_id: Some(client.id),
            summary,
        })
    }

    async fn submit_to_bank(
        &self,
        correlation_id: Uuid,
        proposal: &Proposal,
        bank: &BankName,
    ) -> (ProposalResult, Option<Accepted>) {
        let validation = self.validation.adjust_for_bank(proposal, bank);
        if !validation.is_valid {
            info!(
                event_name = "submission.bank.rejected",
                correlation_id = %correlation_id,
                bank = %bank,
                errors = validation.errors.len(),
                "proposal rejected by bank policy"
            );
            let reasons = validation.rejection_reasons();
            return (
                ProposalResult::failed(
                    bank.clone(),
                    validation.adjustments,
                    SubmissionFailure::Rejected { reasons },
                ),
                None,
            );
        }

        let Some(gateway) = self.gateways.get(bank) else {
            warn!(
                event_name = "submission.bank.unavailable",
                correlation_id = %correlation_id,
                bank = %bank,
                "no gateway configured for bank"
            );
            return (
                ProposalResult::failed(
                    bank.clone(),
                    validation.adjustments,
                    SubmissionFailure::Unavailable {
                        message: format!("no gateway configured for {bank}"),
                    },
                ),
                None,
            );
        };

        let adjusted = match &validation.adjusted_snapshot {
            Some(snapshot) => proposal.with_snapshot(snapshot),
            None => proposal.clone(),
        };

        match gateway.submit(&adjusted).await {
            Ok(submission) => {
                info!(
                    event_name = "submission.bank.accepted",
                    correlation_id = %correlation_id,
                    bank = %bank,
                    proposal_id = %submission.proposal_id.0,
                    adjustments = validation.adjustments.len(),
                    "bank accepted the proposal"
                );
                let result = ProposalResult::submitted(
                    bank.clone(),
                    submission.proposal_id.clone(),
                    submission.proposal_number.clone(),
                    validation.adjustments.clone(),
                );
                let accepted = Accepted {
                    gateway: Arc::clone(gateway),
                    submission,
                    adjustments: validation.adjustments,
                };
                (result, Some(accepted))
            }
            Err(error) => {
                warn!(
                    event_name = "submission.bank.failed",
                    correlation_id = %correlation_id,
                    bank = %bank,
                    error_class = error.error_class(),
                    error = %error,
                    "bank call failed"
                );
                (
                    ProposalResult::failed(
                        bank.clone(),
                        validation.adjustments,
                        SubmissionFailure::Bank { error },
                    ),
                    None,
                )
            }
        }
    }

    /// Best effort: a failed detail fetch leaves the stored record with the submit response.
    async fn fetch_details(
        &self,
        correlation_id: Uuid,
        accepted: &[Accepted],
    ) -> Vec<Option<ProposalDetails>> {
        let mut details = Vec::with_capacity(accepted.len());
        for submitted in accepted {
            match submitted.gateway.proposal_details(&submitted.submission.proposal_id).await {
                Ok(found) => details.push(Some(found)),
                Err(error) => {
                    warn!(
                        event_name = "submission.details.unavailable",
                        correlation_id = %correlation_id,
                        bank = %submitted.gateway.bank(),
                        error_class = error.error_class(),
                        "could not fetch proposal details"
                    );
                    details.push(None);
                }
            }
        }
        details
    }

    /// Creates the client, or adopts the one a concurrent batch stored first.
    async fn create_client(
        &self,
        correlation_id: Uuid,
        proposal: &Proposal,
        identity: &IdentityKey,
    ) -> Result<ClientRecord, RepositoryError> {
        match self.clients.create(proposal).await {
            Err(RepositoryError::Conflict(key)) => {
                let client = self
                    .clients
                    .find_by_identity(identity)
                    .await?
                    .ok_or(RepositoryError::Conflict(key))?;
                info!(
                    event_name = "submission.client.reused",
                    correlation_id = %correlation_id,
                    client_id = %client.id.0,
                    "client was created concurrently; reusing it"
                );
                Ok(client)
            }
            created => created,
        }
    }

    async fn persist(
        &self,
        client: &ClientRecord,
        identity: &IdentityKey,
        submitted: &Accepted,
        details: Option<ProposalDetails>,
    ) -> Result<(), RepositoryError> {
        let bank = submitted.gateway.bank();
        let (status, payload) = match details {
            Some(details) => (details.status, details.payload),
            None => (None, submitted.submission.raw.clone()),
        };

        let record = ProposalDetailRecord {
            client_id: client.id.clone(),
            bank: bank.clone(),
            external_proposal_id: submitted.submission.proposal_id.clone(),
            proposal_number: submitted.submission.proposal_number.clone(),
            status,
            adjustments: submitted.adjustments.clone(),
            payload,
            created_at: Utc::now(),
        };
        self.details.save(&record).await?;
        self.clients
            .update_bank_reference(identity, bank, &submitted.submission.proposal_id)
            .await
    }

    fn persistence_failed(
        &self,
        correlation_id: Uuid,
        source: RepositoryError,
        results: Vec<ProposalResult>,
    ) -> SubmissionError {
        warn!(
            event_name = "submission.persistence.failed",
            correlation_id = %correlation_id,
            error = %source,
            "submitted proposals could not be stored"
        );
        SubmissionError::Persistence { source, results }
    }
}

fn distinct(banks: &[BankName]) -> Vec<BankName> {
    let mut seen = BTreeSet::new();
    banks.iter().filter(|bank| seen.insert((*bank).clone())).cloned().collect()
}
