use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::proposal::{BankName, Proposal};
use crate::domain::simulation::{SimulationRequest, SimulationResult};
use crate::domain::submission::SubmissionFailure;
use crate::domain::validation::Adjustment;
use crate::gateway::BankGateways;
use crate::normalization::{NormalizationError, Normalizer, SimulationNormalizer};

/// Quotes a proposal at several banks. Nothing is persisted.
pub struct SimulationService {
    normalizer: SimulationNormalizer,
    gateways: Arc<BankGateways>,
}

impl SimulationService {
    pub fn new(normalizer: SimulationNormalizer, gateways: Arc<BankGateways>) -> Self {
        Self { normalizer, gateways }
    }

    pub async fn simulate(&self, proposal: &Proposal, banks: &[BankName]) -> Vec<SimulationResult> {
        let mut results = Vec::with_capacity(banks.len());
        for bank in banks {
            results.push(self.simulate_bank(proposal, bank).await);
        }
        results
    }

    async fn simulate_bank(&self, proposal: &Proposal, bank: &BankName) -> SimulationResult {
        let normalization = match self.normalizer.normalize(&proposal.loan_terms(), bank) {
            Ok(normalization) => normalization,
            Err(NormalizationError::Rejected(rejection)) => {
                return failed(
                    bank,
                    Vec::new(),
                    SubmissionFailure::Rejected { reasons: vec![rejection.reason] },
                );
            }
            Err(error @ NormalizationError::UnknownBank(_)) => {
                return failed(
                    bank,
                    Vec::new(),
                    SubmissionFailure::Unavailable { message: error.to_string() },
                );
            }
        };

        let Some(gateway) = self.gateways.get(bank) else {
            return failed(
                bank,
                normalization.adjustments,
                SubmissionFailure::Unavailable { message: format!("no gateway configured for {bank}") },
            );
        };

        let adjusted_snapshot = normalization.adjusted.snapshot();
        let request = SimulationRequest {
            bank: bank.clone(),
            terms: normalization.adjusted,
            applicant_document: proposal.applicant.document.clone(),
            birth_date: proposal.applicant.birth_date,
        };

        match gateway.simulate(&request).await {
            Ok(quote) => {
                info!(
                    event_name = "simulation.bank.quoted",
                    bank = %bank,
                    adjustments = normalization.adjustments.len(),
                    "simulation quoted"
                );
                SimulationResult {
                    bank: bank.clone(),
                    success: true,
                    quote: Some(quote),
                    adjustments: normalization.adjustments,
                    adjusted_snapshot: Some(adjusted_snapshot),
                    error: None,
                }
            }
            Err(error) => {
                warn!(
                    event_name = "simulation.bank.failed",
                    bank = %bank,
                    error_class = error.error_class(),
                    "simulation failed"
                );
                SimulationResult {
                    bank: bank.clone(),
                    success: false,
                    quote: None,
                    adjustments: normalization.adjustments,
                    adjusted_snapshot: Some(adjusted_snapshot),
                    error: Some(SubmissionFailure::Bank { error }),
                }
            }
        }
    }
}

fn failed(
    bank: &BankName,
    adjustments: Vec<Adjustment>,
    error: SubmissionFailure,
) -> SimulationResult {
    SimulationResult {
        bank: bank.clone(),
        success: false,
        quote: None,
        adjustments,
        adjusted_snapshot: None,
        error: Some(error),
    }
}
