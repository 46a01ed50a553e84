use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::proposal::{BankName, LoanTerms, ProposalSnapshot};
use crate::domain::submission::SubmissionFailure;
use crate::domain::validation::Adjustment;

/// Payload handed to a bank's simulation endpoint after simulation-time normalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub bank: BankName,
    pub terms: LoanTerms,
    pub applicant_document: String,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationQuote {
    pub monthly_installment: Option<Decimal>,
    pub interest_rate_pct: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub raw: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub bank: BankName,
    pub success: bool,
    pub quote: Option<SimulationQuote>,
    pub adjustments: Vec<Adjustment>,
    pub adjusted_snapshot: Option<ProposalSnapshot>,
    pub error: Option<SubmissionFailure>,
}
