use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::proposal::{BankName, IdentityKey};
use crate::domain::validation::Adjustment;
use crate::errors::BankError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalProposalId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: ClientId,
    pub identity_key: IdentityKey,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalDetailRecord {
    pub client_id: ClientId,
    pub bank: BankName,
    pub external_proposal_id: ExternalProposalId,
    pub proposal_number: Option<String>,
    pub status: Option<String>,
    pub adjustments: Vec<Adjustment>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// Why a bank attempt did not produce a submitted proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionFailure {
    Rejected { reasons: Vec<String> },
    Bank { error: BankError },
    Unavailable { message: String },
}

impl SubmissionFailure {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "validation_rejected",
            Self::Bank { error } => error.error_class(),
            Self::Unavailable { .. } => "bank_unavailable",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResult {
    pub bank: BankName,
    pub success: bool,
    pub proposal_id: Option<ExternalProposalId>,
    pub proposal_number: Option<String>,
    pub adjustments: Vec<Adjustment>,
    pub error: Option<SubmissionFailure>,
}

impl ProposalResult {
    pub fn failed(bank: BankName, adjustments: Vec<Adjustment>, error: SubmissionFailure) -> Self {
        Self {
            bank,
            success: false,
            proposal_id: None,
            proposal_number: None,
            adjustments,
            error: Some(error),
        }
    }

    pub fn submitted(
        bank: BankName,
        proposal_id: ExternalProposalId,
        proposal_number: Option<String>,
        adjustments: Vec<Adjustment>,
    ) -> Self {
        Self {
            bank,
            success: true,
            proposal_id: Some(proposal_id),
            proposal_number,
            adjustments,
            error: None,
        }
    }
}
