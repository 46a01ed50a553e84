//! Boundaries to partner banks and storage.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::domain::proposal::{BankName, IdentityKey, Proposal};
use crate::domain::simulation::{SimulationQuote, SimulationRequest};
use crate::domain::submission::{ClientRecord, ExternalProposalId, ProposalDetailRecord};
use crate::errors::{BankError, RepositoryError};

/// Bearer credential handed to bank ports. Never printed.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    pub fn from_secret(value: SecretString) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

pub struct IssuedToken {
    pub value: SecretString,
    pub ttl: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BankSubmission {
    pub proposal_id: ExternalProposalId,
    pub proposal_number: Option<String>,
    pub raw: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProposalDetails {
    pub proposal_id: ExternalProposalId,
    pub status: Option<String>,
    pub payload: Value,
}

#[async_trait]
pub trait AuthPort: Send + Sync {
    fn bank(&self) -> &BankName;

    async fn request_token(&self) -> Result<IssuedToken, BankError>;
}

#[async_trait]
pub trait BankProposalPort: Send + Sync {
    async fn submit(
        &self,
        proposal: &Proposal,
        token: &AccessToken,
    ) -> Result<BankSubmission, BankError>;

    async fn proposal_details(
        &self,
        proposal_id: &ExternalProposalId,
        token: &AccessToken,
    ) -> Result<ProposalDetails, BankError>;
}

#[async_trait]
pub trait BankSimulationPort: Send + Sync {
    async fn simulate(
        &self,
        request: &SimulationRequest,
        token: &AccessToken,
    ) -> Result<SimulationQuote, BankError>;
}

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn find_by_identity(
        &self,
        identity: &IdentityKey,
    ) -> Result<Option<ClientRecord>, RepositoryError>;

    /// Creates the client with its contact detail row. Fails with `Conflict` when the identity
    /// key already exists.
    async fn create(&self, proposal: &Proposal) -> Result<ClientRecord, RepositoryError>;

    async fn update_bank_reference(
        &self,
        identity: &IdentityKey,
        bank: &BankName,
        proposal_id: &ExternalProposalId,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ProposalDetailRepository: Send + Sync {
    async fn save(&self, record: &ProposalDetailRecord) -> Result<(), RepositoryError>;
}
