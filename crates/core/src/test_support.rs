//! Scripted ports for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tokio::sync::Mutex;

use crate::domain::proposal::{BankName, IdentityKey, Proposal};
use crate::domain::simulation::{SimulationQuote, SimulationRequest};
use crate::domain::submission::{ClientId, ClientRecord, ExternalProposalId, ProposalDetailRecord};
use crate::errors::{BankError, RepositoryError};
use crate::ports::{
    AccessToken, AuthPort, BankProposalPort, BankSimulationPort, BankSubmission, ClientRepository,
    IssuedToken, ProposalDetailRepository, ProposalDetails,
};

/// Issues `<bank>-token-<n>` with a fixed TTL and counts requests.
pub struct ScriptedAuth {
    bank: BankName,
    ttl: Duration,
    latency: Option<Duration>,
    failure: Option<BankError>,
    requests: AtomicUsize,
}

impl ScriptedAuth {
    pub fn new(bank: &str, ttl: Duration) -> Self {
        Self {
            bank: BankName(bank.to_string()),
            ttl,
            latency: None,
            failure: None,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn failing(bank: &str, error: BankError) -> Self {
        Self { failure: Some(error), ..Self::new(bank, Duration::from_secs(3600)) }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthPort for ScriptedAuth {
    fn bank(&self) -> &BankName {
        &self.bank
    }

    async fn request_token(&self) -> Result<IssuedToken, BankError> {
        let issued = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(IssuedToken { value: format!("{}-token-{issued}", self.bank).into(), ttl: self.ttl })
    }
}

/// Accepts every proposal as `<bank>-<n>` unless an error was queued first.
pub struct ScriptedBank {
    bank: BankName,
    latency: Option<Duration>,
    submit_errors: StdMutex<VecDeque<BankError>>,
    details_error: StdMutex<Option<BankError>>,
    submissions: StdMutex<Vec<Proposal>>,
    simulations: StdMutex<Vec<SimulationRequest>>,
    tokens: StdMutex<Vec<String>>,
    accepted: AtomicUsize,
}

impl ScriptedBank {
    pub fn accepting(bank: &str) -> Self {
        Self {
            bank: BankName(bank.to_string()),
            latency: None,
            submit_errors: StdMutex::new(VecDeque::new()),
            details_error: StdMutex::new(None),
            submissions: StdMutex::new(Vec::new()),
            simulations: StdMutex::new(Vec::new()),
            tokens: StdMutex::new(Vec::new()),
            accepted: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push_submit_error(&self, error: BankError) {
        self.submit_errors.lock().expect("submit errors lock").push_back(error);
    }

    pub fn fail_details(&self, error: BankError) {
        *self.details_error.lock().expect("details lock") = Some(error);
    }

    pub fn submissions_seen(&self) -> Vec<Proposal> {
        self.submissions.lock().expect("submissions lock").clone()
    }

    pub fn simulations_seen(&self) -> Vec<SimulationRequest> {
        self.simulations.lock().expect("simulations lock").clone()
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens.lock().expect("tokens lock").clone()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl BankProposalPort for ScriptedBank {
    async fn submit(
        &self,
        proposal: &Proposal,
        token: &AccessToken,
    ) -> Result<BankSubmission, BankError> {
        self.tokens.lock().expect("tokens lock").push(token.expose().to_string());
        self.pause().await;
        if let Some(error) = self.submit_errors.lock().expect("submit errors lock").pop_front() {
            return Err(error);
        }

        self.submissions.lock().expect("submissions lock").push(proposal.clone());
        let number = self.accepted.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("{}-{number}", self.bank);
        Ok(BankSubmission {
            proposal_id: ExternalProposalId(id.clone()),
            proposal_number: Some(format!("{number:06}")),
            raw: json!({ "id": id }),
        })
    }

    async fn proposal_details(
        &self,
        proposal_id: &ExternalProposalId,
        _token: &AccessToken,
    ) -> Result<ProposalDetails, BankError> {
        if let Some(error) = self.details_error.lock().expect("details lock").clone() {
            return Err(error);
        }
        Ok(ProposalDetails {
            proposal_id: proposal_id.clone(),
            status: Some("received".to_string()),
            payload: json!({ "id": proposal_id.0, "status": "received" }),
        })
    }
}

#[async_trait]
impl BankSimulationPort for ScriptedBank {
    async fn simulate(
        &self,
        request: &SimulationRequest,
        _token: &AccessToken,
    ) -> Result<SimulationQuote, BankError> {
        self.simulations.lock().expect("simulations lock").push(request.clone());
        Ok(SimulationQuote {
            monthly_installment: Some(Decimal::new(215_000, 2)),
            interest_rate_pct: Some(Decimal::new(1_049, 2)),
            total_cost: None,
            raw: json!({ "bank": request.bank }),
        })
    }
}

#[derive(Default)]
pub struct RecordingClients {
    clients: Mutex<HashMap<IdentityKey, ClientRecord>>,
    racing: Mutex<Option<ClientRecord>>,
    references: Mutex<Vec<(IdentityKey, BankName, ExternalProposalId)>>,
    lookups: AtomicUsize,
    creates: AtomicUsize,
}

impl RecordingClients {
    pub async fn seed(&self, proposal: &Proposal) -> ClientRecord {
        let record = client_for(proposal);
        self.clients.lock().await.insert(record.identity_key.clone(), record.clone());
        record
    }

    /// Stores a client for the proposal just before the next `create` runs, the way a
    /// concurrent batch for the same applicant would.
    pub async fn register_before_next_create(&self, proposal: &Proposal) -> ClientRecord {
        let record = client_for(proposal);
        *self.racing.lock().await = Some(record.clone());
        record
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub async fn references(&self) -> Vec<(IdentityKey, BankName, ExternalProposalId)> {
        self.references.lock().await.clone()
    }
}

fn client_for(proposal: &Proposal) -> ClientRecord {
    ClientRecord {
        id: ClientId::generate(),
        identity_key: proposal.identity_key(),
        name: proposal.applicant.name.clone(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl ClientRepository for RecordingClients {
    async fn find_by_identity(
        &self,
        identity: &IdentityKey,
    ) -> Result<Option<ClientRecord>, RepositoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.clients.lock().await.get(identity).cloned())
    }

    async fn create(&self, proposal: &Proposal) -> Result<ClientRecord, RepositoryError> {
        let mut clients = self.clients.lock().await;
        if let Some(winner) = self.racing.lock().await.take() {
            clients.insert(winner.identity_key.clone(), winner);
        }
        let identity = proposal.identity_key();
        if clients.contains_key(&identity) {
            return Err(RepositoryError::Conflict(identity.0));
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        let record = client_for(proposal);
        clients.insert(identity, record.clone());
        Ok(record)
    }

    async fn update_bank_reference(
        &self,
        identity: &IdentityKey,
        bank: &BankName,
        proposal_id: &ExternalProposalId,
    ) -> Result<(), RepositoryError> {
        self.references.lock().await.push((identity.clone(), bank.clone(), proposal_id.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDetails {
    records: Mutex<Vec<ProposalDetailRecord>>,
    failure: Option<RepositoryError>,
}

impl RecordingDetails {
    pub fn failing(error: RepositoryError) -> Self {
        Self { records: Mutex::new(Vec::new()), failure: Some(error) }
    }

    pub async fn records(&self) -> Vec<ProposalDetailRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl ProposalDetailRepository for RecordingDetails {
    async fn save(&self, record: &ProposalDetailRecord) -> Result<(), RepositoryError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}
