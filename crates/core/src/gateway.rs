//! One bank's ports behind its credential cache and a call timeout.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::credentials::CredentialCache;
use crate::domain::proposal::{BankName, Proposal};
use crate::domain::simulation::{SimulationQuote, SimulationRequest};
use crate::domain::submission::ExternalProposalId;
use crate::errors::BankError;
use crate::ports::{
    AuthPort, BankProposalPort, BankSimulationPort, BankSubmission, ProposalDetails,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatewaySettings {
    pub call_timeout: Duration,
    pub token_safety_margin: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self { call_timeout: Duration::from_secs(30), token_safety_margin: Duration::from_secs(60) }
    }
}

pub struct BankGateway {
    bank: BankName,
    proposals: Arc<dyn BankProposalPort>,
    simulations: Option<Arc<dyn BankSimulationPort>>,
    credentials: CredentialCache,
    call_timeout: Duration,
}

impl BankGateway {
    pub fn new(
        auth: Arc<dyn AuthPort>,
        proposals: Arc<dyn BankProposalPort>,
        settings: GatewaySettings,
    ) -> Self {
        let credentials = CredentialCache::new(auth, settings.token_safety_margin);
        Self {
            bank: credentials.bank().clone(),
            proposals,
            simulations: None,
            credentials,
            call_timeout: settings.call_timeout,
        }
    }

    pub fn with_simulations(mut self, simulations: Arc<dyn BankSimulationPort>) -> Self {
        self.simulations = Some(simulations);
        self
    }

    pub fn bank(&self) -> &BankName {
        &self.bank
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    pub async fn submit(&self, proposal: &Proposal) -> Result<BankSubmission, BankError> {
        let proposals = &self.proposals;
        self.credentials
            .execute(|token| async move {
                self.bounded(proposals.submit(proposal, &token)).await
            })
            .await
    }

    pub async fn proposal_details(
        &self,
        proposal_id: &ExternalProposalId,
    ) -> Result<ProposalDetails, BankError> {
        let proposals = &self.proposals;
        self.credentials
            .execute(|token| async move {
                self.bounded(proposals.proposal_details(proposal_id, &token)).await
            })
            .await
    }

    pub async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationQuote, BankError> {
        let Some(simulations) = &self.simulations else {
            return Err(BankError::Unsupported(format!("{} has no simulation endpoint", self.bank)));
        };
        self.credentials
            .execute(|token| async move {
                self.bounded(simulations.simulate(request, &token)).await
            })
            .await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, BankError>>,
    ) -> Result<T, BankError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(
                    event_name = "gateway.call.timeout",
                    bank = %self.bank,
                    timeout_secs = self.call_timeout.as_secs(),
                    "bank call timed out"
                );
                Err(BankError::Timeout(self.call_timeout.as_secs()))
            }
        }
    }
}

/// Gateways keyed by bank.
#[derive(Default)]
pub struct BankGateways {
    gateways: BTreeMap<BankName, Arc<BankGateway>>,
}

impl BankGateways {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, gateway: BankGateway) {
        self.gateways.insert(gateway.bank().clone(), Arc::new(gateway));
    }

    pub fn with(mut self, gateway: BankGateway) -> Self {
        self.insert(gateway);
        self
    }

    pub fn get(&self, bank: &BankName) -> Option<&Arc<BankGateway>> {
        self.gateways.get(bank)
    }

    pub fn banks(&self) -> impl Iterator<Item = &BankName> {
        self.gateways.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}
