use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use lendrelay_core::domain::proposal::{BankName, IdentityKey, Proposal};
use lendrelay_core::domain::submission::{
    ClientId, ClientRecord, ExternalProposalId, ProposalDetailRecord,
};
use lendrelay_core::errors::RepositoryError;
use lendrelay_core::ports::{ClientRepository, ProposalDetailRepository};

/// Clients and their bank references kept in process. Used by dry runs and tests.
#[derive(Default)]
pub struct InMemoryClientRepository {
    clients: RwLock<HashMap<IdentityKey, ClientRecord>>,
    references: RwLock<HashMap<(IdentityKey, BankName), ExternalProposalId>>,
}

impl InMemoryClientRepository {
    pub async fn bank_reference(
        &self,
        identity: &IdentityKey,
        bank: &BankName,
    ) -> Option<ExternalProposalId> {
        self.references.read().await.get(&(identity.clone(), bank.clone())).cloned()
    }
}

#[async_trait::async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn find_by_identity(
        &self,
        identity: &IdentityKey,
    ) -> Result<Option<ClientRecord>, RepositoryError> {
        let clients = self.clients.read().await;
        Ok(clients.get(identity).cloned())
    }

    async fn create(&self, proposal: &Proposal) -> Result<ClientRecord, RepositoryError> {
        let identity = proposal.identity_key();
        let mut clients = self.clients.write().await;
        if clients.contains_key(&identity) {
            return Err(RepositoryError::Conflict(format!("client {identity} already exists")));
        }
        let record = ClientRecord {
            id: ClientId::generate(),
            identity_key: identity.clone(),
            name: proposal.applicant.name.clone(),
            created_at: Utc::now(),
        };
        clients.insert(identity, record.clone());
        Ok(record)
    }

    async fn update_bank_reference(
        &self,
        identity: &IdentityKey,
        bank: &BankName,
        proposal_id: &ExternalProposalId,
    ) -> Result<(), RepositoryError> {
        if !self.clients.read().await.contains_key(identity) {
            return Err(RepositoryError::NotFound(format!("client {identity}")));
        }
        let mut references = self.references.write().await;
        references.insert((identity.clone(), bank.clone()), proposal_id.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProposalDetailRepository {
    records: RwLock<HashMap<(BankName, ExternalProposalId), ProposalDetailRecord>>,
}

impl InMemoryProposalDetailRepository {
    pub async fn list_for_client(&self, client_id: &ClientId) -> Vec<ProposalDetailRecord> {
        let records = self.records.read().await;
        let mut listed: Vec<ProposalDetailRecord> =
            records.values().filter(|record| &record.client_id == client_id).cloned().collect();
        listed.sort_by(|left, right| left.bank.cmp(&right.bank));
        listed
    }
}

#[async_trait::async_trait]
impl ProposalDetailRepository for InMemoryProposalDetailRepository {
    async fn save(&self, record: &ProposalDetailRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert(
            (record.bank.clone(), record.external_proposal_id.clone()),
            record.clone(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use lendrelay_core::domain::proposal::BankName;
    use lendrelay_core::domain::submission::{ExternalProposalId, ProposalDetailRecord};
    use lendrelay_core::errors::RepositoryError;
    use lendrelay_core::ports::{ClientRepository, ProposalDetailRepository};

    use crate::repositories::fixtures::married_proposal;
    use crate::repositories::{InMemoryClientRepository, InMemoryProposalDetailRepository};

    #[tokio::test]
    async fn in_memory_clients_reject_duplicate_identity() {
        let repo = InMemoryClientRepository::default();
        let created = repo.create(&married_proposal("123.456.789-09")).await.expect("create");

        let found = repo.find_by_identity(&created.identity_key).await.expect("find");
        let duplicate = repo.create(&married_proposal("12345678909")).await;

        assert_eq!(found, Some(created));
        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn in_memory_bank_reference_round_trip() {
        let repo = InMemoryClientRepository::default();
        let client = repo.create(&married_proposal("123.456.789-09")).await.expect("create");
        let bank = BankName("inter".to_string());

        repo.update_bank_reference(&client.identity_key, &bank, &ExternalProposalId("IN-3".into()))
            .await
            .expect("reference");

        assert_eq!(
            repo.bank_reference(&client.identity_key, &bank).await,
            Some(ExternalProposalId("IN-3".into()))
        );
    }

    #[tokio::test]
    async fn in_memory_details_are_listed_per_client() {
        let clients = InMemoryClientRepository::default();
        let details = InMemoryProposalDetailRepository::default();
        let client = clients.create(&married_proposal("123.456.789-09")).await.expect("create");
        let record = ProposalDetailRecord {
            client_id: client.id.clone(),
            bank: BankName("itau".to_string()),
            external_proposal_id: ExternalProposalId("IT-1".into()),
            proposal_number: None,
            status: None,
            adjustments: Vec::new(),
            payload: json!({ "id": "IT-1" }),
            created_at: Utc::now(),
        };

        details.save(&record).await.expect("save");

        assert_eq!(details.list_for_client(&client.id).await, vec![record]);
    }
}
