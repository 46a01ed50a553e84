use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use lendrelay_core::domain::proposal::{BankName, IdentityKey, Proposal};
use lendrelay_core::domain::submission::{ClientId, ClientRecord, ExternalProposalId};
use lendrelay_core::errors::RepositoryError;
use lendrelay_core::ports::ClientRepository;

use super::{decode_error, storage_error};
use crate::DbPool;

pub struct SqlClientRepository {
    pool: DbPool,
}

impl SqlClientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Latest external proposal id per bank for one client, ordered by bank.
    pub async fn bank_references(
        &self,
        identity: &IdentityKey,
    ) -> Result<Vec<(BankName, ExternalProposalId)>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT r.bank, r.external_proposal_id
             FROM client_bank_reference r
             JOIN client c ON c.id = r.client_id
             WHERE c.identity_key = ?
             ORDER BY r.bank",
        )
        .bind(&identity.0)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter()
            .map(|row| {
                let bank: String = row.try_get("bank").map_err(decode_error)?;
                let proposal_id: String =
                    row.try_get("external_proposal_id").map_err(decode_error)?;
                Ok((BankName(bank), ExternalProposalId(proposal_id)))
            })
            .collect()
    }
}

fn row_to_client(row: &sqlx::sqlite::SqliteRow) -> Result<ClientRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let identity_key: String = row.try_get("identity_key").map_err(decode_error)?;
    let name: String = row.try_get("name").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(ClientRecord {
        id: ClientId(Uuid::parse_str(&id).map_err(decode_error)?),
        identity_key: IdentityKey(identity_key),
        name,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(decode_error)?
            .with_timezone(&Utc),
    })
}

#[async_trait::async_trait]
impl ClientRepository for SqlClientRepository {
    async fn find_by_identity(
        &self,
        identity: &IdentityKey,
    ) -> Result<Option<ClientRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, identity_key, name, created_at FROM client WHERE identity_key = ?",
        )
        .bind(&identity.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.as_ref().map(row_to_client).transpose()
    }

    async fn create(&self, proposal: &Proposal) -> Result<ClientRecord, RepositoryError> {
        let record = ClientRecord {
            id: ClientId::generate(),
            identity_key: proposal.identity_key(),
            name: proposal.applicant.name.clone(),
            created_at: Utc::now(),
        };
        let created_at = record.created_at.to_rfc3339();
        let spouse = proposal.spouse.as_ref();

        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::query("INSERT INTO client (id, identity_key, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(record.id.0.to_string())
            .bind(&record.identity_key.0)
            .bind(&record.name)
            .bind(&created_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        sqlx::query(
            "INSERT INTO client_detail (client_id, document, email, phone, birth_date,
                                        marital_status, monthly_income, spouse_name,
                                        spouse_document, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.0.to_string())
        .bind(&proposal.applicant.document)
        .bind(&proposal.applicant.email)
        .bind(&proposal.applicant.phone)
        .bind(proposal.applicant.birth_date.map(|date| date.to_string()))
        .bind(proposal.marital_status.as_str())
        .bind(proposal.monthly_income.to_string())
        .bind(spouse.map(|spouse| spouse.name.clone()))
        .bind(spouse.map(|spouse| spouse.document.clone()))
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        info!(
            event_name = "db.client.created",
            client_id = %record.id.0,
            "client created"
        );
        Ok(record)
    }

    async fn update_bank_reference(
        &self,
        identity: &IdentityKey,
        bank: &BankName,
        proposal_id: &ExternalProposalId,
    ) -> Result<(), RepositoryError> {
        let client = self
            .find_by_identity(identity)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("client {identity}")))?;

        sqlx::query(
            "INSERT INTO client_bank_reference (client_id, bank, external_proposal_id, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(client_id, bank) DO UPDATE SET
                 external_proposal_id = excluded.external_proposal_id,
                 updated_at = excluded.updated_at",
        )
        .bind(client.id.0.to_string())
        .bind(bank.as_str())
        .bind(&proposal_id.0)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        debug!(
            event_name = "db.client.bank_reference_updated",
            client_id = %client.id.0,
            bank = %bank,
            "bank reference updated"
        );
        Ok(())
    }
}
