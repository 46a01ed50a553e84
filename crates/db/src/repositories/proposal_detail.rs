use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::info;

use lendrelay_core::domain::proposal::BankName;
use lendrelay_core::domain::submission::{ClientId, ExternalProposalId, ProposalDetailRecord};
use lendrelay_core::errors::RepositoryError;
use lendrelay_core::ports::ProposalDetailRepository;

use super::{decode_error, storage_error};
use crate::DbPool;

/// Bank-side proposal details, one row per bank proposal id.
pub struct SqlProposalDetailRepository {
    pool: DbPool,
}

impl SqlProposalDetailRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_client(
        &self,
        client_id: &ClientId,
    ) -> Result<Vec<ProposalDetailRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT client_id, bank, external_proposal_id, proposal_number, status,
                    adjustments_json, payload_json, created_at
             FROM proposal_detail
             WHERE client_id = ?
             ORDER BY bank, id",
        )
        .bind(client_id.0.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(|row| row_to_detail(row, client_id)).collect()
    }
}

fn row_to_detail(
    row: &sqlx::sqlite::SqliteRow,
    client_id: &ClientId,
) -> Result<ProposalDetailRecord, RepositoryError> {
    let bank: String = row.try_get("bank").map_err(decode_error)?;
    let external_proposal_id: String =
        row.try_get("external_proposal_id").map_err(decode_error)?;
    let adjustments_json: String = row.try_get("adjustments_json").map_err(decode_error)?;
    let payload_json: String = row.try_get("payload_json").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(ProposalDetailRecord {
        client_id: client_id.clone(),
        bank: BankName(bank),
        external_proposal_id: ExternalProposalId(external_proposal_id),
        proposal_number: row.try_get("proposal_number").map_err(decode_error)?,
        status: row.try_get("status").map_err(decode_error)?,
        adjustments: serde_json::from_str(&adjustments_json).map_err(decode_error)?,
        payload: serde_json::from_str(&payload_json).map_err(decode_error)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(decode_error)?
            .with_timezone(&Utc),
    })
}

#[async_trait::async_trait]
impl ProposalDetailRepository for SqlProposalDetailRepository {
    async fn save(&self, record: &ProposalDetailRecord) -> Result<(), RepositoryError> {
        let adjustments = serde_json::to_string(&record.adjustments).map_err(decode_error)?;
        let payload = serde_json::to_string(&record.payload).map_err(decode_error)?;

        sqlx::query(
            "INSERT INTO proposal_detail (client_id, bank, external_proposal_id, proposal_number,
                                          status, adjustments_json, payload_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(bank, external_proposal_id) DO UPDATE SET
                 proposal_number = excluded.proposal_number,
                 status = excluded.status,
                 adjustments_json = excluded.adjustments_json,
                 payload_json = excluded.payload_json",
        )
        .bind(record.client_id.0.to_string())
        .bind(record.bank.as_str())
        .bind(&record.external_proposal_id.0)
        .bind(&record.proposal_number)
        .bind(&record.status)
        .bind(adjustments)
        .bind(payload)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        info!(
            event_name = "db.proposal_detail.saved",
            client_id = %record.client_id.0,
            bank = %record.bank,
            "proposal detail saved"
        );
        Ok(())
    }
}
