use lendrelay_core::errors::RepositoryError;

pub mod client;
pub mod memory;
pub mod proposal_detail;

pub use client::SqlClientRepository;
pub use memory::{InMemoryClientRepository, InMemoryProposalDetailRepository};
pub use proposal_detail::SqlProposalDetailRepository;

/// Maps a driver error onto the port error. Unique violations become `Conflict`.
pub(crate) fn storage_error(error: sqlx::Error) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(db.message().to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            RepositoryError::Decode(error.to_string())
        }
        sqlx::Error::RowNotFound => RepositoryError::NotFound(error.to_string()),
        _ => RepositoryError::Storage(error.to_string()),
    }
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use lendrelay_core::domain::proposal::{
        Applicant, BankName, FlowType, MaritalStatus, PropertyType, Proposal, Spouse,
    };

    pub fn married_proposal(document: &str) -> Proposal {
        Proposal {
            applicant: Applicant {
                name: "Carla Menezes".to_string(),
                document: document.to_string(),
                email: Some("carla@example.com".to_string()),
                phone: Some("+55 11 99999-0000".to_string()),
                birth_date: NaiveDate::from_ymd_opt(1988, 4, 12),
            },
            spouse: Some(Spouse {
                name: "Rui Menezes".to_string(),
                document: "987.654.321-00".to_string(),
                birth_date: None,
                monthly_income: Decimal::from(6_000),
            }),
            property_value: Decimal::from(450_000),
            financed_value: Decimal::from(300_000),
            term_months: 360,
            property_type: PropertyType::Residential,
            marital_status: MaritalStatus::Married,
            monthly_income: Decimal::from(12_000),
            flow_type: FlowType::New,
            selected_banks: BTreeSet::from([BankName("itau".to_string())]),
            construction: None,
            portability: None,
        }
    }
}
