use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use lendrelay_core::config::AppConfig;
use lendrelay_core::domain::proposal::BankName;
use lendrelay_core::errors::DomainError;
use lendrelay_core::gateway::{BankGateway, BankGateways, GatewaySettings};

use crate::client::HttpBankClient;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    InvalidBank(#[from] DomainError),
    #[error("could not build http client for {bank}: {source}")]
    ClientBuild { bank: BankName, source: reqwest::Error },
}

/// Builds one gateway per configured bank, each with proposal and simulation endpoints.
pub fn build_gateways(config: &AppConfig) -> Result<BankGateways, AdapterError> {
    let settings = GatewaySettings {
        call_timeout: config.submission.bank_timeout(),
        token_safety_margin: config.submission.token_safety_margin(),
    };

    let mut gateways = BankGateways::new();
    for (name, endpoint) in &config.banks {
        let bank = BankName::parse(name)?;
        let client = HttpBankClient::new(bank.clone(), endpoint.clone(), settings.call_timeout)
            .map_err(|source| AdapterError::ClientBuild { bank: bank.clone(), source })?;
        let client = Arc::new(client);
        gateways.insert(
            BankGateway::new(client.clone(), client.clone(), settings).with_simulations(client),
        );
        info!(event_name = "banks.gateway.configured", bank = %bank, "bank gateway configured");
    }
    Ok(gateways)
}
