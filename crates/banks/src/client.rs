use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use lendrelay_core::config::BankEndpointConfig;
use lendrelay_core::domain::proposal::{BankName, Proposal};
use lendrelay_core::domain::simulation::{SimulationQuote, SimulationRequest};
use lendrelay_core::domain::submission::ExternalProposalId;
use lendrelay_core::errors::BankError;
use lendrelay_core::ports::{
    AccessToken, AuthPort, BankProposalPort, BankSimulationPort, BankSubmission, IssuedToken,
    ProposalDetails,
};

use crate::payload::{
    DetailsResponse, ProposalPayload, SimulationPayload, SimulationResponse, SubmitResponse,
    TokenResponse,
};
use crate::status::{classify_status, transport_error};

/// Lifetime assumed when a token response carries no `expires_in`.
const DEFAULT_TOKEN_TTL_SECS: u64 = 300;

/// One bank's HTTP endpoints. Implements every bank port.
pub struct HttpBankClient {
    bank: BankName,
    client: Client,
    endpoint: BankEndpointConfig,
    timeout: Duration,
}

impl std::fmt::Debug for HttpBankClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBankClient")
            .field("bank", &self.bank)
            .field("base_url", &self.endpoint.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpBankClient {
    pub fn new(
        bank: BankName,
        endpoint: BankEndpointConfig,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { bank, client, endpoint, timeout })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, BankError> {
        let response =
            request.send().await.map_err(|error| transport_error(&error, self.timeout.as_secs()))?;
        let status = response.status();
        let body =
            response.text().await.map_err(|error| transport_error(&error, self.timeout.as_secs()))?;

        if !status.is_success() {
            let error = classify_status(status.as_u16(), &body);
            warn!(
                event_name = "banks.http.failed",
                bank = %self.bank,
                status = status.as_u16(),
                error_class = error.error_class(),
                "bank http call failed"
            );
            return Err(error);
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|error| BankError::Decode(error.to_string()))
    }
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, BankError> {
    serde_json::from_value(value.clone()).map_err(|error| BankError::Decode(error.to_string()))
}

#[async_trait]
impl AuthPort for HttpBankClient {
    fn bank(&self) -> &BankName {
        &self.bank
    }

    async fn request_token(&self) -> Result<IssuedToken, BankError> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.endpoint.client_id.as_str()),
            ("client_secret", self.endpoint.client_secret.expose_secret()),
        ];
        if let Some(scope) = &self.endpoint.scope {
            form.push(("scope", scope.as_str()));
        }

        let value = self.send(self.client.post(&self.endpoint.token_url).form(&form)).await?;
        let token: TokenResponse = decode(&value)?;
        if token.access_token.is_empty() {
            return Err(BankError::Decode("token endpoint returned an empty access token".into()));
        }

        let ttl = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS));
        debug!(
            event_name = "banks.token.issued",
            bank = %self.bank,
            ttl_secs = ttl.as_secs(),
            "bank token issued"
        );
        Ok(IssuedToken { value: token.access_token.into(), ttl })
    }
}

#[async_trait]
impl BankProposalPort for HttpBankClient {
    async fn submit(
        &self,
        proposal: &Proposal,
        token: &AccessToken,
    ) -> Result<BankSubmission, BankError> {
        let request = self
            .client
            .post(self.url("proposals"))
            .bearer_auth(token.expose())
            .json(&ProposalPayload::from(proposal));
        let raw = self.send(request).await?;
        let response: SubmitResponse = decode(&raw)?;

        Ok(BankSubmission {
            proposal_id: ExternalProposalId(response.id),
            proposal_number: response.proposal_number,
            raw,
        })
    }

    async fn proposal_details(
        &self,
        proposal_id: &ExternalProposalId,
        token: &AccessToken,
    ) -> Result<ProposalDetails, BankError> {
        let request = self
            .client
            .get(self.url(&format!("proposals/{}", proposal_id.0)))
            .bearer_auth(token.expose());
        let payload = self.send(request).await?;
        let response: DetailsResponse = decode(&payload)?;

        Ok(ProposalDetails { proposal_id: proposal_id.clone(), status: response.status, payload })
    }
}

#[async_trait]
impl BankSimulationPort for HttpBankClient {
    async fn simulate(
        &self,
        request: &SimulationRequest,
        token: &AccessToken,
    ) -> Result<SimulationQuote, BankError> {
        let http = self
            .client
            .post(self.url("simulations"))
            .bearer_auth(token.expose())
            .json(&SimulationPayload::from(request));
        let raw = self.send(http).await?;
        let response: SimulationResponse = decode(&raw)?;

        Ok(SimulationQuote {
            monthly_installment: response.monthly_installment,
            interest_rate_pct: response.interest_rate_pct,
            total_cost: response.total_cost,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use lendrelay_core::config::BankEndpointConfig;
    use lendrelay_core::domain::proposal::{
        Applicant, BankName, FlowType, MaritalStatus, PropertyType, Proposal,
    };
    use lendrelay_core::domain::submission::ExternalProposalId;
    use lendrelay_core::errors::BankError;
    use lendrelay_core::ports::{AccessToken, AuthPort, BankProposalPort};

    use super::HttpBankClient;

    fn client(server: &MockServer) -> HttpBankClient {
        HttpBankClient::new(
            BankName("caixa".to_string()),
            BankEndpointConfig {
                base_url: format!("{}/api/", server.uri()),
                token_url: format!("{}/oauth/token", server.uri()),
                client_id: "lendrelay".to_string(),
                client_secret: "s3cret".to_string().into(),
                scope: Some("proposals".to_string()),
            },
            Duration::from_secs(5),
        )
        .expect("http client")
    }

    fn proposal() -> Proposal {
        Proposal {
            applicant: Applicant {
                name: "Ana Souza".to_string(),
                document: "123.456.789-09".to_string(),
                email: None,
                phone: None,
                birth_date: None,
            },
            spouse: None,
            property_value: Decimal::from(300_000),
            financed_value: Decimal::from(200_000),
            term_months: 240,
            property_type: PropertyType::Residential,
            marital_status: MaritalStatus::Single,
            monthly_income: Decimal::from(15_000),
            flow_type: FlowType::New,
            selected_banks: BTreeSet::new(),
            construction: None,
            portability: None,
        }
    }

    #[tokio::test]
    async fn token_request_uses_client_credentials_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("scope=proposals"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "tok-1", "expires_in": 900 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let issued = client(&server).request_token().await.expect("token");

        assert_eq!(issued.value.expose_secret(), "tok-1");
        assert_eq!(issued.ttl, Duration::from_secs(900));
    }

    #[tokio::test]
    async fn rejected_token_request_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let error = client(&server).request_token().await.err().expect("forbidden");

        assert_eq!(error, BankError::Forbidden);
    }

    #[tokio::test]
    async fn submit_posts_bearer_json_and_reads_proposal_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/proposals"))
            .and(header("authorization", "Bearer tok-1"))
            .and(body_string_contains("\"financed_value\":\"200000\""))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "proposalId": "CX-88", "proposalNumber": "0088" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let submission = client(&server)
            .submit(&proposal(), &AccessToken::new("tok-1"))
            .await
            .expect("submitted");

        assert_eq!(submission.proposal_id, ExternalProposalId("CX-88".to_string()));
        assert_eq!(submission.proposal_number.as_deref(), Some("0088"));
        assert_eq!(submission.raw["proposalId"], "CX-88");
    }

    #[tokio::test]
    async fn expired_token_on_submit_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/proposals"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let error = client(&server)
            .submit(&proposal(), &AccessToken::new("stale"))
            .await
            .expect_err("unauthorized");

        assert!(error.is_unauthorized());
    }

    #[tokio::test]
    async fn details_keep_full_payload_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/proposals/CX-88"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "CX-88", "status": "em_analise", "rate": 9.9 })),
            )
            .mount(&server)
            .await;

        let details = client(&server)
            .proposal_details(&ExternalProposalId("CX-88".to_string()), &AccessToken::new("tok"))
            .await
            .expect("details");

        assert_eq!(details.status.as_deref(), Some("em_analise"));
        assert_eq!(details.payload["rate"], 9.9);
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/proposals"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&server)
            .await;

        let error = client(&server)
            .submit(&proposal(), &AccessToken::new("tok"))
            .await
            .expect_err("decode");

        assert!(matches!(error, BankError::Decode(_)));
    }
}
