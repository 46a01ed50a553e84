//! Wire shapes of the bank JSON contract.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lendrelay_core::domain::proposal::{
    Applicant, ConstructionDetails, FlowType, MaritalStatus, PortabilityDetails, PropertyType,
    Proposal, Spouse,
};
use lendrelay_core::domain::simulation::SimulationRequest;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ProposalPayload<'a> {
    pub flow_type: FlowType,
    pub applicant: &'a Applicant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spouse: Option<&'a Spouse>,
    pub marital_status: MaritalStatus,
    pub monthly_income: Decimal,
    pub property_type: PropertyType,
    pub property_value: Decimal,
    pub financed_value: Decimal,
    pub term_months: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub construction: Option<&'a ConstructionDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portability: Option<&'a PortabilityDetails>,
}

impl<'a> From<&'a Proposal> for ProposalPayload<'a> {
    fn from(proposal: &'a Proposal) -> Self {
        Self {
            flow_type: proposal.flow_type,
            applicant: &proposal.applicant,
            spouse: proposal.spouse.as_ref(),
            marital_status: proposal.marital_status,
            monthly_income: proposal.monthly_income,
            property_type: proposal.property_type,
            property_value: proposal.property_value,
            financed_value: proposal.financed_value,
            term_months: proposal.term_months,
            construction: proposal.construction.as_ref(),
            portability: proposal.portability.as_ref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SimulationPayload<'a> {
    pub document: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    pub property_type: PropertyType,
    pub property_value: Decimal,
    pub financed_value: Decimal,
    pub term_months: u32,
    pub monthly_income: Decimal,
}

impl<'a> From<&'a SimulationRequest> for SimulationPayload<'a> {
    fn from(request: &'a SimulationRequest) -> Self {
        Self {
            document: &request.applicant_document,
            birth_date: request.birth_date,
            property_type: request.terms.property_type,
            property_value: request.terms.property_value,
            financed_value: request.terms.financed_value,
            term_months: request.terms.term_months,
            monthly_income: request.terms.monthly_income,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    #[serde(alias = "proposal_id", alias = "proposalId")]
    pub id: String,
    #[serde(default, alias = "number", alias = "proposalNumber")]
    pub proposal_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailsResponse {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SimulationResponse {
    #[serde(default, alias = "installment", alias = "monthlyInstallment")]
    pub monthly_installment: Option<Decimal>,
    #[serde(default, alias = "interest_rate", alias = "interestRate")]
    pub interest_rate_pct: Option<Decimal>,
    #[serde(default, alias = "totalCost", alias = "cet")]
    pub total_cost: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{SimulationResponse, SubmitResponse};

    #[test]
    fn submit_response_accepts_common_id_spellings() {
        let camel: SubmitResponse =
            serde_json::from_value(json!({ "proposalId": "P-1", "proposalNumber": "77" }))
                .expect("camel case");
        let snake: SubmitResponse =
            serde_json::from_value(json!({ "proposal_id": "P-2" })).expect("snake case");

        assert_eq!(camel.id, "P-1");
        assert_eq!(camel.proposal_number.as_deref(), Some("77"));
        assert_eq!(snake.id, "P-2");
        assert_eq!(snake.proposal_number, None);
    }

    #[test]
    fn simulation_response_reads_numbers_and_strings() {
        let response: SimulationResponse =
            serde_json::from_value(json!({ "installment": 2150.5, "interestRate": "10.49" }))
                .expect("simulation");

        assert_eq!(response.monthly_installment.map(|value| value.to_string()).as_deref(), Some("2150.5"));
        assert_eq!(response.interest_rate_pct.map(|value| value.to_string()).as_deref(), Some("10.49"));
        assert_eq!(response.total_cost, None);
    }
}
