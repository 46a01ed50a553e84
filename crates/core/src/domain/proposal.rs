use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BankName(pub String);

impl BankName {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::EmptyBankName);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BankName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Applicant identity used to detect duplicate applications: the document with
/// punctuation stripped.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(pub String);

impl IdentityKey {
    pub fn from_document(document: &str) -> Self {
        Self(document.chars().filter(char::is_ascii_alphanumeric).collect())
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Residential,
    Commercial,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Residential => "residential",
            Self::Commercial => "commercial",
        }
    }
}

impl std::str::FromStr for PropertyType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "residential" => Ok(Self::Residential),
            "commercial" => Ok(Self::Commercial),
            other => Err(DomainError::UnknownPropertyType(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
    StableUnion,
    Divorced,
    Widowed,
}

impl MaritalStatus {
    pub fn has_partner(&self) -> bool {
        matches!(self, Self::Married | Self::StableUnion)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Married => "married",
            Self::StableUnion => "stable_union",
            Self::Divorced => "divorced",
            Self::Widowed => "widowed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    New,
    Resend,
    #[serde(alias = "add-bank")]
    AddBank,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Resend => "resend",
            Self::AddBank => "add_bank",
        }
    }
}

impl std::str::FromStr for FlowType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "new" => Ok(Self::New),
            "resend" => Ok(Self::Resend),
            "add_bank" => Ok(Self::AddBank),
            other => Err(DomainError::UnknownFlowType(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub name: String,
    pub document: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spouse {
    pub name: String,
    pub document: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_income: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionDetails {
    pub land_value: Decimal,
    pub construction_budget: Decimal,
    pub duration_months: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortabilityDetails {
    pub origin_bank: String,
    pub outstanding_balance: Decimal,
    pub remaining_months: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub applicant: Applicant,
    #[serde(default)]
    pub spouse: Option<Spouse>,
    pub property_value: Decimal,
    pub financed_value: Decimal,
    pub term_months: u32,
    pub property_type: PropertyType,
    pub marital_status: MaritalStatus,
    pub monthly_income: Decimal,
    pub flow_type: FlowType,
    #[serde(default)]
    pub selected_banks: BTreeSet<BankName>,
    #[serde(default)]
    pub construction: Option<ConstructionDetails>,
    #[serde(default)]
    pub portability: Option<PortabilityDetails>,
}

impl Proposal {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::from_document(&self.applicant.document)
    }

    pub fn ltv(&self) -> Option<Decimal> {
        ltv_percent(self.property_value, self.financed_value)
    }

    /// Applicant income plus the spouse's when the couple applies together.
    pub fn household_income(&self) -> Decimal {
        match (&self.spouse, self.marital_status.has_partner()) {
            (Some(spouse), true) => self.monthly_income.saturating_add(spouse.monthly_income),
            _ => self.monthly_income,
        }
    }

    pub fn loan_terms(&self) -> LoanTerms {
        LoanTerms {
            property_value: self.property_value,
            financed_value: self.financed_value,
            term_months: self.term_months,
            property_type: self.property_type,
            monthly_income: self.household_income(),
        }
    }

    pub fn snapshot(&self) -> ProposalSnapshot {
        self.loan_terms().snapshot()
    }

    /// Returns a copy carrying the given loan values; every other field is cloned as is.
    pub fn with_loan_terms(&self, terms: &LoanTerms) -> Self {
        Self {
            property_value: terms.property_value,
            financed_value: terms.financed_value,
            term_months: terms.term_months,
            ..self.clone()
        }
    }

    pub fn with_snapshot(&self, snapshot: &ProposalSnapshot) -> Self {
        Self {
            property_value: snapshot.property_value,
            financed_value: snapshot.financed_value,
            term_months: snapshot.term_months,
            ..self.clone()
        }
    }
}

/// The loan values normalization works on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub property_value: Decimal,
    pub financed_value: Decimal,
    pub term_months: u32,
    pub property_type: PropertyType,
    pub monthly_income: Decimal,
}

impl LoanTerms {
    pub fn ltv(&self) -> Option<Decimal> {
        ltv_percent(self.property_value, self.financed_value)
    }

    pub fn snapshot(&self) -> ProposalSnapshot {
        ProposalSnapshot {
            property_value: self.property_value,
            financed_value: self.financed_value,
            term_months: self.term_months,
            ltv: self.ltv(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSnapshot {
    pub property_value: Decimal,
    pub financed_value: Decimal,
    pub term_months: u32,
    pub ltv: Option<Decimal>,
}

/// Largest money amount (10^15) accepted on a proposal.
pub const MAX_MONEY_VALUE: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// `financed / property * 100`, rounded to two decimal places. `None` without a property value
/// or when the ratio cannot be represented.
pub fn ltv_percent(property_value: Decimal, financed_value: Decimal) -> Option<Decimal> {
    if property_value <= Decimal::ZERO {
        return None;
    }
    let ratio = financed_value.checked_mul(Decimal::ONE_HUNDRED)?.checked_div(property_value)?;
    Some(ratio.round_dp(2).normalize())
}
