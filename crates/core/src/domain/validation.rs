use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::proposal::{BankName, ProposalSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalField {
    ApplicantName,
    ApplicantDocument,
    BirthDate,
    Spouse,
    PropertyValue,
    FinancedValue,
    Term,
    MonthlyIncome,
    Portability,
    Construction,
    Bank,
}

impl ProposalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicantName => "applicant_name",
            Self::ApplicantDocument => "applicant_document",
            Self::BirthDate => "birth_date",
            Self::Spouse => "spouse",
            Self::PropertyValue => "property_value",
            Self::FinancedValue => "financed_value",
            Self::Term => "term",
            Self::MonthlyIncome => "monthly_income",
            Self::Portability => "portability",
            Self::Construction => "construction",
            Self::Bank => "bank",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Blocking,
    Warning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    MissingRequiredField,
    ValueOutOfRange,
    FinancedExceedsProperty,
    LtvAboveMaximum,
    LtvBelowMinimum,
    TermAboveMaximum,
    TermBelowMinimum,
    PropertyValueBelowMinimum,
    FinancingBelowMinimum,
    IncomeBelowMinimum,
    AgeAtMaturityExceeded,
    BirthDateMissing,
    SpouseRequired,
    PortabilityBalanceUncovered,
    ValueAdjusted,
    StrategyError,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Self::ValueOutOfRange => "VALUE_OUT_OF_RANGE",
            Self::FinancedExceedsProperty => "FINANCED_EXCEEDS_PROPERTY",
            Self::LtvAboveMaximum => "LTV_ABOVE_MAXIMUM",
            Self::LtvBelowMinimum => "LTV_BELOW_MINIMUM",
            Self::TermAboveMaximum => "TERM_ABOVE_MAXIMUM",
            Self::TermBelowMinimum => "TERM_BELOW_MINIMUM",
            Self::PropertyValueBelowMinimum => "PROPERTY_VALUE_BELOW_MINIMUM",
            Self::FinancingBelowMinimum => "FINANCING_BELOW_MINIMUM",
            Self::IncomeBelowMinimum => "INCOME_BELOW_MINIMUM",
            Self::AgeAtMaturityExceeded => "AGE_AT_MATURITY_EXCEEDED",
            Self::BirthDateMissing => "BIRTH_DATE_MISSING",
            Self::SpouseRequired => "SPOUSE_REQUIRED",
            Self::PortabilityBalanceUncovered => "PORTABILITY_BALANCE_UNCOVERED",
            Self::ValueAdjusted => "VALUE_ADJUSTED",
            Self::StrategyError => "STRATEGY_ERROR",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: ValidationCode,
    pub field: ProposalField,
    pub message: String,
    pub severity: Severity,
}

impl ValidationError {
    pub fn blocking(code: ValidationCode, field: ProposalField, message: impl Into<String>) -> Self {
        Self { code, field, message: message.into(), severity: Severity::Blocking }
    }

    pub fn warning(code: ValidationCode, field: ProposalField, message: impl Into<String>) -> Self {
        Self { code, field, message: message.into(), severity: Severity::Warning }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Automatic,
    Rejection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub field: ProposalField,
    pub original_value: Decimal,
    pub adjusted_value: Decimal,
    pub reason: String,
    pub kind: AdjustmentKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub bank: BankName,
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
    pub adjustments: Vec<Adjustment>,
    pub original_snapshot: ProposalSnapshot,
    pub adjusted_snapshot: Option<ProposalSnapshot>,
}

impl ValidationResult {
    /// Splits findings by severity; the result is valid when nothing is blocking.
    pub fn from_findings(
        bank: BankName,
        findings: Vec<ValidationError>,
        snapshot: ProposalSnapshot,
    ) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            findings.into_iter().partition(ValidationError::is_blocking);
        Self {
            bank,
            is_valid: errors.is_empty(),
            errors,
            warnings,
            adjustments: Vec::new(),
            original_snapshot: snapshot,
            adjusted_snapshot: None,
        }
    }

    pub fn strategy_error(
        bank: BankName,
        message: impl Into<String>,
        snapshot: ProposalSnapshot,
    ) -> Self {
        Self::from_findings(
            bank,
            vec![ValidationError::blocking(
                ValidationCode::StrategyError,
                ProposalField::Bank,
                message,
            )],
            snapshot,
        )
    }

    pub fn was_adjusted(&self) -> bool {
        !self.adjustments.is_empty()
    }

    pub fn rejection_reasons(&self) -> Vec<String> {
        self.errors.iter().map(|error| error.message.clone()).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub approved: usize,
    pub rejected: usize,
    pub adjusted: usize,
    pub total_adjustments: usize,
    pub total_warnings: usize,
    pub total_errors: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiValidationResult {
    pub valid_banks: Vec<ValidationResult>,
    pub invalid_banks: Vec<ValidationResult>,
    pub summary: ValidationSummary,
    pub recommendations: Vec<String>,
    pub best_bank_option: Option<BankName>,
}

impl MultiValidationResult {
    pub fn result_for(&self, bank: &BankName) -> Option<&ValidationResult> {
        self.valid_banks.iter().chain(self.invalid_banks.iter()).find(|result| &result.bank == bank)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredBank {
    pub bank: BankName,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestBankOption {
    pub bank: BankName,
    pub score: f64,
    pub alternatives: Vec<ScoredBank>,
    pub scores: BTreeMap<BankName, f64>,
}
