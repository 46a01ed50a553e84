//! The common validation steps every bank strategy runs before its own rules.

use rust_decimal::Decimal;

use crate::domain::proposal::{Proposal, MAX_MONEY_VALUE};
use crate::domain::validation::{ProposalField, ValidationCode, ValidationError};
use crate::normalization::money;
use crate::policy::BankPolicy;

pub fn required_fields(proposal: &Proposal, findings: &mut Vec<ValidationError>) {
    if proposal.applicant.name.trim().is_empty() {
        findings.push(missing(ProposalField::ApplicantName, "applicant name is required"));
    }
    if proposal.identity_key().0.is_empty() {
        findings.push(missing(ProposalField::ApplicantDocument, "applicant document is required"));
    }
    if proposal.property_value <= Decimal::ZERO {
        findings.push(missing(ProposalField::PropertyValue, "property value must be positive"));
    }
    if proposal.financed_value <= Decimal::ZERO {
        findings.push(missing(ProposalField::FinancedValue, "financed value must be positive"));
    }
    if proposal.term_months == 0 {
        findings.push(missing(ProposalField::Term, "term must be at least one month"));
    }
    if proposal.monthly_income <= Decimal::ZERO {
        findings.push(missing(ProposalField::MonthlyIncome, "monthly income must be positive"));
    }
    for (field, label, value) in [
        (ProposalField::PropertyValue, "property value", proposal.property_value),
        (ProposalField::FinancedValue, "financed value", proposal.financed_value),
        (ProposalField::MonthlyIncome, "monthly income", proposal.monthly_income),
    ] {
        if value > MAX_MONEY_VALUE {
            findings.push(ValidationError::blocking(
                ValidationCode::ValueOutOfRange,
                field,
                format!("{label} {} is above the accepted maximum of {}", value.normalize(), MAX_MONEY_VALUE),
            ));
        }
    }
    if proposal.financed_value > proposal.property_value && proposal.property_value > Decimal::ZERO
    {
        findings.push(ValidationError::blocking(
            ValidationCode::FinancedExceedsProperty,
            ProposalField::FinancedValue,
            format!(
                "financed value {} exceeds property value {}",
                money(proposal.financed_value),
                money(proposal.property_value)
            ),
        ));
    }
}

pub fn ltv_within_policy(
    proposal: &Proposal,
    policy: &BankPolicy,
    findings: &mut Vec<ValidationError>,
) {
    let Some(ltv) = proposal.ltv() else {
        return;
    };
    let range = policy.ltv_for(proposal.property_type);

    if ltv > range.max {
        findings.push(ValidationError::blocking(
            ValidationCode::LtvAboveMaximum,
            ProposalField::FinancedValue,
            format!(
                "LTV {}% is above the {} maximum of {}% for {} properties",
                ltv,
                policy.display_name,
                range.max.normalize(),
                proposal.property_type.as_str()
            ),
        ));
    } else if ltv < range.min {
        findings.push(ValidationError::blocking(
            ValidationCode::LtvBelowMinimum,
            ProposalField::FinancedValue,
            format!(
                "LTV {}% is below the {} minimum of {}%",
                ltv,
                policy.display_name,
                range.min.normalize()
            ),
        ));
    }
}

pub fn term_within_policy(
    proposal: &Proposal,
    policy: &BankPolicy,
    findings: &mut Vec<ValidationError>,
) {
    if proposal.term_months == 0 {
        return;
    }
    let range = policy.term_for(proposal.property_type);

    if proposal.term_months > range.max {
        findings.push(ValidationError::blocking(
            ValidationCode::TermAboveMaximum,
            ProposalField::Term,
            format!(
                "term of {} months is above the {} maximum of {} months",
                proposal.term_months, policy.display_name, range.max
            ),
        ));
    } else if proposal.term_months < range.min {
        findings.push(ValidationError::blocking(
            ValidationCode::TermBelowMinimum,
            ProposalField::Term,
            format!(
                "term of {} months is below the {} minimum of {} months",
                proposal.term_months, policy.display_name, range.min
            ),
        ));
    }
}

pub fn property_value_floor(
    proposal: &Proposal,
    policy: &BankPolicy,
    findings: &mut Vec<ValidationError>,
) {
    if proposal.property_value > Decimal::ZERO
        && proposal.property_value < policy.min_property_value
    {
        findings.push(ValidationError::blocking(
            ValidationCode::PropertyValueBelowMinimum,
            ProposalField::PropertyValue,
            format!(
                "property value {} is below the {} minimum of {}",
                money(proposal.property_value),
                policy.display_name,
                money(policy.min_property_value)
            ),
        ));
    }

    if proposal.financed_value > Decimal::ZERO
        && proposal.financed_value < policy.min_financing_value
    {
        findings.push(ValidationError::blocking(
            ValidationCode::FinancingBelowMinimum,
            ProposalField::FinancedValue,
            format!(
                "financed value {} is below the {} minimum of {}",
                money(proposal.financed_value),
                policy.display_name,
                money(policy.min_financing_value)
            ),
        ));
    }
}

pub fn income_floor(proposal: &Proposal, policy: &BankPolicy, findings: &mut Vec<ValidationError>) {
    let Some(min_income) = policy.min_income else {
        return;
    };
    let income = proposal.household_income();
    if income > Decimal::ZERO && income < min_income {
        findings.push(ValidationError::blocking(
            ValidationCode::IncomeBelowMinimum,
            ProposalField::MonthlyIncome,
            format!(
                "monthly income {} is below the {} minimum of {}",
                money(income),
                policy.display_name,
                money(min_income)
            ),
        ));
    }
}

fn missing(field: ProposalField, message: &str) -> ValidationError {
    ValidationError::blocking(ValidationCode::MissingRequiredField, field, message)
}
