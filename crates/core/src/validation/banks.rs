//! Bank-specific rules layered on top of the common checks.

use std::borrow::Cow;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::checks;
use crate::domain::proposal::Proposal;
use crate::domain::validation::{ProposalField, ValidationCode, ValidationError};
use crate::normalization::money;
use crate::policy::BankPolicy;

/// Hook a strategy runs after the common checks.
///
/// A hook that owns the LTV or term rule replaces the common check for that rule.
/// `effective_policy` may tighten limits for a particular proposal; normalization uses the
/// tightened policy so adjustments satisfy the hook.
pub trait BankRules: Send + Sync {
    fn owns_ltv_rule(&self) -> bool {
        false
    }

    fn owns_term_rule(&self) -> bool {
        false
    }

    fn effective_policy<'a>(&self, _proposal: &Proposal, policy: &'a BankPolicy) -> Cow<'a, BankPolicy> {
        Cow::Borrowed(policy)
    }

    fn check(&self, proposal: &Proposal, policy: &BankPolicy, findings: &mut Vec<ValidationError>);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StandardRules;

impl BankRules for StandardRules {
    fn check(&self, _proposal: &Proposal, _policy: &BankPolicy, _findings: &mut Vec<ValidationError>) {}
}

/// 80 years and 6 months.
pub const ITAU_MAX_AGE_AT_MATURITY_MONTHS: u32 = 80 * 12 + 6;

/// Applicant age plus term must stay within [`ITAU_MAX_AGE_AT_MATURITY_MONTHS`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ItauRules {
    as_of: Option<NaiveDate>,
}

impl ItauRules {
    pub fn as_of(date: NaiveDate) -> Self {
        Self { as_of: Some(date) }
    }

    fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn remaining_months(&self, proposal: &Proposal) -> Option<u32> {
        let birth_date = proposal.applicant.birth_date?;
        let age = age_in_months(birth_date, self.today());
        Some(ITAU_MAX_AGE_AT_MATURITY_MONTHS.saturating_sub(age))
    }
}

impl BankRules for ItauRules {
    fn effective_policy<'a>(&self, proposal: &Proposal, policy: &'a BankPolicy) -> Cow<'a, BankPolicy> {
        let Some(remaining) = self.remaining_months(proposal) else {
            return Cow::Borrowed(policy);
        };
        let range = policy.term_for(proposal.property_type);
        if remaining >= range.max {
            return Cow::Borrowed(policy);
        }

        let mut tightened = policy.clone();
        let term = tightened.term.get_mut(proposal.property_type);
        term.max = remaining.max(term.min);
        Cow::Owned(tightened)
    }

    fn check(&self, proposal: &Proposal, policy: &BankPolicy, findings: &mut Vec<ValidationError>) {
        let Some(remaining) = self.remaining_months(proposal) else {
            findings.push(ValidationError::warning(
                ValidationCode::BirthDateMissing,
                ProposalField::BirthDate,
                "birth date not provided; age at maturity could not be checked",
            ));
            return;
        };

        let min_term = policy.term_for(proposal.property_type).min;
        if remaining < min_term {
            findings.push(ValidationError::blocking(
                ValidationCode::AgeAtMaturityExceeded,
                ProposalField::BirthDate,
                format!(
                    "applicant would exceed 80 years and 6 months before the minimum term of {min_term} months"
                ),
            ));
        } else if proposal.term_months > remaining {
            findings.push(ValidationError::blocking(
                ValidationCode::AgeAtMaturityExceeded,
                ProposalField::Term,
                format!(
                    "term of {} months takes the applicant past 80 years and 6 months; maximum is {} months",
                    proposal.term_months, remaining
                ),
            ));
        }
    }
}

/// Portability operations are capped at 80% LTV for every property type.
#[derive(Clone, Copy, Debug, Default)]
pub struct SantanderRules;

pub const SANTANDER_PORTABILITY_MAX_LTV: i64 = 80;

impl BankRules for SantanderRules {
    fn owns_ltv_rule(&self) -> bool {
        true
    }

    fn effective_policy<'a>(&self, proposal: &Proposal, policy: &'a BankPolicy) -> Cow<'a, BankPolicy> {
        if proposal.portability.is_none() {
            return Cow::Borrowed(policy);
        }
        let mut portability = policy.clone();
        let cap = Decimal::from(SANTANDER_PORTABILITY_MAX_LTV);
        portability.ltv.residential.max = cap;
        portability.ltv.commercial.max = cap;
        Cow::Owned(portability)
    }

    fn check(&self, proposal: &Proposal, policy: &BankPolicy, findings: &mut Vec<ValidationError>) {
        checks::ltv_within_policy(proposal, policy, findings);

        if let Some(portability) = &proposal.portability {
            if proposal.financed_value < portability.outstanding_balance {
                findings.push(ValidationError::blocking(
                    ValidationCode::PortabilityBalanceUncovered,
                    ProposalField::Portability,
                    format!(
                        "financed value {} does not cover the outstanding balance of {} at {}",
                        money(proposal.financed_value),
                        money(portability.outstanding_balance),
                        portability.origin_bank
                    ),
                ));
            }
        }
    }
}

/// Married and stable-union applicants must declare the spouse.
#[derive(Clone, Copy, Debug, Default)]
pub struct BradescoRules;

impl BankRules for BradescoRules {
    fn check(&self, proposal: &Proposal, _policy: &BankPolicy, findings: &mut Vec<ValidationError>) {
        if proposal.marital_status.has_partner() && proposal.spouse.is_none() {
            findings.push(ValidationError::blocking(
                ValidationCode::SpouseRequired,
                ProposalField::Spouse,
                format!(
                    "spouse details are required for {} applicants",
                    proposal.marital_status.as_str()
                ),
            ));
        }
    }
}

/// Construction loans run at most 240 months and at least 12 months past the works.
#[derive(Clone, Copy, Debug, Default)]
pub struct InterRules;

pub const INTER_CONSTRUCTION_MAX_TERM: u32 = 240;
pub const INTER_CONSTRUCTION_GRACE_MONTHS: u32 = 12;

impl BankRules for InterRules {
    fn owns_term_rule(&self) -> bool {
        true
    }

    fn effective_policy<'a>(&self, proposal: &Proposal, policy: &'a BankPolicy) -> Cow<'a, BankPolicy> {
        let Some(construction) = &proposal.construction else {
            return Cow::Borrowed(policy);
        };
        let mut tightened = policy.clone();
        let term = tightened.term.get_mut(proposal.property_type);
        term.max = term.max.min(INTER_CONSTRUCTION_MAX_TERM);
        let earliest = construction.duration_months.saturating_add(INTER_CONSTRUCTION_GRACE_MONTHS);
        term.min = term.min.max(earliest).min(term.max);
        Cow::Owned(tightened)
    }

    fn check(&self, proposal: &Proposal, policy: &BankPolicy, findings: &mut Vec<ValidationError>) {
        checks::term_within_policy(proposal, policy, findings);

        if let Some(construction) = &proposal.construction {
            let total = construction.land_value.saturating_add(construction.construction_budget);
            if total > proposal.property_value {
                findings.push(ValidationError::warning(
                    ValidationCode::FinancedExceedsProperty,
                    ProposalField::Construction,
                    format!(
                        "land value plus construction budget ({}) exceeds the declared property value {}",
                        money(total),
                        money(proposal.property_value)
                    ),
                ));
            }
        }
    }
}

fn age_in_months(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    let years = today.year() - birth_date.year();
    let months = today.month() as i32 - birth_date.month() as i32;
    let mut total = years * 12 + months;
    if today.day() < birth_date.day() {
        total -= 1;
    }
    u32::try_from(total).unwrap_or(0)
}
