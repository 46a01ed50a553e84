//! Policy-driven correction of loan values.
//!
//! Two engines share the same steps but differ in how they treat LTV and financing floors:
//! [`ProposalNormalizer`] only ever lowers the financed value, while
//! [`SimulationNormalizer`] may raise financing to the bank minimum and inflate the property
//! value by the same factor so the ratio holds.

mod proposal;
mod simulation;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::domain::proposal::{BankName, LoanTerms, MAX_MONEY_VALUE};
use crate::domain::validation::{
    Adjustment, AdjustmentKind, ProposalField, ValidationCode, ValidationError,
};
use crate::policy::{BankPolicy, BankPolicyTable};

pub use proposal::ProposalNormalizer;
pub use simulation::SimulationNormalizer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Normalization {
    pub adjusted: LoanTerms,
    pub adjustments: Vec<Adjustment>,
}

impl Normalization {
    pub fn is_unchanged(&self) -> bool {
        self.adjustments.is_empty()
    }
}

/// A violation normalization refuses to correct.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct Rejection {
    pub code: ValidationCode,
    pub field: ProposalField,
    pub value: Decimal,
    pub limit: Decimal,
    pub reason: String,
}

impl Rejection {
    pub fn to_validation_error(&self) -> ValidationError {
        ValidationError::blocking(self.code, self.field, self.reason.clone())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("no policy registered for bank `{0}`")]
    UnknownBank(BankName),
    #[error(transparent)]
    Rejected(#[from] Rejection),
}

pub trait Normalizer: Send + Sync {
    fn policies(&self) -> &BankPolicyTable;

    /// Applies one bank's limits to the candidate. Compliant input comes back untouched with
    /// no adjustments.
    fn normalize_with_policy(
        &self,
        candidate: &LoanTerms,
        policy: &BankPolicy,
    ) -> Result<Normalization, Rejection>;

    fn normalize(
        &self,
        candidate: &LoanTerms,
        bank: &BankName,
    ) -> Result<Normalization, NormalizationError> {
        let policy = self
            .policies()
            .get(bank)
            .ok_or_else(|| NormalizationError::UnknownBank(bank.clone()))?;
        Ok(self.normalize_with_policy(candidate, policy)?)
    }
}

pub(crate) fn reject_below_floors(
    candidate: &LoanTerms,
    policy: &BankPolicy,
) -> Result<(), Rejection> {
    if candidate.property_value > MAX_MONEY_VALUE {
        return Err(out_of_range(ProposalField::PropertyValue, candidate.property_value));
    }
    if candidate.financed_value > MAX_MONEY_VALUE {
        return Err(out_of_range(ProposalField::FinancedValue, candidate.financed_value));
    }
    if candidate.property_value < policy.min_property_value {
        return Err(Rejection {
            code: ValidationCode::PropertyValueBelowMinimum,
            field: ProposalField::PropertyValue,
            value: candidate.property_value,
            limit: policy.min_property_value,
            reason: format!(
                "property value {} is below the {} minimum of {}",
                money(candidate.property_value),
                policy.display_name,
                money(policy.min_property_value)
            ),
        });
    }

    if let Some(min_income) = policy.min_income {
        if candidate.monthly_income < min_income {
            return Err(Rejection {
                code: ValidationCode::IncomeBelowMinimum,
                field: ProposalField::MonthlyIncome,
                value: candidate.monthly_income,
                limit: min_income,
                reason: format!(
                    "monthly income {} is below the {} minimum of {}",
                    money(candidate.monthly_income),
                    policy.display_name,
                    money(min_income)
                ),
            });
        }
    }

    Ok(())
}

/// Lowers the financed value to the LTV ceiling. Property value is left alone.
pub(crate) fn cap_ltv(
    candidate: &mut LoanTerms,
    policy: &BankPolicy,
    adjustments: &mut Vec<Adjustment>,
) -> Result<(), Rejection> {
    let max_ltv = policy.ltv_for(candidate.property_type).max;
    if candidate.property_value <= Decimal::ZERO {
        return Ok(());
    }
    let Some(ltv) = candidate.ltv() else {
        return Err(out_of_range(ProposalField::FinancedValue, candidate.financed_value));
    };
    if ltv <= max_ltv {
        return Ok(());
    }

    let capped = candidate
        .property_value
        .checked_mul(max_ltv)
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| out_of_range(ProposalField::PropertyValue, candidate.property_value))?
        .round_dp_with_strategy(2, RoundingStrategy::ToZero);
    adjustments.push(Adjustment {
        field: ProposalField::FinancedValue,
        original_value: candidate.financed_value,
        adjusted_value: capped,
        reason: format!(
            "financed value reduced from {} to {} to respect the {}% LTV limit of {} (property value {})",
            money(candidate.financed_value),
            money(capped),
            max_ltv.normalize(),
            policy.display_name,
            money(candidate.property_value)
        ),
        kind: AdjustmentKind::Automatic,
    });
    candidate.financed_value = capped;
    Ok(())
}

/// Refusal for amounts whose ratios cannot be computed.
pub(crate) fn out_of_range(field: ProposalField, value: Decimal) -> Rejection {
    Rejection {
        code: ValidationCode::ValueOutOfRange,
        field,
        value,
        limit: MAX_MONEY_VALUE,
        reason: format!("{} is too large to normalize", value.normalize()),
    }
}

pub(crate) fn clamp_term(
    candidate: &mut LoanTerms,
    policy: &BankPolicy,
    adjustments: &mut Vec<Adjustment>,
) {
    let range = policy.term_for(candidate.property_type);
    let clamped = range.clamp(candidate.term_months);
    if clamped == candidate.term_months {
        return;
    }

    let bound = if clamped == range.max { "maximum" } else { "minimum" };
    adjustments.push(Adjustment {
        field: ProposalField::Term,
        original_value: Decimal::from(candidate.term_months),
        adjusted_value: Decimal::from(clamped),
        reason: format!(
            "term changed from {} to {} months to meet the {} {} of {} months",
            candidate.term_months, clamped, policy.display_name, bound, clamped
        ),
        kind: AdjustmentKind::Automatic,
    });
    candidate.term_months = clamped;
}

pub(crate) fn money(value: Decimal) -> Decimal {
    value.round_dp(2).normalize()
}
