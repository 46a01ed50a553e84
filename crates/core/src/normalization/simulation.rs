use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};

use super::{
    cap_ltv, clamp_term, money, out_of_range, reject_below_floors, Normalization, Normalizer,
    Rejection,
};
use crate::domain::proposal::LoanTerms;
use crate::domain::validation::{Adjustment, AdjustmentKind, ProposalField};
use crate::policy::{BankPolicy, BankPolicyTable};

/// Simulation-time normalization.
///
/// Same as proposal time, plus a financing floor: when the financed value is below the bank
/// minimum it is raised to that minimum and the property value is inflated by the same factor,
/// keeping the LTV produced by the cap step.
#[derive(Clone, Debug)]
pub struct SimulationNormalizer {
    policies: Arc<BankPolicyTable>,
}

impl SimulationNormalizer {
    pub fn new(policies: Arc<BankPolicyTable>) -> Self {
        Self { policies }
    }

    pub fn standard() -> Self {
        Self::new(Arc::new(BankPolicyTable::standard()))
    }
}

impl Normalizer for SimulationNormalizer {
    fn policies(&self) -> &BankPolicyTable {
        &self.policies
    }

    fn normalize_with_policy(
        &self,
        candidate: &LoanTerms,
        policy: &BankPolicy,
    ) -> Result<Normalization, Rejection> {
        reject_below_floors(candidate, policy)?;

        let mut adjusted = candidate.clone();
        let mut adjustments = Vec::new();
        cap_ltv(&mut adjusted, policy, &mut adjustments)?;
        raise_financing_floor(&mut adjusted, policy, &mut adjustments)?;
        clamp_term(&mut adjusted, policy, &mut adjustments);

        Ok(Normalization { adjusted, adjustments })
    }
}

fn raise_financing_floor(
    candidate: &mut LoanTerms,
    policy: &BankPolicy,
    adjustments: &mut Vec<Adjustment>,
) -> Result<(), Rejection> {
    let minimum = policy.min_financing_value;
    if candidate.financed_value >= minimum || candidate.financed_value <= Decimal::ZERO {
        return Ok(());
    }

    let inflated_property = candidate
        .property_value
        .checked_mul(minimum)
        .and_then(|scaled| scaled.checked_div(candidate.financed_value))
        .ok_or_else(|| out_of_range(ProposalField::PropertyValue, candidate.property_value))?
        .round_dp_with_strategy(2, RoundingStrategy::AwayFromZero);

    adjustments.push(Adjustment {
        field: ProposalField::FinancedValue,
        original_value: candidate.financed_value,
        adjusted_value: minimum,
        reason: format!(
            "financed value raised from {} to the {} minimum of {}",
            money(candidate.financed_value),
            policy.display_name,
            money(minimum)
        ),
        kind: AdjustmentKind::Automatic,
    });
    adjustments.push(Adjustment {
        field: ProposalField::PropertyValue,
        original_value: candidate.property_value,
        adjusted_value: inflated_property,
        reason: format!(
            "property value raised from {} to {} to keep the loan-to-value ratio",
            money(candidate.property_value),
            money(inflated_property)
        ),
        kind: AdjustmentKind::Automatic,
    });

    candidate.financed_value = minimum;
    candidate.property_value = inflated_property;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::SimulationNormalizer;
    use crate::domain::proposal::fixtures::proposal;
    use crate::domain::proposal::{BankName, MAX_MONEY_VALUE};
    use crate::domain::validation::{ProposalField, ValidationCode};
    use crate::normalization::{NormalizationError, Normalizer, ProposalNormalizer};

    fn bank(name: &str) -> BankName {
        BankName(name.to_string())
    }

    #[test]
    fn small_financing_is_raised_and_property_inflated_proportionally() {
        let normalizer = SimulationNormalizer::standard();
        let candidate = proposal(300_000, 60_000, 240).loan_terms();

        let outcome = normalizer.normalize(&candidate, &bank("inter")).expect("normalizes");

        assert_eq!(outcome.adjusted.financed_value, Decimal::from(100_000));
        assert_eq!(outcome.adjusted.property_value, Decimal::from(500_000));
        assert_eq!(outcome.adjusted.ltv(), candidate.ltv());
        let fields: Vec<_> = outcome.adjustments.iter().map(|a| a.field).collect();
        assert_eq!(fields, vec![ProposalField::FinancedValue, ProposalField::PropertyValue]);
    }

    #[test]
    fn inflated_property_is_rounded_up_to_cents() {
        let normalizer = SimulationNormalizer::standard();
        let candidate = proposal(250_000, 70_000, 240).loan_terms();

        let outcome = normalizer.normalize(&candidate, &bank("inter")).expect("normalizes");

        // 250000 * 100000 / 70000 = 357142.857...
        assert_eq!(outcome.adjusted.property_value, Decimal::new(35_714_286, 2));
    }

    #[test]
    fn inflating_a_tiny_financing_share_is_rejected_when_it_overflows() {
        let normalizer = SimulationNormalizer::standard();
        let mut candidate = proposal(300_000, 60_000, 240).loan_terms();
        candidate.property_value = MAX_MONEY_VALUE;
        candidate.financed_value = Decimal::new(1, 28);

        let error = normalizer.normalize(&candidate, &bank("inter")).expect_err("overflow");

        let NormalizationError::Rejected(rejection) = error else {
            panic!("expected a rejection, got {error:?}");
        };
        assert_eq!(rejection.code, ValidationCode::ValueOutOfRange);
    }

    #[test]
    fn proposal_time_never_raises_financing() {
        let candidate = proposal(300_000, 60_000, 240).loan_terms();

        let outcome =
            ProposalNormalizer::standard().normalize(&candidate, &bank("inter")).expect("normalizes");

        assert!(outcome.is_unchanged());
        assert_eq!(outcome.adjusted.financed_value, Decimal::from(60_000));
    }

    #[test]
    fn ltv_cap_runs_before_the_financing_floor() {
        let normalizer = SimulationNormalizer::standard();
        let candidate = proposal(300_000, 290_000, 240).loan_terms();

        let outcome = normalizer.normalize(&candidate, &bank("caixa")).expect("normalizes");

        assert_eq!(outcome.adjusted.financed_value, Decimal::from(240_000));
        assert_eq!(outcome.adjustments.len(), 1);
    }
}
