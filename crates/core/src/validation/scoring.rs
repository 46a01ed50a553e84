//! Ranking of banks that accepted a proposal.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;

use crate::domain::proposal::PropertyType;
use crate::domain::validation::{BestBankOption, ScoredBank, ValidationResult};
use crate::policy::BankPolicyTable;

/// Weights for scoring components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    /// Starting score for every accepted bank (default: 100)
    pub base: f64,
    /// Penalty per adjustment (default: 10)
    pub adjustment_penalty: f64,
    /// Penalty per warning (default: 5)
    pub warning_penalty: f64,
    /// Bonus per point of maximum LTV (default: 0.5)
    pub max_ltv_bonus: f64,
    /// Bonus per month of maximum term (default: 0.01)
    pub max_term_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 100.0,
            adjustment_penalty: 10.0,
            warning_penalty: 5.0,
            max_ltv_bonus: 0.5,
            max_term_bonus: 0.01,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BestBankScorer {
    policies: Arc<BankPolicyTable>,
    weights: ScoringWeights,
}

impl BestBankScorer {
    pub fn new(policies: Arc<BankPolicyTable>) -> Self {
        Self { policies, weights: ScoringWeights::default() }
    }

    pub fn with_weights(policies: Arc<BankPolicyTable>, weights: ScoringWeights) -> Self {
        Self { policies, weights }
    }

    /// Score one accepted bank. Banks without a policy get no LTV or term bonus.
    pub fn score(&self, result: &ValidationResult, property_type: PropertyType) -> f64 {
        let penalty = self.weights.adjustment_penalty * result.adjustments.len() as f64
            + self.weights.warning_penalty * result.warnings.len() as f64;

        let bonus = self
            .policies
            .get(&result.bank)
            .map(|policy| {
                let max_ltv = policy.ltv_for(property_type).max.to_f64().unwrap_or(0.0);
                let max_term = f64::from(policy.term_for(property_type).max);
                self.weights.max_ltv_bonus * max_ltv + self.weights.max_term_bonus * max_term
            })
            .unwrap_or(0.0);

        self.weights.base - penalty + bonus
    }

    /// Highest score wins; equal scores keep the order the banks were validated in.
    pub fn best_of(
        &self,
        accepted: &[ValidationResult],
        property_type: PropertyType,
    ) -> Option<BestBankOption> {
        let mut ranked: Vec<ScoredBank> = accepted
            .iter()
            .map(|result| ScoredBank {
                bank: result.bank.clone(),
                score: self.score(result, property_type),
            })
            .collect();
        ranked.sort_by(|left, right| right.score.total_cmp(&left.score));

        let scores: BTreeMap<_, _> =
            ranked.iter().map(|entry| (entry.bank.clone(), entry.score)).collect();
        let mut ranked = ranked.into_iter();
        let best = ranked.next()?;

        Some(BestBankOption {
            bank: best.bank,
            score: best.score,
            alternatives: ranked.collect(),
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::BestBankScorer;
    use crate::domain::proposal::fixtures::proposal;
    use crate::domain::proposal::{BankName, PropertyType};
    use crate::domain::validation::{
        Adjustment, AdjustmentKind, ProposalField, ValidationCode, ValidationError,
        ValidationResult,
    };
    use crate::policy::BankPolicyTable;
    use rust_decimal::Decimal;

    fn accepted(bank: &str, adjustments: usize, warnings: usize) -> ValidationResult {
        let mut result =
            ValidationResult::from_findings(BankName(bank.to_string()), Vec::new(), proposal(1, 1, 1).snapshot());
        result.adjustments = (0..adjustments)
            .map(|_| Adjustment {
                field: ProposalField::Term,
                original_value: Decimal::from(480),
                adjusted_value: Decimal::from(420),
                reason: "term".to_string(),
                kind: AdjustmentKind::Automatic,
            })
            .collect();
        result.warnings = (0..warnings)
            .map(|_| ValidationError::warning(ValidationCode::ValueAdjusted, ProposalField::Term, "adjusted"))
            .collect();
        result
    }

    #[test]
    fn score_follows_the_weighted_formula() {
        let scorer = BestBankScorer::new(Arc::new(BankPolicyTable::standard()));

        let score = scorer.score(&accepted("itau", 1, 1), PropertyType::Residential);

        // 100 - 10 - 5 + 0.5 * 80 + 0.01 * 420
        assert!((score - 129.2).abs() < 1e-9, "score {score}");
    }

    #[test]
    fn best_bank_has_highest_score_and_alternatives_are_sorted() {
        let scorer = BestBankScorer::new(Arc::new(BankPolicyTable::standard()));
        let results = vec![accepted("inter", 0, 0), accepted("itau", 2, 2), accepted("caixa", 0, 0)];

        let best = scorer.best_of(&results, PropertyType::Residential).expect("best option");

        assert_eq!(best.bank, BankName("caixa".to_string()));
        let order: Vec<_> = best.alternatives.iter().map(|entry| entry.bank.0.as_str()).collect();
        assert_eq!(order, vec!["inter", "itau"]);
        assert_eq!(best.scores.len(), 3);
    }

    #[test]
    fn no_accepted_banks_means_no_best_option() {
        let scorer = BestBankScorer::new(Arc::new(BankPolicyTable::standard()));

        assert!(scorer.best_of(&[], PropertyType::Commercial).is_none());
    }
}
