use std::sync::Arc;

use tracing::{info, warn};

use super::registry::StrategyRegistry;
use super::scoring::BestBankScorer;
use crate::domain::proposal::{BankName, Proposal};
use crate::domain::validation::{
    BestBankOption, MultiValidationResult, ValidationResult, ValidationSummary,
};

pub struct ValidationManager {
    registry: Arc<StrategyRegistry>,
    scorer: BestBankScorer,
}

impl ValidationManager {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        let scorer = BestBankScorer::new(Arc::clone(registry.policies()));
        Self { registry, scorer }
    }

    pub fn with_scorer(registry: Arc<StrategyRegistry>, scorer: BestBankScorer) -> Self {
        Self { registry, scorer }
    }

    pub fn standard() -> Self {
        Self::new(Arc::new(StrategyRegistry::standard()))
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn has_strategy(&self, bank: &BankName) -> bool {
        self.registry.contains(bank)
    }

    pub fn validate_for_bank(&self, proposal: &Proposal, bank: &BankName) -> ValidationResult {
        match self.registry.resolve(bank) {
            Ok(strategy) => strategy.validate(proposal),
            Err(error) => strategy_failure(proposal, bank, &error.to_string()),
        }
    }

    pub fn adjust_for_bank(&self, proposal: &Proposal, bank: &BankName) -> ValidationResult {
        match self.registry.resolve(bank) {
            Ok(strategy) => strategy.validate_and_adjust(proposal),
            Err(error) => strategy_failure(proposal, bank, &error.to_string()),
        }
    }

    /// Validates and adjusts an independent copy of the proposal per bank.
    pub fn validate_for_multiple_banks(
        &self,
        proposal: &Proposal,
        banks: &[BankName],
    ) -> MultiValidationResult {
        let mut valid_banks = Vec::new();
        let mut invalid_banks = Vec::new();
        let mut summary = ValidationSummary::default();

        for bank in banks {
            let candidate = proposal.clone();
            let result = self.adjust_for_bank(&candidate, bank);

            summary.total_adjustments += result.adjustments.len();
            summary.total_warnings += result.warnings.len();
            summary.total_errors += result.errors.len();
            if result.was_adjusted() {
                summary.adjusted += 1;
            }
            if result.is_valid {
                summary.approved += 1;
                valid_banks.push(result);
            } else {
                summary.rejected += 1;
                invalid_banks.push(result);
            }
        }

        let best_bank_option = fewest_adjustments(&valid_banks);
        let recommendations = recommendations(&valid_banks, &invalid_banks, best_bank_option.as_ref());

        info!(
            event_name = "validation.multi_bank.completed",
            requested = banks.len(),
            approved = summary.approved,
            rejected = summary.rejected,
            adjusted = summary.adjusted,
            best_bank = best_bank_option.as_ref().map(BankName::as_str).unwrap_or("none"),
            "multi-bank validation completed"
        );

        MultiValidationResult { valid_banks, invalid_banks, summary, recommendations, best_bank_option }
    }

    pub fn get_best_bank_option(
        &self,
        result: &MultiValidationResult,
        proposal: &Proposal,
    ) -> Option<BestBankOption> {
        self.scorer.best_of(&result.valid_banks, proposal.property_type)
    }
}

fn strategy_failure(proposal: &Proposal, bank: &BankName, message: &str) -> ValidationResult {
    warn!(
        event_name = "validation.strategy.unavailable",
        bank = %bank,
        error = message,
        "no usable validation strategy for bank"
    );
    ValidationResult::strategy_error(bank.clone(), message, proposal.snapshot())
}

fn fewest_adjustments(valid: &[ValidationResult]) -> Option<BankName> {
    valid
        .iter()
        .enumerate()
        .min_by_key(|(position, result)| (result.adjustments.len(), *position))
        .map(|(_, result)| result.bank.clone())
}

fn recommendations(
    valid: &[ValidationResult],
    invalid: &[ValidationResult],
    best: Option<&BankName>,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if valid.is_empty() {
        recommendations
            .push("no selected bank accepts this proposal; review the blocking errors".to_string());
    }
    if let Some(best) = best {
        recommendations.push(format!("{best} accepts the proposal with the fewest adjustments"));
    }
    for result in valid.iter().filter(|result| result.was_adjusted()) {
        recommendations.push(format!(
            "{} accepts the proposal after {} adjustment(s)",
            result.bank,
            result.adjustments.len()
        ));
    }
    for result in invalid {
        if let Some(error) = result.errors.first() {
            recommendations.push(format!("{}: {}", result.bank, error.message));
        }
    }

    recommendations
}
