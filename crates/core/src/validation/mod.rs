//! Per-bank eligibility checks and automatic adjustment.

pub mod banks;
pub mod checks;
pub mod manager;
pub mod registry;
pub mod scoring;

use tracing::debug;

use crate::domain::proposal::{BankName, Proposal};
use crate::domain::validation::{ProposalField, ValidationCode, ValidationError, ValidationResult};
use crate::normalization::{Normalizer, ProposalNormalizer};
use crate::policy::BankPolicy;

pub use banks::{BankRules, BradescoRules, InterRules, ItauRules, SantanderRules, StandardRules};
pub use manager::ValidationManager;
pub use registry::{RegistryError, StrategyRegistry};
pub use scoring::{BestBankScorer, ScoringWeights};

pub trait ValidationStrategy: Send + Sync {
    fn bank(&self) -> &BankName;

    fn policy(&self) -> &BankPolicy;

    /// Runs every check without changing anything. Adjustable violations are still blocking here.
    fn validate(&self, proposal: &Proposal) -> ValidationResult;

    /// Validates, and when every blocking finding is adjustable, normalizes a copy of the
    /// proposal and validates the copy.
    fn validate_and_adjust(&self, proposal: &Proposal) -> ValidationResult;

    fn can_adjust(&self, field: ProposalField) -> bool {
        matches!(field, ProposalField::FinancedValue | ProposalField::Term)
    }
}

pub struct PolicyStrategy {
    policy: BankPolicy,
    rules: Box<dyn BankRules>,
    normalizer: ProposalNormalizer,
}

impl PolicyStrategy {
    pub fn new(policy: BankPolicy, rules: Box<dyn BankRules>, normalizer: ProposalNormalizer) -> Self {
        Self { policy, rules, normalizer }
    }
}

impl ValidationStrategy for PolicyStrategy {
    fn bank(&self) -> &BankName {
        &self.policy.bank
    }

    fn policy(&self) -> &BankPolicy {
        &self.policy
    }

    fn validate(&self, proposal: &Proposal) -> ValidationResult {
        let mut findings = Vec::new();

        checks::required_fields(proposal, &mut findings);
        if !self.rules.owns_ltv_rule() {
            checks::ltv_within_policy(proposal, &self.policy, &mut findings);
        }
        if !self.rules.owns_term_rule() {
            checks::term_within_policy(proposal, &self.policy, &mut findings);
        }
        checks::property_value_floor(proposal, &self.policy, &mut findings);
        checks::income_floor(proposal, &self.policy, &mut findings);

        let effective = self.rules.effective_policy(proposal, &self.policy);
        self.rules.check(proposal, &effective, &mut findings);

        ValidationResult::from_findings(self.policy.bank.clone(), findings, proposal.snapshot())
    }

    fn validate_and_adjust(&self, proposal: &Proposal) -> ValidationResult {
        let mut initial = self.validate(proposal);
        if initial.is_valid {
            return initial;
        }
        if initial.errors.iter().any(|error| !self.can_adjust(error.field)) {
            return initial;
        }

        let effective = self.rules.effective_policy(proposal, &self.policy);
        let normalization =
            match self.normalizer.normalize_with_policy(&proposal.loan_terms(), &effective) {
                Ok(normalization) if normalization.is_unchanged() => return initial,
                Ok(normalization) => normalization,
                Err(rejection) => {
                    debug!(
                        event_name = "validation.adjustment.rejected",
                        bank = %self.policy.bank,
                        code = rejection.code.as_str(),
                        "normalization refused to adjust proposal"
                    );
                    if !initial.errors.iter().any(|error| error.code == rejection.code) {
                        initial.errors.push(rejection.to_validation_error());
                    }
                    return initial;
                }
            };

        let adjusted = proposal.with_loan_terms(&normalization.adjusted);
        let mut result = self.validate(&adjusted);
        result.original_snapshot = proposal.snapshot();
        result.adjusted_snapshot = Some(adjusted.snapshot());
        result.warnings.extend(normalization.adjustments.iter().map(|adjustment| {
            ValidationError::warning(
                ValidationCode::ValueAdjusted,
                adjustment.field,
                adjustment.reason.clone(),
            )
        }));
        result.adjustments = normalization.adjustments;

        debug!(
            event_name = "validation.adjustment.applied",
            bank = %self.policy.bank,
            adjustments = result.adjustments.len(),
            is_valid = result.is_valid,
            "proposal adjusted to bank policy"
        );
        result
    }
}
