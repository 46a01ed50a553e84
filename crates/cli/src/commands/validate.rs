use std::path::Path;

use lendrelay_core::validation::ValidationManager;
use serde_json::json;

use crate::commands::{input_failure, load_proposal, resolve_banks, CommandResult};

/// Offline multi-bank validation. No bank is contacted and nothing is stored.
pub fn run(proposal_path: &Path, requested: &[String]) -> CommandResult {
    let manager = ValidationManager::standard();

    let proposal = match load_proposal(proposal_path) {
        Ok(proposal) => proposal,
        Err(error) => return input_failure("validate", &error),
    };
    let banks = match resolve_banks(requested, &proposal, || manager.registry().banks()) {
        Ok(banks) => banks,
        Err(error) => return input_failure("validate", &error),
    };

    let result = manager.validate_for_multiple_banks(&proposal, &banks);
    let best_bank = manager.get_best_bank_option(&result, &proposal);
    let message = format!(
        "{} of {} banks accept the proposal ({} adjusted)",
        result.summary.approved,
        banks.len(),
        result.summary.adjusted
    );
    let data = Some(json!({ "validation": result, "best_bank": best_bank }));

    if result.summary.approved == 0 {
        return CommandResult::failure_with_data("validate", "no_valid_bank", message, 1, data);
    }
    CommandResult::success_with_data("validate", message, data)
}
