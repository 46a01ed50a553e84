use std::path::Path;
use std::sync::Arc;

use lendrelay_banks::build_gateways;
use lendrelay_core::config::{AppConfig, LoadOptions};
use lendrelay_core::normalization::SimulationNormalizer;
use lendrelay_core::simulation::SimulationService;

use crate::commands::{input_failure, load_proposal, resolve_banks, runtime, to_data, CommandResult};

/// Quotes the proposal at each bank. Nothing is persisted.
pub fn run(options: LoadOptions, proposal_path: &Path, requested: &[String]) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "simulate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let proposal = match load_proposal(proposal_path) {
        Ok(proposal) => proposal,
        Err(error) => return input_failure("simulate", &error),
    };
    let banks = match resolve_banks(requested, &proposal, || config.configured_banks()) {
        Ok(banks) => banks,
        Err(error) => return input_failure("simulate", &error),
    };

    let gateways = match build_gateways(&config) {
        Ok(gateways) => Arc::new(gateways),
        Err(error) => {
            return CommandResult::failure("simulate", "bank_adapter", error.to_string(), 4);
        }
    };

    let runtime = match runtime("simulate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let service = SimulationService::new(SimulationNormalizer::standard(), gateways);
    let results = runtime.block_on(service.simulate(&proposal, &banks));
    let quoted = results.iter().filter(|result| result.success).count();
    let message = format!("{quoted} of {} banks returned a simulation", results.len());

    if quoted == 0 {
        return CommandResult::failure_with_data(
            "simulate",
            "no_simulation",
            message,
            1,
            to_data(&results),
        );
    }
    CommandResult::success_with_data("simulate", message, to_data(&results))
}
