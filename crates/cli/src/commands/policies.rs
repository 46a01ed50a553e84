use lendrelay_core::domain::proposal::BankName;
use lendrelay_core::policy::{BankPolicy, BankPolicyTable};

use crate::commands::{to_data, CommandResult};

pub fn run(bank: Option<&str>) -> CommandResult {
    let table = BankPolicyTable::standard();

    let policies: Vec<&BankPolicy> = match bank {
        None => table.iter().collect(),
        Some(raw) => {
            let found = BankName::parse(raw).ok().and_then(|bank| table.get(&bank));
            let Some(policy) = found else {
                let known: Vec<&str> = table.banks().map(BankName::as_str).collect();
                return CommandResult::failure(
                    "policies",
                    "unknown_bank",
                    format!("no policy for bank `{raw}` (known banks: {})", known.join("|")),
                    2,
                );
            };
            vec![policy]
        }
    };

    CommandResult::success_with_data(
        "policies",
        format!("{} bank policies", policies.len()),
        to_data(&policies),
    )
}
