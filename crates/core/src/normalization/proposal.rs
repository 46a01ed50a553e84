use std::sync::Arc;

use super::{cap_ltv, clamp_term, reject_below_floors, Normalization, Normalizer, Rejection};
use crate::domain::proposal::LoanTerms;
use crate::policy::{BankPolicy, BankPolicyTable};

/// Proposal-time normalization: floors, then LTV cap on the financed value, then term clamp.
#[derive(Clone, Debug)]
pub struct ProposalNormalizer {
    policies: Arc<BankPolicyTable>,
}

impl ProposalNormalizer {
    pub fn new(policies: Arc<BankPolicyTable>) -> Self {
        Self { policies }
    }

    pub fn standard() -> Self {
        Self::new(Arc::new(BankPolicyTable::standard()))
    }
}

impl Normalizer for ProposalNormalizer {
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
        clamp_term(&mut adjusted, policy, &mut adjustments);

        Ok(Normalization { adjusted, adjustments })
    }
}
