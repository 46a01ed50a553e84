use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::debug;

use super::banks::{BankRules, BradescoRules, InterRules, ItauRules, SantanderRules, StandardRules};
use super::{PolicyStrategy, ValidationStrategy};
use crate::domain::proposal::BankName;
use crate::normalization::ProposalNormalizer;
use crate::policy::BankPolicyTable;

type RulesFactory = Box<dyn Fn() -> Box<dyn BankRules> + Send + Sync>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no validation strategy registered for bank `{0}`")]
    NotRegistered(BankName),
    #[error("bank `{0}` has a strategy but no policy")]
    MissingPolicy(BankName),
    #[error("strategy cache lock poisoned")]
    Poisoned,
}

/// Maps bank names to strategy constructors and caches one strategy per bank after first use.
pub struct StrategyRegistry {
    policies: Arc<BankPolicyTable>,
    factories: HashMap<BankName, RulesFactory>,
    instances: RwLock<HashMap<BankName, Arc<dyn ValidationStrategy>>>,
}

impl StrategyRegistry {
    pub fn new(policies: Arc<BankPolicyTable>) -> Self {
        Self { policies, factories: HashMap::new(), instances: RwLock::new(HashMap::new()) }
    }

    pub fn with_default_banks(policies: Arc<BankPolicyTable>) -> Self {
        let mut registry = Self::new(policies);
        registry.register(bank("itau"), || Box::new(ItauRules::default()));
        registry.register(bank("santander"), || Box::new(SantanderRules));
        registry.register(bank("bradesco"), || Box::new(BradescoRules));
        registry.register(bank("inter"), || Box::new(InterRules));
        registry.register(bank("caixa"), || Box::new(StandardRules));
        registry
    }

    pub fn standard() -> Self {
        Self::with_default_banks(Arc::new(BankPolicyTable::standard()))
    }

    /// Replaces any earlier registration and drops the cached instance for that bank.
    pub fn register<F>(&mut self, bank: BankName, factory: F)
    where
        F: Fn() -> Box<dyn BankRules> + Send + Sync + 'static,
    {
        if let Ok(instances) = self.instances.get_mut() {
            instances.remove(&bank);
        }
        self.factories.insert(bank, Box::new(factory));
    }

    pub fn contains(&self, bank: &BankName) -> bool {
        self.factories.contains_key(bank)
    }

    pub fn banks(&self) -> Vec<BankName> {
        let mut banks: Vec<_> = self.factories.keys().cloned().collect();
        banks.sort();
        banks
    }

    pub fn policies(&self) -> &Arc<BankPolicyTable> {
        &self.policies
    }

    pub fn resolve(&self, bank: &BankName) -> Result<Arc<dyn ValidationStrategy>, RegistryError> {
        if let Some(strategy) =
            self.instances.read().map_err(|_| RegistryError::Poisoned)?.get(bank)
        {
            return Ok(Arc::clone(strategy));
        }

        let factory =
            self.factories.get(bank).ok_or_else(|| RegistryError::NotRegistered(bank.clone()))?;
        let policy =
            self.policies.get(bank).ok_or_else(|| RegistryError::MissingPolicy(bank.clone()))?;

        let mut instances = self.instances.write().map_err(|_| RegistryError::Poisoned)?;
        let strategy = instances.entry(bank.clone()).or_insert_with(|| {
            debug!(event_name = "validation.strategy.created", bank = %bank, "strategy instantiated");
            let strategy: Arc<dyn ValidationStrategy> = Arc::new(PolicyStrategy::new(
                policy.clone(),
                factory(),
                ProposalNormalizer::new(Arc::clone(&self.policies)),
            ));
            strategy
        });
        Ok(Arc::clone(strategy))
    }
}

fn bank(name: &str) -> BankName {
    BankName(name.to_string())
}
