//! Per-bank underwriting limits.
//!
//! A [`BankPolicyTable`] is built once at startup and shared read-only by the
//! normalizers, the validation strategies and the best-bank scorer.

mod table;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::proposal::{BankName, PropertyType};

pub use table::standard_policies;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LtvRange {
    pub min: Decimal,
    pub max: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRange {
    pub min: u32,
    pub max: u32,
}

impl TermRange {
    pub fn contains(&self, term_months: u32) -> bool {
        (self.min..=self.max).contains(&term_months)
    }

    pub fn clamp(&self, term_months: u32) -> u32 {
        term_months.max(self.min).min(self.max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByPropertyType<T> {
    pub residential: T,
    pub commercial: T,
}

impl<T> ByPropertyType<T> {
    pub fn get(&self, property_type: PropertyType) -> &T {
        match property_type {
            PropertyType::Residential => &self.residential,
            PropertyType::Commercial => &self.commercial,
        }
    }

    pub fn get_mut(&mut self, property_type: PropertyType) -> &mut T {
        match property_type {
            PropertyType::Residential => &mut self.residential,
            PropertyType::Commercial => &mut self.commercial,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankPolicy {
    pub bank: BankName,
    pub display_name: String,
    pub ltv: ByPropertyType<LtvRange>,
    pub term: ByPropertyType<TermRange>,
    pub min_property_value: Decimal,
    pub min_financing_value: Decimal,
    pub min_income: Option<Decimal>,
}

impl BankPolicy {
    pub fn ltv_for(&self, property_type: PropertyType) -> LtvRange {
        *self.ltv.get(property_type)
    }

    pub fn term_for(&self, property_type: PropertyType) -> TermRange {
        *self.term.get(property_type)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BankPolicyTable {
    policies: BTreeMap<BankName, BankPolicy>,
}

impl BankPolicyTable {
    pub fn new(policies: impl IntoIterator<Item = BankPolicy>) -> Self {
        Self { policies: policies.into_iter().map(|policy| (policy.bank.clone(), policy)).collect() }
    }

    /// The partner banks the platform integrates with today.
    pub fn standard() -> Self {
        Self::new(standard_policies())
    }

    pub fn get(&self, bank: &BankName) -> Option<&BankPolicy> {
        self.policies.get(bank)
    }

    pub fn contains(&self, bank: &BankName) -> bool {
        self.policies.contains_key(bank)
    }

    pub fn banks(&self) -> impl Iterator<Item = &BankName> {
        self.policies.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BankPolicy> {
        self.policies.values()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
