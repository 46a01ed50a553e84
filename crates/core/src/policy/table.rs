use rust_decimal::Decimal;

use super::{BankPolicy, ByPropertyType, LtvRange, TermRange};
use crate::domain::proposal::BankName;

fn ltv(min: i64, max: i64) -> LtvRange {
    LtvRange { min: Decimal::from(min), max: Decimal::from(max) }
}

fn term(min: u32, max: u32) -> TermRange {
    TermRange { min, max }
}

fn policy(
    bank: &str,
    display_name: &str,
    ltv: ByPropertyType<LtvRange>,
    term: ByPropertyType<TermRange>,
    min_property_value: i64,
    min_financing_value: i64,
    min_income: Option<i64>,
) -> BankPolicy {
    BankPolicy {
        bank: BankName(bank.to_string()),
        display_name: display_name.to_string(),
        ltv,
        term,
        min_property_value: Decimal::from(min_property_value),
        min_financing_value: Decimal::from(min_financing_value),
        min_income: min_income.map(Decimal::from),
    }
}

pub fn standard_policies() -> Vec<BankPolicy> {
    vec![
        policy(
            "itau",
            "Itaú Unibanco",
            ByPropertyType { residential: ltv(10, 80), commercial: ltv(10, 60) },
            ByPropertyType { residential: term(60, 420), commercial: term(60, 240) },
            100_000,
            50_000,
            Some(3_000),
        ),
        policy(
            "santander",
            "Santander",
            ByPropertyType { residential: ltv(10, 80), commercial: ltv(10, 60) },
            ByPropertyType { residential: term(36, 420), commercial: term(36, 180) },
            90_000,
            60_000,
            None,
        ),
        policy(
            "bradesco",
            "Bradesco",
            ByPropertyType { residential: ltv(10, 80), commercial: ltv(10, 50) },
            ByPropertyType { residential: term(60, 360), commercial: term(60, 180) },
            150_000,
            80_000,
            Some(4_000),
        ),
        policy(
            "inter",
            "Banco Inter",
            ByPropertyType { residential: ltv(10, 75), commercial: ltv(10, 50) },
            ByPropertyType { residential: term(24, 360), commercial: term(24, 180) },
            200_000,
            100_000,
            Some(5_000),
        ),
        policy(
            "caixa",
            "Caixa Econômica Federal",
            ByPropertyType { residential: ltv(5, 80), commercial: ltv(5, 50) },
            ByPropertyType { residential: term(24, 420), commercial: term(24, 240) },
            80_000,
            40_000,
            None,
        ),
    ]
}
