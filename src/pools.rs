use crate::error::{Result, VariatorError};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

pub const REFERENCE: &str = "reference";
pub const REFERENCE_PREFIXES: &str = "reference_prefixes";
pub const DATES: &str = "dates";
pub const CURRENCIES: &str = "currencies";
pub const AMOUNTS: &str = "amounts";
pub const ACCOUNT_NUMBERS: &str = "account_numbers";
pub const BANK_CODES: &str = "bank_codes";
pub const BANK_PREFIXES: &str = "bank_prefixes";
pub const BANK_SUFFIXES: &str = "bank_suffixes";
pub const FIRST_NAMES: &str = "first_names";
pub const LAST_NAMES: &str = "last_names";
pub const COMPANY_PREFIXES: &str = "company_prefixes";
pub const COMPANY_MIDS: &str = "company_mids";
pub const COMPANY_SUFFIXES: &str = "company_suffixes";
pub const STREET_NAMES: &str = "street_names";
pub const STREET_TYPES: &str = "street_types";
pub const CITIES: &str = "cities";
pub const SENDER_NAMES: &str = "sender_names";
pub const SENDER_ADDRESSES: &str = "sender_addresses";
pub const BENEFICIARY_NAMES: &str = "beneficiary_names";
pub const BENEFICIARY_ADDRESSES: &str = "beneficiary_addresses";
pub const PAYMENT_DETAIL_TEMPLATES: &str = "payment_detail_templates";
pub const INSTRUCTION_TEMPLATES: &str = "instruction_templates";

/// Pools a fully featured variation run draws from. Pass as
/// `required_pools` to fail fast when any of them is missing.
pub const ESSENTIAL_POOLS: [&str; 12] = [
    CURRENCIES,
    BANK_PREFIXES,
    BANK_SUFFIXES,
    FIRST_NAMES,
    LAST_NAMES,
    COMPANY_PREFIXES,
    COMPANY_MIDS,
    COMPANY_SUFFIXES,
    STREET_NAMES,
    STREET_TYPES,
    CITIES,
    REFERENCE_PREFIXES,
];

/// Named candidate values, read-only during generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubstitutionPools {
    pools: BTreeMap<String, Vec<String>>,
}

impl SubstitutionPools {
    pub fn new(pools: BTreeMap<String, Vec<String>>) -> Self {
        Self { pools }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.pools
            .get(name)
            .map(|values| values.as_slice())
            .filter(|values| !values.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(|name| name.as_str())
    }

    /// Uniform pick from a pool; `None` when the pool is absent or empty.
    pub fn choose<R: Rng + ?Sized>(&self, name: &str, rng: &mut R) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.choose(rng))
            .map(|value| value.as_str())
    }

    /// Uniform pick from the first non-empty pool among `names`.
    pub fn choose_first<R: Rng + ?Sized>(&self, names: &[&str], rng: &mut R) -> Option<&str> {
        let pool = names.iter().find_map(|name| self.get(name))?;
        pool.choose(rng).map(|value| value.as_str())
    }

    /// Adds `other`'s pools, replacing same-named pools in `self`.
    pub fn overlay(&mut self, other: &SubstitutionPools) {
        for (name, values) in &other.pools {
            self.pools.insert(name.clone(), values.clone());
        }
    }

    pub fn ensure_present(&self, required: &[String]) -> Result<()> {
        for name in required {
            if !self.contains(name) {
                return Err(VariatorError::MissingPool(name.clone()));
            }
        }
        Ok(())
    }

    /// Sample data covering every pool the rules draw from.
    pub fn builtin() -> Self {
        let mut pools = BTreeMap::new();
        let mut add = |name: &str, values: &[&str]| {
            pools.insert(
                name.to_string(),
                values.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
            );
        };

        add(
            CURRENCIES,
            &[
                "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "NZD", "SGD", "HKD", "CNY", "SEK",
                "NOK", "DKK", "ZAR", "MXN", "BRL", "INR", "THB",
            ],
        );
        add(
            BANK_PREFIXES,
            &[
                "BANK", "FIN", "CITI", "TRAD", "PAY", "TRUST", "METRO", "WEST", "EAST", "UNION",
                "ROYAL", "NATL", "FIRST", "INTER", "GLOBAL", "PACIFIC", "CREDIT", "PRIME", "ALPHA",
                "DELTA",
            ],
        );
        add(
            BANK_SUFFIXES,
            &[
                "US", "EU", "GB", "JP", "CN", "SG", "AU", "DE", "FR", "IT", "ES", "CA", "CH", "KR",
                "HK", "BR", "MX", "IN", "AE", "SA",
            ],
        );
        add(
            REFERENCE_PREFIXES,
            &[
                "REF", "INV", "TR", "PAY", "PO", "TX", "SL", "FC", "TF", "PMT", "CTR", "ACH", "WIR",
                "FX", "DIV", "AP", "AR", "STMT", "BATCH", "INTL",
            ],
        );
        add(
            FIRST_NAMES,
            &[
                "JOHN", "JANE", "ROBERT", "MARY", "DAVID", "LISA", "MICHAEL", "SARAH", "JAMES",
                "EMILY", "WILLIAM", "EMMA", "JOSEPH", "OLIVIA", "RICHARD", "SOPHIA",
            ],
        );
        add(
            LAST_NAMES,
            &[
                "SMITH", "JONES", "BROWN", "JOHNSON", "DAVIS", "MILLER", "WILSON", "MOORE",
                "ANDERSON", "TAYLOR", "THOMAS", "JACKSON", "WHITE", "HARRIS", "MARTIN", "CLARK",
            ],
        );
        add(
            STREET_NAMES,
            &[
                "MAIN", "HIGH", "PARK", "OAK", "PINE", "MAPLE", "BROADWAY", "MARKET", "RIVER", "LAKE",
                "FOREST", "MEADOW", "SUNSET", "HILL", "VALLEY", "CEDAR",
            ],
        );
        add(
            STREET_TYPES,
            &[
                "STREET", "AVENUE", "ROAD", "BOULEVARD", "DRIVE", "LANE", "PLACE", "COURT", "WAY",
                "TERRACE", "PLAZA", "SQUARE",
            ],
        );
        add(
            CITIES,
            &[
                "NEW YORK", "LONDON", "PARIS", "BERLIN", "TOKYO", "SYDNEY", "SINGAPORE",
                "HONG KONG", "MADRID", "ROME", "DUBAI", "TORONTO", "SEOUL", "AMSTERDAM",
            ],
        );
        add(
            COMPANY_PREFIXES,
            &[
                "GLOBAL", "UNITED", "FIRST", "INTER", "TRANS", "MEGA", "MICRO", "NEW", "EASTERN",
                "WESTERN", "NATIONAL", "PACIFIC", "METRO", "CENTRAL", "CROWN", "PRIME",
            ],
        );
        add(
            COMPANY_MIDS,
            &[
                "TRADE", "FINANCE", "TECH", "SYSTEMS", "SOLUTIONS", "PARTNERS", "HOLDINGS",
                "INSURANCE", "INVESTMENTS", "LOGISTICS", "EXPORTS", "IMPORTS", "INDUSTRIES",
                "ENERGY", "TELECOM", "MEDIA",
            ],
        );
        add(
            COMPANY_SUFFIXES,
            &[
                "LTD", "INC", "CORP", "LLC", "PLC", "SA", "AG", "GROUP", "CO", "TRUST",
                "INTERNATIONAL", "ENTERPRISES",
            ],
        );
        add(
            ACCOUNT_NUMBERS,
            &[
                "12345678901234",
                "98765432109876",
                "11223344556677",
                "55667788991010",
                "99887766554433",
                "34343434343434",
                "10203040506070",
            ],
        );
        add(
            AMOUNTS,
            &[
                "100000,00",
                "250000,00",
                "500000,00",
                "750000,00",
                "1000000,00",
                "10000,00",
                "25000,00",
                "125000,00",
            ],
        );
        add(
            PAYMENT_DETAIL_TEMPLATES,
            &[
                "PAYMENT FOR SERVICES",
                "CONSULTING FEE",
                "PRODUCT PURCHASE",
                "INVOICE SETTLEMENT",
                "CONTRACT PAYMENT",
                "INVOICE {number:10000:99999}",
                "PAYMENT REF {string:8}",
                "ORDER {number:1000:9999}/{number:1:99}",
                "CONTRACT {number:100000:999999}",
            ],
        );
        add(
            INSTRUCTION_TEMPLATES,
            &[
                "PLEASE CREDIT BENEFICIARY ACCOUNT PROMPTLY",
                "REF {string:8}",
                "DO NOT CONVERT - KEEP IN ORIGINAL CURRENCY",
                "CHARGES TO BE PAID BY BENEFICIARY",
                "CHARGES TO BE PAID BY ORDERING CUSTOMER",
                "PAYMENT RELATED TO CONTRACT {string:6}",
                "NOTIFY BENEFICIARY UPON RECEIPT",
            ],
        );

        Self { pools }
    }
}
