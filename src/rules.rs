//! Substitution rules, one per field category.
//!
//! Inline rules receive a single zone and return its replacement text
//! (prefix included). Block rules receive every slot of a multi-line block
//! and return exactly one line per slot. Any rule may fail; the engine then
//! keeps the original text.

use crate::error::{RuleResult, SubstitutionError};
use crate::minitemplate::expand_directives;
use crate::pools::{self, SubstitutionPools};
use crate::registry::FieldZone;
use crate::schema::FieldCategory;
use crate::utils::{
    clamp_day, format_amount, format_swift_date, is_amount_char, parse_amount, parse_swift_date,
    random_string, shift_month, ALPHANUMERIC, DIGITS, UPPERCASE,
};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Days a shifted value date may drift around the original day of month.
pub const DAY_JITTER: i64 = 7;

/// Knobs the rules read from the generation config.
#[derive(Debug, Clone)]
pub struct RuleTuning {
    amount_factor: Uniform<f64>,
    max_date_shift_months: i64,
}

impl RuleTuning {
    /// `amount_perturbation` must already be validated to lie in `[0, 1)`.
    pub fn new(amount_perturbation: f64, max_date_shift_months: u32) -> Self {
        Self {
            amount_factor: Uniform::new_inclusive(
                1.0 - amount_perturbation,
                1.0 + amount_perturbation,
            ),
            max_date_shift_months: max_date_shift_months as i64,
        }
    }
}

/// Everything a rule may draw from while producing one substitute.
pub struct RuleContext<'a> {
    rng: &'a mut StdRng,
    pools: &'a SubstitutionPools,
    tuning: &'a RuleTuning,
}

impl<'a> RuleContext<'a> {
    pub fn new(rng: &'a mut StdRng, pools: &'a SubstitutionPools, tuning: &'a RuleTuning) -> Self {
        Self { rng, pools, tuning }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        self.rng
    }

    fn pick(&mut self, pool: &str) -> Option<String> {
        let pools = self.pools;
        pools.choose(pool, self.rng()).map(str::to_string)
    }

    fn pick_first(&mut self, names: &[&str]) -> Option<String> {
        let pools = self.pools;
        pools.choose_first(names, self.rng()).map(str::to_string)
    }

    /// Pool value, or a made-up uppercase word when the pool is missing.
    fn pick_or_word(&mut self, pool: &str) -> String {
        match self.pick(pool) {
            Some(value) => value,
            None => {
                let length = self.rng.gen_range(4..=8);
                random_string(self.rng(), length, UPPERCASE)
            }
        }
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability)
    }

    fn amount_factor(&mut self) -> f64 {
        let tuning = self.tuning;
        tuning.amount_factor.sample(self.rng())
    }

    fn shifted_date(&mut self, year: i32, month: u32, day: u32) -> RuleResult<String> {
        let max = self.tuning.max_date_shift_months;
        let delta = self.rng.gen_range(-max..=max);
        let (year, month) = shift_month(year, month, delta);
        let day = clamp_day(day as i64 + self.rng.gen_range(-DAY_JITTER..=DAY_JITTER));

        i32::try_from(year)
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
            .map(format_swift_date)
            .ok_or_else(|| {
                SubstitutionError::InvalidDate(format!("{:04}-{:02}-{:02}", year, month, day))
            })
    }
}

/// Lines of a block, one slot per line that may be rewritten.
#[derive(Debug, Clone)]
pub struct BlockZone<'a> {
    pub category: &'a FieldCategory,
    pub slots: Vec<&'a str>,
}

fn leading_whitespace(value: &str) -> usize {
    value.len() - value.trim_start().len()
}

pub fn substitute_reference(zone: &FieldZone<'_>, ctx: &mut RuleContext<'_>) -> RuleResult<String> {
    let value = zone.content.trim();
    if !value.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(SubstitutionError::MissingContent {
            category: FieldCategory::Reference.name().to_string(),
        });
    }

    let replacement = match ctx.pick(pools::REFERENCE) {
        Some(reference) => reference,
        None => {
            let prefix = ctx.pick(pools::REFERENCE_PREFIXES).unwrap_or_default();
            let digit_count = ctx.rng().gen_range(4..=8);
            let digits = random_string(ctx.rng(), digit_count, DIGITS);
            let letter_count = ctx.rng().gen_range(1..=3);
            let letters = random_string(ctx.rng(), letter_count, UPPERCASE);
            format!("{}{}{}", prefix, digits, letters)
        }
    };

    Ok(format!(
        "{}{}",
        zone.prefix,
        zone.content.replacen(value, &replacement, 1)
    ))
}

/// `YYMMDD` + three-letter currency + comma-decimal amount, e.g. `230101EUR10000,00`.
/// Anything after the amount is kept.
pub fn substitute_date_amount_currency(
    zone: &FieldZone<'_>,
    ctx: &mut RuleContext<'_>,
) -> RuleResult<String> {
    let lead = leading_whitespace(zone.content);
    let body = &zone.content[lead..];

    let date = body
        .get(0..6)
        .ok_or_else(|| SubstitutionError::InvalidDate(body.to_string()))?;
    let (year, month, day) =
        parse_swift_date(date).ok_or_else(|| SubstitutionError::InvalidDate(date.to_string()))?;

    let currency = body
        .get(6..9)
        .filter(|c| c.chars().all(|c| c.is_ascii_alphabetic()))
        .ok_or_else(|| SubstitutionError::InvalidCurrency(body[6..].chars().take(3).collect()))?;

    let rest = &body[9..];
    let amount_len = rest.find(|c: char| !is_amount_char(c)).unwrap_or(rest.len());
    let (amount, tail) = rest.split_at(amount_len);
    let original_amount =
        parse_amount(amount).ok_or_else(|| SubstitutionError::InvalidAmount(amount.to_string()))?;

    let new_date = match ctx.pick(pools::DATES) {
        Some(date) => date,
        None => ctx.shifted_date(year, month, day)?,
    };
    let new_currency = match ctx.pick(pools::CURRENCIES) {
        Some(code) => code,
        None => random_string(ctx.rng(), currency.len(), UPPERCASE),
    };
    let new_amount = match ctx.pick(pools::AMOUNTS) {
        Some(amount) => amount,
        None => format_amount(original_amount * ctx.amount_factor()),
    };

    Ok(format!(
        "{}{}{}{}{}{}",
        zone.prefix,
        &zone.content[..lead],
        new_date,
        new_currency,
        new_amount,
        tail
    ))
}

pub fn substitute_account_number(
    zone: &FieldZone<'_>,
    ctx: &mut RuleContext<'_>,
) -> RuleResult<String> {
    if zone.content.is_empty() {
        return Err(SubstitutionError::MissingContent {
            category: FieldCategory::AccountNumber.name().to_string(),
        });
    }

    let digits = match ctx.pick(pools::ACCOUNT_NUMBERS) {
        Some(account) => account,
        None => random_string(ctx.rng(), zone.content.chars().count(), DIGITS),
    };

    Ok(format!("{}{}", zone.prefix, digits))
}

pub fn substitute_bank_code(zone: &FieldZone<'_>, ctx: &mut RuleContext<'_>) -> RuleResult<String> {
    let value = zone.content.trim();
    if !value.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(SubstitutionError::MissingContent {
            category: FieldCategory::BankCode.name().to_string(),
        });
    }

    let code = match ctx.pick(pools::BANK_CODES) {
        Some(code) => code,
        None => synthesize_bank_code(ctx),
    };

    Ok(format!(
        "{}{}",
        zone.prefix,
        zone.content.replacen(value, &code, 1)
    ))
}

/// Institution (4) + country (2) + location (2) + optional branch (3).
fn synthesize_bank_code(ctx: &mut RuleContext<'_>) -> String {
    let institution = match ctx.pick(pools::BANK_PREFIXES) {
        Some(prefix) => prefix.chars().take(4).collect(),
        None => random_string(ctx.rng(), 4, UPPERCASE),
    };
    let country = match ctx.pick(pools::BANK_SUFFIXES) {
        Some(suffix) => suffix,
        None => random_string(ctx.rng(), 2, UPPERCASE),
    };
    let location = format!(
        "{}{}",
        random_string(ctx.rng(), 1, UPPERCASE),
        random_string(ctx.rng(), 1, DIGITS)
    );
    let branch = if ctx.chance(0.5) {
        random_string(ctx.rng(), 3, ALPHANUMERIC)
    } else {
        String::new()
    };

    format!("{}{}{}{}", institution, country, location, branch)
}

/// Keeps the first character and randomizes the rest from `A-Z0-9`.
/// The byte length is preserved, so a multi-byte original yields more
/// (ASCII) characters than it had.
pub fn randomize_default(zone: &FieldZone<'_>, ctx: &mut RuleContext<'_>) -> RuleResult<String> {
    let Some(first) = zone.text.chars().next() else {
        return Ok(String::new());
    };
    let remaining = zone.text.len() - first.len_utf8();

    let mut result = String::with_capacity(zone.text.len());
    result.push(first);
    result.push_str(&random_string(ctx.rng(), remaining, ALPHANUMERIC));
    Ok(result)
}

struct PartyProfile {
    names_pool: &'static str,
    addresses_pool: &'static str,
    company_probability: f64,
    city_probability: f64,
}

const SENDER: PartyProfile = PartyProfile {
    names_pool: pools::SENDER_NAMES,
    addresses_pool: pools::SENDER_ADDRESSES,
    company_probability: 0.7,
    city_probability: 0.6,
};

const BENEFICIARY: PartyProfile = PartyProfile {
    names_pool: pools::BENEFICIARY_NAMES,
    addresses_pool: pools::BENEFICIARY_ADDRESSES,
    company_probability: 0.5,
    city_probability: 0.7,
};

pub fn substitute_sender_block(
    zone: &BlockZone<'_>,
    ctx: &mut RuleContext<'_>,
) -> RuleResult<Vec<String>> {
    party_block(zone, ctx, &SENDER)
}

pub fn substitute_beneficiary_block(
    zone: &BlockZone<'_>,
    ctx: &mut RuleContext<'_>,
) -> RuleResult<Vec<String>> {
    party_block(zone, ctx, &BENEFICIARY)
}

/// Name, street address, then optional city; padded with further cities or
/// truncated so the result has exactly one line per slot.
fn party_block(
    zone: &BlockZone<'_>,
    ctx: &mut RuleContext<'_>,
    profile: &PartyProfile,
) -> RuleResult<Vec<String>> {
    let slots = zone.slots.len();
    if slots == 0 {
        return Err(SubstitutionError::EmptyBlock {
            category: zone.category.name().to_string(),
        });
    }

    let name = match ctx.pick(profile.names_pool) {
        Some(name) => name,
        None => party_name(ctx, profile.company_probability),
    };
    let address = match ctx.pick(profile.addresses_pool) {
        Some(address) => address,
        None => street_address(ctx),
    };

    let mut lines = vec![name, address];
    if ctx.chance(profile.city_probability) {
        lines.push(ctx.pick_or_word(pools::CITIES));
    }
    while lines.len() < slots {
        lines.push(ctx.pick_or_word(pools::CITIES));
    }
    lines.truncate(slots);

    Ok(lines)
}

fn party_name(ctx: &mut RuleContext<'_>, company_probability: f64) -> String {
    if ctx.chance(company_probability) {
        let prefix = ctx.pick_or_word(pools::COMPANY_PREFIXES);
        let mid = ctx.pick_or_word(pools::COMPANY_MIDS);
        let suffix = ctx.pick_or_word(pools::COMPANY_SUFFIXES);
        format!("{} {} {}", prefix, mid, suffix)
    } else {
        let first = ctx.pick_or_word(pools::FIRST_NAMES);
        let last = ctx.pick_or_word(pools::LAST_NAMES);
        format!("{} {}", first, last)
    }
}

fn street_address(ctx: &mut RuleContext<'_>) -> String {
    let number = ctx.rng().gen_range(1..=999);
    let street = ctx.pick_or_word(pools::STREET_NAMES);
    let street_type = ctx.pick_or_word(pools::STREET_TYPES);
    format!("{} {} {}", number, street, street_type)
}

/// One expanded remittance template per slot, or random text of the
/// original length when no template pool is configured.
pub fn substitute_payment_detail(
    zone: &BlockZone<'_>,
    ctx: &mut RuleContext<'_>,
) -> RuleResult<Vec<String>> {
    if zone.slots.is_empty() {
        return Err(SubstitutionError::EmptyBlock {
            category: zone.category.name().to_string(),
        });
    }

    let mut lines = Vec::with_capacity(zone.slots.len());
    for original in &zone.slots {
        let line = match ctx.pick_first(&[pools::PAYMENT_DETAIL_TEMPLATES, "payment_detail"]) {
            Some(template) => expand_directives(&template, ctx.rng()),
            None => {
                let length = original.trim().chars().count().max(1);
                random_string(ctx.rng(), length, ALPHANUMERIC)
            }
        };
        lines.push(line);
    }

    Ok(lines)
}

/// An extra instruction line, or `None` when no instruction pool is configured.
pub fn instruction_line(ctx: &mut RuleContext<'_>) -> Option<String> {
    ctx.pick_first(&[pools::INSTRUCTION_TEMPLATES, "instruction"])
        .map(|template| expand_directives(&template, ctx.rng()))
}
