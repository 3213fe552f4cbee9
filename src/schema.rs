use crate::error::{Result, VariatorError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Upper bound for `max_date_shift_months` (one hundred years).
pub const MAX_DATE_SHIFT_MONTHS: u32 = 1200;

/// Class of substitutable zone inside a message template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldCategory {
    /// `:20:` / `:21:` transaction references
    Reference,
    /// `:32A:` value date, currency and amount
    DateAmountCurrency,
    /// `/` followed by a run of digits
    AccountNumber,
    /// `:52A:`, `:53A:`, `:54A:`, `:57A:`, `:58A:` institution identifiers
    BankCode,
    /// `:70:` remittance information block
    PaymentDetail,
    /// `:50K:` ordering customer block
    SenderBlock,
    /// `:59:` beneficiary customer block
    BeneficiaryBlock,
    /// Freestanding instruction line inserted after a payment detail block
    Instruction,
    /// Operator-defined extension, handled by the default randomizer
    Custom(String),
}

impl FieldCategory {
    /// Order in which the line pass tries categories. First match wins.
    pub fn line_priority() -> [FieldCategory; 7] {
        [
            FieldCategory::Reference,
            FieldCategory::DateAmountCurrency,
            FieldCategory::AccountNumber,
            FieldCategory::BankCode,
            FieldCategory::PaymentDetail,
            FieldCategory::SenderBlock,
            FieldCategory::BeneficiaryBlock,
        ]
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "reference" => FieldCategory::Reference,
            "date_amount_currency" => FieldCategory::DateAmountCurrency,
            "account_number" => FieldCategory::AccountNumber,
            "bank_code" => FieldCategory::BankCode,
            "payment_detail" => FieldCategory::PaymentDetail,
            "sender_block" => FieldCategory::SenderBlock,
            "beneficiary_block" => FieldCategory::BeneficiaryBlock,
            "instruction" => FieldCategory::Instruction,
            other => FieldCategory::Custom(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldCategory::Reference => "reference",
            FieldCategory::DateAmountCurrency => "date_amount_currency",
            FieldCategory::AccountNumber => "account_number",
            FieldCategory::BankCode => "bank_code",
            FieldCategory::PaymentDetail => "payment_detail",
            FieldCategory::SenderBlock => "sender_block",
            FieldCategory::BeneficiaryBlock => "beneficiary_block",
            FieldCategory::Instruction => "instruction",
            FieldCategory::Custom(name) => name,
        }
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    #[default]
    #[schemars(
        description = "Cache lives for one generated message. Repeated literals inside a template share a substitute, separate variants are independent."
    )]
    Message,

    #[schemars(
        description = "Cache lives for one generate_variants call. Every variant in the batch reuses the substitutes chosen first."
    )]
    Batch,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GenerationConfig {
    #[schemars(description = "Seed for the engine's random number generator")]
    pub seed: u64,

    #[schemars(
        description = "Upper bound for the number of variants when generate_variants is called without a count"
    )]
    pub max_variations_per_template: usize,

    #[schemars(
        description = "Probability (0.0 to 1.0) that a matched zone without a cached substitute is actually substituted"
    )]
    pub field_substitution_rate: f64,

    #[schemars(
        description = "Probability (0.0 to 1.0) per payment detail tag of inserting an extra instruction line after the block"
    )]
    pub instruction_insertion_rate: f64,

    #[schemars(
        description = "Amounts are scaled by a factor drawn uniformly from [1 - p, 1 + p]. Range: 0.0 to below 1.0"
    )]
    pub amount_perturbation: f64,

    #[schemars(description = "Maximum number of months a value date is shifted in either direction. At most 1200")]
    pub max_date_shift_months: u32,

    #[schemars(description = "Lifetime of the substitution cache")]
    pub cache_scope: CacheScope,

    #[schemars(
        description = "Category name to regular expression. Known categories override their built-in scanner; unknown names register extensions handled by the default randomizer. Capture group 1 is the field prefix."
    )]
    pub field_patterns: BTreeMap<String, String>,

    #[schemars(description = "Pool name to candidate substitution values")]
    pub substitutions: BTreeMap<String, Vec<String>>,

    #[schemars(description = "Pools that must be present and non-empty, checked at construction")]
    pub required_pools: Vec<String>,

    #[schemars(description = "Merge the built-in sample pools underneath the configured ones")]
    pub include_builtin_pools: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_variations_per_template: 10,
            field_substitution_rate: 0.3,
            instruction_insertion_rate: 0.5,
            amount_perturbation: 0.3,
            max_date_shift_months: 12,
            cache_scope: CacheScope::Message,
            field_patterns: BTreeMap::new(),
            substitutions: BTreeMap::new(),
            required_pools: Vec::new(),
            include_builtin_pools: false,
        }
    }
}

impl GenerationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a configuration file, choosing the format from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            other => Err(VariatorError::UnsupportedConfigFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.field_substitution_rate) {
            return Err(VariatorError::InvalidSubstitutionRate(
                self.field_substitution_rate,
            ));
        }

        if !(0.0..=1.0).contains(&self.instruction_insertion_rate) {
            return Err(VariatorError::InvalidInstructionRate(
                self.instruction_insertion_rate,
            ));
        }

        if !(0.0..1.0).contains(&self.amount_perturbation) {
            return Err(VariatorError::InvalidAmountPerturbation(
                self.amount_perturbation,
            ));
        }

        if self.max_variations_per_template == 0 {
            return Err(VariatorError::InvalidMaxVariations(
                self.max_variations_per_template,
            ));
        }

        if self.max_date_shift_months > MAX_DATE_SHIFT_MONTHS {
            return Err(VariatorError::InvalidDateShift(self.max_date_shift_months));
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(GenerationConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
