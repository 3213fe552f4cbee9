use thiserror::Error;

#[derive(Error, Debug)]
pub enum VariatorError {
    #[error("Invalid field substitution rate {0}: must be between 0.0 and 1.0")]
    InvalidSubstitutionRate(f64),

    #[error("Invalid instruction insertion rate {0}: must be between 0.0 and 1.0")]
    InvalidInstructionRate(f64),

    #[error("Invalid amount perturbation {0}: must be at least 0.0 and below 1.0")]
    InvalidAmountPerturbation(f64),

    #[error("Invalid max variations per template {0}: must be at least 1")]
    InvalidMaxVariations(usize),

    #[error("Invalid max date shift {0}: must be at most 1200 months")]
    InvalidDateShift(u32),

    #[error("Required substitution pool '{0}' is missing or empty")]
    MissingPool(String),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedConfigFormat(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VariatorError>;

/// Failure of a single substitution rule. Never escapes a generation call:
/// the engine keeps the original zone text and records the event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionError {
    #[error("No substitutable content in {category} zone")]
    MissingContent { category: String },

    #[error("Unparseable date '{0}'")]
    InvalidDate(String),

    #[error("Unparseable currency '{0}'")]
    InvalidCurrency(String),

    #[error("Unparseable amount '{0}'")]
    InvalidAmount(String),

    #[error("Block for {category} has no lines to regenerate")]
    EmptyBlock { category: String },
}

pub type RuleResult<T> = std::result::Result<T, SubstitutionError>;
