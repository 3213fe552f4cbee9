//! # SWIFT Message Variator
//!
//! A library for turning one SWIFT MT message template into many realistic,
//! structurally valid variants, for training and testing data.
//!
//! ## Core Concepts
//!
//! - **Field Categories**: classes of substitutable zones (references, `:32A:` date/currency/amount,
//!   account numbers, bank codes, party blocks, remittance text)
//! - **Pattern Registry**: binds each category to a matcher and a substitution rule, tried in a fixed priority order
//! - **Substitution Pools**: named lists of candidate values; rules synthesize values when a pool is missing
//! - **Blocks**: `:50K:`, `:59:` and `:70:` span their tag line plus every following line up to the next
//!   line containing `:`, `{` or `}`
//! - **Determinism**: every engine owns a seeded `StdRng`, so the same seed, pools and template
//!   always produce the same output
//!
//! ## Example
//!
//! ```rust,ignore
//! use swift_message_variator::*;
//!
//! let config = GenerationConfig {
//!     seed: 7,
//!     field_substitution_rate: 1.0,
//!     include_builtin_pools: true,
//!     ..Default::default()
//! };
//!
//! let template = ":20:REFERENCE123\n:32A:230101EUR10000,00\n:50K:ORDERING CUSTOMER\n123 MAIN STREET\n:71A:SHA";
//! let variants = generate_variants(&config, template, Some(5)).unwrap();
//! assert_eq!(variants.len(), 5);
//! ```

pub mod engine;
pub mod error;
pub mod generator;
pub mod minitemplate;
pub mod pools;
pub mod registry;
pub mod rules;
pub mod schema;
pub mod utils;

pub use engine::{SubstitutionReport, TemplateVariationEngine, Variation};
pub use error::{Result, RuleResult, SubstitutionError, VariatorError};
pub use generator::{RunStats, VariationBatchGenerator};
pub use minitemplate::expand_directives;
pub use pools::{SubstitutionPools, ESSENTIAL_POOLS};
pub use registry::{FieldMatcher, FieldPatternRegistry, FieldZone, RuleBinding};
pub use schema::*;

use log::debug;

/// Builds a one-off generator from `config` and returns a single variant.
pub fn generate_variant(config: &GenerationConfig, template: &str) -> Result<String> {
    let mut generator = VariationBatchGenerator::new(config.clone())?;
    Ok(generator.generate_variant(template))
}

/// Builds a one-off generator from `config` and returns `count` variants
/// (a random count up to `max_variations_per_template` when `None`).
pub fn generate_variants(
    config: &GenerationConfig,
    template: &str,
    count: Option<usize>,
) -> Result<Vec<String>> {
    let mut generator = VariationBatchGenerator::new(config.clone())?;
    for warning in generator.engine().warnings() {
        debug!("Configuration fallback in effect: {}", warning);
    }
    Ok(generator.generate_variants(template, count))
}
