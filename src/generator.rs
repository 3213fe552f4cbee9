use crate::engine::{SubstitutionReport, TemplateVariationEngine};
use crate::error::Result;
use crate::schema::{CacheScope, GenerationConfig};
use log::info;
use rand::Rng;
use std::time::{Duration, Instant};

/// Informational counters accumulated across every call on one generator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub messages: usize,
    pub totals: SubstitutionReport,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn substitutions(&self) -> usize {
        self.totals.substituted
    }

    pub fn failures(&self) -> usize {
        self.totals.failures
    }
}

/// Produces lists of variants for a template, one full engine pass each.
pub struct VariationBatchGenerator {
    engine: TemplateVariationEngine,
    stats: RunStats,
}

impl VariationBatchGenerator {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        Ok(Self::from_engine(TemplateVariationEngine::new(config)?))
    }

    pub fn from_engine(engine: TemplateVariationEngine) -> Self {
        Self {
            engine,
            stats: RunStats::default(),
        }
    }

    pub fn engine(&self) -> &TemplateVariationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TemplateVariationEngine {
        &mut self.engine
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = RunStats::default();
    }

    pub fn generate_variant(&mut self, template: &str) -> String {
        let started = Instant::now();
        let text = self.next_variant(template);
        self.finish_batch();
        self.stats.elapsed += started.elapsed();
        text
    }

    /// `count` of `None` draws a count between 1 and
    /// `max_variations_per_template`. Always returns exactly the resolved count.
    pub fn generate_variants(&mut self, template: &str, count: Option<usize>) -> Vec<String> {
        let started = Instant::now();
        let count = match count {
            Some(count) => count,
            None => {
                let max = self.engine.config().max_variations_per_template.max(1);
                self.engine.rng().gen_range(1..=max)
            }
        };

        let variants: Vec<String> = (0..count).map(|_| self.next_variant(template)).collect();
        self.finish_batch();

        let elapsed = started.elapsed();
        self.stats.elapsed += elapsed;
        info!(
            "Generated {} variants in {:?} ({} messages, {} substitutions, {} failures so far)",
            variants.len(),
            elapsed,
            self.stats.messages,
            self.stats.substitutions(),
            self.stats.failures()
        );

        variants
    }

    fn next_variant(&mut self, template: &str) -> String {
        let variation = self.engine.vary(template);
        self.stats.messages += 1;
        self.stats.totals.absorb(&variation.report);
        variation.text
    }

    fn finish_batch(&mut self) {
        if self.engine.config().cache_scope == CacheScope::Batch {
            self.engine.clear_cache();
        }
    }
}
