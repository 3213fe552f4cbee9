use crate::error::{Result, RuleResult, VariatorError};
use crate::pools::{SubstitutionPools, ESSENTIAL_POOLS};
use crate::registry::{BlockRule, FieldPatternRegistry, FieldZone, InlineRule, RuleBinding};
use crate::rules::{self, BlockZone, RuleContext, RuleTuning};
use crate::schema::{CacheScope, FieldCategory, GenerationConfig};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution};
use std::collections::HashMap;
use std::time::Instant;

/// Characters that end a block body when found anywhere in a line.
pub const BLOCK_BOUNDARY_MARKERS: [char; 3] = [':', '{', '}'];

type CacheKey = (FieldCategory, String);

/// Per-message counters. Callers that need to know whether anything changed
/// should read `substituted`, not compare strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstitutionReport {
    pub substituted: usize,
    pub skipped: usize,
    pub cache_hits: usize,
    pub failures: usize,
    pub instructions_inserted: usize,
}

impl SubstitutionReport {
    pub fn absorb(&mut self, other: &SubstitutionReport) {
        self.substituted += other.substituted;
        self.skipped += other.skipped;
        self.cache_hits += other.cache_hits;
        self.failures += other.failures;
        self.instructions_inserted += other.instructions_inserted;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variation {
    pub text: String,
    pub report: SubstitutionReport,
}

/// Everything derived from a config. Built completely before it replaces
/// the engine's current state.
struct EngineParts {
    registry: FieldPatternRegistry,
    pools: SubstitutionPools,
    tuning: RuleTuning,
    substitution_rate: Bernoulli,
    instruction_rate: Bernoulli,
}

impl EngineParts {
    fn build(config: &GenerationConfig) -> Result<Self> {
        config.validate()?;

        let substitution_rate = Bernoulli::new(config.field_substitution_rate)
            .map_err(|_| VariatorError::InvalidSubstitutionRate(config.field_substitution_rate))?;
        let instruction_rate = Bernoulli::new(config.instruction_insertion_rate)
            .map_err(|_| VariatorError::InvalidInstructionRate(config.instruction_insertion_rate))?;

        let mut pools = if config.include_builtin_pools {
            SubstitutionPools::builtin()
        } else {
            SubstitutionPools::default()
        };
        pools.overlay(&SubstitutionPools::new(config.substitutions.clone()));
        pools.ensure_present(&config.required_pools)?;

        let missing: Vec<&str> = ESSENTIAL_POOLS
            .iter()
            .copied()
            .filter(|name| !pools.contains(name))
            .collect();
        if !missing.is_empty() {
            warn!(
                "Pools missing, synthetic values will be used instead: {}",
                missing.join(", ")
            );
        }

        let registry = FieldPatternRegistry::build(&config.field_patterns);

        Ok(Self {
            registry,
            pools,
            tuning: RuleTuning::new(config.amount_perturbation, config.max_date_shift_months),
            substitution_rate,
            instruction_rate,
        })
    }
}

/// Produces variations of one template at a time.
///
/// The engine owns its random state and substitution cache, so it is not
/// meant to be shared between threads; give each worker its own instance.
pub struct TemplateVariationEngine {
    config: GenerationConfig,
    registry: FieldPatternRegistry,
    pools: SubstitutionPools,
    tuning: RuleTuning,
    substitution_rate: Bernoulli,
    instruction_rate: Bernoulli,
    rng: StdRng,
    cache: HashMap<CacheKey, Vec<String>>,
}

impl TemplateVariationEngine {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let parts = EngineParts::build(&config)?;
        info!(
            "Variation engine ready: seed {}, {} categories, {} pools",
            config.seed,
            parts.registry.entries().len(),
            parts.pools.names().count()
        );

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            registry: parts.registry,
            pools: parts.pools,
            tuning: parts.tuning,
            substitution_rate: parts.substitution_rate,
            instruction_rate: parts.instruction_rate,
            cache: HashMap::new(),
        })
    }

    /// Replaces registry, pools and rates in one step and reseeds from the
    /// new config. On error the engine keeps its previous state.
    pub fn reconfigure(&mut self, config: GenerationConfig) -> Result<()> {
        let parts = EngineParts::build(&config)?;

        self.registry = parts.registry;
        self.pools = parts.pools;
        self.tuning = parts.tuning;
        self.substitution_rate = parts.substitution_rate;
        self.instruction_rate = parts.instruction_rate;
        self.rng = StdRng::seed_from_u64(config.seed);
        self.config = config;
        self.cache.clear();

        info!("Variation engine reconfigured: seed {}", self.config.seed);
        Ok(())
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn registry(&self) -> &FieldPatternRegistry {
        &self.registry
    }

    pub fn pools(&self) -> &SubstitutionPools {
        &self.pools
    }

    pub fn warnings(&self) -> &[String] {
        self.registry.warnings()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Generates one variant of `template`. Never fails: zones whose rule
    /// errors keep their original text and are counted in the report.
    pub fn vary(&mut self, template: &str) -> Variation {
        let started = Instant::now();
        let mut report = SubstitutionReport::default();

        let lines: Vec<&str> = template.split('\n').collect();
        let substituted = self.substitute_lines(&lines, &mut report);
        let output = self.insert_instructions(substituted, &mut report);

        if self.config.cache_scope == CacheScope::Message {
            self.cache.clear();
        }

        info!(
            "Generated variant in {:?}: {} substituted, {} skipped, {} cache hits, {} failures",
            started.elapsed(),
            report.substituted,
            report.skipped,
            report.cache_hits,
            report.failures
        );

        Variation {
            text: output.join("\n"),
            report,
        }
    }

    fn substitute_lines(&mut self, lines: &[&str], report: &mut SubstitutionReport) -> Vec<String> {
        let mut output = Vec::with_capacity(lines.len());
        let mut index = 0;

        while index < lines.len() {
            let (line, ending) = split_line_ending(lines[index]);
            if line.trim().is_empty() {
                output.push(lines[index].to_string());
                index += 1;
                continue;
            }

            let classified = self
                .registry
                .classify(line)
                .map(|(entry, zones)| (entry.category.clone(), entry.rule, zones));

            match classified {
                None => output.push(lines[index].to_string()),
                Some((category, RuleBinding::Inline(rule), zones)) => {
                    let rewritten = self.substitute_inline(&category, rule, line, &zones, report);
                    output.push(format!("{}{}", rewritten, ending));
                }
                Some((category, RuleBinding::Block(rule), zones)) => {
                    let end = block_end(lines, index);
                    let tag_zone = zones[0];
                    output.extend(self.substitute_block(
                        &category,
                        rule,
                        &lines[index..end],
                        &tag_zone,
                        report,
                    ));
                    index = end;
                    continue;
                }
            }

            index += 1;
        }

        output
    }

    fn substitute_inline(
        &mut self,
        category: &FieldCategory,
        rule: InlineRule,
        line: &str,
        zones: &[FieldZone<'_>],
        report: &mut SubstitutionReport,
    ) -> String {
        let mut result = String::with_capacity(line.len());
        let mut cursor = 0;

        for zone in zones {
            result.push_str(&line[cursor..zone.start]);
            let substitute = self.resolve(category, zone.text, report, |ctx| {
                rule(zone, ctx).map(|value| vec![value])
            });
            match substitute.as_ref().and_then(|values| values.first()) {
                Some(value) => result.push_str(value),
                None => result.push_str(zone.text),
            }
            cursor = zone.end;
        }

        result.push_str(&line[cursor..]);
        result
    }

    /// `block[0]` is the tag line; the rest is the body up to, not including,
    /// the boundary line.
    fn substitute_block(
        &mut self,
        category: &FieldCategory,
        rule: BlockRule,
        block: &[&str],
        tag_zone: &FieldZone<'_>,
        report: &mut SubstitutionReport,
    ) -> Vec<String> {
        let (tag_line, tag_ending) = split_line_ending(block[0]);
        let inline = tag_zone.content.trim();

        let mut slots = Vec::with_capacity(block.len());
        if !inline.is_empty() {
            slots.push(inline);
        }
        for raw in &block[1..] {
            let (body, _) = split_line_ending(raw);
            if !body.trim().is_empty() {
                slots.push(body);
            }
        }

        let zone = BlockZone { category, slots };
        let original = block.join("\n");
        let Some(generated) = self.resolve(category, &original, report, |ctx| rule(&zone, ctx))
        else {
            return block.iter().map(|line| line.to_string()).collect();
        };

        let mut fresh = generated.into_iter();
        let mut output = Vec::with_capacity(block.len());

        let name = if inline.is_empty() { None } else { fresh.next() };
        match name {
            Some(name) => output.push(format!(
                "{}{}{}{}{}",
                &tag_line[..tag_zone.start],
                tag_zone.prefix,
                name,
                &tag_line[tag_zone.end..],
                tag_ending
            )),
            None => output.push(block[0].to_string()),
        }

        for raw in &block[1..] {
            let (body, ending) = split_line_ending(raw);
            if body.trim().is_empty() {
                output.push(raw.to_string());
                continue;
            }
            match fresh.next() {
                Some(line) => output.push(format!("{}{}", line, ending)),
                None => output.push(raw.to_string()),
            }
        }

        output
    }

    /// Cache first, then the substitution roll, then the rule.
    fn resolve<F>(
        &mut self,
        category: &FieldCategory,
        original: &str,
        report: &mut SubstitutionReport,
        produce: F,
    ) -> Option<Vec<String>>
    where
        F: FnOnce(&mut RuleContext<'_>) -> RuleResult<Vec<String>>,
    {
        let key = (category.clone(), original.to_string());
        if let Some(cached) = self.cache.get(&key) {
            debug!("{}: cache hit for {:?}", category, original);
            report.cache_hits += 1;
            return Some(cached.clone());
        }

        if !self.substitution_rate.sample(&mut self.rng) {
            debug!("{}: left {:?} unchanged", category, original);
            report.skipped += 1;
            return None;
        }

        let mut ctx = RuleContext::new(&mut self.rng, &self.pools, &self.tuning);
        match produce(&mut ctx) {
            Ok(substitute) => {
                debug!("{}: {:?} -> {:?}", category, original, substitute);
                report.substituted += 1;
                self.cache.insert(key, substitute.clone());
                Some(substitute)
            }
            Err(e) => {
                warn!(
                    "{} substitution failed, keeping original text {:?}: {}",
                    category, original, e
                );
                report.failures += 1;
                None
            }
        }
    }

    /// Second pass: after each instruction anchor that wins the roll, add an
    /// expanded instruction line behind the anchor's block.
    fn insert_instructions(
        &mut self,
        lines: Vec<String>,
        report: &mut SubstitutionReport,
    ) -> Vec<String> {
        let mut output = Vec::with_capacity(lines.len() + 1);
        let mut index = 0;

        while index < lines.len() {
            let (line, ending) = split_line_ending(&lines[index]);
            if !self.registry.instruction_anchor().is_match(line)
                || !self.instruction_rate.sample(&mut self.rng)
            {
                output.push(lines[index].clone());
                index += 1;
                continue;
            }

            let end = block_end(&lines, index);
            output.extend(lines[index..end].iter().cloned());

            let mut ctx = RuleContext::new(&mut self.rng, &self.pools, &self.tuning);
            match rules::instruction_line(&mut ctx) {
                Some(instruction) => {
                    debug!("{}: inserted {:?}", FieldCategory::Instruction, instruction);
                    output.push(format!("{}{}", instruction, ending));
                    report.instructions_inserted += 1;
                }
                None => debug!("{}: no template pool, nothing inserted", FieldCategory::Instruction),
            }

            index = end;
        }

        output
    }
}

/// Splits a trailing `\r` off so matching never sees it.
fn split_line_ending(line: &str) -> (&str, &str) {
    match line.strip_suffix('\r') {
        Some(body) => (body, "\r"),
        None => (line, ""),
    }
}

/// Index of the first line after `start` containing a boundary marker, or
/// `lines.len()` when the block runs to the end of the template.
pub fn block_end<S: AsRef<str>>(lines: &[S], start: usize) -> usize {
    (start + 1..lines.len())
        .find(|&i| lines[i].as_ref().contains(BLOCK_BOUNDARY_MARKERS))
        .unwrap_or(lines.len())
}
