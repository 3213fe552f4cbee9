use crate::error::RuleResult;
use crate::rules::{self, BlockZone, RuleContext};
use crate::schema::FieldCategory;
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;

pub const REFERENCE_TAGS: [&str; 2] = [":20:", ":21:"];
pub const DATE_AMOUNT_TAGS: [&str; 1] = [":32A:"];
pub const BANK_CODE_TAGS: [&str; 5] = [":52A:", ":57A:", ":58A:", ":53A:", ":54A:"];
pub const PAYMENT_DETAIL_TAGS: [&str; 1] = [":70:"];
pub const SENDER_TAGS: [&str; 1] = [":50K:"];
pub const BENEFICIARY_TAGS: [&str; 1] = [":59:"];

/// Shortest digit run after a `/` that counts as an account number.
pub const MIN_ACCOUNT_DIGITS: usize = 5;

/// One recognised zone inside a single template line. Offsets are byte
/// offsets into that line; `text == prefix + content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldZone<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
    pub prefix: &'a str,
    pub content: &'a str,
}

impl<'a> FieldZone<'a> {
    fn new(line: &'a str, start: usize, prefix_end: usize, end: usize) -> Self {
        Self {
            start,
            end,
            text: &line[start..end],
            prefix: &line[start..prefix_end],
            content: &line[prefix_end..end],
        }
    }
}

/// How a category recognises its zones. Kept separate from the rules so the
/// scanning strategy can change without touching substitution logic.
#[derive(Debug, Clone)]
pub enum FieldMatcher {
    /// The first listed tag found in the line; the zone runs to end of line.
    Tags(Vec<String>),
    /// Every `/` followed by optional non-digit qualifiers and a digit run.
    AccountScan { min_digits: usize },
    /// Every non-empty match; capture group 1 (when present) is the prefix.
    Pattern(Regex),
    /// Whole line, except structural lines (see [`is_structural_line`]).
    /// Stand-in for an extension pattern that failed to compile.
    CatchAll,
}

impl FieldMatcher {
    pub fn tags(tags: &[&str]) -> Self {
        FieldMatcher::Tags(tags.iter().map(|t| t.to_string()).collect())
    }

    pub fn is_match(&self, line: &str) -> bool {
        !self.find_zones(line).is_empty()
    }

    pub fn find_zones<'a>(&self, line: &'a str) -> Vec<FieldZone<'a>> {
        match self {
            FieldMatcher::Tags(tags) => tags
                .iter()
                .find_map(|tag| {
                    line.find(tag.as_str())
                        .map(|pos| FieldZone::new(line, pos, pos + tag.len(), line.len()))
                })
                .into_iter()
                .collect(),
            FieldMatcher::AccountScan { min_digits } => scan_accounts(line, *min_digits),
            FieldMatcher::Pattern(regex) => regex
                .captures_iter(line)
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    if whole.as_str().is_empty() {
                        return None;
                    }
                    let prefix_end = caps
                        .get(1)
                        .map(|group| group.end().clamp(whole.start(), whole.end()))
                        .unwrap_or(whole.start());
                    Some(FieldZone::new(line, whole.start(), prefix_end, whole.end()))
                })
                .collect(),
            FieldMatcher::CatchAll => {
                if line.trim().is_empty() || is_structural_line(line) {
                    Vec::new()
                } else {
                    vec![FieldZone::new(line, 0, 0, line.len())]
                }
            }
        }
    }
}

/// Envelope delimiters (`{`, `}`) and `:TAG:` field openers.
pub fn is_structural_line(line: &str) -> bool {
    if line.contains(['{', '}']) {
        return true;
    }
    let Some(rest) = line.trim_start().strip_prefix(':') else {
        return false;
    };
    match rest.find(':') {
        Some(end) => end > 0 && rest[..end].chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}

fn scan_accounts(line: &str, min_digits: usize) -> Vec<FieldZone<'_>> {
    let mut zones = Vec::new();
    let mut search_from = 0;

    while let Some(offset) = line[search_from..].find('/') {
        let slash = search_from + offset;
        let after_slash = slash + 1;

        let digits_start = line[after_slash..]
            .find(|c: char| c.is_ascii_digit() || c == '/' || c.is_whitespace())
            .map(|i| after_slash + i)
            .unwrap_or(line.len());

        let digits_end = line[digits_start..]
            .find(|c: char| !c.is_ascii_digit())
            .map(|i| digits_start + i)
            .unwrap_or(line.len());

        if digits_end - digits_start >= min_digits {
            zones.push(FieldZone::new(line, slash, digits_start, digits_end));
            search_from = digits_end;
        } else {
            search_from = after_slash;
        }
    }

    zones
}

pub type InlineRule = fn(&FieldZone<'_>, &mut RuleContext<'_>) -> RuleResult<String>;
pub type BlockRule = fn(&BlockZone<'_>, &mut RuleContext<'_>) -> RuleResult<Vec<String>>;

#[derive(Clone, Copy)]
pub enum RuleBinding {
    /// Rewrites each matched zone in place.
    Inline(InlineRule),
    /// Regenerates the tag line's inline content and the body up to the next boundary.
    Block(BlockRule),
}

impl std::fmt::Debug for RuleBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleBinding::Inline(_) => f.write_str("Inline"),
            RuleBinding::Block(_) => f.write_str("Block"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub category: FieldCategory,
    pub matcher: FieldMatcher,
    pub rule: RuleBinding,
}

/// Immutable category table. Rebuilding produces a new registry; nothing
/// mutates one in place.
#[derive(Debug, Clone)]
pub struct FieldPatternRegistry {
    entries: Vec<RegistryEntry>,
    instruction_anchor: FieldMatcher,
    warnings: Vec<String>,
}

impl FieldPatternRegistry {
    pub fn build(field_patterns: &BTreeMap<String, String>) -> Self {
        let mut warnings = Vec::new();
        let mut entries = Vec::new();

        for category in FieldCategory::line_priority() {
            let matcher = resolve_matcher(&category, field_patterns, &mut warnings);
            let rule = builtin_rule(&category);
            debug!("Registered {:?} rule for '{}'", rule, category);
            entries.push(RegistryEntry {
                category,
                matcher,
                rule,
            });
        }

        let instruction_anchor =
            resolve_matcher(&FieldCategory::Instruction, field_patterns, &mut warnings);

        for (name, pattern) in field_patterns {
            let category = FieldCategory::from_name(name);
            if !matches!(category, FieldCategory::Custom(_)) {
                continue;
            }
            let matcher = compile_pattern(&category, pattern, &mut warnings);
            debug!("Registered default randomizer for extension '{}'", category);
            entries.push(RegistryEntry {
                category,
                matcher,
                rule: RuleBinding::Inline(rules::randomize_default),
            });
        }

        Self {
            entries,
            instruction_anchor,
            warnings,
        }
    }

    /// Entries in the order the line pass tries them.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn entry(&self, category: &FieldCategory) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| &e.category == category)
    }

    pub fn instruction_anchor(&self) -> &FieldMatcher {
        &self.instruction_anchor
    }

    /// Configuration problems that were recovered with a fallback.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// First entry, in priority order, with at least one zone in `line`.
    pub fn classify<'r, 'l>(
        &'r self,
        line: &'l str,
    ) -> Option<(&'r RegistryEntry, Vec<FieldZone<'l>>)> {
        self.entries.iter().find_map(|entry| {
            let zones = entry.matcher.find_zones(line);
            if zones.is_empty() {
                None
            } else {
                Some((entry, zones))
            }
        })
    }
}

fn resolve_matcher(
    category: &FieldCategory,
    field_patterns: &BTreeMap<String, String>,
    warnings: &mut Vec<String>,
) -> FieldMatcher {
    match field_patterns.get(category.name()) {
        Some(pattern) => compile_pattern(category, pattern, warnings),
        None => default_matcher(category),
    }
}

fn compile_pattern(
    category: &FieldCategory,
    pattern: &str,
    warnings: &mut Vec<String>,
) -> FieldMatcher {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => FieldMatcher::Pattern(regex),
        Err(e) => {
            let fallback = match category {
                FieldCategory::Custom(_) => "catch-all pattern",
                _ => "built-in matcher",
            };
            let message = format!("Invalid pattern for '{}': {}. Using {}.", category, e, fallback);
            warn!("{}", message);
            warnings.push(message);
            default_matcher(category)
        }
    }
}

pub fn default_matcher(category: &FieldCategory) -> FieldMatcher {
    match category {
        FieldCategory::Reference => FieldMatcher::tags(&REFERENCE_TAGS),
        FieldCategory::DateAmountCurrency => FieldMatcher::tags(&DATE_AMOUNT_TAGS),
        FieldCategory::AccountNumber => FieldMatcher::AccountScan {
            min_digits: MIN_ACCOUNT_DIGITS,
        },
        FieldCategory::BankCode => FieldMatcher::tags(&BANK_CODE_TAGS),
        FieldCategory::PaymentDetail | FieldCategory::Instruction => {
            FieldMatcher::tags(&PAYMENT_DETAIL_TAGS)
        }
        FieldCategory::SenderBlock => FieldMatcher::tags(&SENDER_TAGS),
        FieldCategory::BeneficiaryBlock => FieldMatcher::tags(&BENEFICIARY_TAGS),
        FieldCategory::Custom(_) => FieldMatcher::CatchAll,
    }
}

pub fn builtin_rule(category: &FieldCategory) -> RuleBinding {
    match category {
        FieldCategory::Reference => RuleBinding::Inline(rules::substitute_reference),
        FieldCategory::DateAmountCurrency => {
            RuleBinding::Inline(rules::substitute_date_amount_currency)
        }
        FieldCategory::AccountNumber => RuleBinding::Inline(rules::substitute_account_number),
        FieldCategory::BankCode => RuleBinding::Inline(rules::substitute_bank_code),
        FieldCategory::PaymentDetail => RuleBinding::Block(rules::substitute_payment_detail),
        FieldCategory::SenderBlock => RuleBinding::Block(rules::substitute_sender_block),
        FieldCategory::BeneficiaryBlock => RuleBinding::Block(rules::substitute_beneficiary_block),
        FieldCategory::Instruction | FieldCategory::Custom(_) => {
            RuleBinding::Inline(rules::randomize_default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_tag_matcher_zone() {
        let matcher = FieldMatcher::tags(&REFERENCE_TAGS);
        let zones = matcher.find_zones(":20:REFERENCE123");
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].prefix, ":20:");
        assert_eq!(zones[0].content, "REFERENCE123");
        assert_eq!(zones[0].start, 0);
        assert!(matcher.find_zones(":23B:CRED").is_empty());
    }

    #[test]
    fn test_account_scan_finds_every_run() {
        let matcher = FieldMatcher::AccountScan { min_digits: 5 };
        let zones = matcher.find_zones("/ACC12345678 /9876543 /12");
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].prefix, "/ACC");
        assert_eq!(zones[0].content, "12345678");
        assert_eq!(zones[1].prefix, "/");
        assert_eq!(zones[1].content, "9876543");
        assert!(matcher.find_zones("2023/01/15").is_empty());
        assert!(matcher.find_zones("no slash 123456").is_empty());
    }

    #[test]
    fn test_pattern_matcher_uses_group_one_as_prefix() {
        let mut warnings = Vec::new();
        let matcher = compile_pattern(&FieldCategory::Reference, r"(:20:)(\w+)", &mut warnings);
        let zones = matcher.find_zones(":20:abc123");
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].prefix, ":20:");
        assert_eq!(zones[0].content, "abc123");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_priority_order_first_match_wins() {
        let registry = FieldPatternRegistry::build(&BTreeMap::new());
        let (entry, _) = registry.classify(":20:/1234567890").unwrap();
        assert_eq!(entry.category, FieldCategory::Reference);

        let (entry, _) = registry.classify(":59:/1234567890").unwrap();
        assert_eq!(entry.category, FieldCategory::AccountNumber);

        let (entry, _) = registry.classify(":50K:ORDERING CUSTOMER").unwrap();
        assert_eq!(entry.category, FieldCategory::SenderBlock);

        assert!(registry.classify(":71A:SHA").is_none());
    }

    #[test]
    fn test_malformed_builtin_pattern_keeps_builtin_matcher() {
        let registry = FieldPatternRegistry::build(&patterns(&[("reference", "(:20:")]));
        assert_eq!(registry.warnings().len(), 1);
        assert!(registry.warnings()[0].contains("reference"));

        let entry = registry.entry(&FieldCategory::Reference).unwrap();
        assert!(matches!(entry.matcher, FieldMatcher::Tags(_)));
        assert!(registry.classify("{1:F01BANKBEBBAXXX0000000000}{4:").is_none());
        let (entry, _) = registry.classify(":32A:230101EUR100,00").unwrap();
        assert_eq!(entry.category, FieldCategory::DateAmountCurrency);
    }

    #[test]
    fn test_malformed_extension_pattern_skips_structural_lines() {
        let registry = FieldPatternRegistry::build(&patterns(&[("charges", "(:71A:")]));
        assert_eq!(registry.warnings().len(), 1);
        let entry = registry.entry(&FieldCategory::Custom("charges".to_string())).unwrap();
        assert!(matches!(entry.matcher, FieldMatcher::CatchAll));

        for line in ["{1:F01BANKBEBBAXXX0000000000}{4:", ":71A:SHA", ":23B:CRED", "-}"] {
            assert!(entry.matcher.find_zones(line).is_empty(), "{} matched", line);
        }
        assert_eq!(entry.matcher.find_zones("FREE TEXT 12").len(), 1);
    }

    #[test]
    fn test_structural_line_detection() {
        assert!(is_structural_line(":20:REF"));
        assert!(is_structural_line("  :59F:X"));
        assert!(is_structural_line("{2:I103BANKDEFFXXXXN}"));
        assert!(is_structural_line("-}"));
        assert!(!is_structural_line("PAYMENT: INVOICE 12"));
        assert!(!is_structural_line("::"));
        assert!(!is_structural_line("123 MAIN STREET"));
    }

    #[test]
    fn test_unknown_category_registered_after_builtins() {
        let registry = FieldPatternRegistry::build(&patterns(&[("charges", r":71A:\w+")]));
        let last = registry.entries().last().unwrap();
        assert_eq!(last.category, FieldCategory::Custom("charges".to_string()));
        assert!(matches!(last.rule, RuleBinding::Inline(_)));

        let (entry, zones) = registry.classify(":71A:SHA").unwrap();
        assert_eq!(entry.category.name(), "charges");
        assert_eq!(zones[0].text, ":71A:SHA");
    }

    #[test]
    fn test_instruction_anchor_defaults_to_payment_detail_tag() {
        let registry = FieldPatternRegistry::build(&BTreeMap::new());
        assert!(registry.instruction_anchor().is_match(":70:PAYMENT FOR SERVICES"));
        assert!(!registry.instruction_anchor().is_match(":72:/ACC/"));
    }
}
