use regex::Regex;
use std::collections::BTreeMap;
use swift_message_variator::utils::parse_swift_date;
use swift_message_variator::*;

const MT103: &str = "{1:F01BANKBEBBAXXX0000000000}{2:I103BANKDEFFXXXXN}{4:
:20:REFERENCE123
:23B:CRED
:32A:230101EUR10000,00
:50K:/12345678901
ORDERING CUSTOMER
123 MAIN STREET
:52A:BANKBEBB
:57A:BANKDEFF
:59:/98765432101
BENEFICIARY NAME
456 OAK AVE
:70:PAYMENT FOR SERVICES
:71A:SHA
-}";

const SIMPLE: &str = ":20:REFERENCE123\n:32A:230101EUR10000,00\n:50K:ORDERING CUSTOMER\n123 MAIN STREET\n:59:BENEFICIARY\n456 OAK AVE\n:71A:SHA";

fn full_rate_config(seed: u64) -> GenerationConfig {
    GenerationConfig {
        seed,
        field_substitution_rate: 1.0,
        include_builtin_pools: true,
        ..Default::default()
    }
}

fn line_starting_with<'a>(text: &'a str, tag: &str) -> &'a str {
    text.lines()
        .find(|line| line.starts_with(tag))
        .unwrap_or_else(|| panic!("no {} line in:\n{}", tag, text))
}

#[test]
fn test_simple_template_scenario() -> anyhow::Result<()> {
    let config = GenerationConfig {
        seed: 1234,
        field_substitution_rate: 1.0,
        ..Default::default()
    };
    let variant = generate_variant(&config, SIMPLE)?;
    let lines: Vec<&str> = variant.split('\n').collect();

    assert_eq!(lines.len(), 7);
    assert!(lines[0].starts_with(":20:"));
    assert_ne!(lines[0], ":20:REFERENCE123");

    let date_amount = Regex::new(r"^:32A:\d{6}[A-Z]{3}\d+,\d{2}$")?;
    assert!(date_amount.is_match(lines[1]), "bad :32A: line {}", lines[1]);

    assert!(lines[2].starts_with(":50K:"));
    assert_ne!(lines[2], ":50K:ORDERING CUSTOMER");
    assert!(!lines[3].is_empty());
    assert!(lines[4].starts_with(":59:"));
    assert_ne!(lines[4], ":59:BENEFICIARY");
    assert!(!lines[5].is_empty());
    assert_eq!(lines[6], ":71A:SHA");
    Ok(())
}

#[test]
fn test_structural_markers_preserved() -> anyhow::Result<()> {
    for seed in 0..25 {
        let variants = generate_variants(&full_rate_config(seed), MT103, Some(3))?;
        for variant in variants {
            let header = variant.find("{1:").expect("missing {1:");
            let body = variant.find("{4:").expect("missing {4:");
            let trailer = variant.rfind("-}").expect("missing -}");
            assert!(header < body && body < trailer, "markers out of order:\n{}", variant);
            assert!(variant.contains(":23B:CRED"));
            assert!(variant.contains(":71A:SHA"));
        }
    }
    Ok(())
}

#[test]
fn test_value_dates_stay_valid() -> anyhow::Result<()> {
    for seed in 0..100 {
        let variant = generate_variant(&full_rate_config(seed), MT103)?;
        let line = line_starting_with(&variant, ":32A:");
        let (_, month, day) =
            parse_swift_date(&line[5..11]).unwrap_or_else(|| panic!("bad date in {}", line));
        assert!((1..=12).contains(&month));
        assert!((1..=28).contains(&day), "day {} out of range in {}", day, line);
    }
    Ok(())
}

#[test]
fn test_amounts_use_comma_decimals() -> anyhow::Result<()> {
    let amount = Regex::new(r"^:32A:\d{6}[A-Z]{3}(\d+,\d{2})$")?;

    // Without an amounts pool every amount comes from perturbing the original.
    let config = GenerationConfig {
        field_substitution_rate: 1.0,
        ..Default::default()
    };
    let mut generator = VariationBatchGenerator::new(config)?;
    for variant in generator.generate_variants(MT103, Some(100)) {
        let line = line_starting_with(&variant, ":32A:");
        let captures = amount
            .captures(line)
            .unwrap_or_else(|| panic!("bad amount in {}", line));
        let value: f64 = captures[1].replace(',', ".").parse()?;
        assert!((7000.0..=13000.0).contains(&value));
    }
    Ok(())
}

#[test]
fn test_same_seed_same_output() -> anyhow::Result<()> {
    let config = full_rate_config(99);
    let first = generate_variants(&config, MT103, None)?;
    let second = generate_variants(&config, MT103, None)?;
    assert_eq!(first, second);

    let other = generate_variants(&full_rate_config(100), MT103, Some(first.len()))?;
    assert_ne!(first, other);
    Ok(())
}

#[test]
fn test_repeated_literal_gets_one_substitute() -> anyhow::Result<()> {
    let template = ":20:DUPLICATE1\n:57A:BANKDEFF\n:20:DUPLICATE1\n:57A:BANKDEFF";
    for seed in 0..20 {
        let variant = generate_variant(&full_rate_config(seed), template)?;
        let lines: Vec<&str> = variant.lines().collect();
        assert_eq!(lines[0], lines[2]);
        assert_eq!(lines[1], lines[3]);
    }
    Ok(())
}

#[test]
fn test_garbage_input_returned_unchanged() -> anyhow::Result<()> {
    let config = full_rate_config(1);
    assert_eq!(
        generate_variant(&config, "not a swift message at all")?,
        "not a swift message at all"
    );
    assert_eq!(generate_variant(&config, "")?, "");

    let mut engine = TemplateVariationEngine::new(config)?;
    let variation = engine.vary("\n\n   \n");
    assert_eq!(variation.text, "\n\n   \n");
    assert_eq!(variation.report, SubstitutionReport::default());
    Ok(())
}

#[test]
fn test_missing_required_pool_fails_construction() {
    let config = GenerationConfig {
        required_pools: vec!["cities".to_string(), "sender_names".to_string()],
        include_builtin_pools: true,
        ..Default::default()
    };
    match VariationBatchGenerator::new(config) {
        Err(VariatorError::MissingPool(name)) => assert_eq!(name, "sender_names"),
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("construction should fail"),
    }
}

#[test]
fn test_builtin_pools_satisfy_strict_mode() -> anyhow::Result<()> {
    let config = GenerationConfig {
        required_pools: ESSENTIAL_POOLS.iter().map(|name| name.to_string()).collect(),
        ..full_rate_config(5)
    };
    let variants = generate_variants(&config, MT103, Some(2))?;
    assert_eq!(variants.len(), 2);
    Ok(())
}

#[test]
fn test_malformed_builtin_pattern_keeps_envelope() -> anyhow::Result<()> {
    let mut patterns = BTreeMap::new();
    patterns.insert("reference".to_string(), "(:20:".to_string());

    for seed in 0..10 {
        let config = GenerationConfig {
            field_patterns: patterns.clone(),
            ..full_rate_config(seed)
        };
        let mut generator = VariationBatchGenerator::new(config)?;
        assert_eq!(generator.engine().warnings().len(), 1);

        let variant = generator.generate_variant(MT103);
        assert!(variant.starts_with("{1:"), "header rewritten:\n{}", variant);
        assert!(variant.contains("{4:"));
        assert!(variant.ends_with("-}"));
        assert!(line_starting_with(&variant, ":20:").len() > 4);
        assert!(line_starting_with(&variant, ":32A:").len() > 5);
        assert!(variant.contains(":71A:SHA"));
        assert!(variant.contains(":23B:CRED"));
    }
    Ok(())
}

#[test]
fn test_payment_detail_templates_expanded() -> anyhow::Result<()> {
    let mut substitutions = BTreeMap::new();
    substitutions.insert(
        "payment_detail_templates".to_string(),
        vec!["INVOICE {number:100:100} REF {string:5}".to_string()],
    );
    let config = GenerationConfig {
        field_substitution_rate: 1.0,
        instruction_insertion_rate: 0.0,
        substitutions,
        ..Default::default()
    };

    let variant = generate_variant(&config, ":70:PAYMENT FOR SERVICES\nORDER 12\n:71A:SHA")?;
    let detail = Regex::new(r"^:70:INVOICE 100 REF [A-Z0-9]{5}\nINVOICE 100 REF [A-Z0-9]{5}\n:71A:SHA$")?;
    assert!(detail.is_match(&variant), "unexpected detail block:\n{}", variant);
    Ok(())
}

#[test]
fn test_default_randomizer_preserves_shape() -> anyhow::Result<()> {
    let mut patterns = BTreeMap::new();
    patterns.insert("charges".to_string(), r":71A:\w+".to_string());
    let config = GenerationConfig {
        field_patterns: patterns,
        ..full_rate_config(8)
    };

    let mut generator = VariationBatchGenerator::new(config)?;
    for variant in generator.generate_variants(SIMPLE, Some(20)) {
        let last = variant.lines().last().unwrap_or_default();
        assert_eq!(last.len(), ":71A:SHA".len());
        assert!(last.starts_with(':'));
    }
    Ok(())
}

#[test]
fn test_config_file_round_trip() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join("swift_variator_integration_config.yaml");
    std::fs::write(
        &path,
        "seed: 11\nfield_substitution_rate: 1.0\nsubstitutions:\n  reference: [FIXEDREF]\n",
    )?;
    let config = GenerationConfig::from_path(&path);
    let _ = std::fs::remove_file(&path);

    let variant = generate_variant(&config?, ":20:OLD\n:71A:SHA")?;
    assert_eq!(variant, ":20:FIXEDREF\n:71A:SHA");
    Ok(())
}

#[test]
fn test_run_stats_accumulate() -> anyhow::Result<()> {
    let mut generator = VariationBatchGenerator::new(full_rate_config(4))?;
    generator.generate_variants(SIMPLE, Some(4));
    generator.generate_variant(SIMPLE);

    let stats = generator.stats();
    assert_eq!(stats.messages, 5);
    assert_eq!(stats.substitutions(), 20);
    assert_eq!(stats.failures(), 0);
    Ok(())
}
