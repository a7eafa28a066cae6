use chrono::Utc;
use tributary_core::{
    ModelId, PricingEntry, PricingTable, RequestKind, TokenUsage, UsageRecord, UsageTotals,
    estimate_tokens,
};

#[test]
fn estimate_is_ceiling_of_quarter_length() {
    assert_eq!(estimate_tokens(""), 0);
    assert_eq!(estimate_tokens("a"), 1);
    assert_eq!(estimate_tokens("abcd"), 1);
    assert_eq!(estimate_tokens("abcdefgh"), 2);
    assert_eq!(estimate_tokens("abcdefghi"), 3);
    // Counted in characters, not bytes
    assert_eq!(estimate_tokens("日本語です"), 2);
}

#[test]
fn estimate_is_monotonic_in_length() {
    let mut text = String::new();
    let mut previous = estimate_tokens(&text);
    for _ in 0..200 {
        text.push('é');
        let current = estimate_tokens(&text);
        assert!(current >= previous);
        previous = current;
    }
}

#[test]
fn cost_is_monotonic_in_each_token_count() {
    let pricing = PricingTable::default();
    for model in [ModelId::Gpt4oMini, ModelId::Gpt4o, ModelId::Gpt4Turbo, ModelId::Gpt35Turbo] {
        let mut previous = pricing.cost(model, 0, 500);
        for input in (0..10_000).step_by(250) {
            let current = pricing.cost(model, input, 500);
            assert!(current >= previous);
            previous = current;
        }

        let mut previous = pricing.cost(model, 500, 0);
        for output in (0..10_000).step_by(250) {
            let current = pricing.cost(model, 500, output);
            assert!(current >= previous);
            previous = current;
        }

        assert_eq!(pricing.cost(model, 0, 0), 0.0);
    }
}

#[test]
fn cost_matches_per_thousand_formula() {
    let pricing = PricingTable::default()
        .with_override(ModelId::Gpt4o, PricingEntry::new(0.005, 0.015).expect("valid"))
        .expect("override");
    let cost = pricing.cost(ModelId::Gpt4o, 1500, 500);
    assert!((cost - (1.5 * 0.005 + 0.5 * 0.015)).abs() < 1e-12);
}

#[test]
fn negative_prices_are_rejected() {
    assert!(PricingEntry::new(-0.1, 0.2).is_err());
    assert!(PricingEntry::new(0.1, f64::NAN).is_err());
}

#[test]
fn pricing_table_deserializes_model_keys() {
    let json = r#"{"gpt-4o-mini": {"input_cost_per_1k": 0.001, "output_cost_per_1k": 0.002}}"#;
    let pricing: PricingTable = serde_json::from_str(json).expect("json");
    assert!(pricing.validate().is_ok());
    assert_eq!(*pricing.entry(ModelId::Gpt4oMini).input_cost_per_1k(), 0.001);
    assert_eq!(pricing.entry(ModelId::Gpt4o), PricingEntry::builtin(ModelId::Gpt4o));
}

#[test]
fn usage_records_aggregate_into_totals() {
    let pricing = PricingTable::default();
    let records: Vec<UsageRecord> = (0..3)
        .map(|_| {
            UsageRecord::new(
                "user-1",
                ModelId::Gpt4oMini,
                RequestKind::Headline,
                TokenUsage::new(1000, 2000),
                &pricing,
                Utc::now(),
            )
        })
        .collect();

    let totals: UsageTotals = records.iter().collect();
    assert_eq!(totals.request_count, 3);
    assert_eq!(totals.input_tokens, 3000);
    assert_eq!(totals.output_tokens, 6000);
    let expected = 3.0 * pricing.cost(ModelId::Gpt4oMini, 1000, 2000);
    assert!((totals.cost_usd - expected).abs() < 1e-12);
    assert!(*records[0].cost_usd() >= 0.0);
}
