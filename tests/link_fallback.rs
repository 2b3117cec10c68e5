// tests/link_fallback.rs
//
// A bare link rejected only for low semantic value can be rescued when enabled.

use reply_gate::{Analyzer, AnalyzerConfig, BehavioralSignals, ReasonCode, Weights};

const NO_HISTORY: [&str; 0] = [];

fn neutral_config(link_fallback: bool) -> AnalyzerConfig {
    let mut cfg = AnalyzerConfig::default();
    cfg.weights = Weights::zero();
    cfg.link_fallback = link_fallback;
    cfg
}

#[test]
fn bare_link_is_rescued_when_enabled() {
    let a = Analyzer::builder(neutral_config(true)).dev_log(false).build();
    let r = a.analyze("https://example.com/report", &NO_HISTORY, &BehavioralSignals::default());

    assert!((r.probability - 0.5).abs() < 1e-9);
    assert!(r.is_worth_replying);
    assert!(r.has_reason(ReasonCode::LinkFallback));
    assert!(!r.has_reason(ReasonCode::LowSemanticValue));
    assert!(!r.has_reason(ReasonCode::BelowReplyThreshold));
}

#[test]
fn bare_link_is_rejected_when_disabled() {
    let a = Analyzer::builder(neutral_config(false)).dev_log(false).build();
    let r = a.analyze("https://example.com/report", &NO_HISTORY, &BehavioralSignals::default());

    assert!(!r.is_worth_replying);
    assert!(r.has_reason(ReasonCode::LowSemanticValue));
    assert!(r.has_reason(ReasonCode::BelowReplyThreshold));
    assert!(!r.has_reason(ReasonCode::LinkFallback));
}

#[test]
fn no_rescue_below_minimum_probability() {
    let mut cfg = neutral_config(true);
    cfg.weights.bias = -3.0;
    let a = Analyzer::builder(cfg).dev_log(false).build();
    let r = a.analyze("https://example.com/report", &NO_HISTORY, &BehavioralSignals::default());
    assert!(r.probability < 0.35);
    assert!(!r.is_worth_replying);
    assert!(!r.has_reason(ReasonCode::LinkFallback));
}
