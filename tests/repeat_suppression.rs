// tests/repeat_suppression.rs
//
// Near-duplicate messages are shrunk unless they carry a question, a CTA or a link.

use reply_gate::{Analyzer, AnalyzerConfig, BehavioralSignals, ReasonCode};

fn analyzer() -> Analyzer {
    Analyzer::builder(AnalyzerConfig::default()).dev_log(false).build()
}

#[test]
fn repeated_chinese_message_is_suppressed() {
    let a = analyzer();
    let history = ["我要退款", "我要退款", "我要退款"];
    let r = a.explain("我要退款", &history, &BehavioralSignals::default());

    assert!(!r.is_worth_replying);
    assert!(r.has_reason(ReasonCode::HardRepeatShrink), "reasons: {:?}", r.reasons);
    assert!(r.features.history_similarity.unwrap() >= 0.9);
    assert!(r.probability <= 0.2 + 1e-9);

    let dbg = r.debug.expect("explain attaches debug");
    assert!(dbg.calibration.repeat_factor.is_some());
    assert!(dbg.calibration.probability <= dbg.calibration.shrunk);
}

#[test]
fn fresh_message_has_no_repeat_penalty() {
    let a = analyzer();
    let r = a.analyze(
        "the quarterly invoice looks wrong",
        &["我要退款", "good morning team"],
        &BehavioralSignals::default(),
    );
    assert!(!r.has_reason(ReasonCode::HardRepeatShrink));
}

#[test]
fn repeated_question_is_exempt() {
    let a = analyzer();
    let text = "where is the staging dashboard?";
    let r = a.analyze(text, &[text, text], &BehavioralSignals::default());
    assert!(r.has_reason(ReasonCode::QuestionDetected));
    assert!(!r.has_reason(ReasonCode::HardRepeatShrink));
}

#[test]
fn repeated_link_is_exempt() {
    let a = analyzer();
    let text = "build report https://ci.example.com/run/42";
    let r = a.analyze(text, &[text, text], &BehavioralSignals::default());
    assert_eq!(r.features.has_link, Some(true));
    assert!(!r.has_reason(ReasonCode::HardRepeatShrink));
}

#[test]
fn configured_repeat_threshold_wins() {
    let mut cfg = AnalyzerConfig::default();
    cfg.repeat_penalty.threshold = Some(1.01);
    let a = Analyzer::builder(cfg).dev_log(false).build();
    let r = a.analyze("我要退款", &["我要退款"], &BehavioralSignals::default());
    assert!(!r.has_reason(ReasonCode::HardRepeatShrink));
}
