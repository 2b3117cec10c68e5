// tests/compliance_policy.rs
//
// Profanity and sensitive-word checks drive the policy verdict; a block always wins
// over the reply decision.

use std::sync::Arc;

use reply_gate::providers::{
    ChineseComplianceDetector, ComplianceHit, ProfanityFilter, SensitiveWordFilter,
};
use reply_gate::{Analyzer, AnalyzerConfig, BehavioralSignals, PolicyAction, ReasonCode};

const NO_HISTORY: [&str; 0] = [];

struct Darn;
impl ProfanityFilter for Darn {
    fn is_profane(&self, token: &str) -> anyhow::Result<bool> {
        Ok(token == "darn")
    }
}

struct MaskWord(&'static str);
impl SensitiveWordFilter for MaskWord {
    fn filter(&self, text: &str) -> anyhow::Result<String> {
        Ok(text.replace(self.0, &"*".repeat(self.0.chars().count())))
    }
}

struct Offline;
impl ProfanityFilter for Offline {
    fn is_profane(&self, _token: &str) -> anyhow::Result<bool> {
        anyhow::bail!("profanity service offline")
    }
}
impl ChineseComplianceDetector for Offline {
    fn detect(&self, _text: &str) -> anyhow::Result<ComplianceHit> {
        anyhow::bail!("compliance service offline")
    }
}

fn mentioned() -> BehavioralSignals {
    BehavioralSignals {
        mentioned_by_at: true,
        ..Default::default()
    }
}

#[test]
fn english_profanity_blocks_even_when_mentioned() {
    let a = Analyzer::builder(AnalyzerConfig::default())
        .dev_log(false)
        .profanity_filter(Arc::new(Darn))
        .build();
    let r = a.analyze("this darn build is broken again?", &NO_HISTORY, &mentioned());

    assert_eq!(r.policy.action, PolicyAction::Block);
    assert!(!r.is_worth_replying);
    assert!(r.has_reason(ReasonCode::ComplianceBlock));
    assert_eq!(r.policy.details[0].kind, "profanity_en");
    assert_eq!(r.policy.details[0].matches, vec!["darn".to_string()]);
    assert!(r.features.toxicity.unwrap() > 0.0);
}

#[test]
fn block_overrides_a_met_threshold_without_claiming_it() {
    let mut cfg = AnalyzerConfig::default();
    cfg.thresholds.reply = 0.0;
    let a = Analyzer::builder(cfg)
        .dev_log(false)
        .profanity_filter(Arc::new(Darn))
        .build();
    let r = a.analyze("darn, can someone look at the deploy?", &NO_HISTORY, &mentioned());

    assert_eq!(r.policy.action, PolicyAction::Block);
    assert!(!r.is_worth_replying);
    assert!(!r.has_reason(ReasonCode::ReplyThresholdMet));
    assert!(!r.has_reason(ReasonCode::LinkFallback));
    assert_eq!(r.reasons.last(), Some(&ReasonCode::ComplianceBlock));
}

#[test]
fn sensitive_chinese_word_blocks() {
    let a = Analyzer::builder(AnalyzerConfig::default())
        .dev_log(false)
        .sensitive_word_filter(Arc::new(MaskWord("违禁")))
        .build();
    let r = a.analyze("这里有违禁内容吗？", &NO_HISTORY, &mentioned());

    assert_eq!(r.policy.action, PolicyAction::Block);
    assert!(!r.is_worth_replying);
    let detail = r
        .policy
        .details
        .iter()
        .find(|d| d.kind == "sensitive_zh")
        .expect("sensitive_zh detail");
    assert!(detail.score > 0.0);
}

#[test]
fn clean_text_is_allowed() {
    let a = Analyzer::builder(AnalyzerConfig::default())
        .dev_log(false)
        .profanity_filter(Arc::new(Darn))
        .build();
    let r = a.analyze("could you share the release notes?", &NO_HISTORY, &mentioned());
    assert_eq!(r.policy.action, PolicyAction::Allow);
    assert!(r.policy.details.is_empty());
    assert!(!r.has_reason(ReasonCode::ComplianceBlock));
}

#[test]
fn failing_detectors_degrade_to_allow() {
    let a = Analyzer::builder(AnalyzerConfig::default())
        .dev_log(false)
        .profanity_filter(Arc::new(Offline))
        .chinese_compliance(Arc::new(Offline))
        .build();
    let r = a.analyze("请帮我看看 darn 这个问题", &NO_HISTORY, &mentioned());
    assert_eq!(r.policy.action, PolicyAction::Allow);
    assert_eq!(r.features.toxicity, Some(0.0));
}

#[test]
fn disabled_compliance_reports_none() {
    let mut cfg = AnalyzerConfig::default();
    cfg.compliance.enabled = false;
    let a = Analyzer::builder(cfg)
        .dev_log(false)
        .profanity_filter(Arc::new(Darn))
        .build();
    let r = a.analyze("darn it", &NO_HISTORY, &BehavioralSignals::default());
    assert_eq!(r.policy.action, PolicyAction::None);
    assert_eq!(r.features.toxicity, None);
}
