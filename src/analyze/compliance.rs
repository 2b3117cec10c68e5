//! Compliance checker: English profanity and Chinese sensitive content folded into a
//! single toxicity score and a flag/block policy.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::language::is_cjk;
use super::signals::clamp01;
use crate::config::ComplianceConfig;
use crate::decision::{Policy, PolicyAction, PolicyDetail};
use crate::providers::{
    ChineseComplianceDetector, Collaborators, ComplianceHit, ProfanityFilter, SensitiveWordFilter,
};

pub const KIND_PROFANITY_EN: &str = "profanity_en";
pub const KIND_SENSITIVE_ZH: &str = "sensitive_zh";

const EN_WEIGHT: f64 = 0.6;
const ZH_WEIGHT: f64 = 0.8;

static LATIN_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z][a-z'\-]*").expect("latin word regex"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplianceOutcome {
    pub english: f64,
    pub chinese: f64,
    pub toxicity: f64,
    pub policy: Policy,
}

/// Lower-cased Latin words.
pub fn english_tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    LATIN_WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Full-width ASCII variants and the ideographic space folded to half-width.
pub fn to_half_width(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// The stretch of `original` that differs from `filtered` once the common prefix
/// and suffix are trimmed.
fn differing_span(original: &str, filtered: &str) -> String {
    let a: Vec<char> = original.chars().collect();
    let b: Vec<char> = filtered.chars().collect();
    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let span: String = a[prefix..a.len() - suffix].iter().collect();
    if span.trim().is_empty() {
        original.to_string()
    } else {
        span.trim().to_string()
    }
}

/// Chinese compliance detector backed by a sensitive-word filter: any change the
/// filter makes to the normalized text is one match with score 1.
pub struct SensitiveFilterBridge {
    filter: Arc<dyn SensitiveWordFilter>,
}

impl SensitiveFilterBridge {
    pub fn new(filter: Arc<dyn SensitiveWordFilter>) -> Self {
        Self { filter }
    }
}

impl ChineseComplianceDetector for SensitiveFilterBridge {
    fn detect(&self, text: &str) -> anyhow::Result<ComplianceHit> {
        let normalized = to_half_width(text).to_lowercase();
        let filtered = self.filter.filter(&normalized)?;
        if filtered == normalized {
            return Ok(ComplianceHit::default());
        }
        Ok(ComplianceHit {
            score: 1.0,
            matches: vec![differing_span(&normalized, &filtered)],
        })
    }
}

fn english_signal(filter: &dyn ProfanityFilter, tokens: &[String]) -> (f64, Vec<String>) {
    if tokens.is_empty() {
        return (0.0, Vec::new());
    }
    let mut profane = 0usize;
    let mut matches: Vec<String> = Vec::new();
    for token in tokens {
        match filter.is_profane(token) {
            Ok(true) => {
                profane += 1;
                if !matches.contains(token) {
                    matches.push(token.clone());
                }
            }
            Ok(false) => {}
            Err(e) => {
                debug!(error = %e, "profanity filter failed");
                return (0.0, Vec::new());
            }
        }
    }
    (profane as f64 / tokens.len() as f64, matches)
}

fn chinese_signal(detector: &dyn ChineseComplianceDetector, text: &str) -> ComplianceHit {
    match detector.detect(text) {
        Ok(hit) => ComplianceHit {
            score: clamp01(hit.score),
            matches: hit.matches,
        },
        Err(e) => {
            debug!(error = %e, "chinese compliance detector failed");
            ComplianceHit::default()
        }
    }
}

pub fn check(cfg: &ComplianceConfig, clean_text: &str, collab: &Collaborators) -> ComplianceOutcome {
    if !cfg.enabled {
        return ComplianceOutcome::default();
    }

    let (english, en_matches) = english_signal(collab.profanity.as_ref(), &english_tokens(clean_text));

    // An injected detector sees every message; the word-filter bridge only Han text.
    let zh = match &collab.zh_compliance {
        Some(detector) => chinese_signal(detector.as_ref(), clean_text),
        None if clean_text.chars().any(is_cjk) => {
            chinese_signal(&SensitiveFilterBridge::new(collab.sensitive.clone()), clean_text)
        }
        None => ComplianceHit::default(),
    };

    let toxicity = clamp01(EN_WEIGHT * english + ZH_WEIGHT * zh.score);

    let mut details = Vec::new();
    if english > 0.0 {
        details.push(PolicyDetail {
            kind: KIND_PROFANITY_EN.to_string(),
            score: english,
            matches: en_matches,
        });
    }
    if zh.score > 0.0 {
        details.push(PolicyDetail {
            kind: KIND_SENSITIVE_ZH.to_string(),
            score: zh.score,
            matches: zh.matches,
        });
    }

    let action = if toxicity > 0.0 && toxicity >= clamp01(cfg.block_threshold) {
        PolicyAction::Block
    } else if toxicity > 0.0 && toxicity >= clamp01(cfg.flag_threshold) {
        PolicyAction::Flag
    } else {
        PolicyAction::Allow
    };

    ComplianceOutcome {
        english,
        chinese: zh.score,
        toxicity,
        policy: Policy { action, details },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Words(&'static [&'static str]);
    impl ProfanityFilter for Words {
        fn is_profane(&self, token: &str) -> anyhow::Result<bool> {
            Ok(self.0.contains(&token))
        }
    }

    struct Mask(&'static str);
    impl SensitiveWordFilter for Mask {
        fn filter(&self, text: &str) -> anyhow::Result<String> {
            Ok(text.replace(self.0, "**"))
        }
    }

    struct Down;
    impl ProfanityFilter for Down {
        fn is_profane(&self, _token: &str) -> anyhow::Result<bool> {
            anyhow::bail!("wordlist missing")
        }
    }

    /// Scores romanized content the way a hosted classifier would.
    struct Romanized;
    impl ChineseComplianceDetector for Romanized {
        fn detect(&self, text: &str) -> anyhow::Result<ComplianceHit> {
            Ok(if text.contains("mingan") {
                ComplianceHit {
                    score: 0.5,
                    matches: vec!["mingan".to_string()],
                }
            } else {
                ComplianceHit::default()
            })
        }
    }

    fn collab_with(profanity: Arc<dyn ProfanityFilter>) -> Collaborators {
        Collaborators {
            profanity,
            ..Collaborators::default()
        }
    }

    #[test]
    fn half_width_folding() {
        assert_eq!(to_half_width("ＡＢＣ１２３！\u{3000}x"), "ABC123! x");
    }

    #[test]
    fn profanity_fraction_blocks() {
        let c = collab_with(Arc::new(Words(&["darn"])));
        let out = check(&ComplianceConfig::default(), "darn it this darn thing", &c);
        assert!((out.english - 0.4).abs() < 1e-9);
        assert!((out.toxicity - 0.24).abs() < 1e-9);
        assert_eq!(out.policy.action, PolicyAction::Block);
        assert_eq!(out.policy.details[0].kind, KIND_PROFANITY_EN);
        assert_eq!(out.policy.details[0].matches, vec!["darn".to_string()]);
    }

    #[test]
    fn flag_between_thresholds() {
        let c = collab_with(Arc::new(Words(&["darn"])));
        let text = "darn ".to_string() + &"word ".repeat(19);
        let out = check(&ComplianceConfig::default(), &text, &c);
        // 1/20 * 0.6 = 0.03
        assert_eq!(out.policy.action, PolicyAction::Flag);
    }

    #[test]
    fn clean_text_is_allowed_and_disabled_is_none() {
        let c = Collaborators::default();
        let out = check(&ComplianceConfig::default(), "hello there", &c);
        assert_eq!(out.policy.action, PolicyAction::Allow);
        assert!(out.policy.details.is_empty());

        let off = ComplianceConfig {
            enabled: false,
            ..ComplianceConfig::default()
        };
        assert_eq!(check(&off, "hello", &c).policy.action, PolicyAction::None);
    }

    #[test]
    fn sensitive_filter_bridge() {
        let c = Collaborators {
            sensitive: Arc::new(Mask("坏词")),
            ..Collaborators::default()
        };
        let out = check(&ComplianceConfig::default(), "这是坏词吧", &c);
        assert!((out.chinese - 1.0).abs() < 1e-9);
        assert!((out.toxicity - 0.8).abs() < 1e-9);
        assert_eq!(out.policy.action, PolicyAction::Block);
        assert_eq!(out.policy.details[0].kind, KIND_SENSITIVE_ZH);
        assert_eq!(out.policy.details[0].matches, vec!["坏词".to_string()]);
    }

    #[test]
    fn injected_detector_runs_on_latin_text() {
        let c = Collaborators {
            zh_compliance: Some(Arc::new(Romanized)),
            ..Collaborators::default()
        };
        let out = check(&ComplianceConfig::default(), "zhe shi mingan neirong", &c);
        assert!((out.chinese - 0.5).abs() < 1e-9);
        assert!((out.toxicity - 0.4).abs() < 1e-9);
        assert_eq!(out.policy.details[0].kind, KIND_SENSITIVE_ZH);
        assert_eq!(out.policy.details[0].matches, vec!["mingan".to_string()]);

        // the word-filter bridge stays limited to Han text
        let bridge_only = Collaborators {
            sensitive: Arc::new(Mask("mingan")),
            ..Collaborators::default()
        };
        let out = check(&ComplianceConfig::default(), "zhe shi mingan neirong", &bridge_only);
        assert_eq!(out.chinese, 0.0);
    }

    #[test]
    fn failing_detector_is_zero_signal() {
        let c = collab_with(Arc::new(Down));
        let out = check(&ComplianceConfig::default(), "anything at all", &c);
        assert_eq!(out.english, 0.0);
        assert_eq!(out.policy.action, PolicyAction::Allow);
    }
}
