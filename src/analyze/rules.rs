//! Configured call-to-action rules, compiled once per analyzer.
//!
//! A rule is either a regex pattern (from config) or a predicate (attached in code).
//! Each carries a language tag (`*` for any) and a weight in [0,1]. Matching rules
//! combine by noisy-OR: `1 − Π(1 − w)`.
//!
//! TOML shape:
//! ```toml
//! [[resources.cta_rules]]
//! id = "please"
//! pattern = "\\bplease\\b"
//! flags = "i"
//! lang = "en"
//! weight = 0.6
//! ```

use std::fmt;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::signals::clamp01;

pub const ANY_LANG: &str = "*";

fn any_lang() -> String {
    ANY_LANG.to_string()
}

fn default_weight() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
    #[serde(default)]
    pub id: Option<String>,
    pub pattern: String,
    /// Regex flags: `i`, `m`, `s`, `x`. Others are ignored.
    #[serde(default)]
    pub flags: Option<String>,
    #[serde(default = "any_lang")]
    pub lang: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

pub type RulePredicate = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Rule definition before compilation.
#[derive(Clone)]
pub enum RuleDef {
    Pattern(PatternRule),
    Predicate {
        id: String,
        lang: String,
        weight: f64,
        test: RulePredicate,
    },
}

impl fmt::Debug for RuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleDef::Pattern(p) => f.debug_tuple("Pattern").field(p).finish(),
            RuleDef::Predicate { id, lang, weight, .. } => f
                .debug_struct("Predicate")
                .field("id", id)
                .field("lang", lang)
                .field("weight", weight)
                .finish_non_exhaustive(),
        }
    }
}

enum Matcher {
    Regex(Regex),
    Predicate(RulePredicate),
}

struct CompiledRule {
    id: String,
    lang: String,
    weight: f64,
    matcher: Matcher,
}

impl CompiledRule {
    fn applies_to(&self, lang: &str) -> bool {
        self.lang == ANY_LANG || self.lang.eq_ignore_ascii_case(lang)
    }

    fn find(&self, text: &str, lang: &str) -> Option<Option<String>> {
        match &self.matcher {
            Matcher::Regex(re) => re.find(text).map(|m| Some(m.as_str().to_string())),
            Matcher::Predicate(test) => test(text, lang).then_some(None),
        }
    }
}

/// A rule that fired, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatch {
    pub id: String,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Default)]
pub struct CompiledRuleEngine {
    rules: Vec<CompiledRule>,
}

impl fmt::Debug for CompiledRuleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRuleEngine")
            .field("rules", &self.names())
            .finish()
    }
}

fn build_regex(rule: &PatternRule) -> Result<Regex, regex::Error> {
    let flags = rule.flags.as_deref().unwrap_or("");
    RegexBuilder::new(&rule.pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
}

impl CompiledRuleEngine {
    /// Compile definitions; rules with invalid patterns are dropped with a warning.
    pub fn compile<I: IntoIterator<Item = RuleDef>>(defs: I) -> Self {
        let mut rules = Vec::new();
        for (idx, def) in defs.into_iter().enumerate() {
            match def {
                RuleDef::Pattern(p) => {
                    let id = p.id.clone().unwrap_or_else(|| format!("rule_{idx}"));
                    match build_regex(&p) {
                        Ok(re) => rules.push(CompiledRule {
                            id,
                            lang: p.lang.trim().to_ascii_lowercase(),
                            weight: clamp01(p.weight),
                            matcher: Matcher::Regex(re),
                        }),
                        Err(e) => warn!(rule = %id, error = %e, "dropping rule with invalid pattern"),
                    }
                }
                RuleDef::Predicate {
                    id,
                    lang,
                    weight,
                    test,
                } => rules.push(CompiledRule {
                    id,
                    lang: lang.trim().to_ascii_lowercase(),
                    weight: clamp01(weight),
                    matcher: Matcher::Predicate(test),
                }),
            }
        }
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.id.clone()).collect()
    }

    /// Noisy-OR over rules that apply to `lang` and match `text`.
    pub fn score(&self, text: &str, lang: &str) -> f64 {
        let miss = self
            .rules
            .iter()
            .filter(|r| r.applies_to(lang) && r.find(text, lang).is_some())
            .fold(1.0, |acc, r| acc * (1.0 - r.weight));
        clamp01(1.0 - miss)
    }

    pub fn matched(&self, text: &str, lang: &str) -> Vec<RuleMatch> {
        self.rules
            .iter()
            .filter(|r| r.applies_to(lang))
            .filter_map(|r| {
                r.find(text, lang).map(|snippet| RuleMatch {
                    id: r.id.clone(),
                    weight: r.weight,
                    snippet,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(id: &str, pattern: &str, lang: &str, weight: f64) -> RuleDef {
        RuleDef::Pattern(PatternRule {
            id: Some(id.into()),
            pattern: pattern.into(),
            flags: Some("i".into()),
            lang: lang.into(),
            weight,
        })
    }

    #[test]
    fn noisy_or_combines() {
        let eng = CompiledRuleEngine::compile(vec![
            pattern("please", r"\bplease\b", "*", 0.5),
            pattern("asap", r"\basap\b", "en", 0.5),
        ]);
        assert_eq!(eng.len(), 2);
        assert!((eng.score("Please fix it ASAP", "en") - 0.75).abs() < 1e-9);
        assert!((eng.score("please fix it asap", "zh") - 0.5).abs() < 1e-9);
        assert_eq!(eng.score("nothing here", "en"), 0.0);
    }

    #[test]
    fn invalid_patterns_are_dropped() {
        let eng = CompiledRuleEngine::compile(vec![
            pattern("broken", r"(unclosed", "*", 0.9),
            pattern("ok", r"help", "*", 0.4),
        ]);
        assert_eq!(eng.names(), vec!["ok".to_string()]);
    }

    #[test]
    fn weights_are_clamped() {
        let eng = CompiledRuleEngine::compile(vec![pattern("big", "go", "*", 4.0)]);
        assert_eq!(eng.score("go now", "en"), 1.0);
    }

    #[test]
    fn predicates_and_matches() {
        let eng = CompiledRuleEngine::compile(vec![
            RuleDef::Predicate {
                id: "long".into(),
                lang: "*".into(),
                weight: 0.3,
                test: Arc::new(|text: &str, _lang: &str| text.chars().count() > 10),
            },
            pattern("check", r"\bcheck\b", "en", 0.6),
        ]);
        let m = eng.matched("please check this", "en");
        assert_eq!(m.len(), 2);
        assert_eq!(m[0].id, "long");
        assert_eq!(m[0].snippet, None);
        assert_eq!(m[1].snippet.as_deref(), Some("check"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let r: PatternRule = serde_json::from_str(r#"{"pattern":"x"}"#).unwrap();
        assert_eq!(r.lang, "*");
        assert!((r.weight - 0.5).abs() < 1e-12);
        assert!(r.id.is_none());
    }
}
