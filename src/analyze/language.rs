//! Language routing, tokenization, stopword filtering and the semantic-density score.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use super::signals::clamp01;
use crate::providers::{
    split_sentences, CharSegmenter, ChineseSegmenter, Collaborators, EnglishTokenizer, LanguageDetector,
    PartOfSpeech, RegexTokenizer, Term,
};

/// Largest boost the POS content ratio can add to the semantic score.
const POS_BOOST: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Zh,
    En,
    Other,
}

impl Language {
    pub fn tag(self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
            Language::Other => "other",
        }
    }

    /// Map a detector code; `None` for undetermined.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        match code.as_str() {
            "" | "und" => None,
            "zh" | "zho" | "chi" | "cmn" | "yue" | "wuu" => Some(Language::Zh),
            "en" | "eng" => Some(Language::En),
            c if c.starts_with("zh-") || c.starts_with("zh_") => Some(Language::Zh),
            c if c.starts_with("en-") || c.starts_with("en_") => Some(Language::En),
            _ => Some(Language::Other),
        }
    }
}

/// Han ideographs (unified, extension A/B, compatibility).
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}

/// Script heuristic: any Han ⇒ Chinese, else any Latin letter ⇒ English.
pub fn script_language(text: &str) -> Language {
    if text.chars().any(is_cjk) {
        Language::Zh
    } else if text.chars().any(|c| c.is_ascii_alphabetic()) {
        Language::En
    } else {
        Language::Other
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detected {
    pub language: Language,
    /// Detector code, or the heuristic tag when the detector gave up.
    pub code: String,
}

pub(crate) fn detect(detector: &dyn LanguageDetector, text: &str, min_length: usize) -> Detected {
    match detector.detect(text, min_length) {
        Ok(code) => {
            if let Some(language) = Language::from_code(&code) {
                return Detected { language, code };
            }
        }
        Err(e) => debug!(error = %e, "language detector failed, using script heuristic"),
    }
    let language = script_language(text);
    Detected {
        language,
        code: language.tag().to_string(),
    }
}

/// Per-language stopword sets, lower-cased.
#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    sets: HashMap<String, HashSet<String>>,
}

impl Stopwords {
    pub fn from_config(map: &BTreeMap<String, Vec<String>>) -> Self {
        let sets = map
            .iter()
            .map(|(lang, words)| {
                (
                    lang.to_ascii_lowercase(),
                    words.iter().map(|w| w.to_lowercase()).collect(),
                )
            })
            .collect();
        Self { sets }
    }

    pub fn contains(&self, language: Language, token: &str) -> bool {
        let key = match language {
            Language::Zh => "zh",
            Language::En | Language::Other => "en",
        };
        self.sets
            .get(key)
            .is_some_and(|set| set.contains(&token.to_lowercase()))
    }
}

fn is_numeric_token(token: &str) -> bool {
    token.chars().any(|c| c.is_numeric())
        && token
            .chars()
            .all(|c| c.is_numeric() || matches!(c, '.' | ',' | '_' | '-'))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tokenized {
    pub tokens: Vec<String>,
    pub meaningful: Vec<String>,
    /// Noun+verb+adjective share among tagged terms, when any term is tagged.
    pub pos_content_ratio: Option<f64>,
    pub semantic_score: f64,
}

pub(crate) fn tokenize(
    language: Language,
    clean_text: &str,
    collab: &Collaborators,
    stopwords: &Stopwords,
) -> Tokenized {
    let terms: Vec<Term> = match language {
        Language::Zh => collab
            .chinese
            .segment(clean_text)
            .or_else(|e| {
                debug!(error = %e, "segmenter failed, using per-character fallback");
                CharSegmenter.segment(clean_text)
            })
            .unwrap_or_default()
            .into_iter()
            .map(Term::plain)
            .collect(),
        Language::En | Language::Other => {
            let terms = collab
                .english
                .terms(clean_text)
                .or_else(|e| {
                    debug!(error = %e, "english tokenizer failed, using regex fallback");
                    RegexTokenizer.terms(clean_text)
                })
                .unwrap_or_default();
            with_tags(terms, clean_text, collab.english.as_ref())
        }
    };

    let terms: Vec<Term> = terms
        .into_iter()
        .filter(|t| t.text.chars().any(char::is_alphanumeric))
        .map(|t| Term {
            text: t.text.trim().to_lowercase(),
            pos: t.pos,
        })
        .collect();

    let tokens: Vec<String> = terms.iter().map(|t| t.text.clone()).collect();
    let meaningful: Vec<String> = tokens
        .iter()
        .filter(|t| !is_numeric_token(t) && !stopwords.contains(language, t))
        .cloned()
        .collect();

    let tagged: Vec<PartOfSpeech> = terms.iter().filter_map(|t| t.pos).collect();
    let pos_content_ratio = (!tagged.is_empty()).then(|| {
        tagged.iter().filter(|p| p.is_content()).count() as f64 / tagged.len() as f64
    });

    let density = if tokens.is_empty() {
        0.0
    } else {
        meaningful.len() as f64 / tokens.len() as f64
    };
    let semantic_score = clamp01(density + POS_BOOST * pos_content_ratio.unwrap_or(0.0));

    Tokenized {
        tokens,
        meaningful,
        pos_content_ratio,
        semantic_score,
    }
}

/// Fill POS from the tagger when the tokenizer returned none. Tags that do not
/// line up one-to-one with the terms are ignored.
fn with_tags(mut terms: Vec<Term>, text: &str, english: &dyn EnglishTokenizer) -> Vec<Term> {
    if terms.is_empty() || terms.iter().any(|t| t.pos.is_some()) {
        return terms;
    }
    match english.tag(text) {
        Ok(tags) if tags.len() == terms.len() => {
            for (term, pos) in terms.iter_mut().zip(tags) {
                term.pos = pos;
            }
        }
        Ok(tags) => debug!(terms = terms.len(), tags = tags.len(), "POS tags misaligned, ignoring"),
        Err(e) => debug!(error = %e, "POS tagging failed"),
    }
    terms
}

/// Sentences of the punctuation-bearing text.
pub(crate) fn sentences(language: Language, intent_text: &str, collab: &Collaborators) -> Vec<String> {
    match language {
        Language::En => collab.english.sentences(intent_text).unwrap_or_else(|e| {
            debug!(error = %e, "sentence splitter failed, using built-in splitter");
            split_sentences(intent_text)
        }),
        Language::Zh | Language::Other => split_sentences(intent_text),
    }
}

/// Share of sentences whose first word is tagged as a verb. `None` without POS tags.
pub(crate) fn imperative_ratio(sentences: &[String], english: &dyn EnglishTokenizer) -> Option<f64> {
    let mut considered = 0usize;
    let mut imperative = 0usize;
    let mut any_tagged = false;
    for sentence in sentences {
        let terms = match english.terms(sentence) {
            Ok(t) => t,
            Err(e) => {
                debug!(error = %e, "POS tagging failed");
                return None;
            }
        };
        let Some(first) = terms
            .iter()
            .find(|t| t.text.chars().any(char::is_alphanumeric))
        else {
            continue;
        };
        considered += 1;
        if let Some(pos) = first.pos {
            any_tagged = true;
            if pos == PartOfSpeech::Verb {
                imperative += 1;
            }
        }
    }
    (any_tagged && considered > 0).then(|| imperative as f64 / considered as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;
    use crate::providers::UndeterminedDetector;
    use std::sync::Arc;

    struct Fixed(&'static str);
    impl LanguageDetector for Fixed {
        fn detect(&self, _text: &str, _min: usize) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;
    impl LanguageDetector for Broken {
        fn detect(&self, _text: &str, _min: usize) -> anyhow::Result<String> {
            anyhow::bail!("model not loaded")
        }
    }

    /// Tags the first word of each sentence as a verb, everything else as a noun.
    struct FirstVerb;
    impl EnglishTokenizer for FirstVerb {
        fn terms(&self, text: &str) -> anyhow::Result<Vec<Term>> {
            Ok(text
                .split_whitespace()
                .enumerate()
                .map(|(i, w)| Term {
                    text: w.to_string(),
                    pos: Some(if i == 0 {
                        PartOfSpeech::Verb
                    } else {
                        PartOfSpeech::Noun
                    }),
                })
                .collect())
        }
        fn sentences(&self, text: &str) -> anyhow::Result<Vec<String>> {
            Ok(split_sentences(text))
        }
    }

    /// Plain terms; tags come separately, nouns throughout.
    struct SeparateTagger {
        extra_tag: bool,
    }
    impl EnglishTokenizer for SeparateTagger {
        fn terms(&self, text: &str) -> anyhow::Result<Vec<Term>> {
            RegexTokenizer.terms(text)
        }
        fn sentences(&self, text: &str) -> anyhow::Result<Vec<String>> {
            Ok(split_sentences(text))
        }
        fn tag(&self, text: &str) -> anyhow::Result<Vec<Option<PartOfSpeech>>> {
            let mut tags = vec![Some(PartOfSpeech::Noun); text.split_whitespace().count()];
            if self.extra_tag {
                tags.push(None);
            }
            Ok(tags)
        }
    }

    fn stopwords() -> Stopwords {
        Stopwords::from_config(&AnalyzerConfig::default().stopwords)
    }

    #[test]
    fn codes_map_to_languages() {
        assert_eq!(Language::from_code("cmn"), Some(Language::Zh));
        assert_eq!(Language::from_code("eng"), Some(Language::En));
        assert_eq!(Language::from_code("EN-us"), Some(Language::En));
        assert_eq!(Language::from_code("fra"), Some(Language::Other));
        assert_eq!(Language::from_code("und"), None);
    }

    #[test]
    fn undetermined_falls_back_to_script() {
        assert_eq!(detect(&UndeterminedDetector, "我要退款", 3).language, Language::Zh);
        assert_eq!(detect(&UndeterminedDetector, "refund me", 3).language, Language::En);
        assert_eq!(detect(&UndeterminedDetector, "123 !!", 3).language, Language::Other);
        assert_eq!(detect(&Broken, "hello", 3).language, Language::En);
        let d = detect(&Fixed("cmn"), "whatever", 3);
        assert_eq!(d.language, Language::Zh);
        assert_eq!(d.code, "cmn");
    }

    #[test]
    fn stopwords_and_numbers_are_not_meaningful() {
        let t = tokenize(
            Language::En,
            "The build 42 is ready",
            &Collaborators::default(),
            &stopwords(),
        );
        assert_eq!(t.tokens, vec!["the", "build", "42", "is", "ready"]);
        assert_eq!(t.meaningful, vec!["build", "ready"]);
        assert!((t.semantic_score - 0.4).abs() < 1e-9);
        assert!(t.pos_content_ratio.is_none());
    }

    #[test]
    fn chinese_uses_segmenter() {
        let t = tokenize(Language::Zh, "我要退款", &Collaborators::default(), &stopwords());
        assert_eq!(t.tokens.len(), 4);
        assert_eq!(t.meaningful, vec!["要", "退", "款"]);
    }

    #[test]
    fn pos_tags_boost_semantic_score() {
        let collab = Collaborators {
            english: Arc::new(FirstVerb),
            ..Collaborators::default()
        };
        let t = tokenize(Language::En, "check logs", &collab, &stopwords());
        assert_eq!(t.pos_content_ratio, Some(1.0));
        assert!((t.semantic_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn separate_tagger_fills_missing_pos() {
        let collab = Collaborators {
            english: Arc::new(SeparateTagger { extra_tag: false }),
            ..Collaborators::default()
        };
        let t = tokenize(Language::En, "the deploy logs", &collab, &stopwords());
        assert_eq!(t.pos_content_ratio, Some(1.0));
        assert!(t.semantic_score > 2.0 / 3.0);

        let collab = Collaborators {
            english: Arc::new(SeparateTagger { extra_tag: true }),
            ..Collaborators::default()
        };
        let t = tokenize(Language::En, "the deploy logs", &collab, &stopwords());
        assert!(t.pos_content_ratio.is_none());
    }

    #[test]
    fn imperative_needs_tags() {
        let s = vec!["check the logs.".to_string(), "thanks".to_string()];
        assert_eq!(imperative_ratio(&s, &FirstVerb), Some(1.0));
        assert_eq!(imperative_ratio(&s, &RegexTokenizer), None);
    }
}
