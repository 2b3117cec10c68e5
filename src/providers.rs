// src/providers.rs
//! Capability traits for the NLP collaborators the analyzer consumes, plus neutral
//! built-in implementations.
//!
//! Every call returns `anyhow::Result`; the analyzer turns an `Err` into a neutral
//! signal for that one feature and carries on.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analyze::language::is_cjk;

/// Language code returned when detection is not possible.
pub const UNDETERMINED: &str = "und";

pub trait LanguageDetector: Send + Sync {
    /// ISO-639 style code, or `"und"`.
    fn detect(&self, text: &str, min_length: usize) -> anyhow::Result<String>;
}

/// Always undetermined; the analyzer then routes by script.
#[derive(Debug, Default, Clone, Copy)]
pub struct UndeterminedDetector;

impl LanguageDetector for UndeterminedDetector {
    fn detect(&self, _text: &str, _min_length: usize) -> anyhow::Result<String> {
        Ok(UNDETERMINED.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Pronoun,
    Other,
}

impl PartOfSpeech {
    pub fn is_content(self) -> bool {
        matches!(self, Self::Noun | Self::Verb | Self::Adjective)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub text: String,
    pub pos: Option<PartOfSpeech>,
}

impl Term {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pos: None,
        }
    }
}

pub trait EnglishTokenizer: Send + Sync {
    fn terms(&self, text: &str) -> anyhow::Result<Vec<Term>>;
    fn sentences(&self, text: &str) -> anyhow::Result<Vec<String>>;
    /// POS tags aligned with `terms`; `None` entries when untagged.
    fn tag(&self, text: &str) -> anyhow::Result<Vec<Option<PartOfSpeech>>> {
        Ok(self.terms(text)?.into_iter().map(|t| t.pos).collect())
    }
}

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?u)\b\w+\b").expect("tokenizer regex"));

/// Unicode word tokenizer without POS tags.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexTokenizer;

impl EnglishTokenizer for RegexTokenizer {
    fn terms(&self, text: &str) -> anyhow::Result<Vec<Term>> {
        Ok(WORD_RE.find_iter(text).map(|m| Term::plain(m.as_str())).collect())
    }

    fn sentences(&self, text: &str) -> anyhow::Result<Vec<String>> {
        Ok(split_sentences(text))
    }
}

const TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？', '…', '\n'];

/// Split after runs of sentence terminators; terminators stay on their sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if TERMINATORS.contains(&c) {
            while let Some(&next) = chars.peek() {
                if !TERMINATORS.contains(&next) {
                    break;
                }
                current.push(next);
                chars.next();
            }
            let s = current.trim();
            if !s.is_empty() {
                out.push(s.to_string());
            }
            current.clear();
        }
    }
    let s = current.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
    out
}

pub trait ChineseSegmenter: Send + Sync {
    fn segment(&self, text: &str) -> anyhow::Result<Vec<String>>;
}

/// One token per Han character; runs of other word characters stay whole.
#[derive(Debug, Default, Clone, Copy)]
pub struct CharSegmenter;

impl ChineseSegmenter for CharSegmenter {
    fn segment(&self, text: &str) -> anyhow::Result<Vec<String>> {
        let mut out = Vec::new();
        let mut word = String::new();
        for c in text.chars() {
            if is_cjk(c) {
                if !word.is_empty() {
                    out.push(std::mem::take(&mut word));
                }
                out.push(c.to_string());
            } else if c.is_alphanumeric() || c == '_' {
                word.push(c);
            } else if !word.is_empty() {
                out.push(std::mem::take(&mut word));
            }
        }
        if !word.is_empty() {
            out.push(word);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SentimentReport {
    pub score: f64,
    pub comparative: f64,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

pub trait SentimentAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> anyhow::Result<SentimentReport>;
}

/// Reports every text as neutral.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeutralSentiment;

impl SentimentAnalyzer for NeutralSentiment {
    fn analyze(&self, _text: &str) -> anyhow::Result<SentimentReport> {
        Ok(SentimentReport::default())
    }
}

pub trait ProfanityFilter: Send + Sync {
    fn is_profane(&self, token: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProfanity;

impl ProfanityFilter for NoProfanity {
    fn is_profane(&self, _token: &str) -> anyhow::Result<bool> {
        Ok(false)
    }
}

/// Returns the text with sensitive words masked.
pub trait SensitiveWordFilter: Send + Sync {
    fn filter(&self, text: &str) -> anyhow::Result<String>;
}

/// Masks nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughFilter;

impl SensitiveWordFilter for PassthroughFilter {
    fn filter(&self, text: &str) -> anyhow::Result<String> {
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplianceHit {
    pub score: f64,
    pub matches: Vec<String>,
}

pub trait ChineseComplianceDetector: Send + Sync {
    fn detect(&self, text: &str) -> anyhow::Result<ComplianceHit>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: usize,
    pub score: f64,
}

/// A throwaway full-text index over pre-tokenized documents.
pub trait SearchIndex {
    fn add_doc(&mut self, id: usize, tokens: &[String]) -> anyhow::Result<()>;
    fn search(&self, query: &[String]) -> anyhow::Result<Vec<SearchHit>>;
}

pub trait SearchIndexFactory: Send + Sync {
    fn create(&self) -> anyhow::Result<Box<dyn SearchIndex>>;
}

pub const BM25_K1: f64 = 1.5;
pub const BM25_B: f64 = 0.75;

/// In-memory Okapi BM25 (k1 = 1.5, b = 0.75, non-negative idf).
#[derive(Debug, Default, Clone)]
pub struct Bm25Index {
    docs: Vec<(usize, Vec<String>)>,
}

impl SearchIndex for Bm25Index {
    fn add_doc(&mut self, id: usize, tokens: &[String]) -> anyhow::Result<()> {
        self.docs.push((id, tokens.to_vec()));
        Ok(())
    }

    fn search(&self, query: &[String]) -> anyhow::Result<Vec<SearchHit>> {
        let n = self.docs.len() as f64;
        if self.docs.is_empty() || query.is_empty() {
            return Ok(Vec::new());
        }
        let avgdl = (self.docs.iter().map(|(_, d)| d.len()).sum::<usize>() as f64 / n).max(1e-9);

        let mut terms: Vec<&str> = query.iter().map(String::as_str).collect();
        terms.sort_unstable();
        terms.dedup();

        let mut df: HashMap<&str, usize> = HashMap::new();
        for (_, doc) in &self.docs {
            for &t in &terms {
                if doc.iter().any(|d| d == t) {
                    *df.entry(t).or_default() += 1;
                }
            }
        }

        let mut hits = Vec::new();
        for (id, doc) in &self.docs {
            let dl = doc.len() as f64;
            let mut score = 0.0;
            for &t in &terms {
                let tf = doc.iter().filter(|d| *d == t).count() as f64;
                if tf == 0.0 {
                    continue;
                }
                let dft = df.get(t).copied().unwrap_or(0) as f64;
                let idf = ((n - dft + 0.5) / (dft + 0.5) + 1.0).ln();
                score += idf * tf * (BM25_K1 + 1.0)
                    / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * dl / avgdl));
            }
            if score > 0.0 {
                hits.push(SearchHit { id: *id, score });
            }
        }
        Ok(hits)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Bm25IndexFactory;

impl SearchIndexFactory for Bm25IndexFactory {
    fn create(&self) -> anyhow::Result<Box<dyn SearchIndex>> {
        Ok(Box::new(Bm25Index::default()))
    }
}

/// The full set of collaborators an analyzer calls, neutral by default.
#[derive(Clone)]
pub struct Collaborators {
    pub language: Arc<dyn LanguageDetector>,
    pub english: Arc<dyn EnglishTokenizer>,
    pub chinese: Arc<dyn ChineseSegmenter>,
    pub sentiment: Arc<dyn SentimentAnalyzer>,
    pub profanity: Arc<dyn ProfanityFilter>,
    pub sensitive: Arc<dyn SensitiveWordFilter>,
    /// When unset, Chinese compliance bridges to `sensitive`.
    pub zh_compliance: Option<Arc<dyn ChineseComplianceDetector>>,
    pub search: Arc<dyn SearchIndexFactory>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            language: Arc::new(UndeterminedDetector),
            english: Arc::new(RegexTokenizer),
            chinese: Arc::new(CharSegmenter),
            sentiment: Arc::new(NeutralSentiment),
            profanity: Arc::new(NoProfanity),
            sensitive: Arc::new(PassthroughFilter),
            zh_compliance: None,
            search: Arc::new(Bm25IndexFactory),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("zh_compliance", &self.zh_compliance.is_some())
            .finish_non_exhaustive()
    }
}
