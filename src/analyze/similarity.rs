//! History similarity: seven channels, each reduced to its maximum over the history
//! window, and their trimmed-mean composite.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use super::hashing::{simhash32, simhash_similarity, MinHasher};
use super::signals::clamp01;
use crate::providers::{Bm25Index, SearchIndex, SearchIndexFactory};

/// Saturation constant for `raw / (raw + BM25_NORM)`.
pub const BM25_NORM: f64 = 8.0;

/// One message prepared for comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityDoc {
    /// Lower-cased clean text.
    pub text: String,
    /// Meaningful tokens.
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SimilarityChannels {
    pub lexical: Option<f64>,
    pub tfidf: Option<f64>,
    pub bm25: Option<f64>,
    pub jaccard: Option<f64>,
    pub overlap: Option<f64>,
    pub simhash: Option<f64>,
    pub minhash: Option<f64>,
}

impl SimilarityChannels {
    /// Reporting channels, in a fixed order.
    pub fn values(&self) -> Vec<f64> {
        [
            self.lexical,
            self.tfidf,
            self.bm25,
            self.jaccard,
            self.overlap,
            self.simhash,
            self.minhash,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn composite(&self) -> Option<f64> {
        trimmed_mean(&self.values())
    }
}

/// More than two values: drop one min and one max, average the rest.
/// Two: plain mean. One: itself. None: `None`.
pub fn trimmed_mean(values: &[f64]) -> Option<f64> {
    match values.len() {
        0 => None,
        1 => Some(values[0]),
        2 => Some((values[0] + values[1]) / 2.0),
        n => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            Some(sorted[1..n - 1].iter().sum::<f64>() / (n - 2) as f64)
        }
    }
}

fn char_bigrams(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    match chars.len() {
        0 => Vec::new(),
        1 => vec![chars[0].to_string()],
        _ => chars.windows(2).map(|w| w.iter().collect()).collect(),
    }
}

fn max_of<I: Iterator<Item = f64>>(iter: I) -> Option<f64> {
    iter.fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .map(clamp01)
}

/// Best of bigram Dice, normalized Levenshtein and Jaro–Winkler.
pub fn lexical_similarity(a: &str, b: &str) -> f64 {
    strsim::sorensen_dice(a, b)
        .max(strsim::normalized_levenshtein(a, b))
        .max(strsim::jaro_winkler(a, b))
}

fn tfidf_vectors<'a>(docs: &'a [Vec<String>]) -> Vec<HashMap<&'a str, f64>> {
    let n = docs.len() as f64;
    let mut df: HashMap<&str, usize> = HashMap::new();
    for doc in docs {
        let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
        for t in unique {
            *df.entry(t).or_default() += 1;
        }
    }
    docs.iter()
        .map(|doc| {
            let mut tf: HashMap<&str, usize> = HashMap::new();
            for t in doc {
                *tf.entry(t.as_str()).or_default() += 1;
            }
            tf.into_iter()
                .map(|(t, f)| {
                    let idf = (1.0 + n / (1.0 + df[t] as f64)).ln();
                    (t, (1.0 + (f as f64).ln()) * idf)
                })
                .collect()
        })
        .collect()
}

fn cosine(a: &HashMap<&str, f64>, b: &HashMap<&str, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(t, x)| b.get(t).map(|y| x * y))
        .sum();
    let na = a.values().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.values().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

fn bm25_raw(
    factory: &dyn SearchIndexFactory,
    history: &[Vec<String>],
    query: &[String],
) -> Option<f64> {
    fn run(index: &mut dyn SearchIndex, history: &[Vec<String>], query: &[String]) -> anyhow::Result<f64> {
        for (id, doc) in history.iter().enumerate() {
            index.add_doc(id, doc)?;
        }
        Ok(index
            .search(query)?
            .iter()
            .map(|h| h.score)
            .filter(|s| s.is_finite())
            .fold(0.0, f64::max))
    }

    if history.is_empty() || query.is_empty() {
        return None;
    }
    let external = factory
        .create()
        .and_then(|mut index| run(index.as_mut(), history, query));
    match external {
        Ok(raw) => Some(raw),
        Err(e) => {
            debug!(error = %e, "search index failed, using built-in BM25");
            run(&mut Bm25Index::default(), history, query).ok()
        }
    }
}

/// Compare `current` against every history doc.
///
/// When `current` has fewer than `sparse_token_min` meaningful tokens, the token
/// channels switch to character bigrams of the clean text for all docs.
pub fn compare(
    current: &SimilarityDoc,
    history: &[SimilarityDoc],
    minhasher: &MinHasher,
    search: &dyn SearchIndexFactory,
    sparse_token_min: usize,
) -> SimilarityChannels {
    if history.is_empty() {
        return SimilarityChannels::default();
    }

    let sparse = current.tokens.len() < sparse_token_min;
    let token_set = |doc: &SimilarityDoc| -> Vec<String> {
        if sparse {
            char_bigrams(&doc.text)
        } else {
            doc.tokens.clone()
        }
    };
    let cur_tokens = token_set(current);
    let hist_tokens: Vec<Vec<String>> = history.iter().map(token_set).collect();

    let lexical = if current.text.is_empty() {
        None
    } else {
        max_of(
            history
                .iter()
                .filter(|h| !h.text.is_empty())
                .map(|h| lexical_similarity(&current.text, &h.text)),
        )
    };

    let tfidf = if cur_tokens.is_empty() {
        None
    } else {
        let mut docs = Vec::with_capacity(hist_tokens.len() + 1);
        docs.push(cur_tokens.clone());
        docs.extend(hist_tokens.iter().cloned());
        let vectors = tfidf_vectors(&docs);
        max_of(vectors[1..].iter().map(|v| cosine(&vectors[0], v)))
    };

    let cur_set: HashSet<&str> = cur_tokens.iter().map(String::as_str).collect();
    let mut jaccard = None;
    let mut overlap = None;
    if !cur_set.is_empty() {
        let pairs: Vec<(usize, usize, usize)> = hist_tokens
            .iter()
            .map(|h| h.iter().map(String::as_str).collect::<HashSet<&str>>())
            .filter(|h| !h.is_empty())
            .map(|h| {
                let inter = cur_set.intersection(&h).count();
                let union = cur_set.union(&h).count();
                (inter, union, cur_set.len().min(h.len()))
            })
            .collect();
        jaccard = max_of(pairs.iter().map(|&(i, u, _)| i as f64 / u as f64));
        overlap = max_of(pairs.iter().map(|&(i, _, m)| i as f64 / m as f64));
    }

    let bm25 = bm25_raw(search, &hist_tokens, &cur_tokens).map(|raw| clamp01(raw / (raw + BM25_NORM)));

    let simhash = simhash32(&cur_tokens).and_then(|cur| {
        max_of(
            hist_tokens
                .iter()
                .filter_map(|h| simhash32(h))
                .map(|h| simhash_similarity(cur, h)),
        )
    });

    let minhash = minhasher.signature(&current.text).and_then(|cur| {
        max_of(
            history
                .iter()
                .filter_map(|h| minhasher.signature(&h.text))
                .map(|h| MinHasher::similarity(&cur, &h)),
        )
    });

    SimilarityChannels {
        lexical,
        tfidf,
        bm25,
        jaccard,
        overlap,
        simhash,
        minhash,
    }
}
