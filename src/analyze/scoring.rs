//! Linear scorer: `z = bias + Σ weight_i * clamp01(input_i)`.
//!
//! Polarity lives in the weights (fatigue, repeats and toxicity carry negative
//! defaults), so every input here is a plain magnitude in [0,1].

use serde::Serialize;

use super::signals::clamp01;
use super::Weights;

/// Scorer inputs. Values outside [0,1] are clamped before multiplication.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScoreInputs {
    pub questionness: f64,
    pub cta: f64,
    pub urgency: f64,
    pub acknowledgment: f64,
    pub semantic: f64,
    pub entropy: f64,
    pub length: f64,
    pub caps: f64,
    pub repeat_char: f64,
    pub unique_char: f64,
    pub digit: f64,
    pub short_utterance: f64,
    pub emoji_density: f64,
    pub link: f64,
    pub code_block: f64,
    pub mentioned: f64,
    pub followup: f64,
    pub sender_fatigue: f64,
    pub group_fatigue: f64,
    pub sender_reply_rate: f64,
    pub group_reply_rate: f64,
    pub session_positive: f64,
    pub session_negative: f64,
    pub session_saturation: f64,
    pub history_similarity: f64,
    pub lexical_similarity: f64,
    pub bm25_similarity: f64,
    pub sentiment_positive: f64,
    pub sentiment_negative: f64,
    pub toxicity: f64,
    pub imperative: f64,
}

/// One term of the weighted sum, for the debug breakdown.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Contribution {
    pub name: &'static str,
    pub weight: f64,
    pub value: f64,
    pub product: f64,
}

/// Named `(name, weight, clamped input)` triples, intercept excluded.
pub fn weighted_terms(inputs: &ScoreInputs, w: &Weights) -> [(&'static str, f64, f64); 31] {
    let i = inputs;
    [
        ("questionness", w.questionness, clamp01(i.questionness)),
        ("cta", w.cta, clamp01(i.cta)),
        ("urgency", w.urgency, clamp01(i.urgency)),
        ("acknowledgment", w.acknowledgment, clamp01(i.acknowledgment)),
        ("semantic", w.semantic, clamp01(i.semantic)),
        ("entropy", w.entropy, clamp01(i.entropy)),
        ("length", w.length, clamp01(i.length)),
        ("caps", w.caps, clamp01(i.caps)),
        ("repeat_char", w.repeat_char, clamp01(i.repeat_char)),
        ("unique_char", w.unique_char, clamp01(i.unique_char)),
        ("digit", w.digit, clamp01(i.digit)),
        ("short_utterance", w.short_utterance, clamp01(i.short_utterance)),
        ("emoji_density", w.emoji_density, clamp01(i.emoji_density)),
        ("link", w.link, clamp01(i.link)),
        ("code_block", w.code_block, clamp01(i.code_block)),
        ("mentioned", w.mentioned, clamp01(i.mentioned)),
        ("followup", w.followup, clamp01(i.followup)),
        ("sender_fatigue", w.sender_fatigue, clamp01(i.sender_fatigue)),
        ("group_fatigue", w.group_fatigue, clamp01(i.group_fatigue)),
        ("sender_reply_rate", w.sender_reply_rate, clamp01(i.sender_reply_rate)),
        ("group_reply_rate", w.group_reply_rate, clamp01(i.group_reply_rate)),
        ("session_positive", w.session_positive, clamp01(i.session_positive)),
        ("session_negative", w.session_negative, clamp01(i.session_negative)),
        ("session_saturation", w.session_saturation, clamp01(i.session_saturation)),
        ("history_similarity", w.history_similarity, clamp01(i.history_similarity)),
        ("lexical_similarity", w.lexical_similarity, clamp01(i.lexical_similarity)),
        ("bm25_similarity", w.bm25_similarity, clamp01(i.bm25_similarity)),
        ("sentiment_positive", w.sentiment_positive, clamp01(i.sentiment_positive)),
        ("sentiment_negative", w.sentiment_negative, clamp01(i.sentiment_negative)),
        ("toxicity", w.toxicity, clamp01(i.toxicity)),
        ("imperative", w.imperative, clamp01(i.imperative)),
    ]
}

/// Raw logit before calibration. Non-finite weights contribute nothing.
pub fn logit(inputs: &ScoreInputs, w: &Weights) -> f64 {
    let bias = if w.bias.is_finite() { w.bias } else { 0.0 };
    weighted_terms(inputs, w)
        .iter()
        .filter(|(_, weight, _)| weight.is_finite())
        .fold(bias, |acc, (_, weight, value)| acc + weight * value)
}

pub fn contributions(inputs: &ScoreInputs, w: &Weights) -> Vec<Contribution> {
    weighted_terms(inputs, w)
        .iter()
        .map(|&(name, weight, value)| Contribution {
            name,
            weight,
            value,
            product: weight * value,
        })
        .collect()
}
