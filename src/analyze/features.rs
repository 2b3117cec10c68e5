//! Flat per-call feature record. Every field is optional: a signal that could not be
//! computed (no history, collaborator unavailable) stays `None`.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisFeatures {
    // language & counts
    pub language: Option<String>,
    pub language_code: Option<String>,
    pub char_count: Option<usize>,
    pub token_count: Option<usize>,
    pub meaningful_token_count: Option<usize>,
    pub sentence_count: Option<usize>,
    pub emoji_count: Option<usize>,
    pub url_count: Option<usize>,
    pub mention_count: Option<usize>,
    pub has_link: Option<bool>,
    pub has_code_block: Option<bool>,
    pub has_question_mark: Option<bool>,

    // structure
    pub caps_ratio: Option<f64>,
    pub punctuation_intensity: Option<f64>,
    pub repeat_char_ratio: Option<f64>,
    pub unique_char_ratio: Option<f64>,
    pub digit_ratio: Option<f64>,
    pub entropy: Option<f64>,
    pub emoji_density: Option<f64>,
    pub length_score: Option<f64>,
    pub short_utterance: Option<f64>,
    pub mention_density: Option<f64>,
    pub semantic_score: Option<f64>,
    pub pos_content_ratio: Option<f64>,
    pub imperative_ratio: Option<f64>,

    // intent
    pub questionness: Option<f64>,
    pub cta: Option<f64>,
    pub urgency: Option<f64>,
    pub acknowledgment: Option<f64>,
    pub rule_score: Option<f64>,

    // history
    pub history_size: Option<usize>,
    pub lexical_similarity: Option<f64>,
    pub tfidf_similarity: Option<f64>,
    pub bm25_similarity: Option<f64>,
    pub jaccard_similarity: Option<f64>,
    pub overlap_similarity: Option<f64>,
    pub simhash_similarity: Option<f64>,
    pub minhash_similarity: Option<f64>,
    pub history_similarity: Option<f64>,

    // sentiment & compliance
    pub sentiment_positive: Option<f64>,
    pub sentiment_negative: Option<f64>,
    pub profanity_en: Option<f64>,
    pub sensitive_zh: Option<f64>,
    pub toxicity: Option<f64>,

    // behavior
    pub mentioned: Option<bool>,
    pub followup_after_bot: Option<bool>,
    pub sender_fatigue: Option<f64>,
    pub group_fatigue: Option<f64>,
    pub sender_reply_rate: Option<f64>,
    pub group_reply_rate: Option<f64>,
    pub session_valence: Option<f64>,
    pub session_saturation: Option<f64>,
}
