//! Linear-model weights, one named multiplier per scorer input plus the intercept.
//!
//! TOML shape (any subset):
//! ```toml
//! [weights]
//! bias = -1.6
//! questionness = 1.6
//! mentioned = 2.2
//! ```

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub bias: f64,
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

impl Default for Weights {
    fn default() -> Self {
        Self {
            bias: -1.6,
            questionness: 1.6,
            cta: 1.3,
            urgency: 0.5,
            acknowledgment: -1.1,
            semantic: 0.9,
            entropy: 0.3,
            length: 0.4,
            caps: 0.1,
            repeat_char: -0.6,
            unique_char: 0.2,
            digit: -0.1,
            short_utterance: -0.5,
            emoji_density: -0.4,
            link: 0.3,
            code_block: 0.4,
            mentioned: 2.2,
            followup: 0.6,
            sender_fatigue: -0.9,
            group_fatigue: -0.7,
            sender_reply_rate: -0.5,
            group_reply_rate: -0.4,
            session_positive: 0.3,
            session_negative: -0.3,
            session_saturation: -0.5,
            history_similarity: -1.2,
            lexical_similarity: -0.3,
            bm25_similarity: -0.2,
            sentiment_positive: 0.1,
            sentiment_negative: 0.4,
            toxicity: -1.5,
            imperative: 0.3,
        }
    }
}

impl Weights {
    /// Every multiplier and the intercept at zero; the model then outputs p = 0.5.
    pub fn zero() -> Self {
        Self {
            bias: 0.0,
            questionness: 0.0,
            cta: 0.0,
            urgency: 0.0,
            acknowledgment: 0.0,
            semantic: 0.0,
            entropy: 0.0,
            length: 0.0,
            caps: 0.0,
            repeat_char: 0.0,
            unique_char: 0.0,
            digit: 0.0,
            short_utterance: 0.0,
            emoji_density: 0.0,
            link: 0.0,
            code_block: 0.0,
            mentioned: 0.0,
            followup: 0.0,
            sender_fatigue: 0.0,
            group_fatigue: 0.0,
            sender_reply_rate: 0.0,
            group_reply_rate: 0.0,
            session_positive: 0.0,
            session_negative: 0.0,
            session_saturation: 0.0,
            history_similarity: 0.0,
            lexical_similarity: 0.0,
            bm25_similarity: 0.0,
            sentiment_positive: 0.0,
            sentiment_negative: 0.0,
            toxicity: 0.0,
            imperative: 0.0,
        }
    }
}
