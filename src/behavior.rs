// src/behavior.rs
//! Behavioral signals computed upstream (fatigue, reply counts, mentions, attention
//! session) and the normalized values the scorer reads from them.

use serde::{Deserialize, Serialize};

use crate::analyze::signals::clamp01;

/// Replies by the same sender in the window that count as saturation.
pub const SENDER_REPLY_SATURATION: f64 = 10.0;
/// Replies in the group in the window that count as saturation.
pub const GROUP_REPLY_SATURATION: f64 = 60.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttentionSession {
    pub considered_count: u32,
    pub replied_count: u32,
    /// Mean gate probability over the session.
    pub avg_gate_prob: f64,
    pub reply_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BehavioralSignals {
    pub sender_fatigue: Option<f64>,
    pub group_fatigue: Option<f64>,
    pub sender_reply_count_window: Option<u32>,
    pub group_reply_count_window: Option<u32>,
    pub is_followup_after_bot_reply: bool,
    pub mentioned_by_at: bool,
    pub mentioned_by_name: bool,
    pub attention_session: Option<AttentionSession>,
}

impl BehavioralSignals {
    pub fn mentioned(&self) -> bool {
        self.mentioned_by_at || self.mentioned_by_name
    }

    pub fn sender_fatigue(&self) -> f64 {
        self.sender_fatigue.map(clamp01).unwrap_or(0.0)
    }

    pub fn group_fatigue(&self) -> f64 {
        self.group_fatigue.map(clamp01).unwrap_or(0.0)
    }

    pub fn sender_reply_rate(&self) -> f64 {
        self.sender_reply_count_window
            .map(|n| clamp01(f64::from(n) / SENDER_REPLY_SATURATION))
            .unwrap_or(0.0)
    }

    pub fn group_reply_rate(&self) -> f64 {
        self.group_reply_count_window
            .map(|n| clamp01(f64::from(n) / GROUP_REPLY_SATURATION))
            .unwrap_or(0.0)
    }

    /// `(avg_gate_prob − 0.5)·2` in [-1,1].
    pub fn session_valence(&self) -> Option<f64> {
        self.attention_session
            .filter(|s| s.avg_gate_prob.is_finite())
            .map(|s| ((s.avg_gate_prob - 0.5) * 2.0).clamp(-1.0, 1.0))
    }

    pub fn session_saturation(&self) -> Option<f64> {
        self.attention_session
            .filter(|s| s.reply_ratio.is_finite())
            .map(|s| clamp01(s.reply_ratio))
    }
}
