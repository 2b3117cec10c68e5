//! Result types: the reply verdict, reason codes and compliance policy.
//!
//! Wire shape is camelCase (`isWorthReplying`, `probability`, ...). Reason codes
//! serialize as SCREAMING_SNAKE_CASE strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analyze::debug::DebugBreakdown;
use crate::analyze::features::AnalysisFeatures;

/// Machine-readable reason, appended in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    EmptyOrInvalidInput,
    Mentioned,
    FollowupAfterBot,
    QuestionDetected,
    CtaDetected,
    Urgent,
    Acknowledgment,
    LowSemanticValue,
    HighFatigue,
    SessionSaturated,
    AmbiguityShrink,
    HardRepeatShrink,
    ComplianceFlag,
    ComplianceBlock,
    ReplyThresholdMet,
    BelowReplyThreshold,
    LinkFallback,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::EmptyOrInvalidInput => "EMPTY_OR_INVALID_INPUT",
            ReasonCode::Mentioned => "MENTIONED",
            ReasonCode::FollowupAfterBot => "FOLLOWUP_AFTER_BOT",
            ReasonCode::QuestionDetected => "QUESTION_DETECTED",
            ReasonCode::CtaDetected => "CTA_DETECTED",
            ReasonCode::Urgent => "URGENT",
            ReasonCode::Acknowledgment => "ACKNOWLEDGMENT",
            ReasonCode::LowSemanticValue => "LOW_SEMANTIC_VALUE",
            ReasonCode::HighFatigue => "HIGH_FATIGUE",
            ReasonCode::SessionSaturated => "SESSION_SATURATED",
            ReasonCode::AmbiguityShrink => "AMBIGUITY_SHRINK",
            ReasonCode::HardRepeatShrink => "HARD_REPEAT_SHRINK",
            ReasonCode::ComplianceFlag => "COMPLIANCE_FLAG",
            ReasonCode::ComplianceBlock => "COMPLIANCE_BLOCK",
            ReasonCode::ReplyThresholdMet => "REPLY_THRESHOLD_MET",
            ReasonCode::BelowReplyThreshold => "BELOW_REPLY_THRESHOLD",
            ReasonCode::LinkFallback => "LINK_FALLBACK",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compliance verdict. `None` means the checker did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    #[default]
    None,
    Allow,
    Flag,
    Block,
}

impl PolicyAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyAction::None => "none",
            PolicyAction::Allow => "allow",
            PolicyAction::Flag => "flag",
            PolicyAction::Block => "block",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDetail {
    pub kind: String,
    pub score: f64,
    #[serde(default)]
    pub matches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub action: PolicyAction,
    #[serde(default)]
    pub details: Vec<PolicyDetail>,
}

/// Outcome of one `Analyzer::analyze` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub original: String,
    pub is_worth_replying: bool,
    /// Calibrated probability in [0,1].
    pub probability: f64,
    /// `round(probability * 100)`.
    pub score: u8,
    pub confidence: f64,
    pub features: AnalysisFeatures,
    pub reasons: Vec<ReasonCode>,
    pub policy: Policy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugBreakdown>,
}

impl AnalysisResult {
    /// Result for empty or whitespace-only input.
    pub fn empty_input(original: &str) -> Self {
        Self {
            original: original.to_string(),
            is_worth_replying: false,
            probability: 0.0,
            score: 0,
            confidence: 0.0,
            features: AnalysisFeatures::default(),
            reasons: vec![ReasonCode::EmptyOrInvalidInput],
            policy: Policy::default(),
            debug: None,
        }
    }

    pub fn has_reason(&self, code: ReasonCode) -> bool {
        self.reasons.contains(&code)
    }
}

/// `round(p * 100)` for p in [0,1].
pub fn score_from_probability(p: f64) -> u8 {
    (p.clamp(0.0, 1.0) * 100.0).round() as u8
}
