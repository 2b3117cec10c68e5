//! Intent scorers: question, call-to-action, urgency, acknowledgment.
//!
//! Each one is a plain function of an [`IntentContext`] and can be replaced through
//! [`IntentOverrides`]. Overrides returning values outside [0,1] are clamped.

use std::fmt;
use std::sync::Arc;

use super::language::Language;
use super::signals::clamp01;

/// Inputs shared by all intent scorers for one message.
#[derive(Debug, Clone, Copy)]
pub struct IntentContext<'a> {
    /// Text with links, emoji and mention markers removed; punctuation kept.
    pub text: &'a str,
    pub language: Language,
    pub sentences: &'a [String],
    pub token_count: usize,
    pub semantic_score: f64,
    pub punctuation_intensity: f64,
    pub caps_ratio: f64,
    pub mention_density: f64,
    pub short_utterance: f64,
    /// Imperative-sentence share; English with POS tags only.
    pub imperative_ratio: Option<f64>,
    pub has_link: bool,
    pub has_question_mark: bool,
    /// Noisy-OR score of the configured CTA rules.
    pub rule_score: f64,
    pub question_marks: &'a str,
    pub question_bonus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    Question,
    CallToAction,
    Urgency,
    Acknowledgment,
}

pub type IntentFn = Arc<dyn Fn(&IntentContext<'_>) -> f64 + Send + Sync>;

/// `bonus·[any question mark] + frac·(1 − bonus)`, frac = sentences ending in one.
pub fn question_score(ctx: &IntentContext<'_>) -> f64 {
    let bonus = clamp01(ctx.question_bonus);
    let flat = if ctx.has_question_mark { bonus } else { 0.0 };
    let frac = if ctx.sentences.is_empty() {
        0.0
    } else {
        let asking = ctx
            .sentences
            .iter()
            .filter(|s| {
                s.trim_end()
                    .chars()
                    .last()
                    .is_some_and(|c| ctx.question_marks.contains(c))
            })
            .count();
        asking as f64 / ctx.sentences.len() as f64
    };
    clamp01(flat + frac * (1.0 - bonus))
}

pub fn urgency_score(ctx: &IntentContext<'_>) -> f64 {
    clamp01(0.6 * ctx.punctuation_intensity + 0.4 * ctx.caps_ratio)
}

/// Structural base blended with the configured rules: `0.9·max + 0.1·min`.
pub fn cta_score(ctx: &IntentContext<'_>) -> f64 {
    let mut base = 0.65 * clamp01(ctx.mention_density) + 0.35 * urgency_score(ctx);
    if ctx.language == Language::En {
        if let Some(imperative) = ctx.imperative_ratio {
            base = base.max(clamp01(imperative));
        }
    }
    let base = clamp01(base);
    let rule = clamp01(ctx.rule_score);
    clamp01(0.9 * base.max(rule) + 0.1 * base.min(rule))
}

pub fn acknowledgment_score(ctx: &IntentContext<'_>) -> f64 {
    clamp01(0.7 * ctx.short_utterance + 0.3 * (1.0 - clamp01(ctx.semantic_score)))
}

/// Caller-supplied replacements for the default scorers.
#[derive(Clone, Default)]
pub struct IntentOverrides {
    question: Option<IntentFn>,
    cta: Option<IntentFn>,
    urgency: Option<IntentFn>,
    acknowledgment: Option<IntentFn>,
}

impl fmt::Debug for IntentOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentOverrides")
            .field("question", &self.question.is_some())
            .field("cta", &self.cta.is_some())
            .field("urgency", &self.urgency.is_some())
            .field("acknowledgment", &self.acknowledgment.is_some())
            .finish()
    }
}

impl IntentOverrides {
    pub fn set(&mut self, kind: IntentKind, f: IntentFn) {
        let slot = match kind {
            IntentKind::Question => &mut self.question,
            IntentKind::CallToAction => &mut self.cta,
            IntentKind::Urgency => &mut self.urgency,
            IntentKind::Acknowledgment => &mut self.acknowledgment,
        };
        *slot = Some(f);
    }

    pub fn score(&self, kind: IntentKind, ctx: &IntentContext<'_>) -> f64 {
        let custom = match kind {
            IntentKind::Question => &self.question,
            IntentKind::CallToAction => &self.cta,
            IntentKind::Urgency => &self.urgency,
            IntentKind::Acknowledgment => &self.acknowledgment,
        };
        if let Some(f) = custom {
            return clamp01(f(ctx));
        }
        match kind {
            IntentKind::Question => question_score(ctx),
            IntentKind::CallToAction => cta_score(ctx),
            IntentKind::Urgency => urgency_score(ctx),
            IntentKind::Acknowledgment => acknowledgment_score(ctx),
        }
    }
}
