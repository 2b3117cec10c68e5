//! Reply-worthiness analysis pipeline.
//!
//! `Analyzer::analyze` runs, per message:
//! preprocess → language/tokens → structural signals → intents → history similarity
//! → sentiment/compliance → linear score → calibration → decision.
//!
//! The analyzer is immutable after construction and performs no I/O; every
//! collaborator failure degrades one feature to neutral.

pub mod calibration;
pub mod compliance;
pub mod debug;
pub mod features;
pub mod hashing;
pub mod intent;
pub mod language;
pub mod preprocess;
pub mod rules;
pub mod scoring;
pub mod signals;
pub mod similarity;
pub mod weights;

use std::sync::Arc;

pub use intent::{IntentContext, IntentFn, IntentKind, IntentOverrides};
pub use rules::{CompiledRuleEngine, PatternRule, RuleDef, RuleMatch, RulePredicate};
pub use weights::Weights;

use self::calibration::Calibrator;
use self::debug::DebugBreakdown;
use self::features::AnalysisFeatures;
use self::hashing::MinHasher;
use self::language::{Language, Stopwords};
use self::preprocess::preprocess;
use self::scoring::ScoreInputs;
use self::signals::{clamp01, StructuralSignals};
use self::similarity::SimilarityDoc;
use crate::behavior::BehavioralSignals;
use crate::config::AnalyzerConfig;
use crate::decision::{score_from_probability, AnalysisResult, PolicyAction, ReasonCode};
use crate::providers::{
    ChineseComplianceDetector, ChineseSegmenter, Collaborators, EnglishTokenizer, LanguageDetector,
    ProfanityFilter, SearchIndexFactory, SensitiveWordFilter, SentimentAnalyzer,
};

/// Clean-text characters at which the length signal saturates.
const LENGTH_SATURATION: f64 = 80.0;

fn ratio(n: usize, d: usize) -> f64 {
    if d == 0 {
        0.0
    } else {
        clamp01(n as f64 / d as f64)
    }
}

/// Attaches the non-data parts of an analyzer: extra rules, intent overrides and
/// collaborators.
pub struct AnalyzerBuilder {
    config: AnalyzerConfig,
    extra_rules: Vec<RuleDef>,
    intents: IntentOverrides,
    collab: Collaborators,
    dev_log: Option<bool>,
}

impl AnalyzerBuilder {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            extra_rules: Vec::new(),
            intents: IntentOverrides::default(),
            collab: Collaborators::default(),
            dev_log: None,
        }
    }

    /// Add a CTA rule on top of `resources.cta_rules`.
    pub fn rule(mut self, def: RuleDef) -> Self {
        self.extra_rules.push(def);
        self
    }

    pub fn predicate_rule<F>(self, id: &str, lang: &str, weight: f64, test: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.rule(RuleDef::Predicate {
            id: id.to_string(),
            lang: lang.to_string(),
            weight,
            test: Arc::new(test),
        })
    }

    /// Replace one of the default intent scorers.
    pub fn intent<F>(mut self, kind: IntentKind, f: F) -> Self
    where
        F: Fn(&IntentContext<'_>) -> f64 + Send + Sync + 'static,
    {
        self.intents.set(kind, Arc::new(f));
        self
    }

    pub fn collaborators(mut self, collab: Collaborators) -> Self {
        self.collab = collab;
        self
    }

    pub fn language_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.collab.language = detector;
        self
    }

    pub fn english_tokenizer(mut self, tokenizer: Arc<dyn EnglishTokenizer>) -> Self {
        self.collab.english = tokenizer;
        self
    }

    pub fn chinese_segmenter(mut self, segmenter: Arc<dyn ChineseSegmenter>) -> Self {
        self.collab.chinese = segmenter;
        self
    }

    pub fn sentiment(mut self, sentiment: Arc<dyn SentimentAnalyzer>) -> Self {
        self.collab.sentiment = sentiment;
        self
    }

    pub fn profanity_filter(mut self, filter: Arc<dyn ProfanityFilter>) -> Self {
        self.collab.profanity = filter;
        self
    }

    pub fn sensitive_word_filter(mut self, filter: Arc<dyn SensitiveWordFilter>) -> Self {
        self.collab.sensitive = filter;
        self
    }

    pub fn chinese_compliance(mut self, detector: Arc<dyn ChineseComplianceDetector>) -> Self {
        self.collab.zh_compliance = Some(detector);
        self
    }

    pub fn search_index(mut self, factory: Arc<dyn SearchIndexFactory>) -> Self {
        self.collab.search = factory;
        self
    }

    /// Force anonymized decision logging on or off; by default it follows the env.
    pub fn dev_log(mut self, on: bool) -> Self {
        self.dev_log = Some(on);
        self
    }

    pub fn build(self) -> Analyzer {
        let defs = self
            .config
            .resources
            .cta_rules
            .iter()
            .cloned()
            .map(RuleDef::Pattern)
            .chain(self.extra_rules.iter().cloned());
        let rules = CompiledRuleEngine::compile(defs);
        Analyzer {
            stopwords: Stopwords::from_config(&self.config.stopwords),
            calibrator: Calibrator::from_config(&self.config.calibration),
            minhasher: MinHasher::default(),
            rules,
            dev_log: self.dev_log.unwrap_or_else(debug::dev_logging_enabled),
            extra_rules: self.extra_rules,
            intents: self.intents,
            collab: self.collab,
            config: self.config,
        }
    }
}

/// Decides whether a chat message is worth replying to.
pub struct Analyzer {
    config: AnalyzerConfig,
    rules: CompiledRuleEngine,
    extra_rules: Vec<RuleDef>,
    intents: IntentOverrides,
    collab: Collaborators,
    stopwords: Stopwords,
    calibrator: Calibrator,
    minhasher: MinHasher,
    dev_log: bool,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .field("rules", &self.rules)
            .field("intents", &self.intents)
            .finish_non_exhaustive()
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        AnalyzerBuilder::new(config).build()
    }

    pub fn builder(config: AnalyzerConfig) -> AnalyzerBuilder {
        AnalyzerBuilder::new(config)
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn rules(&self) -> &CompiledRuleEngine {
        &self.rules
    }

    /// A new analyzer with `config` and the same rules, intents and collaborators.
    pub fn reconfigure(&self, config: AnalyzerConfig) -> Self {
        let mut builder = AnalyzerBuilder::new(config).collaborators(self.collab.clone());
        builder.extra_rules = self.extra_rules.clone();
        builder.intents = self.intents.clone();
        builder.dev_log = Some(self.dev_log);
        builder.build()
    }

    /// Score one message against its recent history. Never fails.
    pub fn analyze<S: AsRef<str>>(
        &self,
        current: &str,
        history: &[S],
        meta: &BehavioralSignals,
    ) -> AnalysisResult {
        self.evaluate(current, history, meta, self.config.debug)
    }

    /// Like [`Analyzer::analyze`] but always attaches the debug breakdown.
    pub fn explain<S: AsRef<str>>(
        &self,
        current: &str,
        history: &[S],
        meta: &BehavioralSignals,
    ) -> AnalysisResult {
        self.evaluate(current, history, meta, true)
    }

    fn similarity_doc(&self, text: &str) -> Option<SimilarityDoc> {
        let pre = preprocess(text);
        if pre.clean_text.is_empty() {
            return None;
        }
        let detected = language::detect(
            self.collab.language.as_ref(),
            &pre.clean_text,
            self.config.language.min_length,
        );
        let tok = language::tokenize(detected.language, &pre.clean_text, &self.collab, &self.stopwords);
        Some(SimilarityDoc {
            text: pre.normalized(),
            tokens: tok.meaningful,
        })
    }

    fn sentiment(&self, language: Language, text: &str) -> (Option<f64>, Option<f64>) {
        if language != Language::Zh {
            return (None, None);
        }
        match self.collab.sentiment.analyze(text) {
            Ok(report) => {
                let valence = if report.comparative.is_finite() {
                    report.comparative.tanh()
                } else {
                    0.0
                };
                (Some(valence.max(0.0)), Some((-valence).max(0.0)))
            }
            Err(e) => {
                tracing::debug!(error = %e, "sentiment analyzer failed");
                (None, None)
            }
        }
    }

    fn evaluate<S: AsRef<str>>(
        &self,
        current: &str,
        history: &[S],
        meta: &BehavioralSignals,
        with_debug: bool,
    ) -> AnalysisResult {
        let pre = preprocess(current);
        if pre.original.is_empty() {
            return AnalysisResult::empty_input(current);
        }
        let cfg = &self.config;
        let th = &cfg.thresholds;

        // language & tokens
        let detected = language::detect(
            self.collab.language.as_ref(),
            &pre.clean_text,
            cfg.language.min_length,
        );
        let lang = detected.language;
        let tok = language::tokenize(lang, &pre.clean_text, &self.collab, &self.stopwords);
        let sentences = language::sentences(lang, &pre.intent_text, &self.collab);
        let imperative = if lang == Language::En {
            language::imperative_ratio(&sentences, self.collab.english.as_ref())
        } else {
            None
        };

        // structure
        let structural = StructuralSignals::from_text(&pre.original);
        let entropy = signals::entropy(&pre.clean_text);
        let has_question_mark = pre
            .intent_text
            .chars()
            .any(|c| cfg.punct.question_marks.contains(c));
        let short = signals::short_utterance_score(tok.tokens.len(), has_question_mark, pre.has_link);
        let mention_density = ratio(pre.mention_count, tok.tokens.len().max(pre.mention_count));
        let clean_chars = pre.clean_text.chars().filter(|c| !c.is_whitespace()).count();
        let emoji_density = ratio(pre.emoji_count, pre.emoji_count + clean_chars);
        let length_score = clamp01(clean_chars as f64 / LENGTH_SATURATION);

        // intents
        let rule_score = self.rules.score(&pre.intent_text, lang.tag());
        let ctx = IntentContext {
            text: &pre.intent_text,
            language: lang,
            sentences: &sentences,
            token_count: tok.tokens.len(),
            semantic_score: tok.semantic_score,
            punctuation_intensity: structural.punctuation_intensity,
            caps_ratio: structural.caps_ratio,
            mention_density,
            short_utterance: short,
            imperative_ratio: imperative,
            has_link: pre.has_link,
            has_question_mark,
            rule_score,
            question_marks: &cfg.punct.question_marks,
            question_bonus: cfg.punct.question_bonus,
        };
        let questionness = self.intents.score(IntentKind::Question, &ctx);
        let cta = self.intents.score(IntentKind::CallToAction, &ctx);
        let urgency = self.intents.score(IntentKind::Urgency, &ctx);
        let acknowledgment = self.intents.score(IntentKind::Acknowledgment, &ctx);

        // history
        let start = history.len().saturating_sub(cfg.history_window);
        let docs: Vec<SimilarityDoc> = history[start..]
            .iter()
            .filter_map(|h| self.similarity_doc(h.as_ref()))
            .collect();
        let current_doc = SimilarityDoc {
            text: pre.normalized(),
            tokens: tok.meaningful.clone(),
        };
        let channels = similarity::compare(
            &current_doc,
            &docs,
            &self.minhasher,
            self.collab.search.as_ref(),
            th.sparse_token_min,
        );
        let composite = channels.composite();

        // sentiment & compliance
        let (sentiment_positive, sentiment_negative) = self.sentiment(lang, &pre.clean_text);
        let compliance = compliance::check(&cfg.compliance, &pre.clean_text, &self.collab);

        // behavior
        let session_valence = meta.session_valence();
        let session_saturation = meta.session_saturation();

        let inputs = ScoreInputs {
            questionness,
            cta,
            urgency,
            acknowledgment,
            semantic: tok.semantic_score,
            entropy,
            length: length_score,
            caps: structural.caps_ratio,
            repeat_char: structural.repeat_char_ratio,
            unique_char: structural.unique_char_ratio,
            digit: structural.digit_ratio,
            short_utterance: short,
            emoji_density,
            link: if pre.has_link { 1.0 } else { 0.0 },
            code_block: if pre.has_code_block { 1.0 } else { 0.0 },
            mentioned: if meta.mentioned() { 1.0 } else { 0.0 },
            followup: if meta.is_followup_after_bot_reply { 1.0 } else { 0.0 },
            sender_fatigue: meta.sender_fatigue(),
            group_fatigue: meta.group_fatigue(),
            sender_reply_rate: meta.sender_reply_rate(),
            group_reply_rate: meta.group_reply_rate(),
            session_positive: session_valence.unwrap_or(0.0).max(0.0),
            session_negative: (-session_valence.unwrap_or(0.0)).max(0.0),
            session_saturation: session_saturation.unwrap_or(0.0),
            history_similarity: composite.unwrap_or(0.0),
            lexical_similarity: channels.lexical.unwrap_or(0.0),
            bm25_similarity: channels.bm25.unwrap_or(0.0),
            sentiment_positive: sentiment_positive.unwrap_or(0.0),
            sentiment_negative: sentiment_negative.unwrap_or(0.0),
            toxicity: compliance.toxicity,
            imperative: imperative.unwrap_or(0.0),
        };

        let z = scoring::logit(&inputs, &cfg.weights);
        let mut trace = self.calibrator.run(z, &channels.values());

        // reasons
        let mut reasons = Vec::new();
        if meta.mentioned() {
            reasons.push(ReasonCode::Mentioned);
        }
        if meta.is_followup_after_bot_reply {
            reasons.push(ReasonCode::FollowupAfterBot);
        }
        if questionness >= th.question_soft_min {
            reasons.push(ReasonCode::QuestionDetected);
        }
        if cta >= th.cta_soft_min {
            reasons.push(ReasonCode::CtaDetected);
        }
        if urgency >= th.urgent {
            reasons.push(ReasonCode::Urgent);
        }
        if acknowledgment >= th.acknowledgment {
            reasons.push(ReasonCode::Acknowledgment);
        }
        if tok.semantic_score < th.low_semantic {
            reasons.push(ReasonCode::LowSemanticValue);
        }
        if meta.sender_fatigue().max(meta.group_fatigue()) >= th.high_fatigue {
            reasons.push(ReasonCode::HighFatigue);
        }
        if session_saturation.is_some_and(|s| s >= th.session_saturated) {
            reasons.push(ReasonCode::SessionSaturated);
        }
        if (trace.shrunk - trace.isotonic).abs() > 1e-9 {
            reasons.push(ReasonCode::AmbiguityShrink);
        }

        let repeat_threshold = cfg.repeat_penalty.threshold.unwrap_or(th.hard_repeat);
        if let Some(sim) = composite {
            let exempt = pre.has_link
                || questionness >= th.question_soft_min
                || cta >= th.cta_soft_min;
            if sim >= repeat_threshold && !exempt {
                trace.apply_repeat_penalty(calibration::repeat_penalty_factor(
                    sim,
                    repeat_threshold,
                    cfg.repeat_penalty.max_penalty,
                    cfg.repeat_penalty.min_factor,
                ));
                reasons.push(ReasonCode::HardRepeatShrink);
            }
        }

        let blocked = compliance.policy.action == PolicyAction::Block;
        match compliance.policy.action {
            PolicyAction::Flag => reasons.push(ReasonCode::ComplianceFlag),
            PolicyAction::Block => reasons.push(ReasonCode::ComplianceBlock),
            PolicyAction::None | PolicyAction::Allow => {}
        }

        // decision
        let probability = clamp01(trace.probability);
        let reply_threshold = clamp01(th.reply);
        let mut worthy = probability >= reply_threshold;
        let link_fallback = cfg.link_fallback
            && !worthy
            && !blocked
            && pre.has_link
            && probability > th.link_fallback_min_prob
            && reasons.contains(&ReasonCode::LowSemanticValue)
            && !reasons.contains(&ReasonCode::HardRepeatShrink);
        if blocked {
            // COMPLIANCE_BLOCK already explains the verdict
            worthy = false;
        } else if link_fallback {
            worthy = true;
            reasons.retain(|r| *r != ReasonCode::LowSemanticValue);
            reasons.push(ReasonCode::LinkFallback);
        } else if worthy {
            reasons.push(ReasonCode::ReplyThresholdMet);
        } else {
            reasons.push(ReasonCode::BelowReplyThreshold);
        }

        let features = AnalysisFeatures {
            language: Some(lang.tag().to_string()),
            language_code: Some(detected.code.clone()),
            char_count: Some(pre.original.chars().count()),
            token_count: Some(tok.tokens.len()),
            meaningful_token_count: Some(tok.meaningful.len()),
            sentence_count: Some(sentences.len()),
            emoji_count: Some(pre.emoji_count),
            url_count: Some(pre.url_count),
            mention_count: Some(pre.mention_count),
            has_link: Some(pre.has_link),
            has_code_block: Some(pre.has_code_block),
            has_question_mark: Some(has_question_mark),
            caps_ratio: Some(structural.caps_ratio),
            punctuation_intensity: Some(structural.punctuation_intensity),
            repeat_char_ratio: Some(structural.repeat_char_ratio),
            unique_char_ratio: Some(structural.unique_char_ratio),
            digit_ratio: Some(structural.digit_ratio),
            entropy: Some(entropy),
            emoji_density: Some(emoji_density),
            length_score: Some(length_score),
            short_utterance: Some(short),
            mention_density: Some(mention_density),
            semantic_score: Some(tok.semantic_score),
            pos_content_ratio: tok.pos_content_ratio,
            imperative_ratio: imperative,
            questionness: Some(questionness),
            cta: Some(cta),
            urgency: Some(urgency),
            acknowledgment: Some(acknowledgment),
            rule_score: Some(rule_score),
            history_size: Some(docs.len()),
            lexical_similarity: channels.lexical,
            tfidf_similarity: channels.tfidf,
            bm25_similarity: channels.bm25,
            jaccard_similarity: channels.jaccard,
            overlap_similarity: channels.overlap,
            simhash_similarity: channels.simhash,
            minhash_similarity: channels.minhash,
            history_similarity: composite,
            sentiment_positive,
            sentiment_negative,
            profanity_en: cfg.compliance.enabled.then_some(compliance.english),
            sensitive_zh: cfg.compliance.enabled.then_some(compliance.chinese),
            toxicity: cfg.compliance.enabled.then_some(compliance.toxicity),
            mentioned: Some(meta.mentioned()),
            followup_after_bot: Some(meta.is_followup_after_bot_reply),
            sender_fatigue: meta.sender_fatigue.map(clamp01),
            group_fatigue: meta.group_fatigue.map(clamp01),
            sender_reply_rate: meta
                .sender_reply_count_window
                .map(|_| meta.sender_reply_rate()),
            group_reply_rate: meta
                .group_reply_count_window
                .map(|_| meta.group_reply_rate()),
            session_valence,
            session_saturation,
        };

        let breakdown = with_debug.then(|| DebugBreakdown {
            language: detected.code,
            bias: cfg.weights.bias,
            contributions: scoring::contributions(&inputs, &cfg.weights),
            calibration: trace,
            channels,
            composite_similarity: composite,
            repeat_threshold,
            reply_threshold,
            rule_matches: self.rules.matched(&pre.intent_text, lang.tag()),
        });

        let result = AnalysisResult {
            original: current.to_string(),
            is_worth_replying: worthy,
            probability,
            score: score_from_probability(probability),
            confidence: trace.confidence,
            features,
            reasons,
            policy: compliance.policy,
            debug: breakdown,
        };

        if self.dev_log {
            debug::dev_log_decision(&pre.original, &result, reply_threshold);
        }
        result
    }
}
