// src/config.rs
//! Analyzer configuration: documented defaults, deep-merge of caller overrides,
//! TOML/env loading.
//!
//! Every group carries `#[serde(default)]`, so an override document only needs the
//! keys it changes and unknown keys are ignored. Out-of-range numbers are accepted
//! here and clamped where they are used.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::analyze::rules::PatternRule;
use crate::analyze::weights::Weights;

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/analyzer.toml";
pub const ENV_CONFIG_PATH: &str = "REPLY_GATE_CONFIG_PATH";
pub const ENV_REPLY_THRESHOLD: &str = "REPLY_GATE_THRESHOLD";
pub const ENV_DEV_LOG: &str = "REPLY_GATE_DEV_LOG";
pub const ENV_HOT_RELOAD: &str = "REPLY_GATE_HOT_RELOAD";

/// Immutable analyzer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Number of most recent history entries compared against the current message.
    pub history_window: usize,
    /// Allow a link to rescue a message rejected only for low semantic value.
    pub link_fallback: bool,
    /// Attach the debug breakdown to every result.
    pub debug: bool,
    pub language: LanguageConfig,
    pub weights: Weights,
    pub punct: PunctConfig,
    pub thresholds: Thresholds,
    pub repeat_penalty: RepeatPenaltyConfig,
    pub compliance: ComplianceConfig,
    pub calibration: CalibrationConfig,
    pub resources: Resources,
    /// Stopword sets keyed by language tag (`en`, `zh`).
    pub stopwords: BTreeMap<String, Vec<String>>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            history_window: 6,
            link_fallback: false,
            debug: false,
            language: LanguageConfig::default(),
            weights: Weights::default(),
            punct: PunctConfig::default(),
            thresholds: Thresholds::default(),
            repeat_penalty: RepeatPenaltyConfig::default(),
            compliance: ComplianceConfig::default(),
            calibration: CalibrationConfig::default(),
            resources: Resources::default(),
            stopwords: default_stopwords(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Minimum text length hint passed to the language detector.
    pub min_length: usize,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self { min_length: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PunctConfig {
    /// Characters that end a question sentence.
    pub question_marks: String,
    /// Flat questionness bonus when any question mark is present.
    pub question_bonus: f64,
}

impl Default for PunctConfig {
    fn default() -> Self {
        Self {
            question_marks: "?？".to_string(),
            question_bonus: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub reply: f64,
    /// Composite history similarity treated as a hard repeat.
    pub hard_repeat: f64,
    pub question_soft_min: f64,
    pub cta_soft_min: f64,
    pub urgent: f64,
    pub acknowledgment: f64,
    pub low_semantic: f64,
    pub high_fatigue: f64,
    pub session_saturated: f64,
    pub link_fallback_min_prob: f64,
    /// Below this many meaningful tokens similarity switches to char bigrams.
    pub sparse_token_min: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            reply: 0.65,
            hard_repeat: 0.9,
            question_soft_min: 0.3,
            cta_soft_min: 0.35,
            urgent: 0.5,
            acknowledgment: 0.6,
            low_semantic: 0.25,
            high_fatigue: 0.7,
            session_saturated: 0.6,
            link_fallback_min_prob: 0.35,
            sparse_token_min: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatPenaltyConfig {
    pub max_penalty: f64,
    pub min_factor: f64,
    /// Explicit trigger level; falls back to `thresholds.hard_repeat`.
    pub threshold: Option<f64>,
}

impl Default for RepeatPenaltyConfig {
    fn default() -> Self {
        Self {
            max_penalty: 0.8,
            min_factor: 0.2,
            threshold: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    pub enabled: bool,
    pub flag_threshold: f64,
    pub block_threshold: f64,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flag_threshold: 0.02,
            block_threshold: 0.06,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platt {
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsotonicPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub temperature: f64,
    pub platt: Option<Platt>,
    pub isotonic: Option<Vec<IsotonicPoint>>,
    /// How strongly channel disagreement pulls the probability toward 0.5.
    pub shrink_factor: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            platt: None,
            isotonic: None,
            shrink_factor: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub cta_rules: Vec<PatternRule>,
}

fn default_stopwords() -> BTreeMap<String, Vec<String>> {
    const EN: &[&str] = &[
        "a", "an", "the", "and", "or", "but", "if", "then", "so", "of", "to", "in", "on",
        "at", "by", "for", "with", "from", "as", "is", "am", "are", "was", "were", "be",
        "been", "it", "its", "this", "that", "these", "those", "i", "me", "my", "we", "our",
        "you", "your", "he", "him", "his", "she", "her", "they", "them", "their", "do",
        "does", "did", "have", "has", "had", "not", "no", "just", "very", "too", "also",
        "ok", "okay", "yes", "yeah", "oh", "um", "uh", "lol", "haha",
    ];
    const ZH: &[&str] = &[
        "的", "了", "是", "我", "你", "他", "她", "它", "们", "在", "也", "就", "都", "和",
        "与", "啊", "吧", "呢", "吗", "哦", "嗯", "呀", "哈", "这", "那", "有", "个", "着",
        "么", "之", "而", "及", "或",
    ];
    let mut out = BTreeMap::new();
    out.insert("en".to_string(), EN.iter().map(|s| s.to_string()).collect());
    out.insert("zh".to_string(), ZH.iter().map(|s| s.to_string()).collect());
    out
}

impl AnalyzerConfig {
    /// Deep-merge `overrides` onto the defaults.
    ///
    /// Objects merge key by key; arrays and scalars replace. Unknown keys are ignored.
    pub fn merged(overrides: Value) -> anyhow::Result<Self> {
        let mut base = serde_json::to_value(Self::default())?;
        deep_merge(&mut base, overrides);
        serde_json::from_value(base).context("invalid analyzer config override")
    }

    /// Build from a TOML override document.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let table: toml::Table = toml::from_str(toml_str).context("parse analyzer TOML")?;
        Self::merged(serde_json::to_value(table)?)
    }

    /// Read a TOML file and build the config from it.
    pub fn from_toml_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read analyzer config at {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("analyzer config at {}", path.display()))
    }

    /// Load from `REPLY_GATE_CONFIG_PATH` (default `config/analyzer.toml`).
    ///
    /// A missing file yields defaults. `REPLY_GATE_THRESHOLD` overrides the reply
    /// threshold afterwards.
    pub fn from_toml() -> anyhow::Result<Self> {
        let path = config_path();
        let mut cfg = if path.exists() {
            Self::from_toml_path(&path)?
        } else {
            info!(path = %path.display(), "analyzer config not found, using defaults");
            Self::default()
        };

        cfg.apply_env_threshold();
        Ok(cfg)
    }

    /// `REPLY_GATE_THRESHOLD` wins over the file value; a non-finite file value
    /// falls back to the default.
    pub fn apply_env_threshold(&mut self) {
        if let Some(t) = parse_threshold_env(std::env::var(ENV_REPLY_THRESHOLD).ok()) {
            self.thresholds.reply = t;
        } else if !self.thresholds.reply.is_finite() {
            warn!("non-finite reply threshold in config, falling back to default");
            self.thresholds.reply = Thresholds::default().reply;
        }
    }
}

/// Resolved config path from env or the default.
pub fn config_path() -> PathBuf {
    std::env::var(ENV_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn deep_merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(over)) => {
            for (key, value) in over {
                match base.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

/// `true` for `1`, `true`, `yes`, `on` (case-insensitive).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

/// Debug build, or `APP_ENV` in {local, development, dev}.
pub fn dev_environment() -> bool {
    cfg!(debug_assertions)
        || matches!(
            std::env::var("APP_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        )
}
