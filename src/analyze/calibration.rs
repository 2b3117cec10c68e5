//! Probability calibration, in a fixed order:
//! temperature → Platt → sigmoid → isotonic → ambiguity shrink → repeat penalty.

use serde::Serialize;

use super::signals::clamp01;
use crate::config::{CalibrationConfig, IsotonicPoint, Platt};

const MIN_TEMPERATURE: f64 = 1e-3;
const MIN_CONFIDENCE: f64 = 0.2;

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Agreement between similarity channels: `clamp(1 − (max − min), 0.2, 1)`.
/// No reporting channels means nothing disagrees.
pub fn channel_confidence(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    (1.0 - (hi - lo)).clamp(MIN_CONFIDENCE, 1.0)
}

/// Pull `p` toward 0.5 by `shrink·(1 − confidence)`.
pub fn shrink_toward_half(p: f64, confidence: f64, shrink_factor: f64) -> f64 {
    let keep = 1.0 - clamp01(shrink_factor) * (1.0 - clamp01(confidence));
    0.5 + (p - 0.5) * keep
}

/// Multiplicative repeat penalty: `max(1 − max_penalty·excess, min_factor)` with
/// `excess = (sim − threshold)/(1 − threshold)`.
pub fn repeat_penalty_factor(similarity: f64, threshold: f64, max_penalty: f64, min_factor: f64) -> f64 {
    let threshold = threshold.clamp(0.0, 0.999);
    let excess = clamp01((similarity - threshold) / (1.0 - threshold));
    clamp01((1.0 - clamp01(max_penalty) * excess).max(clamp01(min_factor)))
}

/// Piecewise-linear remap through sorted breakpoints, clamped outside the range.
pub fn isotonic_remap(p: f64, points: &[IsotonicPoint]) -> f64 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return p;
    };
    if p <= first.x {
        return clamp01(first.y);
    }
    if p >= last.x {
        return clamp01(last.y);
    }
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if p >= a.x && p <= b.x {
            if b.x - a.x <= f64::EPSILON {
                return clamp01(b.y);
            }
            let t = (p - a.x) / (b.x - a.x);
            return clamp01(a.y + t * (b.y - a.y));
        }
    }
    p
}

/// Every intermediate value of one calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationTrace {
    pub logit: f64,
    pub tempered: f64,
    pub platt: f64,
    pub sigmoid: f64,
    pub isotonic: f64,
    pub confidence: f64,
    pub shrunk: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_factor: Option<f64>,
    pub probability: f64,
}

impl CalibrationTrace {
    pub fn apply_repeat_penalty(&mut self, factor: f64) {
        self.repeat_factor = Some(factor);
        self.probability = clamp01(self.probability * factor);
    }
}

/// Calibration parameters resolved from config once per analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibrator {
    temperature: f64,
    platt: Option<Platt>,
    isotonic: Vec<IsotonicPoint>,
    shrink_factor: f64,
}

impl Calibrator {
    pub fn from_config(cfg: &CalibrationConfig) -> Self {
        let temperature = if cfg.temperature.is_finite() && cfg.temperature > 0.0 {
            cfg.temperature.max(MIN_TEMPERATURE)
        } else {
            1.0
        };
        let platt = cfg.platt.filter(|p| p.a.is_finite() && p.b.is_finite());
        let mut isotonic: Vec<IsotonicPoint> = cfg
            .isotonic
            .iter()
            .flatten()
            .copied()
            .filter(|pt| pt.x.is_finite() && pt.y.is_finite())
            .collect();
        isotonic.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self {
            temperature,
            platt,
            isotonic,
            shrink_factor: clamp01(cfg.shrink_factor),
        }
    }

    /// Stages 1–5. The repeat penalty is applied by the caller, which owns its gating.
    pub fn run(&self, z: f64, channels: &[f64]) -> CalibrationTrace {
        let tempered = z / self.temperature;
        let platt = match self.platt {
            Some(Platt { a, b }) => a * tempered + b,
            None => tempered,
        };
        let sig = sigmoid(platt);
        let iso = isotonic_remap(sig, &self.isotonic);
        let confidence = channel_confidence(channels);
        let shrunk = clamp01(shrink_toward_half(iso, confidence, self.shrink_factor));
        CalibrationTrace {
            logit: z,
            tempered,
            platt,
            sigmoid: sig,
            isotonic: iso,
            confidence,
            shrunk,
            repeat_factor: None,
            probability: shrunk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> IsotonicPoint {
        IsotonicPoint { x, y }
    }

    #[test]
    fn sigmoid_is_stable() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
    }

    #[test]
    fn confidence_bounds() {
        assert_eq!(channel_confidence(&[0.4; 7]), 1.0);
        assert!((channel_confidence(&[0.0, 1.0, 0.5]) - 0.2).abs() < 1e-12);
        assert!((channel_confidence(&[0.3, 0.6]) - 0.7).abs() < 1e-12);
        assert_eq!(channel_confidence(&[]), 1.0);
    }

    #[test]
    fn shrink_moves_toward_half() {
        assert!((shrink_toward_half(0.9, 1.0, 0.5) - 0.9).abs() < 1e-12);
        assert!((shrink_toward_half(0.9, 0.2, 0.5) - 0.74).abs() < 1e-12);
        assert!((shrink_toward_half(0.1, 0.2, 1.0) - 0.42).abs() < 1e-12);
    }

    #[test]
    fn isotonic_interpolates_and_clamps() {
        let pts = vec![pt(0.2, 0.1), pt(0.6, 0.5), pt(0.8, 0.9)];
        assert!((isotonic_remap(0.1, &pts) - 0.1).abs() < 1e-12);
        assert!((isotonic_remap(0.4, &pts) - 0.3).abs() < 1e-12);
        assert!((isotonic_remap(0.7, &pts) - 0.7).abs() < 1e-12);
        assert!((isotonic_remap(0.95, &pts) - 0.9).abs() < 1e-12);
        assert_eq!(isotonic_remap(0.33, &[]), 0.33);
    }

    #[test]
    fn repeat_penalty_scales_with_excess() {
        assert!((repeat_penalty_factor(0.9, 0.9, 0.8, 0.2) - 1.0).abs() < 1e-12);
        assert!((repeat_penalty_factor(0.95, 0.9, 0.8, 0.2) - 0.6).abs() < 1e-9);
        assert!((repeat_penalty_factor(1.0, 0.9, 0.8, 0.2) - 0.2).abs() < 1e-9);
        assert!((repeat_penalty_factor(1.0, 0.9, 0.5, 0.1) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn run_applies_stages_in_order() {
        let cfg = CalibrationConfig {
            temperature: 2.0,
            platt: Some(Platt { a: 2.0, b: 0.0 }),
            isotonic: Some(vec![pt(0.8, 0.9), pt(0.0, 0.0), pt(1.0, 1.0)]),
            shrink_factor: 0.5,
        };
        let cal = Calibrator::from_config(&cfg);
        let t = cal.run(1.0, &[]);
        assert!((t.tempered - 0.5).abs() < 1e-12);
        assert!((t.platt - 1.0).abs() < 1e-12);
        assert!((t.sigmoid - sigmoid(1.0)).abs() < 1e-12);
        // sigmoid(1) ≈ 0.731 lies between the sorted points (0,0) and (0.8,0.9)
        assert!((t.isotonic - t.sigmoid * 0.9 / 0.8).abs() < 1e-9);
        assert_eq!(t.confidence, 1.0);
        assert_eq!(t.probability, t.shrunk);
    }

    #[test]
    fn bad_temperature_falls_back() {
        let cal = Calibrator::from_config(&CalibrationConfig {
            temperature: 0.0,
            ..CalibrationConfig::default()
        });
        assert!((cal.run(2.0, &[]).tempered - 2.0).abs() < 1e-12);
    }
}
