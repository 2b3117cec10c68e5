//! Stateless structural signal extractors. Every output is in [0,1].

/// Clamp to [0,1]; NaN maps to 0.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

const EXPRESSIVE: &[char] = &['!', '?', '！', '？', '…', '~', '～'];

fn non_ws(text: &str) -> Vec<char> {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Uppercase share of cased letters. Uncased scripts (CJK) are ignored.
pub fn caps_ratio(text: &str) -> f64 {
    let (upper, cased) = text
        .chars()
        .filter(|c| c.is_uppercase() || c.is_lowercase())
        .fold((0usize, 0usize), |(u, n), c| {
            (u + usize::from(c.is_uppercase()), n + 1)
        });
    if cased == 0 {
        0.0
    } else {
        upper as f64 / cased as f64
    }
}

/// Density of `!`/`?`-style punctuation, plus a flat bump for runs like `!!` or `?!`.
pub fn punctuation_intensity(text: &str) -> f64 {
    let chars = non_ws(text);
    if chars.is_empty() {
        return 0.0;
    }
    let expressive = chars.iter().filter(|c| EXPRESSIVE.contains(c)).count();
    let has_run = chars
        .windows(2)
        .any(|w| EXPRESSIVE.contains(&w[0]) && EXPRESSIVE.contains(&w[1]));
    let bonus = if has_run { 0.25 } else { 0.0 };
    clamp01(3.0 * expressive as f64 / chars.len() as f64 + bonus)
}

/// Share of adjacent character pairs that are identical ("soooo", "!!!!").
pub fn repeat_char_ratio(text: &str) -> f64 {
    let chars = non_ws(text);
    if chars.len() < 2 {
        return 0.0;
    }
    let repeats = chars.windows(2).filter(|w| w[0] == w[1]).count();
    repeats as f64 / (chars.len() - 1) as f64
}

pub fn unique_char_ratio(text: &str) -> f64 {
    let mut chars = non_ws(text);
    if chars.is_empty() {
        return 0.0;
    }
    let total = chars.len();
    chars.sort_unstable();
    chars.dedup();
    chars.len() as f64 / total as f64
}

pub fn digit_ratio(text: &str) -> f64 {
    let chars = non_ws(text);
    if chars.is_empty() {
        return 0.0;
    }
    chars.iter().filter(|c| c.is_numeric()).count() as f64 / chars.len() as f64
}

/// Shannon entropy of the character distribution, normalized by `log2(n)`.
pub fn entropy(text: &str) -> f64 {
    let mut chars = non_ws(text);
    let n = chars.len();
    if n < 2 {
        return 0.0;
    }
    chars.sort_unstable();
    let mut h = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && chars[j] == chars[i] {
            j += 1;
        }
        let p = (j - i) as f64 / n as f64;
        h -= p * p.log2();
        i = j;
    }
    clamp01(h / (n as f64).log2())
}

/// `clamp(1 − tokens/5)`, damped when a question mark or link makes a short message
/// more likely to carry content.
pub fn short_utterance_score(token_count: usize, has_question: bool, has_link: bool) -> f64 {
    let base = clamp01(1.0 - token_count as f64 / 5.0);
    let protection = match (has_question, has_link) {
        (true, _) => 0.6,
        (false, true) => 0.4,
        (false, false) => 0.0,
    };
    base * (1.0 - protection)
}

/// Structural ratios computed on the original (unstripped) message.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StructuralSignals {
    pub caps_ratio: f64,
    pub punctuation_intensity: f64,
    pub repeat_char_ratio: f64,
    pub unique_char_ratio: f64,
    pub digit_ratio: f64,
}

impl StructuralSignals {
    pub fn from_text(original: &str) -> Self {
        Self {
            caps_ratio: caps_ratio(original),
            punctuation_intensity: punctuation_intensity(original),
            repeat_char_ratio: repeat_char_ratio(original),
            unique_char_ratio: unique_char_ratio(original),
            digit_ratio: digit_ratio(original),
        }
    }
}
