//! Message preprocessing: entity decoding, emoji/link/mention/code extraction,
//! punctuation stripping and whitespace normalization.

use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#).expect("url regex"));

// Pictographs, dingbats, misc symbols and regional indicators; a trailing variation
// selector, skin tone or ZWJ-joined pictograph stays part of the same emoji.
static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2B00}-\x{2BFF}](?:[\x{FE0F}\x{1F3FB}-\x{1F3FF}]|\x{200D}[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}])*",
    )
    .expect("emoji regex")
});

static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)@([\p{L}\p{N}_.\-]{1,32})").expect("mention regex"));

static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").expect("fence regex"));
static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`\n]+`").expect("inline code regex"));

static PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{P}\p{S}]+").expect("punct regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preprocessed {
    /// Entity-decoded, trimmed input.
    pub original: String,
    /// Links, emoji and mention markers removed; punctuation kept.
    pub intent_text: String,
    /// `intent_text` with punctuation stripped and whitespace collapsed.
    pub clean_text: String,
    pub emoji_count: usize,
    pub url_count: usize,
    pub mention_count: usize,
    pub has_link: bool,
    pub has_code_block: bool,
}

impl Preprocessed {
    /// Lower-cased clean text used by the similarity channels.
    pub fn normalized(&self) -> String {
        self.clean_text.to_lowercase()
    }
}

fn collapse_ws(text: &str) -> String {
    WS_RE.replace_all(text, " ").trim().to_string()
}

pub fn preprocess(raw: &str) -> Preprocessed {
    let decoded = html_escape::decode_html_entities(raw);
    let original = decoded.trim().to_string();
    if original.is_empty() {
        return Preprocessed::default();
    }

    let has_code_block = CODE_FENCE_RE.is_match(&original) || INLINE_CODE_RE.is_match(&original);

    let url_count = URL_RE.find_iter(&original).count();
    let no_urls = URL_RE.replace_all(&original, " ");

    let emoji_count = EMOJI_RE.find_iter(&no_urls).count();
    let no_emoji = EMOJI_RE.replace_all(&no_urls, " ");

    let mention_count = MENTION_RE.captures_iter(&no_emoji).count();
    // keep the name, drop the marker
    let no_mentions = MENTION_RE.replace_all(&no_emoji, " $1");

    let intent_text = collapse_ws(&no_mentions);
    let clean_text = collapse_ws(&PUNCT_RE.replace_all(&intent_text, " "));

    Preprocessed {
        original,
        intent_text,
        clean_text,
        emoji_count,
        url_count,
        mention_count,
        has_link: url_count > 0,
        has_code_block,
    }
}
