//! Text signals: every script-aware heuristic lives here
//!
//! Nouns, line/sentence structure, persona tone markers, evaluative
//! language and topic-shift markers. The character classes are tuned for
//! Japanese (Han / Katakana) with an ASCII fallback; hiragana runs are
//! grammar, not vocabulary, and are never extracted as nouns.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use crate::{MIN_NOUN_LEN, MIN_POLITE_ENDINGS, SHORT_SENTENCE_CHARS};
use crate::types::Speaker;

lazy_static! {
    // =========================================================================
    // Nouns: dotted katakana compounds, katakana runs, kanji runs, ASCII words
    // Explicit code-point ranges: script properties would also pull in the
    // shared CJK punctuation (、。「」・).
    // =========================================================================
    static ref RE_NOUN: Regex = Regex::new(
        r"[ァ-ヺ][ァ-ヺー]*(?:・[ァ-ヺ][ァ-ヺー]*)+|[ァ-ヺ][ァ-ヺー]+|[\x{3400}-\x{4DBF}\x{4E00}-\x{9FFF}々]{2,}|[A-Za-z0-9]{2,}"
    ).unwrap();

    // =========================================================================
    // Structure
    // =========================================================================
    static ref RE_SPEAKER_LABEL: Regex = Regex::new(
        r"^\s*(?:やな|あゆ|[ABab])\s*[:：]\s*"
    ).unwrap();

    static ref RE_SENTENCE_END: Regex = Regex::new(r"[。！？!?\n]+").unwrap();

    /// Transition phrases that open a new topic mid-line
    static ref RE_TOPIC_MARKER: Regex = Regex::new(
        r"ところで|そういえば|そう言えば|話は変わ|話変わ|それと|あと、|それから|一方で|別の話|さて、|by the way|anyway"
    ).unwrap();

    // =========================================================================
    // やな (A): casual sentence-final particles, reactive vocabulary
    // =========================================================================
    static ref RE_YANA_MARKER: Regex = Regex::new(
        r"じゃん|でしょ(?:[！？!?。、\s」]|$)|だよね|よね[！？!?。、\s」]|かな[！？!?。、\s」]|だね"
    ).unwrap();

    static ref RE_YANA_VOCAB: Regex = Regex::new(
        r"あっ|あ、|へぇ|へー|ねえ|ねぇ|見て|すごい|すっごい|ほら|やった|わぁ|うわ"
    ).unwrap();

    // =========================================================================
    // あゆ (B): address term, analytical vocabulary, polite endings
    // =========================================================================
    static ref RE_AYU_MARKER: Regex = Regex::new(r"姉様").unwrap();

    static ref RE_AYU_VOCAB: Regex = Regex::new(
        r"つまり|実は|一般的|具体的|データ|ちなみに|推定|割合|統計|正確には|確か"
    ).unwrap();

    static ref RE_POLITE_ENDING: Regex = Regex::new(
        r"です|ます|ました|でした|ません|でしょう"
    ).unwrap();

    // =========================================================================
    // Praise (あゆ only): evaluating the partner's contribution
    // =========================================================================
    static ref RE_EVALUATIVE: Regex = Regex::new(
        r"いい質問|良い質問|いい観点|良い観点|さすが|流石|鋭い|素晴らしい|その通り|よく気づ|よく気付|正解です|お見事"
    ).unwrap();

    static ref RE_SECOND_PERSON: Regex = Regex::new(r"姉様|あなた|お姉").unwrap();
}

/// Words too generic to count as a topic
const STOP_NOUNS: &[&str] = &[
    // Han
    "今日", "本当", "自分", "一緒", "普通", "全部", "場合", "様子", "部分", "今回", "最近",
    "以上", "程度", "気持", "意味", "大丈夫", "一般", "一般的", "具体的", "実際", "正確",
    "姉様", "感覚", "状態", "時間", "何回",
    // Katakana
    "ホント", "データ", "イメージ", "タイプ", "パターン",
    // ASCII
    "the", "and", "for", "you", "this", "that", "with", "are", "was", "but", "not", "its",
];

/// Hard-banned words per speaker: each persona's address term is off limits
/// to the other
const BANNED_YANA: &[&str] = &["姉様"];
const BANNED_AYU: &[&str] = &["お姉ちゃん", "やなちゃん"];

/// Characters used to wrap lines as quotes / script dialogue
const WRAPPERS: &[char] = &['「', '」', '『', '』', '"', '“', '”', '\'', '（', '）', '(', ')'];

// =============================================================================
// NOUNS
// =============================================================================

/// Extract the noun vocabulary of a line, in order of first appearance
pub fn extract_nouns(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut nouns = Vec::new();

    for m in RE_NOUN.find_iter(text) {
        let noun = m.as_str().to_lowercase();
        if noun.chars().count() < MIN_NOUN_LEN {
            continue;
        }
        if STOP_NOUNS.contains(&noun.as_str()) {
            continue;
        }
        if seen.insert(noun.clone()) {
            nouns.push(noun);
        }
    }

    nouns
}

// =============================================================================
// STRUCTURE
// =============================================================================

fn strip_wrapping(line: &str) -> &str {
    let line = match RE_SPEAKER_LABEL.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    };
    line.trim().trim_matches(|c: char| WRAPPERS.contains(&c) || c.is_whitespace())
}

/// Lines with actual content. Speaker labels and quote wrappers on their own
/// line do not count.
pub fn content_lines(text: &str) -> usize {
    text.lines()
        .map(strip_wrapping)
        .filter(|l| !l.is_empty())
        .count()
}

/// Split into sentences on sentence-final punctuation and newlines
pub fn sentences(text: &str) -> Vec<String> {
    RE_SENTENCE_END
        .split(text)
        .map(strip_wrapping)
        .filter(|s| s.chars().any(|c| c.is_alphanumeric()))
        .map(String::from)
        .collect()
}

pub fn topic_marker_count(text: &str) -> usize {
    RE_TOPIC_MARKER.find_iter(&text.to_lowercase()).count()
}

pub fn exclamation_count(text: &str) -> usize {
    text.chars().filter(|c| *c == '！' || *c == '!').count()
}

// =============================================================================
// TONE
// =============================================================================

/// The three independent persona signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToneSignals {
    pub marker: bool,
    pub vocabulary: bool,
    pub style: bool,
}

impl ToneSignals {
    /// 0–3
    pub fn score(&self) -> u8 {
        self.marker as u8 + self.vocabulary as u8 + self.style as u8
    }
}

pub fn tone_signals(speaker: Speaker, text: &str) -> ToneSignals {
    match speaker {
        Speaker::Yana => ToneSignals {
            marker: RE_YANA_MARKER.is_match(text),
            vocabulary: RE_YANA_VOCAB.is_match(text),
            style: is_short_exclamatory(text),
        },
        Speaker::Ayu => ToneSignals {
            marker: RE_AYU_MARKER.is_match(text),
            vocabulary: RE_AYU_VOCAB.is_match(text),
            style: polite_ending_count(text) >= MIN_POLITE_ENDINGS,
        },
    }
}

/// Exclaims at least once and keeps sentences short on average
fn is_short_exclamatory(text: &str) -> bool {
    if exclamation_count(text) == 0 {
        return false;
    }
    let parts = sentences(text);
    if parts.is_empty() {
        return false;
    }
    let total: usize = parts.iter().map(|s| s.chars().count()).sum();
    total / parts.len() <= SHORT_SENTENCE_CHARS
}

pub fn polite_ending_count(text: &str) -> usize {
    RE_POLITE_ENDING.find_iter(text).count()
}

/// Built-in banned words the speaker used
pub fn banned_words(speaker: Speaker, text: &str) -> Vec<&'static str> {
    let list = match speaker {
        Speaker::Yana => BANNED_YANA,
        Speaker::Ayu => BANNED_AYU,
    };
    list.iter().copied().filter(|w| text.contains(w)).collect()
}

// =============================================================================
// PRAISE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PraiseSignals {
    pub evaluative: Option<String>,
    pub second_person: bool,
}

pub fn praise_signals(text: &str) -> PraiseSignals {
    PraiseSignals {
        evaluative: RE_EVALUATIVE.find(text).map(|m| m.as_str().to_string()),
        second_person: RE_SECOND_PERSON.is_match(text),
    }
}

// =============================================================================
// EXCERPTS
// =============================================================================

/// Sentence containing `needle` (or the first sentence), capped at `max_chars`
pub fn excerpt(text: &str, needle: &str, max_chars: usize) -> Option<String> {
    let parts = sentences(text);
    let chosen = parts
        .iter()
        .find(|s| !needle.is_empty() && s.to_lowercase().contains(needle))
        .or_else(|| parts.first())?;
    Some(chosen.chars().take(max_chars).collect())
}

// =============================================================================
// TESTS
// =============================================================================
