//! Static rule checks: format, tone, praise, scatter
//!
//! Deterministic, no LLM. Run in that fixed order; the Director stops at
//! the first RETRY.

use serde::{Deserialize, Serialize};
use crate::{
    FORMAT_RETRY_LINES, FORMAT_WARN_LINES,
    SCATTER_RETRY_MARKERS, SCATTER_RETRY_SENTENCES, SCATTER_WARN_MARKERS, SCATTER_WARN_SENTENCES,
};
use crate::core::text_signals;
use crate::types::{CheckVerdict, Finding, FindingCode, Speaker};

/// Tunable thresholds for the static checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticThresholds {
    pub format_retry_lines: usize,
    pub format_warn_lines: usize,
    pub scatter_retry_sentences: usize,
    pub scatter_retry_markers: usize,
    pub scatter_warn_sentences: usize,
    pub scatter_warn_markers: usize,
}

impl Default for StaticThresholds {
    fn default() -> Self {
        Self {
            format_retry_lines: FORMAT_RETRY_LINES,
            format_warn_lines: FORMAT_WARN_LINES,
            scatter_retry_sentences: SCATTER_RETRY_SENTENCES,
            scatter_retry_markers: SCATTER_RETRY_MARKERS,
            scatter_warn_sentences: SCATTER_WARN_SENTENCES,
            scatter_warn_markers: SCATTER_WARN_MARKERS,
        }
    }
}

/// Runs the four static checks
#[derive(Debug, Clone, Default)]
pub struct StaticChecker {
    thresholds: StaticThresholds,
}

impl StaticChecker {
    pub fn new(thresholds: StaticThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &StaticThresholds {
        &self.thresholds
    }

    /// All four checks in order, stopping at the first RETRY.
    ///
    /// `forbidden` are extra hard-banned expressions (from the beat policy).
    pub fn run(&self, speaker: Speaker, text: &str, forbidden: &[String]) -> CheckVerdict {
        let mut combined = CheckVerdict::pass();
        let checks = [
            self.check_format(text),
            self.check_tone(speaker, text, forbidden),
            self.check_praise(speaker, text),
            self.check_scatter(text),
        ];
        for verdict in checks {
            combined.status = combined.status.worst(verdict.status);
            combined.findings.extend(verdict.findings);
            if combined.is_retry() {
                break;
            }
        }
        combined
    }

    /// Line count: ≥8 RETRY, 6–7 WARN
    pub fn check_format(&self, text: &str) -> CheckVerdict {
        let lines = text_signals::content_lines(text);
        if lines >= self.thresholds.format_retry_lines {
            CheckVerdict::from_finding(Finding::retry(
                FindingCode::F101_FORMAT_TOO_MANY_LINES,
                format!("{}行に分かれています。1〜3行にまとめてください。", lines),
            ))
        } else if lines >= self.thresholds.format_warn_lines {
            CheckVerdict::from_finding(Finding::warn(
                FindingCode::F102_FORMAT_LONG,
                format!("{}行は長めです。次はもっと短く。", lines),
            ))
        } else {
            CheckVerdict::pass()
        }
    }

    /// Persona tone score 0–3 plus hard-banned words
    pub fn check_tone(&self, speaker: Speaker, text: &str, forbidden: &[String]) -> CheckVerdict {
        let mut banned: Vec<String> = text_signals::banned_words(speaker, text)
            .into_iter()
            .map(String::from)
            .collect();
        banned.extend(
            forbidden
                .iter()
                .filter(|f| !f.is_empty() && text.contains(f.as_str()))
                .cloned(),
        );
        if !banned.is_empty() {
            return CheckVerdict::from_finding(Finding::retry(
                FindingCode::T203_TONE_BANNED_WORD,
                format!("{}は「{}」を使いません。", speaker, banned.join("」「")),
            ));
        }

        let signals = text_signals::tone_signals(speaker, text);
        match signals.score() {
            0 => CheckVerdict::from_finding(Finding::retry(
                FindingCode::T201_TONE_NO_SIGNAL,
                format!("{}らしい口調がまったく出ていません。", speaker),
            )),
            1 => CheckVerdict::from_finding(Finding::warn(
                FindingCode::T202_TONE_WEAK,
                tone_hint(speaker),
            )),
            _ => CheckVerdict::pass(),
        }
    }

    /// あゆ must not grade やな's contributions
    pub fn check_praise(&self, speaker: Speaker, text: &str) -> CheckVerdict {
        if speaker != Speaker::Ayu {
            return CheckVerdict::pass();
        }
        let signals = text_signals::praise_signals(text);
        match (signals.evaluative, signals.second_person) {
            (Some(phrase), true) => CheckVerdict::from_finding(Finding::retry(
                FindingCode::P301_PRAISE_TO_PARTNER,
                format!("姉様への「{}」のような評価は禁止です。内容で応じてください。", phrase),
            )),
            (Some(phrase), false) => CheckVerdict::from_finding(Finding::warn(
                FindingCode::P302_PRAISE_EVALUATIVE,
                format!("「{}」のような評価語は避け、情報で返してください。", phrase),
            )),
            (None, _) => CheckVerdict::pass(),
        }
    }

    /// Sentence count and topic-shift markers
    pub fn check_scatter(&self, text: &str) -> CheckVerdict {
        let sentences = text_signals::sentences(text).len();
        let markers = text_signals::topic_marker_count(text);
        let t = &self.thresholds;

        if sentences >= t.scatter_retry_sentences && markers >= t.scatter_retry_markers {
            CheckVerdict::from_finding(Finding::retry(
                FindingCode::S401_SCATTER_RETRY,
                format!("{}文・話題転換{}回で散らかっています。一つの対象に絞ってください。", sentences, markers),
            ))
        } else if sentences >= t.scatter_warn_sentences || markers >= t.scatter_warn_markers {
            CheckVerdict::from_finding(Finding::warn(
                FindingCode::S402_SCATTER_WARN,
                "次の発言は一つの話題に絞ってください。",
            ))
        } else {
            CheckVerdict::pass()
        }
    }
}

fn tone_hint(speaker: Speaker) -> String {
    match speaker {
        Speaker::Yana => "やなは短く、「〜じゃん」「〜でしょ」のような砕けた口調で。".to_string(),
        Speaker::Ayu => "あゆは「姉様」と呼びかけ、です・ます調で丁寧に。".to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
