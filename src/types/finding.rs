//! Finding codes for every check the Director runs
//!
//! Same shape as a reason-code taxonomy: stable code string plus a short
//! description, grouped by check family.

use serde::{Deserialize, Serialize};
use crate::types::Status;

/// Codes for findings emitted by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum FindingCode {
    // =========================================================================
    // F1xx: Format
    // =========================================================================
    /// Too many lines, reject
    F101_FORMAT_TOO_MANY_LINES,
    /// Long but acceptable
    F102_FORMAT_LONG,

    // =========================================================================
    // T2xx: Tone
    // =========================================================================
    /// No persona signal at all
    T201_TONE_NO_SIGNAL,
    /// Only one persona signal
    T202_TONE_WEAK,
    /// Hard-banned expression used
    T203_TONE_BANNED_WORD,

    // =========================================================================
    // P3xx: Praise
    // =========================================================================
    /// Evaluates the partner directly
    P301_PRAISE_TO_PARTNER,
    /// Evaluative phrase without a direct address
    P302_PRAISE_EVALUATIVE,

    // =========================================================================
    // S4xx: Scatter
    // =========================================================================
    /// Too many sentences and topic shifts
    S401_SCATTER_RETRY,
    /// Leaning towards scattered
    S402_SCATTER_WARN,

    // =========================================================================
    // L5xx: Loop
    // =========================================================================
    /// Loop too deep, topic must change
    L501_LOOP_FORCE_CHANGE,
    /// Loop forming, soft intervention
    L502_LOOP_SOFT,

    // =========================================================================
    // Q6xx: Quality score
    // =========================================================================
    /// Average score below the RETRY cut-off
    Q601_SCORE_LOW,
    /// Average score in the WARN band
    Q602_SCORE_BORDERLINE,
    /// Scorer failed, degraded to PASS
    Q603_SCORER_UNAVAILABLE,
    /// Scorer status RETRY, only when it returned no numeric scores
    Q604_SCORER_REJECTED,
    /// Scorer listed issues
    Q605_SCORER_ISSUES,

    // =========================================================================
    // H7xx: Hook / topic
    // =========================================================================
    /// Tried to leave the hook before a single turn on it
    H701_PREMATURE_SWITCH,
    /// Came back to an abandoned hook
    H702_ABANDONED_HOOK,

    // =========================================================================
    // K8xx: Fact check
    // =========================================================================
    /// Factual error found, correction pending
    K801_FACT_CORRECTION,
}

impl FindingCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::F101_FORMAT_TOO_MANY_LINES => "F101_FORMAT_TOO_MANY_LINES",
            Self::F102_FORMAT_LONG => "F102_FORMAT_LONG",
            Self::T201_TONE_NO_SIGNAL => "T201_TONE_NO_SIGNAL",
            Self::T202_TONE_WEAK => "T202_TONE_WEAK",
            Self::T203_TONE_BANNED_WORD => "T203_TONE_BANNED_WORD",
            Self::P301_PRAISE_TO_PARTNER => "P301_PRAISE_TO_PARTNER",
            Self::P302_PRAISE_EVALUATIVE => "P302_PRAISE_EVALUATIVE",
            Self::S401_SCATTER_RETRY => "S401_SCATTER_RETRY",
            Self::S402_SCATTER_WARN => "S402_SCATTER_WARN",
            Self::L501_LOOP_FORCE_CHANGE => "L501_LOOP_FORCE_CHANGE",
            Self::L502_LOOP_SOFT => "L502_LOOP_SOFT",
            Self::Q601_SCORE_LOW => "Q601_SCORE_LOW",
            Self::Q602_SCORE_BORDERLINE => "Q602_SCORE_BORDERLINE",
            Self::Q603_SCORER_UNAVAILABLE => "Q603_SCORER_UNAVAILABLE",
            Self::Q604_SCORER_REJECTED => "Q604_SCORER_REJECTED",
            Self::Q605_SCORER_ISSUES => "Q605_SCORER_ISSUES",
            Self::H701_PREMATURE_SWITCH => "H701_PREMATURE_SWITCH",
            Self::H702_ABANDONED_HOOK => "H702_ABANDONED_HOOK",
            Self::K801_FACT_CORRECTION => "K801_FACT_CORRECTION",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::F101_FORMAT_TOO_MANY_LINES => "Response split into too many lines",
            Self::F102_FORMAT_LONG => "Response is long",
            Self::T201_TONE_NO_SIGNAL => "No persona tone signal",
            Self::T202_TONE_WEAK => "Weak persona tone",
            Self::T203_TONE_BANNED_WORD => "Banned expression for this speaker",
            Self::P301_PRAISE_TO_PARTNER => "Evaluates the partner directly",
            Self::P302_PRAISE_EVALUATIVE => "Evaluative language",
            Self::S401_SCATTER_RETRY => "Scattered across topics",
            Self::S402_SCATTER_WARN => "Starting to scatter",
            Self::L501_LOOP_FORCE_CHANGE => "Conversation stuck, topic must change",
            Self::L502_LOOP_SOFT => "Conversation starting to loop",
            Self::Q601_SCORE_LOW => "Quality score too low",
            Self::Q602_SCORE_BORDERLINE => "Quality score borderline",
            Self::Q603_SCORER_UNAVAILABLE => "Scorer unavailable",
            Self::Q604_SCORER_REJECTED => "Scorer rejected the line",
            Self::Q605_SCORER_ISSUES => "Scorer reported issues",
            Self::H701_PREMATURE_SWITCH => "Left the hook too early",
            Self::H702_ABANDONED_HOOK => "Returned to an abandoned hook",
            Self::K801_FACT_CORRECTION => "Factual correction pending",
        }
    }
}

impl std::fmt::Display for FindingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

/// One finding: a code, its severity and a coaching note for the next turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub code: FindingCode,
    pub severity: Status,
    pub message: String,
}

impl Finding {
    pub fn new(code: FindingCode, severity: Status, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
        }
    }

    pub fn warn(code: FindingCode, message: impl Into<String>) -> Self {
        Self::new(code, Status::Warn, message)
    }

    pub fn retry(code: FindingCode, message: impl Into<String>) -> Self {
        Self::new(code, Status::Retry, message)
    }
}

/// Verdict of a single static check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckVerdict {
    pub status: Status,
    pub findings: Vec<Finding>,
}

impl CheckVerdict {
    pub fn pass() -> Self {
        Self {
            status: Status::Pass,
            findings: Vec::new(),
        }
    }

    pub fn from_finding(finding: Finding) -> Self {
        Self {
            status: finding.severity,
            findings: vec![finding],
        }
    }

    pub fn is_retry(&self) -> bool {
        self.status == Status::Retry
    }
}
