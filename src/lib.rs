//! Duo Director: turn-by-turn quality gate for two-persona scene dialogue
//!
//! Each candidate line goes through `Director::evaluate_response` (speculative,
//! no side effects) and, once accepted, `Director::commit_evaluation`.

pub mod core;
pub mod error;
pub mod types;

// =============================================================================
// LOOP GUARD [C]
// =============================================================================

/// Committed turns kept in the novelty window
pub const NOVELTY_WINDOW_SIZE: usize = 10;

/// Loop depth at which soft interventions start
pub const LOOP_SOFT_DEPTH: usize = 3;

/// Loop depth at which the line is rejected outright
pub const LOOP_FORCE_DEPTH: usize = 5;

/// Minimum run length for an extracted noun
pub const MIN_NOUN_LEN: usize = 2;

// =============================================================================
// TOPIC STATE [C]
// =============================================================================

/// Maximum abandoned hooks remembered
pub const MAX_FORBIDDEN_TOPICS: usize = 5;

/// hook_depth saturates here (EXPAND)
pub const MAX_HOOK_DEPTH: u8 = 3;

// =============================================================================
// STATIC CHECKS [C]
// =============================================================================

/// Line count that forces RETRY
pub const FORMAT_RETRY_LINES: usize = 8;

/// Line count that triggers WARN
pub const FORMAT_WARN_LINES: usize = 6;

/// Polite endings needed for the polite-register style signal
pub const MIN_POLITE_ENDINGS: usize = 2;

/// Average sentence length (chars) still counted as "short"
pub const SHORT_SENTENCE_CHARS: usize = 25;

/// Scatter RETRY needs at least this many sentences...
pub const SCATTER_RETRY_SENTENCES: usize = 4;
/// ...and at least this many topic markers
pub const SCATTER_RETRY_MARKERS: usize = 3;
/// Scatter WARN on this many sentences
pub const SCATTER_WARN_SENTENCES: usize = 3;
/// or this many topic markers
pub const SCATTER_WARN_MARKERS: usize = 2;

// =============================================================================
// LLM SCORE THRESHOLDS [C]
// =============================================================================

/// Average below this is a RETRY
pub const SCORE_RETRY_BELOW: f64 = 3.5;

/// Average below this (and not RETRY) is a WARN
pub const SCORE_WARN_BELOW: f64 = 4.0;

// =============================================================================
// PATTERNS [C]
// =============================================================================

/// Recent patterns remembered by the Director
pub const PATTERN_HISTORY_SIZE: usize = 5;

/// Default anti-repetition limit (no 3-in-a-row)
pub const DEFAULT_MAX_CONSECUTIVE: usize = 2;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
