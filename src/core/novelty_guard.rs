//! NoveltyGuard: conversational loop detector
//!
//! Keeps the noun sets of the last committed turns. The loop depth of a new
//! line is the number of consecutive previous turns (newest first) that share
//! at least one noun with it.
//!
//! Escalation:
//! - depth < 3  → nothing
//! - depth 3..5 → soft intervention (never the same one twice in a row)
//! - depth ≥ 5  → FORCE_CHANGE_TOPIC

use std::collections::{BTreeSet, VecDeque};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::{LOOP_FORCE_DEPTH, LOOP_SOFT_DEPTH, NOVELTY_WINDOW_SIZE};
use crate::core::text_signals;
use crate::types::{InterventionStrategy, LoopCheckResult};

/// Sliding-window loop detector. Clone is the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoveltyGuard {
    /// Noun sets of committed turns, oldest first
    window: VecDeque<BTreeSet<String>>,
    capacity: usize,
    /// Committed turns since last reset
    turn_count: u64,
    /// Depth at which the topic must change
    max_topic_depth: usize,
    /// Last soft intervention recommended on a committed turn
    last_strategy: Option<InterventionStrategy>,
}

impl Default for NoveltyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl NoveltyGuard {
    /// Create guard with default window and force depth
    pub fn new() -> Self {
        Self::with_limits(NOVELTY_WINDOW_SIZE, LOOP_FORCE_DEPTH)
    }

    /// Create guard with custom window capacity and force depth
    pub fn with_limits(capacity: usize, max_topic_depth: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            turn_count: 0,
            max_topic_depth: max_topic_depth.max(LOOP_SOFT_DEPTH + 1),
            last_strategy: None,
        }
    }

    /// Check `text` against the window; with `commit` also record it.
    ///
    /// A dry run (`commit = false`) leaves the guard untouched.
    pub fn check_and_update(&mut self, text: &str, commit: bool) -> LoopCheckResult {
        let result = self.check(text);

        if commit {
            let nouns: BTreeSet<String> = result.nouns.iter().cloned().collect();
            self.window.push_back(nouns);
            while self.window.len() > self.capacity {
                self.window.pop_front();
            }
            self.turn_count += 1;
            if let Some(strategy) = result.strategy.filter(|s| !s.is_forced()) {
                self.last_strategy = Some(strategy);
            }
            debug!(
                turn = self.turn_count,
                depth = result.topic_depth,
                window = self.window.len(),
                "novelty window updated"
            );
        }

        result
    }

    /// Read-only check
    pub fn check(&self, text: &str) -> LoopCheckResult {
        let nouns = text_signals::extract_nouns(text);
        if nouns.is_empty() {
            return LoopCheckResult::clear();
        }

        let (topic_depth, stuck) = self.streak(&nouns);
        let stuck_nouns: Vec<String> = nouns.iter().filter(|n| stuck.contains(*n)).cloned().collect();

        let strategy = if topic_depth >= self.max_topic_depth {
            Some(InterventionStrategy::ForceChangeTopic)
        } else if topic_depth >= LOOP_SOFT_DEPTH {
            Some(self.pick_soft())
        } else {
            None
        };

        let injection = strategy.map(|s| s.injection(&stuck_nouns.join("・")));

        LoopCheckResult {
            loop_detected: strategy.is_some(),
            topic_depth,
            stuck_nouns,
            nouns,
            strategy,
            injection,
        }
    }

    /// Walk the window newest-first while each previous turn still shares a
    /// noun with this one. Stuck nouns are the union of those overlaps.
    fn streak(&self, nouns: &[String]) -> (usize, BTreeSet<String>) {
        let current: BTreeSet<String> = nouns.iter().cloned().collect();
        let mut stuck = BTreeSet::new();
        let mut depth = 0;

        for previous in self.window.iter().rev() {
            let overlap: Vec<&String> = current.intersection(previous).collect();
            if overlap.is_empty() {
                break;
            }
            stuck.extend(overlap.into_iter().cloned());
            depth += 1;
        }

        (depth, stuck)
    }

    /// Rotate through the soft catalogue, skipping the last one used
    fn pick_soft(&self) -> InterventionStrategy {
        let catalogue = InterventionStrategy::SOFT;
        let start = (self.turn_count as usize) % catalogue.len();
        (0..catalogue.len())
            .map(|i| catalogue[(start + i) % catalogue.len()])
            .find(|s| Some(*s) != self.last_strategy)
            .unwrap_or(catalogue[0])
    }

    /// Empty window, zero counter
    pub fn reset(&mut self) {
        self.window.clear();
        self.turn_count = 0;
        self.last_strategy = None;
    }

    pub fn turn_count(&self) -> u64 {
        self.turn_count
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn max_topic_depth(&self) -> usize {
        self.max_topic_depth
    }

    pub fn last_strategy(&self) -> Option<InterventionStrategy> {
        self.last_strategy
    }
}

// =============================================================================
// TESTS
// =============================================================================
