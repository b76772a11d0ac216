//! Committed Director state and checkpoints
//!
//! Everything `commit_evaluation` may durably change lives in
//! `CommittedState`. An evaluation works on a clone of it, so a rejected
//! line is rolled back by dropping the clone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::PATTERN_HISTORY_SIZE;
use crate::core::NoveltyGuard;
use crate::error::CheckpointError;
use crate::types::{Pattern, TopicState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedState {
    pub topic: TopicState,
    pub guard: NoveltyGuard,
    /// Last `PATTERN_HISTORY_SIZE` committed patterns, oldest first
    pub recent_patterns: Vec<Pattern>,
    /// Frame of the last committed turn
    pub last_frame: Option<u64>,
}

impl CommittedState {
    pub fn new(guard: NoveltyGuard) -> Self {
        Self {
            topic: TopicState::new(),
            guard,
            recent_patterns: Vec::new(),
            last_frame: None,
        }
    }

    /// `frame_num` starts a new scene relative to the last commit
    pub fn is_new_frame(&self, frame_num: u64) -> bool {
        self.last_frame.is_some_and(|f| f != frame_num)
    }

    /// New scene: topic and loop window start over
    pub fn reset_scene(&mut self) {
        self.topic.reset();
        self.guard.reset();
    }

    /// New session: back to construction defaults
    pub fn reset_all(&mut self) {
        self.reset_scene();
        self.recent_patterns.clear();
        self.last_frame = None;
    }

    pub fn push_pattern(&mut self, pattern: Pattern) {
        self.recent_patterns.push(pattern);
        if self.recent_patterns.len() > PATTERN_HISTORY_SIZE {
            let excess = self.recent_patterns.len() - PATTERN_HISTORY_SIZE;
            self.recent_patterns.drain(0..excess);
        }
    }

    /// SHA-256 over the canonical JSON form, hex encoded
    pub fn digest(&self) -> String {
        // Only string-keyed maps and plain values: serialization cannot fail.
        let bytes = serde_json::to_vec(self).unwrap_or_else(|_| format!("{:?}", self).into_bytes());
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Serializable snapshot of committed state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorCheckpoint {
    pub state: CommittedState,
    pub digest: String,
    pub taken_at: DateTime<Utc>,
}

impl DirectorCheckpoint {
    pub fn capture(state: &CommittedState) -> Self {
        Self {
            state: state.clone(),
            digest: state.digest(),
            taken_at: Utc::now(),
        }
    }

    /// Recompute the digest and compare
    pub fn verify(&self) -> Result<(), CheckpointError> {
        let computed = self.state.digest();
        if computed != self.digest {
            return Err(CheckpointError::DigestMismatch {
                expected: self.digest.clone(),
                computed,
            });
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_history_capped() {
        let mut state = CommittedState::new(NoveltyGuard::new());
        for p in [Pattern::A, Pattern::B, Pattern::C, Pattern::D, Pattern::E, Pattern::A, Pattern::B] {
            state.push_pattern(p);
        }
        assert_eq!(
            state.recent_patterns,
            vec![Pattern::C, Pattern::D, Pattern::E, Pattern::A, Pattern::B]
        );
    }

    #[test]
    fn test_digest_tracks_changes() {
        let mut state = CommittedState::new(NoveltyGuard::new());
        let empty = state.digest();
        assert_eq!(empty.len(), 64);
        assert_eq!(empty, CommittedState::new(NoveltyGuard::new()).digest());

        state.guard.check_and_update("東京タワー", true);
        assert_ne!(state.digest(), empty);

        state.reset_all();
        assert_eq!(state.digest(), empty);
    }

    #[test]
    fn test_new_frame_detection() {
        let mut state = CommittedState::new(NoveltyGuard::new());
        assert!(!state.is_new_frame(7));
        state.last_frame = Some(7);
        assert!(!state.is_new_frame(7));
        assert!(state.is_new_frame(8));
    }

    #[test]
    fn test_checkpoint_verify() {
        let state = CommittedState::new(NoveltyGuard::new());
        let mut checkpoint = DirectorCheckpoint::capture(&state);
        assert!(checkpoint.verify().is_ok());

        checkpoint.state.push_pattern(Pattern::A);
        assert!(matches!(
            checkpoint.verify(),
            Err(CheckpointError::DigestMismatch { .. })
        ));
    }
}
