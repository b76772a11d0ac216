//! Topic state: the single current conversational focus
//!
//! Depth ladder:
//! - DISCOVER (0) → SURFACE (1) → WHY (2) → EXPAND (3, saturates)

use serde::{Deserialize, Serialize};
use crate::{MAX_FORBIDDEN_TOPICS, MAX_HOOK_DEPTH};

/// How deep the conversation has dug into the current hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepthStep {
    Discover,
    Surface,
    Why,
    Expand,
}

impl DepthStep {
    /// Step for a given depth, capped at EXPAND
    pub fn from_depth(depth: u8) -> Self {
        match depth.min(MAX_HOOK_DEPTH) {
            0 => Self::Discover,
            1 => Self::Surface,
            2 => Self::Why,
            _ => Self::Expand,
        }
    }

    /// Coaching line for the next turn at this step
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Discover => "見つけたものを具体的に名指しする",
            Self::Surface => "見た目・数値・位置など表面の事実を足す",
            Self::Why => "なぜそうなっているのかを掘り下げる",
            Self::Expand => "関連する話題へ自然に広げる",
        }
    }
}

impl std::fmt::Display for DepthStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Discover => "DISCOVER",
            Self::Surface => "SURFACE",
            Self::Why => "WHY",
            Self::Expand => "EXPAND",
        };
        write!(f, "{}", name)
    }
}

/// Current conversational focus. Mutated only through the methods below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicState {
    focus_hook: String,
    hook_depth: u8,
    depth_step: DepthStep,
    turns_on_hook: u32,
    forbidden_topics: Vec<String>,
    must_include: Vec<String>,
}

impl Default for TopicState {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicState {
    pub fn new() -> Self {
        Self {
            focus_hook: String::new(),
            hook_depth: 0,
            depth_step: DepthStep::Discover,
            turns_on_hook: 0,
            forbidden_topics: Vec::new(),
            must_include: Vec::new(),
        }
    }

    pub fn focus_hook(&self) -> &str {
        &self.focus_hook
    }

    pub fn hook_depth(&self) -> u8 {
        self.hook_depth
    }

    pub fn depth_step(&self) -> DepthStep {
        self.depth_step
    }

    pub fn turns_on_hook(&self) -> u32 {
        self.turns_on_hook
    }

    /// Most recently abandoned hooks, oldest first
    pub fn forbidden_topics(&self) -> &[String] {
        &self.forbidden_topics
    }

    pub fn must_include(&self) -> &[String] {
        &self.must_include
    }

    pub fn has_hook(&self) -> bool {
        !self.focus_hook.is_empty()
    }

    pub fn is_forbidden(&self, hook: &str) -> bool {
        self.forbidden_topics.iter().any(|t| t == hook)
    }

    /// A hook may only be left after at least one turn on it
    pub fn can_switch_topic(&self) -> bool {
        self.turns_on_hook >= 1
    }

    /// One more turn on the same hook
    pub fn advance_depth(&mut self) {
        self.hook_depth = (self.hook_depth + 1).min(MAX_HOOK_DEPTH);
        self.depth_step = DepthStep::from_depth(self.hook_depth);
        self.turns_on_hook = self.turns_on_hook.saturating_add(1);
    }

    /// Count a committed turn that kept the hook without digging deeper
    pub fn stay_on_hook(&mut self) {
        self.turns_on_hook = self.turns_on_hook.saturating_add(1);
    }

    /// Leave the current hook for `new_hook`.
    ///
    /// The old hook (if any) is pushed onto `forbidden_topics`, which keeps
    /// the last `MAX_FORBIDDEN_TOPICS` entries.
    pub fn switch_topic(&mut self, new_hook: impl Into<String>) {
        let new_hook = new_hook.into();
        if self.has_hook() {
            let old = std::mem::take(&mut self.focus_hook);
            self.forbidden_topics.retain(|t| *t != old);
            self.forbidden_topics.push(old);
            if self.forbidden_topics.len() > MAX_FORBIDDEN_TOPICS {
                let excess = self.forbidden_topics.len() - MAX_FORBIDDEN_TOPICS;
                self.forbidden_topics.drain(0..excess);
            }
        }
        self.forbidden_topics.retain(|t| *t != new_hook);
        self.focus_hook = new_hook;
        self.hook_depth = 0;
        self.depth_step = DepthStep::Discover;
        self.turns_on_hook = 0;
        self.must_include = if self.focus_hook.is_empty() {
            Vec::new()
        } else {
            vec![self.focus_hook.clone()]
        };
    }

    /// Back to construction defaults
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

// =============================================================================
// TESTS
// =============================================================================
