//! Loop check result produced by the NoveltyGuard

use serde::{Deserialize, Serialize};

/// Escalation ladder for a detected loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterventionStrategy {
    /// Ask a probing question about the stuck noun
    ProbeQuestion,
    /// Demand a concrete number / position / size
    ConcreteDetail,
    /// Demand language that ties both speakers together
    RelationalHook,
    /// Reject the line, no soft nudge
    ForceChangeTopic,
}

impl InterventionStrategy {
    /// Soft catalogue, in rotation order
    pub const SOFT: [InterventionStrategy; 3] = [
        InterventionStrategy::ProbeQuestion,
        InterventionStrategy::ConcreteDetail,
        InterventionStrategy::RelationalHook,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::ProbeQuestion => "PROBE_QUESTION",
            Self::ConcreteDetail => "CONCRETE_DETAIL",
            Self::RelationalHook => "RELATIONAL_HOOK",
            Self::ForceChangeTopic => "FORCE_CHANGE_TOPIC",
        }
    }

    pub fn is_forced(&self) -> bool {
        matches!(self, Self::ForceChangeTopic)
    }

    /// Hint injected into the next turn's prompt
    pub fn injection(&self, stuck: &str) -> String {
        match self {
            Self::ProbeQuestion => format!(
                "「{}」の話が続いています。まだ誰も触れていない『なぜ』を一つ問いかけてください。",
                stuck
            ),
            Self::ConcreteDetail => format!(
                "「{}」について、数値・位置・大きさなど具体的な情報を一つ加えてください。",
                stuck
            ),
            Self::RelationalHook => format!(
                "「{}」を、やなとあゆ二人の経験や関係に結びつけて話してください。",
                stuck
            ),
            Self::ForceChangeTopic => format!(
                "「{}」から離れ、画面の別の対象に話題を移してください。",
                stuck
            ),
        }
    }
}

impl std::fmt::Display for InterventionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Outcome of `NoveltyGuard::check_and_update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoopCheckResult {
    /// Depth reached the soft threshold
    pub loop_detected: bool,
    /// Consecutive turns (ending now) sharing at least one noun
    pub topic_depth: usize,
    /// Nouns shared across the whole streak
    pub stuck_nouns: Vec<String>,
    /// Nouns extracted from this turn
    pub nouns: Vec<String>,
    /// Recommended intervention, if any
    pub strategy: Option<InterventionStrategy>,
    /// Prompt hint for the next turn
    pub injection: Option<String>,
}

impl LoopCheckResult {
    /// Result for input that yields no usable nouns
    pub fn clear() -> Self {
        Self::default()
    }

    pub fn is_forced(&self) -> bool {
        self.strategy.map(|s| s.is_forced()).unwrap_or(false)
    }

    /// Loop detected but a soft nudge is enough
    pub fn is_soft(&self) -> bool {
        self.loop_detected && !self.is_forced()
    }

    /// Stuck nouns joined for reasons / prompts
    pub fn stuck_label(&self) -> String {
        self.stuck_nouns.join("・")
    }
}
