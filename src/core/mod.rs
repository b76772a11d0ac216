//! Core engines: text signals, loop guard, beat scheduling, static checks,
//! collaborators and the Director

pub mod text_signals;
pub mod novelty_guard;
pub mod beat_tracker;
pub mod static_checks;
pub mod scorer;
pub mod fact_check;
pub mod state;
pub mod director;

pub use novelty_guard::NoveltyGuard;
pub use beat_tracker::{BeatInfo, BeatPolicy, BeatTracker, PatternInfo, PatternRules};
pub use static_checks::{StaticChecker, StaticThresholds};
pub use scorer::{
    extract_first_json_object, ChatBackend, LlmScorer, NoopScorer, ResponseScorer, ScoreRequest,
    ScorerReply, ScorerVerdict,
};
pub use fact_check::{FactChecker, FnFactChecker, NoFactChecker};
pub use state::{CommittedState, DirectorCheckpoint};
pub use director::{Director, DirectorConfig, DirectorContext, ResponseCandidate};
