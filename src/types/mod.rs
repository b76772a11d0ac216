//! Core types for the Director

mod speaker;
mod topic;
mod pattern;
mod loop_check;
mod evaluation;
mod finding;
mod fact_check;

pub use speaker::{Speaker, DialogueTurn};
pub use topic::{TopicState, DepthStep};
pub use pattern::Pattern;
pub use loop_check::{LoopCheckResult, InterventionStrategy};
pub use evaluation::{Status, Action, Evidence, QualityScores, DirectorEvaluation};
pub use finding::{FindingCode, Finding, CheckVerdict};
pub use fact_check::{FactCheckResult, Confidence};
