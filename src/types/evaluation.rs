//! DirectorEvaluation: the immutable result of one evaluation call

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::types::{
    DepthStep, FactCheckResult, Finding, FindingCode, LoopCheckResult, Pattern, Speaker, TopicState,
};

/// Gate decision for a candidate line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pass,
    Warn,
    Modify,
    Retry,
}

impl Status {
    /// Lenient parse for scorer replies; unknown → `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PASS" => Some(Self::Pass),
            "WARN" => Some(Self::Warn),
            "MODIFY" => Some(Self::Modify),
            "RETRY" => Some(Self::Retry),
            _ => None,
        }
    }

    /// Line may be used (and committed)
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Retry)
    }

    /// The more severe of two statuses
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }

    /// Most severe status in a finding list (PASS if empty)
    pub fn of_findings(findings: &[Finding]) -> Self {
        findings
            .iter()
            .map(|f| f.severity)
            .fold(Status::Pass, Status::worst)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Modify => "MODIFY",
            Self::Retry => "RETRY",
        };
        write!(f, "{}", name)
    }
}

/// Whether the next turn's prompt gets an injected hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[default]
    Noop,
    Intervene,
}

impl Action {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NOOP" => Some(Self::Noop),
            "INTERVENE" => Some(Self::Intervene),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Noop => write!(f, "NOOP"),
            Self::Intervene => write!(f, "INTERVENE"),
        }
    }
}

/// Excerpts justifying an intervention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Evidence {
    pub dialogue: Option<String>,
    pub frame: Option<String>,
}

impl Evidence {
    pub fn is_empty(&self) -> bool {
        self.dialogue.is_none() && self.frame.is_none()
    }
}

/// The five 1–5 rating axes returned by the scorer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct QualityScores {
    pub frame_consistency: Option<f64>,
    pub character_consistency: Option<f64>,
    pub connection: Option<f64>,
    pub information_density: Option<f64>,
    pub naturalness: Option<f64>,
}

impl QualityScores {
    fn values(&self) -> [Option<f64>; 5] {
        [
            self.frame_consistency,
            self.character_consistency,
            self.connection,
            self.information_density,
            self.naturalness,
        ]
    }

    /// At least one axis carries a number
    pub fn has_any(&self) -> bool {
        self.values().iter().any(|v| v.is_some())
    }

    /// Mean of the axes that were returned
    pub fn average(&self) -> Option<f64> {
        let present: Vec<f64> = self.values().iter().flatten().copied().collect();
        if present.is_empty() {
            return None;
        }
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Result of `Director::evaluate_response`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorEvaluation {
    pub status: Status,
    pub reason: String,
    pub suggestion: Option<String>,
    pub next_pattern: Option<Pattern>,
    pub next_instruction: Option<String>,
    pub action: Action,
    pub hook: Option<String>,
    pub evidence: Option<Evidence>,
    pub beat_stage: String,
    /// Candidate topic state (written only by commit)
    pub topic: TopicState,
    pub novelty_info: LoopCheckResult,
    pub findings: Vec<Finding>,
    pub scores: Option<QualityScores>,
    pub fact_check: Option<FactCheckResult>,
    pub speaker: Speaker,
    pub turn_number: u32,
    pub frame_num: u64,
    pub timestamp: DateTime<Utc>,
}

impl DirectorEvaluation {
    pub fn is_accepted(&self) -> bool {
        self.status.is_accepted()
    }

    pub fn is_retry(&self) -> bool {
        self.status == Status::Retry
    }

    pub fn needs_intervention(&self) -> bool {
        self.action == Action::Intervene
    }

    pub fn has_finding(&self, code: FindingCode) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    pub fn focus_hook(&self) -> &str {
        self.topic.focus_hook()
    }

    pub fn hook_depth(&self) -> u8 {
        self.topic.hook_depth()
    }

    pub fn depth_step(&self) -> DepthStep {
        self.topic.depth_step()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// One-line summary for logs
    pub fn to_parseable_string(&self) -> String {
        format!(
            "status={} | action={} | pattern={} | beat={} | hook={} | depth={} | loop={} | reason={}",
            self.status,
            self.action,
            self.next_pattern.map(|p| p.letter()).unwrap_or("-"),
            self.beat_stage,
            if self.focus_hook().is_empty() { "-" } else { self.focus_hook() },
            self.depth_step(),
            self.novelty_info.topic_depth,
            self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order() {
        assert_eq!(Status::Pass.worst(Status::Warn), Status::Warn);
        assert_eq!(Status::Retry.worst(Status::Warn), Status::Retry);
        assert_eq!(Status::Modify.worst(Status::Pass), Status::Modify);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(Status::parse("pass"), Some(Status::Pass));
        assert_eq!(Status::parse(" RETRY "), Some(Status::Retry));
        assert_eq!(Status::parse("ok"), None);
    }

    #[test]
    fn test_scores_average_partial() {
        let scores = QualityScores {
            frame_consistency: Some(4.0),
            naturalness: Some(3.0),
            ..Default::default()
        };
        assert_eq!(scores.average(), Some(3.5));
        assert!(QualityScores::default().average().is_none());
    }
}
