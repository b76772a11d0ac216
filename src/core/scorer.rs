//! Qualitative scorer collaborator
//!
//! The Director asks a `ResponseScorer` for five 1–5 ratings plus optional
//! coaching. Replies cross the boundary through `ScorerReply`, a strict serde
//! schema whose loose fields are coerced to documented defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use crate::error::CollaboratorError;
use crate::types::{Action, DialogueTurn, Evidence, Pattern, QualityScores, Speaker, Status};

/// Everything the scorer sees about one candidate line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub frame_description: String,
    pub speaker: Speaker,
    /// Role text for the speaker under the active pattern
    pub speaker_role: String,
    pub domains: Vec<String>,
    pub history: Vec<DialogueTurn>,
    pub partner_previous: Option<String>,
    pub candidate: String,
    pub beat_guidance: String,
    pub static_warnings: Vec<String>,
}

impl ScoreRequest {
    /// User-side prompt for an LLM scorer
    pub fn render_prompt(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("## Scene\n{}\n\n", self.frame_description));
        out.push_str(&format!(
            "## Speaker\n{} ({})\n",
            self.speaker.display_name(),
            self.speaker_role
        ));
        if !self.domains.is_empty() {
            out.push_str(&format!("domains: {}\n", self.domains.join(", ")));
        }
        out.push('\n');

        if !self.history.is_empty() {
            out.push_str("## Recent conversation\n");
            for turn in &self.history {
                out.push_str(&turn.to_transcript_line());
                out.push('\n');
            }
            out.push('\n');
        }
        if let Some(previous) = &self.partner_previous {
            out.push_str(&format!(
                "## Partner's previous line\n{}: {}\n\n",
                self.speaker.partner().display_name(),
                previous
            ));
        }

        out.push_str(&format!("## Guidance\n{}\n\n", self.beat_guidance));
        if !self.static_warnings.is_empty() {
            out.push_str("## Rule-check warnings\n");
            for warning in &self.static_warnings {
                out.push_str(&format!("- {}\n", warning));
            }
            out.push('\n');
        }

        out.push_str(&format!(
            "## Candidate\n{}: {}\n",
            self.speaker.display_name(),
            self.candidate
        ));
        out
    }
}

/// Coerced scorer output, safe to consume in the pipeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScorerVerdict {
    pub status: Option<Status>,
    pub scores: Option<QualityScores>,
    pub reason: Option<String>,
    pub issues: Vec<String>,
    pub suggestion: Option<String>,
    pub beat_stage: Option<String>,
    pub action: Action,
    pub hook: Option<String>,
    pub evidence: Option<Evidence>,
    pub next_pattern: Option<Pattern>,
    pub next_instruction: Option<String>,
}

/// Raw wire schema. Every field is optional; `into_verdict` applies defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScorerReply {
    pub status: Option<String>,
    pub scores: Option<serde_json::Map<String, Value>>,
    pub reason: Option<String>,
    pub issues: Option<Value>,
    pub suggestion: Option<String>,
    pub beat_stage: Option<String>,
    pub action: Option<String>,
    pub hook: Option<String>,
    pub evidence: Option<Value>,
    pub next_pattern: Option<String>,
    pub next_instruction: Option<String>,
}

impl ScorerReply {
    pub fn from_json_str(json: &str) -> Result<Self, CollaboratorError> {
        serde_json::from_str(json).map_err(|e| CollaboratorError::Malformed(e.to_string()))
    }

    pub fn into_verdict(self) -> ScorerVerdict {
        let scores = self.scores.as_ref().map(coerce_scores).filter(QualityScores::has_any);

        ScorerVerdict {
            status: self.status.as_deref().and_then(Status::parse),
            scores,
            reason: non_empty(self.reason),
            issues: coerce_issues(self.issues),
            suggestion: non_empty(self.suggestion),
            beat_stage: non_empty(self.beat_stage),
            action: self.action.as_deref().and_then(Action::parse).unwrap_or_default(),
            hook: non_empty(self.hook),
            evidence: coerce_evidence(self.evidence),
            next_pattern: self.next_pattern.as_deref().and_then(Pattern::parse),
            next_instruction: non_empty(self.next_instruction),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Number or numeric string, clamped to 1–5
fn coerce_axis(value: Option<&Value>) -> Option<f64> {
    let raw = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.clamp(1.0, 5.0))
}

fn coerce_scores(map: &serde_json::Map<String, Value>) -> QualityScores {
    QualityScores {
        frame_consistency: coerce_axis(map.get("frame_consistency")),
        character_consistency: coerce_axis(map.get("character_consistency")),
        connection: coerce_axis(map.get("connection")),
        information_density: coerce_axis(map.get("information_density")),
        naturalness: coerce_axis(map.get("naturalness")),
    }
}

fn coerce_issues(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => non_empty(Some(s)),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) => non_empty(Some(s)).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn coerce_evidence(value: Option<Value>) -> Option<Evidence> {
    let evidence = match value? {
        Value::Object(map) => Evidence {
            dialogue: non_empty(map.get("dialogue").and_then(Value::as_str).map(String::from)),
            frame: non_empty(map.get("frame").and_then(Value::as_str).map(String::from)),
        },
        Value::String(s) => Evidence {
            dialogue: non_empty(Some(s)),
            frame: None,
        },
        _ => return None,
    };
    (!evidence.is_empty()).then_some(evidence)
}

/// First balanced `{...}` in a free-form reply. Braces inside JSON strings
/// are ignored.
pub fn extract_first_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + idx + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

// =============================================================================
// SCORERS
// =============================================================================

/// Qualitative scorer seam. Errors are absorbed by the Director.
pub trait ResponseScorer: Send + Sync {
    fn score(&self, request: &ScoreRequest) -> Result<ScorerVerdict, CollaboratorError>;
}

/// Static-only operation: no scores, status PASS
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScorer;

impl ResponseScorer for NoopScorer {
    fn score(&self, _request: &ScoreRequest) -> Result<ScorerVerdict, CollaboratorError> {
        Ok(ScorerVerdict {
            status: Some(Status::Pass),
            ..Default::default()
        })
    }
}

/// Caller-owned chat completion. Timeouts and retries are the caller's.
pub trait ChatBackend: Send + Sync {
    fn complete(&self, system: &str, user: &str) -> Result<String, CollaboratorError>;
}

pub const SCORER_SYSTEM_PROMPT: &str = "\
You evaluate one line of a two-sister scene dialogue.
Rate 1-5 on frame_consistency, character_consistency, connection, information_density, naturalness.
Reply with a single JSON object:
{\"scores\": {...}, \"status\": \"PASS|WARN|RETRY|MODIFY\", \"reason\": \"\", \"issues\": [],
 \"suggestion\": null, \"beat_stage\": \"\", \"action\": \"NOOP|INTERVENE\", \"hook\": null,
 \"evidence\": {\"dialogue\": null, \"frame\": null}, \"next_pattern\": \"A-E or null\",
 \"next_instruction\": null}";

/// Scorer backed by an LLM chat completion
#[derive(Debug, Clone)]
pub struct LlmScorer<B: ChatBackend> {
    backend: B,
    system_prompt: String,
}

impl<B: ChatBackend> LlmScorer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            system_prompt: SCORER_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: ChatBackend> ResponseScorer for LlmScorer<B> {
    fn score(&self, request: &ScoreRequest) -> Result<ScorerVerdict, CollaboratorError> {
        let raw = self.backend.complete(&self.system_prompt, &request.render_prompt())?;
        let json = extract_first_json_object(&raw)
            .ok_or_else(|| CollaboratorError::Malformed("no JSON object in reply".to_string()))?;
        let verdict = ScorerReply::from_json_str(json)?.into_verdict();
        debug!(
            status = ?verdict.status,
            average = ?verdict.scores.and_then(|s| s.average()),
            "scorer reply parsed"
        );
        Ok(verdict)
    }
}

// =============================================================================
// TESTS
// =============================================================================
