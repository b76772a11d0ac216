//! Director: per-conversation quality gate
//!
//! Pipeline for one candidate line:
//! 1. Frame change → fresh topic space
//! 2. Loop pre-check (dry run) → FORCE_CHANGE_TOPIC is a RETRY
//! 3. Speculative hook update
//! 4. Static checks (format → tone → praise → scatter)
//! 5. Fact check (optional, never rejects)
//! 6. Qualitative scorer
//! 7. Warning aggregation → action
//! 8. Premature-switch veto
//! 9. Beat / pattern selection
//! 10. Finalize
//!
//! `evaluate_response` never touches committed state. `commit_evaluation`
//! is the only writer.

use std::path::Path;
use std::sync::Arc;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::{LOOP_FORCE_DEPTH, NOVELTY_WINDOW_SIZE, SCORE_RETRY_BELOW, SCORE_WARN_BELOW};
use crate::core::fact_check::FactChecker;
use crate::core::scorer::{ResponseScorer, ScoreRequest, ScorerVerdict};
use crate::core::state::{CommittedState, DirectorCheckpoint};
use crate::core::static_checks::{StaticChecker, StaticThresholds};
use crate::core::text_signals;
use crate::core::{BeatTracker, NoveltyGuard};
use crate::error::{CheckpointError, ConfigError};
use crate::types::{
    Action, DialogueTurn, DirectorEvaluation, Evidence, FactCheckResult, Finding, FindingCode,
    LoopCheckResult, Pattern, QualityScores, Speaker, Status, TopicState,
};

// =============================================================================
// CONFIG & CONTEXT
// =============================================================================

/// Tunable Director parameters. Defaults come from the crate constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    pub static_thresholds: StaticThresholds,
    /// Average below this → RETRY
    pub score_retry_below: f64,
    /// Average below this → WARN
    pub score_warn_below: f64,
    pub fact_check_enabled: bool,
    pub novelty_window: usize,
    pub loop_force_depth: usize,
    /// Max chars of a dialogue/frame evidence excerpt
    pub evidence_chars: usize,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            static_thresholds: StaticThresholds::default(),
            score_retry_below: SCORE_RETRY_BELOW,
            score_warn_below: SCORE_WARN_BELOW,
            fact_check_enabled: false,
            novelty_window: NOVELTY_WINDOW_SIZE,
            loop_force_depth: LOOP_FORCE_DEPTH,
            evidence_chars: 60,
        }
    }
}

impl DirectorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1.0..=5.0).contains(&self.score_retry_below) || self.score_warn_below < self.score_retry_below {
            return Err(ConfigError::Invalid(format!(
                "score cut-offs out of order: retry {} / warn {}",
                self.score_retry_below, self.score_warn_below
            )));
        }
        let t = &self.static_thresholds;
        if t.format_warn_lines > t.format_retry_lines {
            return Err(ConfigError::Invalid("format warn lines exceed retry lines".to_string()));
        }
        if self.novelty_window == 0 {
            return Err(ConfigError::Invalid("novelty window must be positive".to_string()));
        }
        Ok(())
    }
}

/// Read-only context shared by every Director of a process
#[derive(Debug, Clone)]
pub struct DirectorContext {
    pub tracker: BeatTracker,
    pub config: DirectorConfig,
}

impl DirectorContext {
    pub fn new(tracker: BeatTracker, config: DirectorConfig) -> Self {
        Self { tracker, config }
    }

    /// Built-in beat policy with default config
    pub fn builtin() -> Result<Self, ConfigError> {
        Ok(Self::new(BeatTracker::builtin()?, DirectorConfig::default()))
    }

    pub fn from_policy_path(path: &Path, config: DirectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(BeatTracker::from_path(path)?, config))
    }

    fn new_guard(&self) -> NoveltyGuard {
        NoveltyGuard::with_limits(self.config.novelty_window, self.config.loop_force_depth)
    }
}

// =============================================================================
// CANDIDATE
// =============================================================================

/// One candidate line plus everything known about its context
#[derive(Debug, Clone, Copy)]
pub struct ResponseCandidate<'a> {
    pub frame_description: &'a str,
    pub speaker: Speaker,
    pub text: &'a str,
    pub partner_previous: Option<&'a str>,
    pub speaker_domains: &'a [String],
    pub history: &'a [DialogueTurn],
    /// Role text override; defaults to the role of the last committed pattern
    pub speaker_role: Option<&'a str>,
    pub turn_number: u32,
    pub frame_num: u64,
}

impl<'a> ResponseCandidate<'a> {
    pub fn new(speaker: Speaker, text: &'a str, frame_description: &'a str) -> Self {
        Self {
            frame_description,
            speaker,
            text,
            partner_previous: None,
            speaker_domains: &[],
            history: &[],
            speaker_role: None,
            turn_number: 1,
            frame_num: 0,
        }
    }

    pub fn turn(mut self, turn_number: u32) -> Self {
        self.turn_number = turn_number;
        self
    }

    pub fn frame(mut self, frame_num: u64) -> Self {
        self.frame_num = frame_num;
        self
    }

    pub fn partner_previous(mut self, text: &'a str) -> Self {
        self.partner_previous = Some(text);
        self
    }

    pub fn domains(mut self, domains: &'a [String]) -> Self {
        self.speaker_domains = domains;
        self
    }

    pub fn history(mut self, history: &'a [DialogueTurn]) -> Self {
        self.history = history;
        self
    }

    pub fn role(mut self, role: &'a str) -> Self {
        self.speaker_role = Some(role);
        self
    }
}

// =============================================================================
// DIRECTOR
// =============================================================================

/// Hook outcome of step 3
struct HookUpdate {
    hook: Option<String>,
    candidate: TopicState,
    premature: bool,
    abandoned: bool,
}

/// Accumulates the parts of an evaluation while the pipeline runs
struct Draft<'c> {
    candidate: &'c ResponseCandidate<'c>,
    beat_stage: String,
    /// Committed topic as seen before this call
    committed_topic: TopicState,
    novelty: LoopCheckResult,
    findings: Vec<Finding>,
    coaching: Vec<String>,
}

impl Draft<'_> {
    fn coach(&mut self, note: impl Into<String>) {
        let note = note.into();
        if !note.is_empty() && !self.coaching.contains(&note) {
            self.coaching.push(note);
        }
    }

    /// Terminal RETRY: carries the pre-call topic, nothing to commit
    fn retry(self, reason: String, suggestion: Option<String>, scores: Option<QualityScores>) -> DirectorEvaluation {
        DirectorEvaluation {
            status: Status::Retry,
            reason,
            suggestion,
            next_pattern: None,
            next_instruction: None,
            action: Action::Noop,
            hook: None,
            evidence: None,
            beat_stage: self.beat_stage,
            topic: self.committed_topic,
            novelty_info: self.novelty,
            findings: self.findings,
            scores,
            fact_check: None,
            speaker: self.candidate.speaker,
            turn_number: self.candidate.turn_number,
            frame_num: self.candidate.frame_num,
            timestamp: Utc::now(),
        }
    }
}

pub struct Director {
    ctx: Arc<DirectorContext>,
    scorer: Arc<dyn ResponseScorer>,
    fact_checker: Option<Arc<dyn FactChecker>>,
    checker: StaticChecker,
    state: CommittedState,
}

impl Director {
    pub fn new(ctx: Arc<DirectorContext>, scorer: Arc<dyn ResponseScorer>) -> Self {
        let checker = StaticChecker::new(ctx.config.static_thresholds);
        let state = CommittedState::new(ctx.new_guard());
        Self {
            ctx,
            scorer,
            fact_checker: None,
            checker,
            state,
        }
    }

    pub fn with_fact_checker(mut self, fact_checker: Arc<dyn FactChecker>) -> Self {
        self.fact_checker = Some(fact_checker);
        self
    }

    pub fn context(&self) -> &DirectorContext {
        &self.ctx
    }

    pub fn tracker(&self) -> &BeatTracker {
        &self.ctx.tracker
    }

    pub fn topic_state(&self) -> &TopicState {
        &self.state.topic
    }

    pub fn novelty_guard(&self) -> &NoveltyGuard {
        &self.state.guard
    }

    pub fn recent_patterns(&self) -> &[Pattern] {
        &self.state.recent_patterns
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.state.last_frame
    }

    // -------------------------------------------------------------------------
    // Evaluate
    // -------------------------------------------------------------------------

    /// Judge one candidate line. Committed state is never modified.
    pub fn evaluate_response(&self, candidate: &ResponseCandidate<'_>) -> DirectorEvaluation {
        let tracker = &self.ctx.tracker;
        let config = &self.ctx.config;

        // 1. Frame change: the speculation starts from a fresh topic space
        let mut speculation = self.state.clone();
        if speculation.is_new_frame(candidate.frame_num) {
            debug!(
                from = ?speculation.last_frame,
                to = candidate.frame_num,
                "frame changed, topic space reset"
            );
            speculation.reset_scene();
        }

        let mut draft = Draft {
            candidate,
            beat_stage: tracker.get_current_beat(candidate.turn_number).to_string(),
            committed_topic: self.state.topic.clone(),
            novelty: LoopCheckResult::clear(),
            findings: Vec::new(),
            coaching: Vec::new(),
        };

        // 2. Loop pre-check
        draft.novelty = speculation.guard.check_and_update(candidate.text, false);
        if draft.novelty.is_forced() {
            return self.forced_topic_change(draft);
        }
        let soft_loop = draft.novelty.is_soft();
        if soft_loop {
            let note = draft.novelty.injection.clone().unwrap_or_default();
            draft.findings.push(Finding::warn(FindingCode::L502_LOOP_SOFT, note.clone()));
            draft.coach(note);
        }

        // 3. Speculative hook update
        let hook = self.update_hook(&speculation.topic, candidate, &draft.novelty.nouns);
        if hook.abandoned {
            let note = format!(
                "「{}」は一度離れた話題です。戻るなら新しい切り口で。",
                hook.hook.as_deref().unwrap_or_default()
            );
            draft.findings.push(Finding::warn(FindingCode::H702_ABANDONED_HOOK, note.clone()));
            draft.coach(note);
        }

        // 4. Static checks
        let forbidden = tracker.forbidden_for(candidate.speaker);
        let verdict = self.checker.run(candidate.speaker, candidate.text, forbidden);
        if verdict.is_retry() {
            let reason = verdict
                .findings
                .iter()
                .find(|f| f.severity == Status::Retry)
                .map(|f| format!("[{}] {}", f.code.code(), f.message))
                .unwrap_or_default();
            draft.findings.extend(verdict.findings);
            debug!(speaker = %candidate.speaker, turn = candidate.turn_number, %reason, "static check rejected line");
            return draft.retry(reason, None, None);
        }
        for finding in &verdict.findings {
            draft.coach(finding.message.clone());
        }
        draft.findings.extend(verdict.findings);
        let mut status = verdict.status;
        if hook.abandoned {
            status = status.worst(Status::Warn);
        }

        // 5. Fact check
        let fact_check = self.run_fact_check(candidate);
        let correction = fact_check.as_ref().filter(|r| r.needs_correction()).map(FactCheckResult::correction_instruction);
        if let Some(instruction) = &correction {
            draft.findings.push(Finding::new(
                FindingCode::K801_FACT_CORRECTION,
                Status::Pass,
                instruction.clone(),
            ));
        }

        // 6. Qualitative scorer
        let request = self.score_request(candidate, &speculation, &draft);
        let reply = match self.scorer.score(&request) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(speaker = %candidate.speaker, turn = candidate.turn_number, error = %err, "scorer failed, degrading to PASS");
                draft.findings.push(Finding::new(
                    FindingCode::Q603_SCORER_UNAVAILABLE,
                    Status::Pass,
                    err.to_string(),
                ));
                ScorerVerdict::default()
            }
        };

        let average = reply.scores.and_then(|s| s.average());
        let scorer_status = match average {
            Some(avg) if avg < config.score_retry_below => {
                let reason = format!("[{}] 平均スコア {:.2} が基準 {:.1} 未満", FindingCode::Q601_SCORE_LOW.code(), avg, config.score_retry_below);
                draft.findings.push(Finding::retry(FindingCode::Q601_SCORE_LOW, reason.clone()));
                return draft.retry(reason, reply.suggestion, reply.scores);
            }
            Some(avg) if avg < config.score_warn_below => {
                let note = format!("平均スコア {:.2} はやや低め", avg);
                draft.findings.push(Finding::warn(FindingCode::Q602_SCORE_BORDERLINE, note));
                Status::Warn
            }
            Some(_) => Status::Pass,
            // Scorer's own status only counts when it returned no scores
            None => reply.status.unwrap_or(Status::Pass),
        };
        if scorer_status == Status::Retry {
            let reason = format!(
                "[{}] {}",
                FindingCode::Q604_SCORER_REJECTED.code(),
                reply.reason.clone().unwrap_or_else(|| FindingCode::Q604_SCORER_REJECTED.description().to_string())
            );
            draft.findings.push(Finding::retry(FindingCode::Q604_SCORER_REJECTED, reason.clone()));
            return draft.retry(reason, reply.suggestion, reply.scores);
        }
        if !reply.issues.is_empty() {
            draft.findings.push(Finding::new(
                FindingCode::Q605_SCORER_ISSUES,
                Status::Pass,
                reply.issues.join(" / "),
            ));
            for issue in &reply.issues {
                draft.coach(issue.clone());
            }
        }
        status = status.worst(scorer_status);

        // 7. Aggregation
        let mut action = reply.action;
        let mut suggestion = reply.suggestion.clone();
        if status != Status::Pass || soft_loop || !reply.issues.is_empty() || correction.is_some() {
            action = Action::Intervene;
        }

        // 8. Premature switch: veto and coach
        let mut topic = hook.candidate;
        if hook.premature {
            let current = speculation.topic.focus_hook().to_string();
            let note = format!(
                "まだ「{}」を掘り下げきっていません。{}。",
                current,
                speculation.topic.depth_step().guidance()
            );
            draft.findings.push(Finding::new(FindingCode::H701_PREMATURE_SWITCH, Status::Pass, note.clone()));
            if status == Status::Pass {
                action = Action::Intervene;
                suggestion.get_or_insert(note.clone());
            }
            draft.coach(note);
            let mut held = speculation.topic.clone();
            held.stay_on_hook();
            topic = held;
        }

        // 9. Pattern selection
        let recent = &speculation.recent_patterns;
        let next_pattern = match action {
            Action::Noop => None,
            Action::Intervene if correction.is_some() => Some(Pattern::CORRECTION),
            Action::Intervene if soft_loop && tracker.is_pattern_allowed(Pattern::DIGRESSION, recent) => {
                Some(Pattern::DIGRESSION)
            }
            Action::Intervene => Some(
                reply
                    .next_pattern
                    .filter(|p| tracker.is_pattern_allowed(*p, recent))
                    .unwrap_or_else(|| tracker.suggest_pattern(candidate.turn_number, recent)),
            ),
        };

        let next_instruction = match action {
            Action::Noop => None,
            Action::Intervene => {
                let mut parts: Vec<String> = Vec::new();
                parts.extend(correction.clone());
                parts.extend(reply.next_instruction.clone());
                for note in &draft.coaching {
                    if !parts.contains(note) {
                        parts.push(note.clone());
                    }
                }
                (!parts.is_empty()).then(|| parts.join("\n"))
            }
        };

        // 10. Finalize
        let hook_term = reply
            .hook
            .clone()
            .or_else(|| Some(topic.focus_hook().to_string()).filter(|h| !h.is_empty()));
        let evidence = match action {
            Action::Noop => reply.evidence.clone(),
            Action::Intervene => reply.evidence.clone().or_else(|| {
                let needle = hook_term.as_deref().unwrap_or_default();
                let evidence = Evidence {
                    dialogue: text_signals::excerpt(candidate.text, needle, config.evidence_chars),
                    frame: text_signals::excerpt(candidate.frame_description, needle, config.evidence_chars),
                };
                (!evidence.is_empty()).then_some(evidence)
            }),
        };
        let reason = reply
            .reason
            .clone()
            .or_else(|| draft.coaching.first().cloned())
            .unwrap_or_else(|| "OK".to_string());

        let evaluation = DirectorEvaluation {
            status,
            reason,
            suggestion,
            next_pattern,
            next_instruction,
            action,
            hook: hook_term,
            evidence,
            beat_stage: draft.beat_stage,
            topic,
            novelty_info: draft.novelty,
            findings: draft.findings,
            scores: reply.scores,
            fact_check,
            speaker: candidate.speaker,
            turn_number: candidate.turn_number,
            frame_num: candidate.frame_num,
            timestamp: Utc::now(),
        };
        debug!(
            speaker = %candidate.speaker,
            turn = candidate.turn_number,
            frame = candidate.frame_num,
            summary = %evaluation.to_parseable_string(),
            "evaluation complete"
        );
        evaluation
    }

    /// RETRY with pattern `D`. Commit ignores RETRY, so the caller must carry
    /// `next_pattern` and `next_instruction` into the regeneration prompt.
    fn forced_topic_change(&self, mut draft: Draft<'_>) -> DirectorEvaluation {
        let stuck = draft.novelty.stuck_label();
        let reason = format!(
            "[{}] 「{}」の話題が{}ターン続いています。",
            draft.novelty.strategy.map(|s| s.code()).unwrap_or_default(),
            stuck,
            draft.novelty.topic_depth
        );
        draft.findings.push(Finding::retry(FindingCode::L501_LOOP_FORCE_CHANGE, reason.clone()));
        info!(
            speaker = %draft.candidate.speaker,
            turn = draft.candidate.turn_number,
            depth = draft.novelty.topic_depth,
            stuck = %stuck,
            "loop too deep, forcing topic change"
        );
        let injection = draft.novelty.injection.clone();
        let mut evaluation = draft.retry(reason, injection.clone(), None);
        evaluation.next_pattern = Some(Pattern::DIGRESSION);
        evaluation.next_instruction = injection;
        evaluation.action = Action::Intervene;
        evaluation
    }

    /// Pick a hook and apply it to a copy of `base`
    fn update_hook(&self, base: &TopicState, candidate: &ResponseCandidate<'_>, nouns: &[String]) -> HookUpdate {
        let hook = select_hook(base.focus_hook(), nouns, candidate.frame_description);
        let mut next = base.clone();
        let mut premature = false;
        let mut abandoned = false;

        if let Some(h) = &hook {
            if !next.has_hook() {
                next.switch_topic(h.clone());
            } else if h == next.focus_hook() {
                next.advance_depth();
            } else {
                abandoned = next.is_forbidden(h);
                if next.can_switch_topic() {
                    next.switch_topic(h.clone());
                } else {
                    premature = true;
                }
            }
        }

        HookUpdate {
            hook,
            candidate: next,
            premature,
            abandoned,
        }
    }

    fn run_fact_check(&self, candidate: &ResponseCandidate<'_>) -> Option<FactCheckResult> {
        if !self.ctx.config.fact_check_enabled {
            return None;
        }
        let checker = self.fact_checker.as_ref()?;
        match checker.check(candidate.text, candidate.frame_description) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(turn = candidate.turn_number, error = %err, "fact check failed, skipped");
                None
            }
        }
    }

    fn score_request(&self, candidate: &ResponseCandidate<'_>, speculation: &CommittedState, draft: &Draft<'_>) -> ScoreRequest {
        let tracker = &self.ctx.tracker;
        let last_pattern = speculation.recent_patterns.last().copied();
        let speaker_role = candidate
            .speaker_role
            .map(String::from)
            .or_else(|| last_pattern.map(|p| tracker.get_pattern_info(p).role_for(candidate.speaker).to_string()))
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| candidate.speaker.display_name().to_string());

        ScoreRequest {
            frame_description: candidate.frame_description.to_string(),
            speaker: candidate.speaker,
            speaker_role,
            domains: candidate.speaker_domains.to_vec(),
            history: candidate.history.to_vec(),
            partner_previous: candidate.partner_previous.map(String::from),
            candidate: candidate.text.to_string(),
            beat_guidance: tracker.render_guidance(candidate.turn_number, candidate.speaker, last_pattern),
            static_warnings: draft.coaching.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Commit
    // -------------------------------------------------------------------------

    /// Persist an accepted evaluation. A RETRY evaluation is ignored.
    pub fn commit_evaluation(&mut self, text: &str, evaluation: &DirectorEvaluation) {
        if evaluation.is_retry() {
            debug!(turn = evaluation.turn_number, "RETRY evaluation not committed");
            return;
        }

        if self.state.is_new_frame(evaluation.frame_num) {
            self.state.reset_scene();
        }
        self.state.last_frame = Some(evaluation.frame_num);
        self.state.topic = evaluation.topic.clone();
        self.state.guard.check_and_update(text, true);
        if let Some(pattern) = evaluation.next_pattern {
            self.state.push_pattern(pattern);
        }

        info!(
            speaker = %evaluation.speaker,
            turn = evaluation.turn_number,
            frame = evaluation.frame_num,
            status = %evaluation.status,
            hook = %self.state.topic.focus_hook(),
            depth = %self.state.topic.depth_step(),
            "evaluation committed"
        );
    }

    pub fn reset_topic_state(&mut self) {
        self.state.topic.reset();
    }

    /// Topic, loop window and pattern history back to defaults
    pub fn reset_for_new_session(&mut self) {
        self.state.reset_all();
        info!("director reset for new session");
    }

    // -------------------------------------------------------------------------
    // Checkpoints
    // -------------------------------------------------------------------------

    pub fn state_digest(&self) -> String {
        self.state.digest()
    }

    pub fn checkpoint(&self) -> DirectorCheckpoint {
        DirectorCheckpoint::capture(&self.state)
    }

    pub fn restore(&mut self, checkpoint: DirectorCheckpoint) -> Result<(), CheckpointError> {
        checkpoint.verify()?;
        self.state = checkpoint.state;
        Ok(())
    }
}

/// Hook for a candidate line.
///
/// Current hook if mentioned, else the first noun also in the frame, else
/// the first noun. A line without nouns stays on the current hook or seeds
/// one from the frame.
fn select_hook(current: &str, nouns: &[String], frame_description: &str) -> Option<String> {
    if !current.is_empty() && nouns.iter().any(|n| n == current) {
        return Some(current.to_string());
    }
    let frame_nouns = text_signals::extract_nouns(frame_description);
    if nouns.is_empty() {
        if !current.is_empty() {
            return Some(current.to_string());
        }
        return frame_nouns.into_iter().next();
    }
    nouns
        .iter()
        .find(|n| frame_nouns.contains(n))
        .or_else(|| nouns.first())
        .cloned()
}

// =============================================================================
// TESTS
// =============================================================================
