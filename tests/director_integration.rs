//! Integration tests for the Director
//!
//! Full path: candidate → evaluate_response → commit_evaluation, with
//! deterministic stub scorers.

use std::sync::Arc;
use pretty_assertions::assert_eq;
use duo_director::core::{
    Director, DirectorConfig, DirectorContext, FnFactChecker, NoopScorer, ResponseCandidate,
    ResponseScorer, ScoreRequest, ScorerVerdict, BeatTracker,
};
use duo_director::error::{CheckpointError, CollaboratorError};
use duo_director::types::{
    Action, Confidence, DirectorEvaluation, FactCheckResult, FindingCode, InterventionStrategy,
    Pattern, QualityScores, Speaker, Status, TopicState,
};

const FRAME: &str = "夜の東京タワーと公園の噴水";

/// Same five scores for every line
struct FlatScorer(f64);

impl ResponseScorer for FlatScorer {
    fn score(&self, _request: &ScoreRequest) -> Result<ScorerVerdict, CollaboratorError> {
        let v = Some(self.0);
        Ok(ScorerVerdict {
            scores: Some(QualityScores {
                frame_consistency: v,
                character_consistency: v,
                connection: v,
                information_density: v,
                naturalness: v,
            }),
            status: Some(Status::Pass),
            ..Default::default()
        })
    }
}

fn context() -> Arc<DirectorContext> {
    Arc::new(DirectorContext::builtin().unwrap())
}

fn director() -> Director {
    Director::new(context(), Arc::new(FlatScorer(4.5)))
}

/// Evaluate and commit, asserting the line was accepted
fn accept(director: &mut Director, speaker: Speaker, text: &str, turn: u32) -> DirectorEvaluation {
    let candidate = ResponseCandidate::new(speaker, text, FRAME).turn(turn);
    let eval = director.evaluate_response(&candidate);
    assert!(eval.is_accepted(), "turn {} rejected: {}", turn, eval.reason);
    director.commit_evaluation(text, &eval);
    eval
}

/// Evaluation with the timestamp blanked, for equality checks
fn normalized(mut eval: DirectorEvaluation) -> DirectorEvaluation {
    eval.timestamp = chrono::DateTime::<chrono::Utc>::MIN_UTC;
    eval
}

#[test]
fn test_retry_has_no_side_effects() {
    let mut d = director();
    accept(&mut d, Speaker::Yana, "見て、タワーが光ってるじゃん！", 1);
    accept(&mut d, Speaker::Ayu, "姉様、実はタワーは電波塔です。", 2);

    let before = d.state_digest();
    let topic_before = d.topic_state().clone();

    let rejected = [
        "あのタワーは高いです。",
        "東京タワー、すごいじゃん！\n見て！\nほら！\nあっ！\nへぇ！\nわぁ！\nうわ！\nやった！",
        "あっ、姉様のタワーじゃん！",
    ];
    for text in rejected {
        let candidate = ResponseCandidate::new(Speaker::Yana, text, FRAME).turn(3);
        let first = d.evaluate_response(&candidate);
        let second = d.evaluate_response(&candidate);
        assert!(first.is_retry(), "expected RETRY for {:?}", text);
        assert_eq!(normalized(first), normalized(second));
        assert_eq!(d.state_digest(), before);
        assert_eq!(d.topic_state(), &topic_before);
    }
}

#[test]
fn test_accepted_but_unused_evaluation_changes_nothing() {
    let d = director();
    let before = d.state_digest();
    let candidate = ResponseCandidate::new(Speaker::Yana, "見て、タワーが光ってるじゃん！", FRAME);
    let eval = d.evaluate_response(&candidate);
    assert!(eval.is_accepted());
    assert_eq!(d.state_digest(), before);
}

#[test]
fn test_five_identical_commits_force_topic_change() {
    let mut d = director();
    let text = "東京タワー、すごいじゃん！";
    for turn in 1..=5 {
        accept(&mut d, Speaker::Yana, text, turn);
    }
    assert_eq!(d.recent_patterns(), &[Pattern::D, Pattern::D]);

    let before = d.state_digest();
    let candidate = ResponseCandidate::new(Speaker::Yana, text, FRAME).turn(6);
    let eval = d.evaluate_response(&candidate);

    assert_eq!(eval.status, Status::Retry);
    assert_eq!(eval.novelty_info.strategy, Some(InterventionStrategy::ForceChangeTopic));
    assert_eq!(eval.novelty_info.topic_depth, 5);
    assert!(eval.reason.contains("FORCE_CHANGE_TOPIC"));
    assert!(eval.reason.contains("東京"));
    assert_eq!(eval.next_pattern, Some(Pattern::DIGRESSION));
    assert!(eval.has_finding(FindingCode::L501_LOOP_FORCE_CHANGE));
    assert!(eval.next_instruction.is_some());
    assert_eq!(d.state_digest(), before);

    // The D only travels with the evaluation; committing it is a no-op
    d.commit_evaluation(text, &eval);
    assert_eq!(d.state_digest(), before);
    assert_eq!(d.recent_patterns(), &[Pattern::D, Pattern::D]);
}

#[test]
fn test_soft_loop_intervenes_with_digression() {
    let mut d = director();
    let text = "東京タワー、すごいじゃん！";
    for turn in 1..=3 {
        let eval = accept(&mut d, Speaker::Yana, text, turn);
        assert_eq!(eval.action, Action::Noop);
    }
    let eval = accept(&mut d, Speaker::Yana, text, 4);
    assert_eq!(eval.status, Status::Pass);
    assert_eq!(eval.action, Action::Intervene);
    assert_eq!(eval.next_pattern, Some(Pattern::D));
    assert!(eval.novelty_info.is_soft());
    assert!(eval.next_instruction.as_deref().unwrap().contains("東京"));
}

#[test]
fn test_eight_lines_rejected_one_line_not() {
    let d = director();
    let segments = vec!["東京タワー、すごいじゃん"; 8];

    let split = segments.join("\n");
    let eval = d.evaluate_response(&ResponseCandidate::new(Speaker::Yana, &split, FRAME));
    assert_eq!(eval.status, Status::Retry);
    assert!(eval.has_finding(FindingCode::F101_FORMAT_TOO_MANY_LINES));

    let joined = segments.join("");
    let eval = d.evaluate_response(&ResponseCandidate::new(Speaker::Yana, &joined, FRAME));
    assert!(!eval.has_finding(FindingCode::F101_FORMAT_TOO_MANY_LINES));
    assert!(eval.is_accepted());
}

#[test]
fn test_tone_scenarios() {
    let d = Director::new(context(), Arc::new(NoopScorer));
    let eval = |text: &str| d.evaluate_response(&ResponseCandidate::new(Speaker::Yana, text, FRAME));

    assert_eq!(eval("あの塔、高いじゃん。見て。").status, Status::Pass);

    let weak = eval("あの塔、高いじゃん。");
    assert_eq!(weak.status, Status::Warn);
    assert!(weak.has_finding(FindingCode::T202_TONE_WEAK));
    assert_eq!(weak.action, Action::Intervene);

    assert_eq!(eval("あの塔は高いです。").status, Status::Retry);
}

#[test]
fn test_praise_scenarios() {
    let d = director();
    let direct = ResponseCandidate::new(Speaker::Ayu, "さすが姉様、東京タワーは三百三十三メートルです。", FRAME);
    let eval = d.evaluate_response(&direct);
    assert_eq!(eval.status, Status::Retry);
    assert!(eval.has_finding(FindingCode::P301_PRAISE_TO_PARTNER));

    let alone = ResponseCandidate::new(Speaker::Ayu, "さすがですね。東京タワーの高さは三百三十三メートルです。", FRAME);
    let eval = d.evaluate_response(&alone);
    assert_eq!(eval.status, Status::Warn);
    assert!(eval.has_finding(FindingCode::P302_PRAISE_EVALUATIVE));
}

#[test]
fn test_returning_to_abandoned_hook_warns() {
    let mut d = Director::new(context(), Arc::new(NoopScorer));
    accept(&mut d, Speaker::Yana, "見て、タワーが光ってるじゃん！", 1);
    accept(&mut d, Speaker::Ayu, "姉様、実はタワーは電波塔です。", 2);
    accept(&mut d, Speaker::Yana, "ねえ、噴水もすごいじゃん！", 3);
    assert_eq!(d.topic_state().focus_hook(), "噴水");
    assert_eq!(d.topic_state().forbidden_topics(), &["タワー".to_string()]);
    accept(&mut d, Speaker::Ayu, "姉様、実は噴水は夜も動いています。", 4);

    let candidate = ResponseCandidate::new(Speaker::Yana, "あっ、やっぱりタワーじゃん！", FRAME).turn(5);
    let eval = d.evaluate_response(&candidate);
    assert_eq!(eval.status, Status::Warn);
    assert!(eval.has_finding(FindingCode::H702_ABANDONED_HOOK));
    assert_eq!(eval.action, Action::Intervene);
    assert_eq!(eval.focus_hook(), "タワー");
}

#[test]
fn test_fact_check_forces_correction_pattern() {
    let config = DirectorConfig {
        fact_check_enabled: true,
        ..Default::default()
    };
    let ctx = Arc::new(DirectorContext::new(BeatTracker::builtin().unwrap(), config));
    let checker = FnFactChecker(|text: &str, _frame: &str| {
        Ok::<_, CollaboratorError>(FactCheckResult {
            has_error: text.contains("五百"),
            claim: Some("五百メートル".to_string()),
            correct_info: Some("三百三十三メートル".to_string()),
            correction_prompt: None,
            confidence: Confidence::High,
        })
    });
    let d = Director::new(ctx, Arc::new(FlatScorer(4.5))).with_fact_checker(Arc::new(checker));

    let candidate = ResponseCandidate::new(Speaker::Yana, "見て、タワーって五百メートルもあるじゃん！", FRAME);
    let eval = d.evaluate_response(&candidate);
    assert_eq!(eval.status, Status::Pass);
    assert_eq!(eval.action, Action::Intervene);
    assert_eq!(eval.next_pattern, Some(Pattern::CORRECTION));
    assert!(eval.next_instruction.as_deref().unwrap().starts_with("「五百メートル」は誤りです"));
    assert!(eval.has_finding(FindingCode::K801_FACT_CORRECTION));
}

#[test]
fn test_reset_for_new_session_restores_defaults() {
    let mut d = director();
    let fresh = director().state_digest();
    for turn in 1..=5 {
        accept(&mut d, Speaker::Yana, "東京タワー、すごいじゃん！", turn);
    }
    assert_ne!(d.state_digest(), fresh);

    d.reset_for_new_session();
    assert_eq!(d.topic_state(), &TopicState::new());
    assert_eq!(d.novelty_guard().window_len(), 0);
    assert_eq!(d.novelty_guard().turn_count(), 0);
    assert!(d.recent_patterns().is_empty());
    assert_eq!(d.state_digest(), fresh);
}

#[test]
fn test_reset_topic_state_keeps_window() {
    let mut d = director();
    accept(&mut d, Speaker::Yana, "見て、タワーが光ってるじゃん！", 1);
    d.reset_topic_state();
    assert!(!d.topic_state().has_hook());
    assert_eq!(d.novelty_guard().window_len(), 1);
}

#[test]
fn test_checkpoint_round_trip() {
    let mut d = director();
    accept(&mut d, Speaker::Yana, "見て、タワーが光ってるじゃん！", 1);
    let checkpoint = d.checkpoint();
    let saved = d.state_digest();

    accept(&mut d, Speaker::Ayu, "姉様、実はタワーは電波塔です。", 2);
    assert_ne!(d.state_digest(), saved);

    let json = serde_json::to_string(&checkpoint).unwrap();
    let restored: duo_director::core::DirectorCheckpoint = serde_json::from_str(&json).unwrap();
    d.restore(restored).unwrap();
    assert_eq!(d.state_digest(), saved);

    let mut tampered = d.checkpoint();
    tampered.state.recent_patterns.push(Pattern::A);
    assert!(matches!(d.restore(tampered), Err(CheckpointError::DigestMismatch { .. })));
    assert_eq!(d.state_digest(), saved);
}

#[test]
fn test_directors_share_context_not_state() {
    let ctx = context();
    let mut first = Director::new(Arc::clone(&ctx), Arc::new(NoopScorer));
    let second = Director::new(Arc::clone(&ctx), Arc::new(NoopScorer));

    accept(&mut first, Speaker::Yana, "見て、タワーが光ってるじゃん！", 1);
    assert!(first.topic_state().has_hook());
    assert!(!second.topic_state().has_hook());
    assert_eq!(Arc::strong_count(&ctx), 3);
}

#[test]
fn test_beat_stage_follows_turns() {
    let d = Director::new(context(), Arc::new(NoopScorer));
    let stage = |turn: u32| {
        d.evaluate_response(&ResponseCandidate::new(Speaker::Yana, "見て、タワーが光ってるじゃん！", FRAME).turn(turn))
            .beat_stage
    };
    assert_eq!(stage(1), "SETUP");
    assert_eq!(stage(4), "EXPLORATION");
    assert_eq!(stage(8), "DEEPENING");
    assert_eq!(stage(30), "WRAP_UP");
}

#[test]
fn test_evaluation_exports_json() {
    let d = director();
    let eval = d.evaluate_response(&ResponseCandidate::new(Speaker::Yana, "見て、タワーが光ってるじゃん！", FRAME));
    let json = eval.to_json().unwrap();
    assert!(json.contains("\"status\":\"PASS\""));
    let back: DirectorEvaluation = serde_json::from_str(&json).unwrap();
    assert_eq!(back, eval);
    assert!(eval.to_parseable_string().starts_with("status=PASS"));
}
