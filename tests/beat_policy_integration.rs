//! Integration tests for beat policy loading and pattern scheduling

use std::path::PathBuf;
use pretty_assertions::assert_eq;
use duo_director::core::{BeatTracker, DirectorConfig, DirectorContext};
use duo_director::error::ConfigError;
use duo_director::types::{Pattern, Speaker};

const MINIMAL_POLICY: &str = r#"{
  "beats": [
    {"stage": "OPEN", "turn_range": [1, 3], "preferred_patterns": ["B"]},
    {"stage": "CLOSE", "turn_range": [4, 5], "preferred_patterns": ["E"]}
  ],
  "patterns": {
    "A": {"name": "発見→補足"},
    "B": {"name": "疑問→解説", "roles": {"A": "素朴に聞く", "あゆ": "データで答える"}},
    "C": {"name": "誤解→訂正"},
    "D": {"name": "脱線→修正"},
    "E": {"name": "共感→深化"}
  },
  "pattern_rules": {"max_consecutive": 1},
  "fallback_on_stall": ["D"],
  "forbidden_expressions": {"やな": ["了解です"], "B": ["ヤバい"]}
}"#;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("duo_director_{}_{}.json", std::process::id(), name));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_policy_from_path() {
    let path = write_temp("minimal", MINIMAL_POLICY);
    let tracker = BeatTracker::from_path(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(tracker.get_current_beat(2), "OPEN");
    assert_eq!(tracker.get_current_beat(9), "CLOSE");
    assert_eq!(tracker.max_consecutive(), 1);
    assert_eq!(tracker.get_forbidden_expressions("A"), vec!["了解です".to_string()]);
    assert_eq!(tracker.forbidden_for(Speaker::Ayu), &["ヤバい".to_string()]);
    assert_eq!(tracker.get_pattern_info(Pattern::B).role_for(Speaker::Yana), "素朴に聞く");
    assert_eq!(tracker.get_pattern_info(Pattern::B).role_for(Speaker::Ayu), "データで答える");
}

#[test]
fn test_missing_policy_is_fatal() {
    let path = std::env::temp_dir().join("duo_director_does_not_exist.json");
    assert!(matches!(BeatTracker::from_path(&path), Err(ConfigError::Io(_))));
    assert!(matches!(
        DirectorContext::from_policy_path(&path, DirectorConfig::default()),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn test_malformed_policy_is_fatal() {
    assert!(matches!(BeatTracker::from_json_str("{ not json"), Err(ConfigError::Json(_))));

    let no_beats = r#"{"beats": [], "patterns": {}}"#;
    assert!(matches!(BeatTracker::from_json_str(no_beats), Err(ConfigError::Invalid(_))));

    let missing_pattern = MINIMAL_POLICY.replace(r#""E": {"name": "共感→深化"}"#, r#""Z_UNUSED": {}"#);
    assert!(BeatTracker::from_json_str(&missing_pattern).is_err());
}

#[test]
fn test_suggest_never_extends_a_run() {
    let tracker = BeatTracker::builtin().unwrap();
    let max = tracker.max_consecutive();

    for turn in [1, 4, 8, 12, 40] {
        for p in Pattern::ALL {
            for q in Pattern::ALL {
                let history = vec![q, p, p];
                let suggested = tracker.suggest_pattern(turn, &history);
                let tail = &history[history.len() - max..];
                assert!(
                    !tail.iter().all(|h| *h == suggested),
                    "turn {} history {:?} got {:?}",
                    turn,
                    history,
                    suggested
                );
            }
        }
    }
}

#[test]
fn test_single_repeat_limit() {
    let tracker = BeatTracker::from_json_str(MINIMAL_POLICY).unwrap();
    assert_eq!(tracker.suggest_pattern(1, &[]), Pattern::B);
    assert_eq!(tracker.suggest_pattern(1, &[Pattern::B]), Pattern::A);
    assert_eq!(tracker.suggest_pattern(4, &[Pattern::E]), Pattern::A);
}

#[test]
fn test_guidance_mentions_beat_and_role() {
    let tracker = BeatTracker::from_json_str(MINIMAL_POLICY).unwrap();
    let guidance = tracker.render_guidance(1, Speaker::Ayu, Some(Pattern::B));
    assert!(guidance.contains("OPEN"));
    assert!(guidance.contains("データで答える"));
    assert!(guidance.contains("ヤバい"));
}
