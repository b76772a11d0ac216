//! BeatTracker: narrative stage per turn and pattern scheduling
//!
//! The beat policy is a declarative JSON document loaded once. Lookups are
//! pure; unknown names fall back to empty/default values.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::DEFAULT_MAX_CONSECUTIVE;
use crate::error::ConfigError;
use crate::types::{Pattern, Speaker};

/// Policy bundled with the crate
const BUILTIN_POLICY: &str = include_str!("../../config/beat_policy.json");

/// One narrative stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BeatInfo {
    pub stage: String,
    /// Inclusive turn range
    pub turn_range: (u32, u32),
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub preferred_patterns: Vec<Pattern>,
}

impl BeatInfo {
    pub fn contains(&self, turn: u32) -> bool {
        turn >= self.turn_range.0 && turn <= self.turn_range.1
    }
}

/// One exchange pattern and what each speaker does in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PatternInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Role text keyed by canonical speaker key
    #[serde(default)]
    pub roles: HashMap<String, String>,
}

impl PatternInfo {
    pub fn role_for(&self, speaker: Speaker) -> &str {
        self.roles.get(speaker.key()).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRules {
    #[serde(default = "default_max_consecutive")]
    pub max_consecutive: usize,
}

fn default_max_consecutive() -> usize {
    DEFAULT_MAX_CONSECUTIVE
}

impl Default for PatternRules {
    fn default() -> Self {
        Self {
            max_consecutive: DEFAULT_MAX_CONSECUTIVE,
        }
    }
}

/// The full beat policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatPolicy {
    #[serde(default)]
    pub version: Option<String>,
    pub beats: Vec<BeatInfo>,
    pub patterns: BTreeMap<Pattern, PatternInfo>,
    #[serde(default)]
    pub pattern_rules: PatternRules,
    #[serde(default)]
    pub fallback_on_stall: Vec<Pattern>,
    #[serde(default)]
    pub forbidden_expressions: HashMap<String, Vec<String>>,
}

impl BeatPolicy {
    /// Parse and validate a policy document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut policy: BeatPolicy = serde_json::from_str(json)?;
        policy.normalize_characters();
        policy.validate()?;
        Ok(policy)
    }

    /// Re-key forbidden expressions and pattern roles by canonical speaker key
    fn normalize_characters(&mut self) {
        for info in self.patterns.values_mut() {
            info.roles = std::mem::take(&mut info.roles)
                .into_iter()
                .map(|(character, role)| (canonical_character_key(&character), role))
                .collect();
        }

        let raw = std::mem::take(&mut self.forbidden_expressions);
        for (character, expressions) in raw {
            let key = canonical_character_key(&character);
            self.forbidden_expressions
                .entry(key)
                .or_default()
                .extend(expressions);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.beats.is_empty() {
            return Err(ConfigError::Invalid("no beats defined".into()));
        }
        for beat in &self.beats {
            if beat.stage.trim().is_empty() {
                return Err(ConfigError::Invalid("beat with empty stage name".into()));
            }
            if beat.turn_range.0 > beat.turn_range.1 {
                return Err(ConfigError::Invalid(format!(
                    "beat {} has inverted turn_range {:?}",
                    beat.stage, beat.turn_range
                )));
            }
        }
        for pattern in Pattern::ALL {
            if !self.patterns.contains_key(&pattern) {
                return Err(ConfigError::Invalid(format!("pattern {} missing", pattern)));
            }
        }
        if self.pattern_rules.max_consecutive == 0 {
            return Err(ConfigError::Invalid("pattern_rules.max_consecutive must be >= 1".into()));
        }
        Ok(())
    }
}

fn canonical_character_key(character: &str) -> String {
    Speaker::from_alias(character)
        .map(|s| s.key().to_string())
        .unwrap_or_else(|| character.trim().to_lowercase())
}

/// Stage and pattern scheduler over a loaded policy
#[derive(Debug, Clone)]
pub struct BeatTracker {
    policy: BeatPolicy,
}

impl BeatTracker {
    /// Wrap an already-parsed policy (normalized and validated again)
    pub fn new(mut policy: BeatPolicy) -> Result<Self, ConfigError> {
        policy.normalize_characters();
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            policy: BeatPolicy::from_json_str(json)?,
        })
    }

    /// Load a policy file. Missing or malformed files are fatal.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let tracker = Self::from_json_str(&contents)?;
        info!(path = %path.display(), beats = tracker.policy.beats.len(), "beat policy loaded");
        Ok(tracker)
    }

    /// Policy bundled with the crate
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(BUILTIN_POLICY)
    }

    pub fn policy(&self) -> &BeatPolicy {
        &self.policy
    }

    pub fn max_consecutive(&self) -> usize {
        self.policy.pattern_rules.max_consecutive
    }

    /// Stage for a turn. Past every range → last stage; before the first → first.
    pub fn get_current_beat(&self, turn_number: u32) -> &str {
        if let Some(beat) = self.policy.beats.iter().find(|b| b.contains(turn_number)) {
            return &beat.stage;
        }
        let first = &self.policy.beats[0];
        if turn_number < first.turn_range.0 {
            return &first.stage;
        }
        self.policy
            .beats
            .last()
            .map(|b| b.stage.as_str())
            .unwrap_or(first.stage.as_str())
    }

    pub fn get_preferred_patterns(&self, stage: &str) -> &[Pattern] {
        self.find_beat(stage)
            .map(|b| b.preferred_patterns.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_pattern_info(&self, pattern: Pattern) -> PatternInfo {
        self.policy.patterns.get(&pattern).cloned().unwrap_or_default()
    }

    pub fn get_beat_info(&self, stage: &str) -> BeatInfo {
        self.find_beat(stage).cloned().unwrap_or_default()
    }

    fn find_beat(&self, stage: &str) -> Option<&BeatInfo> {
        self.policy.beats.iter().find(|b| b.stage == stage)
    }

    /// False only when the last `max_consecutive` entries are all `pattern`
    pub fn is_pattern_allowed(&self, pattern: Pattern, recent_patterns: &[Pattern]) -> bool {
        let max = self.max_consecutive();
        if recent_patterns.len() < max {
            return true;
        }
        !recent_patterns[recent_patterns.len() - max..]
            .iter()
            .all(|p| *p == pattern)
    }

    /// Stage preference → any pattern (A..E) → stall fallback → A
    pub fn suggest_pattern(&self, turn_number: u32, recent_patterns: &[Pattern]) -> Pattern {
        let stage = self.get_current_beat(turn_number);

        let preferred = self
            .get_preferred_patterns(stage)
            .iter()
            .copied()
            .find(|p| self.is_pattern_allowed(*p, recent_patterns));
        if let Some(pattern) = preferred {
            return pattern;
        }

        if let Some(pattern) = Pattern::ALL
            .iter()
            .copied()
            .find(|p| self.is_pattern_allowed(*p, recent_patterns))
        {
            debug!(stage, pattern = %pattern, "no preferred pattern allowed, using fixed order");
            return pattern;
        }

        self.policy.fallback_on_stall.first().copied().unwrap_or(Pattern::A)
    }

    /// Forbidden expressions for a character alias ("A", "やな", "yana", ...)
    pub fn get_forbidden_expressions(&self, character: &str) -> Vec<String> {
        self.policy
            .forbidden_expressions
            .get(&canonical_character_key(character))
            .cloned()
            .unwrap_or_default()
    }

    pub fn forbidden_for(&self, speaker: Speaker) -> &[String] {
        self.policy
            .forbidden_expressions
            .get(speaker.key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Prompt-ready guidance for the current beat and (optional) pattern
    pub fn render_guidance(&self, turn_number: u32, speaker: Speaker, pattern: Option<Pattern>) -> String {
        let stage = self.get_current_beat(turn_number);
        let beat = self.get_beat_info(stage);
        let mut out = format!(
            "[BEAT {}] goal: {} / tone: {}",
            beat.stage, beat.goal, beat.tone
        );
        if let Some(pattern) = pattern {
            let info = self.get_pattern_info(pattern);
            out.push_str(&format!(
                "\n[PATTERN {} {}] {} / {}: {}",
                pattern,
                info.name,
                info.description,
                speaker.display_name(),
                info.role_for(speaker)
            ));
        }
        let forbidden = self.forbidden_for(speaker);
        if !forbidden.is_empty() {
            out.push_str(&format!("\n[FORBIDDEN] {}", forbidden.join(" / ")));
        }
        out
    }
}

// =============================================================================
// TESTS
// =============================================================================
