//! The two fixed personas and the dialogue history record

use serde::{Deserialize, Serialize};

/// One of the two narrating personas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// Elder sister (A): casual, short exclamatory lines
    Yana,
    /// Younger sister (B): polite register, analytical
    Ayu,
}

impl Speaker {
    /// Normalize an alias ("A", "やな", "yana", ...) to a speaker
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias.trim().to_lowercase().as_str() {
            "a" | "yana" | "やな" | "ヤナ" | "姉" | "elder" => Some(Self::Yana),
            "b" | "ayu" | "あゆ" | "アユ" | "妹" | "younger" => Some(Self::Ayu),
            _ => None,
        }
    }

    /// Canonical key used in the beat policy (`"yana"` / `"ayu"`)
    pub fn key(&self) -> &'static str {
        match self {
            Self::Yana => "yana",
            Self::Ayu => "ayu",
        }
    }

    /// Display name as it appears in dialogue
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Yana => "やな",
            Self::Ayu => "あゆ",
        }
    }

    /// Letter used in speaker-labelled transcripts
    pub fn letter(&self) -> char {
        match self {
            Self::Yana => 'A',
            Self::Ayu => 'B',
        }
    }

    pub fn partner(&self) -> Self {
        match self {
            Self::Yana => Self::Ayu,
            Self::Ayu => Self::Yana,
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One committed line of dialogue, as supplied in conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl DialogueTurn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    /// `やな: ...` transcript line
    pub fn to_transcript_line(&self) -> String {
        format!("{}: {}", self.speaker.display_name(), self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_normalization() {
        assert_eq!(Speaker::from_alias("A"), Some(Speaker::Yana));
        assert_eq!(Speaker::from_alias(" やな "), Some(Speaker::Yana));
        assert_eq!(Speaker::from_alias("Ayu"), Some(Speaker::Ayu));
        assert_eq!(Speaker::from_alias("b"), Some(Speaker::Ayu));
        assert_eq!(Speaker::from_alias("narrator"), None);
    }

    #[test]
    fn test_partner() {
        assert_eq!(Speaker::Yana.partner(), Speaker::Ayu);
        assert_eq!(Speaker::Ayu.partner(), Speaker::Yana);
    }

    #[test]
    fn test_transcript_line() {
        let turn = DialogueTurn::new(Speaker::Ayu, "そうですね。");
        assert_eq!(turn.to_transcript_line(), "あゆ: そうですね。");
    }
}
