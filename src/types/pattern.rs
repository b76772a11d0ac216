//! Two-speaker exchange patterns

use serde::{Deserialize, Serialize};

/// One of the five exchange shapes a pair of turns can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pattern {
    /// Discovery → supplement
    A,
    /// Question → explanation
    B,
    /// Misunderstanding → correction
    C,
    /// Digression → correction
    D,
    /// Empathy → deepening
    E,
}

impl Pattern {
    /// Fixed fallback order
    pub const ALL: [Pattern; 5] = [Pattern::A, Pattern::B, Pattern::C, Pattern::D, Pattern::E];

    /// Pattern used when a factual correction is pending
    pub const CORRECTION: Pattern = Pattern::C;

    /// Pattern used to break a conversational loop
    pub const DIGRESSION: Pattern = Pattern::D;

    /// Parse a letter; anything else is `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "A" | "a" => Some(Self::A),
            "B" | "b" => Some(Self::B),
            "C" | "c" => Some(Self::C),
            "D" | "d" => Some(Self::D),
            "E" | "e" => Some(Self::E),
            _ => None,
        }
    }

    pub fn letter(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Pattern::parse("A"), Some(Pattern::A));
        assert_eq!(Pattern::parse(" e "), Some(Pattern::E));
        assert_eq!(Pattern::parse("F"), None);
        assert_eq!(Pattern::parse(""), None);
    }

    #[test]
    fn test_serde_letter() {
        let json = serde_json::to_string(&Pattern::D).unwrap();
        assert_eq!(json, "\"D\"");
        let back: Pattern = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(back, Pattern::B);
    }
}
