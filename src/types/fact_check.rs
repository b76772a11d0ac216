//! Fact-check collaborator result

use serde::{Deserialize, Serialize};

/// Confidence tier reported by the fact-checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FactCheckResult {
    pub has_error: bool,
    #[serde(default)]
    pub claim: Option<String>,
    #[serde(default)]
    pub correct_info: Option<String>,
    #[serde(default)]
    pub correction_prompt: Option<String>,
    #[serde(default)]
    pub confidence: Confidence,
}

impl FactCheckResult {
    /// No error found
    pub fn clean() -> Self {
        Self::default()
    }

    /// Low-confidence hits are recorded but never acted on
    pub fn needs_correction(&self) -> bool {
        self.has_error && self.confidence != Confidence::Low
    }

    /// Instruction prepended to the next turn
    pub fn correction_instruction(&self) -> String {
        if let Some(prompt) = self.correction_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
            return prompt.to_string();
        }
        match (&self.claim, &self.correct_info) {
            (Some(claim), Some(info)) => {
                format!("「{}」は誤りです。正しくは「{}」。相方が自然に訂正してください。", claim, info)
            }
            (Some(claim), None) => format!("「{}」は誤りの可能性があります。相方が確認してください。", claim),
            _ => "直前の発言に事実誤認があります。相方が自然に訂正してください。".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_confidence_ignored() {
        let result = FactCheckResult {
            has_error: true,
            confidence: Confidence::Low,
            ..Default::default()
        };
        assert!(!result.needs_correction());
    }

    #[test]
    fn test_correction_instruction_prefers_prompt() {
        let result = FactCheckResult {
            has_error: true,
            claim: Some("富士山は2000m".into()),
            correct_info: Some("3776m".into()),
            correction_prompt: Some("標高を訂正して".into()),
            confidence: Confidence::High,
        };
        assert_eq!(result.correction_instruction(), "標高を訂正して");
    }

    #[test]
    fn test_correction_instruction_from_claim() {
        let result = FactCheckResult {
            has_error: true,
            claim: Some("富士山は2000m".into()),
            correct_info: Some("3776m".into()),
            correction_prompt: None,
            confidence: Confidence::Medium,
        };
        assert!(result.correction_instruction().contains("3776m"));
    }
}
