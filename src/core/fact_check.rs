//! Fact-check collaborator seam
//!
//! The checker itself (web search, knowledge lookup) lives outside this
//! crate. Its result only steers pattern selection; it never rejects a line.

use crate::error::CollaboratorError;
use crate::types::FactCheckResult;

pub trait FactChecker: Send + Sync {
    fn check(&self, text: &str, frame_description: &str) -> Result<FactCheckResult, CollaboratorError>;
}

/// Checker that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFactChecker;

impl FactChecker for NoFactChecker {
    fn check(&self, _text: &str, _frame_description: &str) -> Result<FactCheckResult, CollaboratorError> {
        Ok(FactCheckResult::clean())
    }
}

/// Wraps a closure; handy for tests and simple lookups
pub struct FnFactChecker<F>(pub F);

impl<F> FactChecker for FnFactChecker<F>
where
    F: Fn(&str, &str) -> Result<FactCheckResult, CollaboratorError> + Send + Sync,
{
    fn check(&self, text: &str, frame_description: &str) -> Result<FactCheckResult, CollaboratorError> {
        (self.0)(text, frame_description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Confidence;

    #[test]
    fn test_no_fact_checker_is_clean() {
        let result = NoFactChecker.check("東京タワーは333mです", "夜景").unwrap();
        assert!(!result.needs_correction());
    }

    #[test]
    fn test_fn_fact_checker() {
        let checker = FnFactChecker(|text: &str, _frame: &str| {
            Ok::<_, CollaboratorError>(FactCheckResult {
                has_error: text.contains("500m"),
                claim: Some("500m".to_string()),
                correct_info: Some("333m".to_string()),
                correction_prompt: None,
                confidence: Confidence::High,
            })
        });
        assert!(checker.check("東京タワーは500mです", "").unwrap().needs_correction());
        assert!(!checker.check("東京タワーは333mです", "").unwrap().needs_correction());
    }
}
