//! Remote draft analysis.
//!
//! [`AnalysisClient`] is the network boundary of the pipeline: it takes a
//! draft and its conversation context and returns an [`AnalysisResult`] or an
//! [`AnalysisError`]. Whatever the service sends back is passed through
//! [`normalize`] so every result carries every field.

mod error;
pub mod mock;
pub mod normalize;
mod openrouter;

pub use error::{AnalysisError, FailureSeverity};
pub use mock::ScriptedAnalysis;
pub use openrouter::OpenRouterClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ContextWindow;

pub const NEUTRAL_EMOTION: &str = "neutral";
pub const NEUTRAL_EMOJI: &str = "😐";
pub const NEUTRAL_SCORE: u8 = 50;
pub const UNKNOWN_PERCEPTION: &str = "Unable to analyze perception.";
pub const UNPARSED_PERCEPTION: &str = "Analysis incomplete - could not parse response.";
pub const TRIVIAL_PERCEPTION: &str =
    "Trivial message - no significant emotional impact expected.";

/// How a draft is likely to land with its recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 0..=100
    pub relationship_score: u8,
    pub primary_emotion: String,
    pub emoji: String,
    pub tone: String,
    pub recipient_feeling: String,
    pub perception_analysis: String,
    pub improved_draft: String,
    pub has_significant_emotion: bool,
}

impl AnalysisResult {
    /// The all-defaults result for `draft`.
    pub fn neutral_for(draft: &str) -> Self {
        Self {
            relationship_score: NEUTRAL_SCORE,
            primary_emotion: NEUTRAL_EMOTION.into(),
            emoji: NEUTRAL_EMOJI.into(),
            tone: NEUTRAL_EMOTION.into(),
            recipient_feeling: NEUTRAL_EMOTION.into(),
            perception_analysis: UNKNOWN_PERCEPTION.into(),
            improved_draft: draft.into(),
            has_significant_emotion: false,
        }
    }

    pub fn trivial(draft: &str) -> Self {
        Self {
            perception_analysis: TRIVIAL_PERCEPTION.into(),
            ..Self::neutral_for(draft)
        }
    }

    pub fn could_not_analyze(draft: &str) -> Self {
        Self {
            perception_analysis: UNPARSED_PERCEPTION.into(),
            ..Self::neutral_for(draft)
        }
    }

    /// The suggested rewrite, when it differs from `draft`.
    pub fn suggestion_for(&self, draft: &str) -> Option<&str> {
        let improved = self.improved_draft.trim();
        (!improved.is_empty() && improved != draft.trim()).then_some(improved)
    }
}

/// Stateless request/response analysis service.
#[async_trait(?Send)]
pub trait AnalysisClient {
    /// Analyzes `draft` in light of `context`.
    ///
    /// Fails with [`AnalysisError::MissingCredential`] without touching the
    /// network when `credential` is absent or blank.
    async fn analyze(
        &self,
        draft: &str,
        context: &ContextWindow,
        credential: Option<&str>,
        model: &str,
    ) -> Result<AnalysisResult, AnalysisError>;
}
