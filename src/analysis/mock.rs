use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{AnalysisClient, AnalysisError, AnalysisResult};
use crate::context::ContextWindow;

/// Analysis client that replays queued replies, each after an optional delay.
///
/// Once the queue is empty every call succeeds with the neutral result. The
/// credential check still applies, so a missing key fails like the real
/// client does.
#[derive(Default)]
pub struct ScriptedAnalysis {
    script: RefCell<VecDeque<(Duration, Result<AnalysisResult, AnalysisError>)>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, result: AnalysisResult) -> Self {
        self.reply_after(Duration::ZERO, result)
    }

    pub fn reply_after(self, delay: Duration, result: AnalysisResult) -> Self {
        self.script.borrow_mut().push_back((delay, Ok(result)));
        self
    }

    pub fn fail_after(self, delay: Duration, error: AnalysisError) -> Self {
        self.script.borrow_mut().push_back((delay, Err(error)));
        self
    }

    /// Drafts received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

#[async_trait(?Send)]
impl AnalysisClient for ScriptedAnalysis {
    async fn analyze(
        &self,
        draft: &str,
        context: &ContextWindow,
        credential: Option<&str>,
        model: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        if credential.is_none_or(|key| key.trim().is_empty()) {
            return Err(AnalysisError::MissingCredential);
        }
        trace!(target: "llm", %draft, %model, context_len = context.len(), "scripted prompt");
        self.calls.borrow_mut().push(draft.to_string());
        let next = self.script.borrow_mut().pop_front();
        let (delay, reply) =
            next.unwrap_or_else(|| (Duration::ZERO, Ok(AnalysisResult::neutral_for(draft))));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        debug!(target: "llm", ok = reply.is_ok(), "scripted response");
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_then_falls_back() {
        let client = ScriptedAnalysis::new()
            .reply(AnalysisResult {
                emoji: "😊".into(),
                ..AnalysisResult::neutral_for("a")
            })
            .fail_after(Duration::ZERO, AnalysisError::EmptyDraft);
        let ctx = ContextWindow::new(10);
        let first = client.analyze("a", &ctx, Some("k"), "m").await.unwrap();
        assert_eq!(first.emoji, "😊");
        assert_eq!(
            client.analyze("b", &ctx, Some("k"), "m").await,
            Err(AnalysisError::EmptyDraft)
        );
        let third = client.analyze("c", &ctx, Some("k"), "m").await.unwrap();
        assert_eq!(third.improved_draft, "c");
        assert_eq!(client.calls(), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn missing_credential_is_not_recorded() {
        let client = ScriptedAnalysis::new();
        let ctx = ContextWindow::new(10);
        assert_eq!(
            client.analyze("hello", &ctx, None, "m").await,
            Err(AnalysisError::MissingCredential)
        );
        assert!(client.calls().is_empty());
    }
}
