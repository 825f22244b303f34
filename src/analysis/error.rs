use thiserror::Error;

/// Why an analysis produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("no draft to analyze")]
    EmptyDraft,
    #[error("API error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("network error: {message}")]
    Network { timed_out: bool, message: String },
}

/// How long a failure stays on screen, shortest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureSeverity {
    Brief,
    Notice,
    Serious,
}

impl AnalysisError {
    pub fn timed_out() -> Self {
        AnalysisError::Network {
            timed_out: true,
            message: "request timed out".into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AnalysisError::Upstream { status: 429, .. })
    }

    pub fn is_model_not_found(&self) -> bool {
        matches!(self, AnalysisError::Upstream { status: 404, .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AnalysisError::Network { timed_out: true, .. })
    }

    pub fn severity(&self) -> FailureSeverity {
        match self {
            AnalysisError::Network { timed_out: true, .. } => FailureSeverity::Brief,
            AnalysisError::Network { .. } => FailureSeverity::Notice,
            AnalysisError::MissingCredential
            | AnalysisError::EmptyDraft
            | AnalysisError::Upstream { .. } => FailureSeverity::Serious,
        }
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        AnalysisError::Network {
            timed_out: e.is_timeout(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_upstream_statuses() {
        let quota = AnalysisError::Upstream {
            status: 429,
            message: "slow down".into(),
        };
        assert!(quota.is_rate_limited());
        assert!(!quota.is_model_not_found());
        assert_eq!(quota.to_string(), "API error (429): slow down");
    }

    #[test]
    fn timeouts_are_the_briefest_failure() {
        assert_eq!(AnalysisError::timed_out().severity(), FailureSeverity::Brief);
        let network = AnalysisError::Network {
            timed_out: false,
            message: "refused".into(),
        };
        assert_eq!(network.severity(), FailureSeverity::Notice);
        assert_eq!(
            AnalysisError::MissingCredential.severity(),
            FailureSeverity::Serious
        );
        assert!(FailureSeverity::Brief < FailureSeverity::Serious);
    }
}
