//! Request lifecycle for draft analysis.
//!
//! The [`Orchestrator`] turns one qualifying draft into exactly one
//! [`Outcome`]. It never performs I/O: a dispatch that needs the network
//! yields an [`AnalysisJob`] for the runtime to execute, and the runtime
//! reports back through [`Orchestrator::on_response`]. Only the response for
//! the most recent request id is accepted.

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::analysis::{AnalysisError, AnalysisResult};
use crate::config::TimingConfig;
use crate::context::ContextWindow;
use crate::settings::SettingsStore;
use crate::triviality::is_trivial;

/// Monotonically increasing request identifier.
pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    Debouncing,
    /// The last draft read was trivial and was not sent.
    Filtered,
    Pending(RequestId),
    Succeeded(AnalysisResult),
    Failed(AnalysisError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub id: RequestId,
    /// The draft as read when the debounce fired.
    pub draft: String,
    pub context: ContextWindow,
    pub requested_at: DateTime<Utc>,
}

/// Work handed to the runtime for a network call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisJob {
    pub request: AnalysisRequest,
    pub credential: String,
    pub model: String,
}

/// The single outcome delivered for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeeded {
        id: RequestId,
        draft: String,
        result: AnalysisResult,
    },
    Failed {
        id: RequestId,
        error: AnalysisError,
    },
}

impl Outcome {
    pub fn id(&self) -> RequestId {
        match self {
            Outcome::Succeeded { id, .. } | Outcome::Failed { id, .. } => *id,
        }
    }
}

/// What a dispatch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A network call is needed.
    Remote(AnalysisJob),
    /// The outcome was decided locally.
    Settled(Outcome),
}

#[derive(Debug, Clone)]
struct InFlight {
    id: RequestId,
    draft: String,
    timeout_at: Instant,
}

pub struct Orchestrator {
    timing: TimingConfig,
    state: PipelineState,
    last_id: RequestId,
    in_flight: Option<InFlight>,
    failed_until: Option<Instant>,
}

impl Orchestrator {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            timing,
            state: PipelineState::Idle,
            last_id: 0,
            in_flight: None,
            failed_until: None,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Id of the request whose response would currently be accepted.
    pub fn pending_id(&self) -> Option<RequestId> {
        self.in_flight.as_ref().map(|f| f.id)
    }

    /// A quiet-period timer was (re)armed.
    pub fn debouncing(&mut self) {
        if !matches!(self.state, PipelineState::Pending(_)) {
            self.state = PipelineState::Debouncing;
        }
    }

    /// The debounce fired but the draft had not changed.
    pub fn settle_debounce(&mut self) {
        if self.state == PipelineState::Debouncing {
            self.state = PipelineState::Idle;
        }
    }

    /// The draft read at fire time was trivial; it replaces whatever was in flight.
    pub fn filtered(&mut self) {
        if let Some(stale) = self.in_flight.take() {
            debug!(request_id = stale.id, "trivial draft supersedes request");
        }
        self.failed_until = None;
        self.state = PipelineState::Filtered;
    }

    /// Starts analysis of `draft`, superseding any request in flight.
    ///
    /// Settings are read here on every call. Trivial drafts and a missing
    /// credential settle immediately without producing a job.
    pub fn dispatch(
        &mut self,
        draft: &str,
        context: ContextWindow,
        settings: &dyn SettingsStore,
        default_model: &str,
        now: Instant,
    ) -> Dispatch {
        self.last_id += 1;
        let id = self.last_id;
        if let Some(stale) = self.in_flight.take() {
            debug!(request_id = stale.id, superseded_by = id, "request superseded");
        }
        self.failed_until = None;

        if is_trivial(draft) {
            trace!(request_id = id, "trivial draft settled locally");
            let result = AnalysisResult::trivial(draft);
            self.state = PipelineState::Succeeded(result.clone());
            return Dispatch::Settled(Outcome::Succeeded {
                id,
                draft: draft.to_string(),
                result,
            });
        }

        let Some(credential) = settings.credential() else {
            info!(request_id = id, "no API key configured");
            return Dispatch::Settled(self.fail(id, AnalysisError::MissingCredential, now));
        };
        let model = settings.model_or(default_model);

        self.state = PipelineState::Pending(id);
        self.in_flight = Some(InFlight {
            id,
            draft: draft.to_string(),
            timeout_at: now + self.timing.request_timeout(),
        });
        debug!(request_id = id, %model, draft_len = draft.len(), context_len = context.len(), "dispatching analysis");
        Dispatch::Remote(AnalysisJob {
            request: AnalysisRequest {
                id,
                draft: draft.to_string(),
                context,
                requested_at: Utc::now(),
            },
            credential,
            model,
        })
    }

    /// Accepts the response for `id` if it is still the current request.
    pub fn on_response(
        &mut self,
        id: RequestId,
        response: Result<AnalysisResult, AnalysisError>,
        now: Instant,
    ) -> Option<Outcome> {
        if self.pending_id() != Some(id) {
            trace!(request_id = id, "discarding stale response");
            return None;
        }
        let in_flight = self.in_flight.take()?;
        match response {
            Ok(result) => {
                debug!(request_id = id, emotion = %result.primary_emotion, "analysis succeeded");
                self.state = PipelineState::Succeeded(result.clone());
                Some(Outcome::Succeeded {
                    id,
                    draft: in_flight.draft,
                    result,
                })
            }
            Err(error) => Some(self.fail(id, error, now)),
        }
    }

    /// Advances the request timeout and the failure window.
    pub fn poll(&mut self, now: Instant) -> Option<Outcome> {
        if self.failed_until.is_some_and(|at| at <= now) {
            self.failed_until = None;
            if matches!(self.state, PipelineState::Failed(_)) {
                self.state = PipelineState::Idle;
            }
        }
        let expired = self.in_flight.as_ref().is_some_and(|f| f.timeout_at <= now);
        if expired {
            let in_flight = self.in_flight.take()?;
            warn!(request_id = in_flight.id, "analysis timed out");
            return Some(self.fail(in_flight.id, AnalysisError::timed_out(), now));
        }
        None
    }

    pub fn deadline(&self) -> Option<Instant> {
        let timeout = self.in_flight.as_ref().map(|f| f.timeout_at);
        match (timeout, self.failed_until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// The presentation has taken the result.
    pub fn consumed(&mut self) {
        if matches!(self.state, PipelineState::Succeeded(_)) {
            self.state = PipelineState::Idle;
        }
    }

    /// Drops observation of any request in flight and returns to `Idle`.
    pub fn discard(&mut self) {
        if let Some(stale) = self.in_flight.take() {
            debug!(request_id = stale.id, "draft emptied, request discarded");
        }
        self.failed_until = None;
        self.state = PipelineState::Idle;
    }

    fn fail(&mut self, id: RequestId, error: AnalysisError, now: Instant) -> Outcome {
        self.failed_until = Some(now + self.timing.failure_window(error.severity()));
        self.state = PipelineState::Failed(error.clone());
        Outcome::Failed { id, error }
    }
}
