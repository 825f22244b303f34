//! Indicator and detail-view lifecycle.
//!
//! [`Presentation`] observes orchestrator outcomes and user actions and keeps
//! its own timers (auto-hide, attention cue). It never touches the request
//! lifecycle.

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::analysis::{AnalysisError, AnalysisResult};
use crate::config::TimingConfig;
use crate::draft::truncate_chars;
use crate::orchestrator::RequestId;

/// Glyph and short label shown next to the composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Indicator {
    pub glyph: String,
    pub label: String,
    pub auto_hide: bool,
}

impl Indicator {
    fn new(glyph: &str, label: impl Into<String>, auto_hide: bool) -> Self {
        Self {
            glyph: glyph.to_string(),
            label: label.into(),
            auto_hide,
        }
    }

    pub fn analyzing() -> Self {
        Self::new("⏳", "Analyzing…", false)
    }

    pub fn applied() -> Self {
        Self::new("✅", "Applied!", true)
    }

    pub fn for_result(result: &AnalysisResult) -> Self {
        Self::new(&result.emoji, result.primary_emotion.clone(), true)
    }

    pub fn for_failure(error: &AnalysisError) -> Self {
        match error {
            AnalysisError::Network { timed_out: true, .. } => Self::new("❌", "Timeout", true),
            AnalysisError::Network { .. } => Self::new("❌", "Network error", true),
            AnalysisError::Upstream { status: 429, .. } => {
                Self::new("⏸️", "Quota exceeded - check API settings", true)
            }
            AnalysisError::Upstream { status: 404, .. } => Self::new("⚠️", "Model not found", true),
            AnalysisError::Upstream { message, .. } if message.trim().is_empty() => {
                Self::new("❌", "Analysis failed", true)
            }
            AnalysisError::Upstream { message, .. } => {
                Self::new("❌", truncate_chars(message, 30), true)
            }
            AnalysisError::MissingCredential => {
                Self::new("🔑", "Add your API key in settings", true)
            }
            AnalysisError::EmptyDraft => Self::new("❌", "No draft detected", true),
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.glyph, self.label)
    }
}

/// Coarse sentiment of the tone description, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneClass {
    Positive,
    Negative,
    Neutral,
}

impl ToneClass {
    pub fn of(tone: &str) -> Self {
        let tone = tone.to_lowercase();
        if ["positive", "friendly", "kind"].iter().any(|k| tone.contains(k)) {
            ToneClass::Positive
        } else if ["negative", "harsh", "aggressive"].iter().any(|k| tone.contains(k)) {
            ToneClass::Negative
        } else {
            ToneClass::Neutral
        }
    }
}

/// Everything the detail view shows for one result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub emoji: String,
    pub emotion: String,
    pub tone: String,
    pub tone_class: ToneClass,
    pub recipient_feeling: String,
    pub perception: String,
    pub relationship_score: u8,
    pub original_draft: String,
    /// Present only when the rewrite differs from the draft.
    pub suggestion: Option<String>,
}

impl DetailView {
    pub fn new(result: &AnalysisResult, draft: &str) -> Self {
        Self {
            emoji: result.emoji.clone(),
            emotion: result.primary_emotion.clone(),
            tone: result.tone.clone(),
            tone_class: ToneClass::of(&result.tone),
            recipient_feeling: result.recipient_feeling.clone(),
            perception: result.perception_analysis.clone(),
            relationship_score: result.relationship_score,
            original_draft: draft.to_string(),
            suggestion: result.suggestion_for(draft).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum PresentationState {
    Hidden,
    Indicating(Indicator),
    DetailOpen(DetailView),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Button,
    Escape,
    OutsideClick,
}

#[derive(Debug, Clone)]
struct Held {
    id: RequestId,
    draft: String,
    result: AnalysisResult,
}

pub struct Presentation {
    timing: TimingConfig,
    state: PresentationState,
    held: Option<Held>,
    hide_at: Option<Instant>,
    cue_at: Option<Instant>,
}

impl Presentation {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            timing,
            state: PresentationState::Hidden,
            held: None,
            hide_at: None,
            cue_at: None,
        }
    }

    pub fn state(&self) -> &PresentationState {
        &self.state
    }

    pub fn held_id(&self) -> Option<RequestId> {
        self.held.as_ref().map(|h| h.id)
    }

    /// A request was dispatched.
    pub fn analyzing(&mut self) {
        self.reset_timers();
        self.held = None;
        self.state = PresentationState::Indicating(Indicator::analyzing());
    }

    /// Shows a result; repeating the same result for the same request is a no-op.
    pub fn show_result(&mut self, id: RequestId, result: &AnalysisResult, draft: &str, now: Instant) {
        if self
            .held
            .as_ref()
            .is_some_and(|h| h.id == id && &h.result == result)
        {
            trace!(request_id = id, "result already shown");
            return;
        }
        self.held = Some(Held {
            id,
            draft: draft.to_string(),
            result: result.clone(),
        });
        self.state = PresentationState::Indicating(Indicator::for_result(result));
        self.hide_at = Some(now + self.timing.auto_hide());
        self.cue_at = result
            .has_significant_emotion
            .then(|| now + self.timing.cue_delay());
    }

    pub fn show_failure(&mut self, error: &AnalysisError, now: Instant) {
        self.held = None;
        self.cue_at = None;
        self.state = PresentationState::Indicating(Indicator::for_failure(error));
        self.hide_at = Some(now + self.timing.failure_window(error.severity()));
    }

    /// Opens the detail view if a result is held. Returns whether it opened.
    pub fn open_detail(&mut self) -> bool {
        let Some(held) = &self.held else {
            return false;
        };
        if !matches!(self.state, PresentationState::Indicating(_)) {
            return false;
        }
        self.state = PresentationState::DetailOpen(DetailView::new(&held.result, &held.draft));
        self.hide_at = None;
        true
    }

    pub fn close(&mut self, reason: CloseReason) {
        if matches!(self.state, PresentationState::DetailOpen(_)) {
            debug!(?reason, "detail view closed");
            self.held = None;
            self.state = PresentationState::Hidden;
        }
    }

    /// The draft was emptied: hide and forget everything.
    pub fn clear(&mut self) {
        self.reset_timers();
        self.held = None;
        self.state = PresentationState::Hidden;
    }

    /// Takes the suggestion from the open detail view.
    pub fn take_suggestion(&mut self) -> Option<String> {
        let PresentationState::DetailOpen(view) = &self.state else {
            return None;
        };
        let suggestion = view.suggestion.clone()?;
        self.held = None;
        Some(suggestion)
    }

    pub fn confirm_applied(&mut self, now: Instant) {
        self.cue_at = None;
        self.state = PresentationState::Indicating(Indicator::applied());
        self.hide_at = Some(now + self.timing.auto_hide());
    }

    /// Runs due timers. Returns `true` when the attention cue is due.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.hide_at.is_some_and(|at| at <= now) {
            self.hide_at = None;
            self.held = None;
            self.state = PresentationState::Hidden;
        }
        if self.cue_at.is_some_and(|at| at <= now) {
            self.cue_at = None;
            return true;
        }
        false
    }

    pub fn deadline(&self) -> Option<Instant> {
        match (self.hide_at, self.cue_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn reset_timers(&mut self) {
        self.hide_at = None;
        self.cue_at = None;
    }
}
