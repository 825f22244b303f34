//! The draft-capture pipeline as a single owned value.
//!
//! [`Pipeline`] is sans-IO: it consumes [`PipelineEvent`]s stamped with the
//! current instant and returns the [`Effect`]s the caller must carry out. Time
//! only advances through [`Pipeline::poll_timers`], which the driver calls
//! once [`Pipeline::next_deadline`] has passed.

use std::rc::Rc;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::analysis::{AnalysisError, AnalysisResult};
use crate::config::Config;
use crate::context::ContextWindow;
use crate::draft::has_changed;
use crate::orchestrator::{AnalysisJob, Dispatch, Orchestrator, Outcome, PipelineState, RequestId};
use crate::platform::{ElementHandle, Page, PlatformAdapter, Rect};
use crate::presentation::{CloseReason, Presentation, PresentationState};
use crate::scheduler::{Debouncer, Throttle};
use crate::settings::SettingsStore;
use crate::triviality::is_trivial;

/// Composer events that (re)arm the debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSignal {
    #[default]
    Input,
    KeyUp,
    Paste,
}

/// Actions raised by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    IndicatorClicked,
    Close(CloseReason),
    ApplySuggestion,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The document mutated; carries the new snapshot.
    PageChanged(Page),
    /// The composer reported input, optionally with its new text.
    Input {
        signal: InputSignal,
        text: Option<String>,
    },
    AnalysisFinished {
        id: RequestId,
        response: Result<AnalysisResult, AnalysisError>,
    },
    User(UserAction),
}

/// Side effects requested by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Analyze(AnalysisJob),
    Render {
        state: PresentationState,
        anchor: Option<Rect>,
    },
    AttentionCue,
    ReplaceDraft {
        element: ElementHandle,
        text: String,
    },
}

pub struct Pipeline {
    adapter: Box<dyn PlatformAdapter>,
    settings: Rc<dyn SettingsStore>,
    config: Config,
    page: Page,
    composer: Option<ElementHandle>,
    last_seen: String,
    debounce: Debouncer,
    throttle: Throttle,
    resync_at: Option<Instant>,
    orchestrator: Orchestrator,
    presentation: Presentation,
}

impl Pipeline {
    pub fn new(
        adapter: Box<dyn PlatformAdapter>,
        settings: Rc<dyn SettingsStore>,
        config: Config,
    ) -> Self {
        let timing = config.timing.clone();
        Self {
            adapter,
            settings,
            page: Page::default(),
            composer: None,
            last_seen: String::new(),
            debounce: Debouncer::new(timing.debounce()),
            throttle: Throttle::new(timing.mutation_throttle()),
            resync_at: None,
            orchestrator: Orchestrator::new(timing.clone()),
            presentation: Presentation::new(timing),
            config,
        }
    }

    pub fn state(&self) -> &PipelineState {
        self.orchestrator.state()
    }

    pub fn presentation(&self) -> &PresentationState {
        self.presentation.state()
    }

    /// The draft last acted upon.
    pub fn last_seen(&self) -> &str {
        &self.last_seen
    }

    pub fn composer(&self) -> Option<&ElementHandle> {
        self.composer.as_ref()
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn handle(&mut self, event: PipelineEvent, now: Instant) -> Vec<Effect> {
        let before = self.presentation.state().clone();
        let mut effects = Vec::new();
        match event {
            PipelineEvent::PageChanged(page) => {
                self.page = page;
                if self.composer.is_none() {
                    self.rescan();
                }
                if self.throttle.signal(now) {
                    trace!("mutation rescan scheduled");
                }
            }
            PipelineEvent::Input { signal, text } => {
                trace!(?signal, "input signal");
                if let (Some(handle), Some(text)) = (&self.composer, text) {
                    self.page.set_text(handle, &text);
                }
                self.input_signal(now);
            }
            PipelineEvent::AnalysisFinished { id, response } => {
                if let Some(outcome) = self.orchestrator.on_response(id, response, now) {
                    self.deliver(outcome, now);
                }
            }
            PipelineEvent::User(action) => self.user_action(action, now, &mut effects),
        }
        self.render_if_changed(&before, &mut effects);
        effects
    }

    /// Earliest instant at which [`Pipeline::poll_timers`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.debounce.deadline(),
            self.throttle.deadline(),
            self.resync_at,
            self.orchestrator.deadline(),
            self.presentation.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn poll_timers(&mut self, now: Instant) -> Vec<Effect> {
        let before = self.presentation.state().clone();
        let mut effects = Vec::new();

        if self.throttle.fire_if_due(now) {
            self.rescan();
            self.input_signal(now);
        }
        if self.resync_at.is_some_and(|at| at <= now) {
            self.resync_at = None;
            self.last_seen = self.current_draft();
            trace!(draft_len = self.last_seen.len(), "resynced after apply");
        }
        if self.debounce.fire_if_due(now) {
            self.debounce_fired(now, &mut effects);
        }
        if let Some(outcome) = self.orchestrator.poll(now) {
            self.deliver(outcome, now);
        }
        if self.presentation.poll(now) {
            effects.push(Effect::AttentionCue);
        }

        self.render_if_changed(&before, &mut effects);
        effects
    }

    fn current_draft(&self) -> String {
        self.composer
            .as_ref()
            .map(|h| self.adapter.extract_draft_text(&self.page, h))
            .unwrap_or_default()
    }

    /// Drops a vanished composer and looks for one if none is tracked.
    fn rescan(&mut self) {
        if let Some(handle) = &self.composer {
            if self.page.editable(handle).is_none() {
                info!(%handle, "composer lost");
                self.composer = None;
            }
        }
        if self.composer.is_none() {
            if let Some(handle) = self.adapter.find_draft_element(&self.page) {
                info!(%handle, platform = ?self.adapter.platform(), "composer attached");
                self.composer = Some(handle);
                self.last_seen.clear();
            }
        }
    }

    fn input_signal(&mut self, now: Instant) {
        if self.composer.is_none() {
            return;
        }
        if self.current_draft().is_empty() && !self.last_seen.is_empty() {
            self.emptied();
            return;
        }
        self.debounce.arm(now);
        self.orchestrator.debouncing();
    }

    fn emptied(&mut self) {
        debug!("draft emptied");
        self.last_seen.clear();
        self.debounce.cancel();
        self.orchestrator.discard();
        self.presentation.clear();
    }

    fn debounce_fired(&mut self, now: Instant, effects: &mut Vec<Effect>) {
        let current = self.current_draft();
        if !has_changed(Some(&self.last_seen), Some(&current)) {
            self.orchestrator.settle_debounce();
            return;
        }
        if current.is_empty() {
            self.emptied();
            return;
        }
        self.last_seen = current.clone();
        if is_trivial(&current) {
            debug!(draft_len = current.len(), "trivial draft filtered");
            self.orchestrator.filtered();
            self.presentation.clear();
            return;
        }

        let limit = self.adapter.context_limit();
        let context = ContextWindow::from_messages(
            limit,
            self.adapter.find_recent_messages(&self.page, limit),
        );
        self.presentation.analyzing();
        match self.orchestrator.dispatch(
            &current,
            context,
            self.settings.as_ref(),
            &self.config.service.default_model,
            now,
        ) {
            Dispatch::Remote(job) => effects.push(Effect::Analyze(job)),
            Dispatch::Settled(outcome) => self.deliver(outcome, now),
        }
    }

    fn deliver(&mut self, outcome: Outcome, now: Instant) {
        match outcome {
            Outcome::Succeeded { id, draft, result } => {
                self.presentation.show_result(id, &result, &draft, now);
                self.orchestrator.consumed();
            }
            Outcome::Failed { id, error } => {
                debug!(request_id = id, %error, "analysis failed");
                self.presentation.show_failure(&error, now);
            }
        }
    }

    fn user_action(&mut self, action: UserAction, now: Instant, effects: &mut Vec<Effect>) {
        match action {
            UserAction::IndicatorClicked => {
                self.presentation.open_detail();
            }
            UserAction::Close(reason) => self.presentation.close(reason),
            UserAction::ApplySuggestion => {
                let Some(element) = self.composer.clone() else {
                    return;
                };
                let Some(text) = self.presentation.take_suggestion() else {
                    return;
                };
                info!(%element, "applying suggestion");
                self.last_seen = text.clone();
                self.page.set_text(&element, &text);
                effects.push(Effect::ReplaceDraft { element, text });
                self.presentation.confirm_applied(now);
                self.resync_at = Some(now + self.config.timing.apply_resync());
            }
        }
    }

    fn render_if_changed(&self, before: &PresentationState, effects: &mut Vec<Effect>) {
        let state = self.presentation.state();
        if state == before {
            return;
        }
        let anchor = self
            .composer
            .as_ref()
            .and_then(|h| self.adapter.element_position(&self.page, h));
        effects.push(Effect::Render {
            state: state.clone(),
            anchor,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{EditableNode, Platform};
    use crate::presentation::Indicator;
    use crate::settings::{API_KEY, MemorySettings};
    use std::time::Duration;

    const MS: Duration = Duration::from_millis(1);

    fn page(text: &str) -> Page {
        Page {
            host: "discord.com".into(),
            editables: vec![EditableNode::new("composer", text).hint("role=textbox")],
            ..Page::default()
        }
    }

    fn pipeline(settings: MemorySettings) -> Pipeline {
        Pipeline::new(
            Platform::Discord.adapter(),
            Rc::new(settings),
            Config::default(),
        )
    }

    fn keyed() -> Pipeline {
        pipeline(MemorySettings::new().with(API_KEY, "sk-test"))
    }

    fn typed(text: &str) -> PipelineEvent {
        PipelineEvent::Input {
            signal: InputSignal::Input,
            text: Some(text.into()),
        }
    }

    /// Polls every deadline up to and including `to`, like the runtime would.
    fn advance(p: &mut Pipeline, to: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        while let Some(at) = p.next_deadline().filter(|at| *at <= to) {
            effects.extend(p.poll_timers(at));
        }
        effects
    }

    fn jobs(effects: &[Effect]) -> Vec<&AnalysisJob> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Analyze(job) => Some(job),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn attaches_to_the_composer_on_first_page() {
        let t0 = Instant::now();
        let mut p = keyed();
        assert!(p.handle(PipelineEvent::PageChanged(page("")), t0).is_empty());
        assert_eq!(p.composer(), Some(&ElementHandle::new("composer")));
    }

    #[test]
    fn burst_of_input_yields_one_request_with_the_final_draft() {
        let t0 = Instant::now();
        let mut p = keyed();
        p.handle(PipelineEvent::PageChanged(page("")), t0);
        for (i, text) in ["wh", "why did", "why did you do that"].iter().enumerate() {
            p.handle(typed(text), t0 + (i as u32 * 300) * MS);
        }
        assert_eq!(p.state(), &PipelineState::Debouncing);
        assert_eq!(p.next_deadline(), Some(t0 + 500 * MS));

        // the mutation rescan at 500ms counts as another signal
        assert!(jobs(&advance(&mut p, t0 + 1499 * MS)).is_empty());
        let effects = advance(&mut p, t0 + 1500 * MS);
        let jobs = jobs(&effects);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].request.draft, "why did you do that");
        assert_eq!(p.last_seen(), "why did you do that");
        assert!(effects.contains(&Effect::Render {
            state: PresentationState::Indicating(Indicator::analyzing()),
            anchor: None
        }));
    }

    #[test]
    fn unchanged_draft_is_not_reanalyzed() {
        let t0 = Instant::now();
        let mut p = keyed();
        p.handle(PipelineEvent::PageChanged(page("are we still on for tonight")), t0);
        p.handle(typed("are we still on for tonight"), t0);
        assert_eq!(jobs(&advance(&mut p, t0 + 1500 * MS)).len(), 1);

        p.handle(typed("are we still on for tonight"), t0 + 1600 * MS);
        assert!(jobs(&advance(&mut p, t0 + 2600 * MS)).is_empty());
    }

    #[test]
    fn trivial_draft_is_filtered_silently() {
        let t0 = Instant::now();
        let mut p = keyed();
        p.handle(PipelineEvent::PageChanged(page("")), t0);
        p.handle(typed("lol"), t0);
        assert!(advance(&mut p, t0 + 1500 * MS).is_empty());
        assert_eq!(p.state(), &PipelineState::Filtered);
        assert_eq!(p.presentation(), &PresentationState::Hidden);
    }

    #[test]
    fn missing_credential_shows_the_key_hint_without_a_job() {
        let t0 = Instant::now();
        let mut p = pipeline(MemorySettings::new());
        p.handle(PipelineEvent::PageChanged(page("")), t0);
        p.handle(typed("I can't believe you said that"), t0);
        let effects = advance(&mut p, t0 + 1500 * MS);
        assert!(jobs(&effects).is_empty());
        assert_eq!(
            p.presentation(),
            &PresentationState::Indicating(Indicator::for_failure(&AnalysisError::MissingCredential))
        );
        assert_eq!(p.next_deadline(), Some(t0 + 5500 * MS));
        advance(&mut p, t0 + 5500 * MS);
        assert_eq!(p.presentation(), &PresentationState::Hidden);
        assert_eq!(p.state(), &PipelineState::Idle);
    }

    #[test]
    fn emptying_the_draft_hides_immediately() {
        let t0 = Instant::now();
        let mut p = keyed();
        p.handle(PipelineEvent::PageChanged(page("")), t0);
        p.handle(typed("we need to talk about money"), t0);
        let effects = advance(&mut p, t0 + 1500 * MS);
        let id = jobs(&effects)[0].request.id;

        let effects = p.handle(typed(""), t0 + 1700 * MS);
        assert_eq!(
            effects,
            [Effect::Render {
                state: PresentationState::Hidden,
                anchor: None
            }]
        );
        assert_eq!(p.state(), &PipelineState::Idle);
        assert_eq!(p.last_seen(), "");

        let late = p.handle(
            PipelineEvent::AnalysisFinished {
                id,
                response: Ok(AnalysisResult::neutral_for("we need to talk about money")),
            },
            t0 + 2000 * MS,
        );
        assert!(late.is_empty());
        assert_eq!(p.presentation(), &PresentationState::Hidden);
    }

    #[test]
    fn apply_updates_last_seen_before_replacing() {
        let t0 = Instant::now();
        let mut p = keyed();
        p.handle(PipelineEvent::PageChanged(page("")), t0);
        p.handle(typed("you never listen to me"), t0);
        let effects = advance(&mut p, t0 + 1500 * MS);
        let id = jobs(&effects)[0].request.id;
        let result = AnalysisResult {
            improved_draft: "I'd love for us to talk when you have a moment".into(),
            ..AnalysisResult::neutral_for("you never listen to me")
        };
        p.handle(
            PipelineEvent::AnalysisFinished {
                id,
                response: Ok(result),
            },
            t0 + 2000 * MS,
        );
        p.handle(PipelineEvent::User(UserAction::IndicatorClicked), t0 + 2100 * MS);
        assert!(matches!(p.presentation(), PresentationState::DetailOpen(_)));

        let effects = p.handle(PipelineEvent::User(UserAction::ApplySuggestion), t0 + 2200 * MS);
        assert_eq!(
            effects[0],
            Effect::ReplaceDraft {
                element: ElementHandle::new("composer"),
                text: "I'd love for us to talk when you have a moment".into()
            }
        );
        assert_eq!(p.last_seen(), "I'd love for us to talk when you have a moment");
        assert_eq!(p.presentation(), &PresentationState::Indicating(Indicator::applied()));

        // the platform echoes the replacement as input; nothing is re-sent
        p.handle(typed("I'd love for us to talk when you have a moment"), t0 + 2250 * MS);
        assert!(jobs(&advance(&mut p, t0 + 3250 * MS)).is_empty());
        assert_eq!(p.last_seen(), "I'd love for us to talk when you have a moment");
    }

    #[test]
    fn lost_composer_is_reattached_with_fresh_state() {
        let t0 = Instant::now();
        let mut p = keyed();
        p.handle(PipelineEvent::PageChanged(page("")), t0);
        p.handle(typed("see you at the station at six"), t0);
        advance(&mut p, t0 + 1500 * MS);
        assert_eq!(p.last_seen(), "see you at the station at six");

        let mut other_chat = page("draft in the other chat");
        other_chat.editables[0].handle = ElementHandle::new("composer-2");
        p.handle(PipelineEvent::PageChanged(other_chat), t0 + 1600 * MS);
        advance(&mut p, t0 + 2100 * MS);
        assert_eq!(p.composer(), Some(&ElementHandle::new("composer-2")));
        assert_eq!(p.last_seen(), "");

        let effects = advance(&mut p, t0 + 3100 * MS);
        assert_eq!(jobs(&effects)[0].request.draft, "draft in the other chat");
    }
}
