//! Single-threaded driver for a [`Pipeline`].
//!
//! The runtime owns the clock, the timers and every in-flight analysis
//! future. A superseded request keeps running to completion; the pipeline
//! simply ignores its response when it arrives.

use std::rc::Rc;

use futures::StreamExt;
use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace};

use crate::analysis::{AnalysisClient, AnalysisError, AnalysisResult};
use crate::orchestrator::{AnalysisJob, RequestId};
use crate::pipeline::{Effect, Pipeline, PipelineEvent};
use crate::platform::{ElementHandle, Rect};
use crate::presentation::PresentationState;

/// The UI layer: renders presentation states and edits the composer.
pub trait Surface {
    fn render(&mut self, state: &PresentationState, anchor: Option<Rect>);
    /// Chime and ambient glow for a significant result.
    fn attention_cue(&mut self);
    fn replace_draft(&mut self, element: &ElementHandle, text: &str);
}

type Response = (RequestId, Result<AnalysisResult, AnalysisError>);

pub struct Runtime<S> {
    pipeline: Pipeline,
    client: Rc<dyn AnalysisClient>,
    surface: S,
    in_flight: FuturesUnordered<LocalBoxFuture<'static, Response>>,
}

impl<S: Surface> Runtime<S> {
    pub fn new(pipeline: Pipeline, client: Rc<dyn AnalysisClient>, surface: S) -> Self {
        Self {
            pipeline,
            client,
            surface,
            in_flight: FuturesUnordered::new(),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Processes events until the channel closes and all outstanding
    /// requests and timers have settled.
    pub async fn run(&mut self, mut events: mpsc::Receiver<PipelineEvent>) {
        let mut open = true;
        loop {
            let deadline = self.pipeline.next_deadline();
            if !open && deadline.is_none() && self.in_flight.is_empty() {
                break;
            }
            let effects = tokio::select! {
                event = events.recv(), if open => match event {
                    Some(event) => self.pipeline.handle(event, Instant::now()),
                    None => {
                        debug!("event source closed, draining");
                        open = false;
                        continue;
                    }
                },
                Some((id, response)) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    trace!(request_id = id, ok = response.is_ok(), "analysis returned");
                    self.pipeline.handle(
                        PipelineEvent::AnalysisFinished { id, response },
                        Instant::now(),
                    )
                }
                _ = sleep_until_opt(deadline) => self.pipeline.poll_timers(Instant::now()),
            };
            self.apply(effects);
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Analyze(job) => self.spawn_analysis(job),
                Effect::Render { state, anchor } => self.surface.render(&state, anchor),
                Effect::AttentionCue => self.surface.attention_cue(),
                Effect::ReplaceDraft { element, text } => self.surface.replace_draft(&element, &text),
            }
        }
    }

    fn spawn_analysis(&mut self, job: AnalysisJob) {
        let client = Rc::clone(&self.client);
        debug!(request_id = job.request.id, in_flight = self.in_flight.len(), "starting analysis");
        self.in_flight.push(Box::pin(async move {
            let AnalysisJob {
                request,
                credential,
                model,
            } = job;
            let response = client
                .analyze(&request.draft, &request.context, Some(&credential), &model)
                .await;
            (request.id, response)
        }));
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
