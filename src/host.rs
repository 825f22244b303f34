//! Newline-delimited JSON bridge to a host page.
//!
//! The browser side writes one [`HostEvent`] per line; the pipeline's
//! surface output is written back as one JSON object per line.

use std::io::Write;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::pipeline::{InputSignal, PipelineEvent, UserAction};
use crate::platform::{ElementHandle, Page, Rect};
use crate::presentation::{CloseReason, PresentationState};
use crate::runtime::Surface;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Page {
        page: Page,
    },
    Input {
        #[serde(default)]
        kind: InputSignal,
        #[serde(default)]
        text: Option<String>,
    },
    Click,
    Close {
        #[serde(default = "default_close")]
        reason: CloseReason,
    },
    Apply,
}

fn default_close() -> CloseReason {
    CloseReason::Button
}

impl From<HostEvent> for PipelineEvent {
    fn from(event: HostEvent) -> Self {
        match event {
            HostEvent::Page { page } => PipelineEvent::PageChanged(page),
            HostEvent::Input { kind, text } => PipelineEvent::Input { signal: kind, text },
            HostEvent::Click => PipelineEvent::User(UserAction::IndicatorClicked),
            HostEvent::Close { reason } => PipelineEvent::User(UserAction::Close(reason)),
            HostEvent::Apply => PipelineEvent::User(UserAction::ApplySuggestion),
        }
    }
}

/// Reads host events line by line and forwards them to the pipeline.
///
/// Malformed lines are logged and skipped. Returns when the reader is
/// exhausted or the receiver is gone.
pub async fn forward_events<R>(reader: R, tx: mpsc::Sender<PipelineEvent>) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("reading host events")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = match serde_json::from_str::<HostEvent>(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "ignoring malformed host event");
                continue;
            }
        };
        if tx.send(event.into()).await.is_err() {
            debug!("pipeline stopped, no longer forwarding");
            break;
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
enum SurfaceLine<'a> {
    Render {
        state: &'a PresentationState,
        anchor: Option<Rect>,
    },
    AttentionCue,
    ReplaceDraft {
        element: &'a ElementHandle,
        text: &'a str,
    },
}

/// [`Surface`] that writes each effect as a JSON line.
pub struct ConsoleSurface<W> {
    out: W,
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &SurfaceLine<'_>) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, line)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }

    fn emit(&mut self, line: &SurfaceLine<'_>) {
        if let Err(e) = self.write_line(line) {
            warn!(error = %e, "failed to write surface output");
        }
    }
}

impl<W: Write> Surface for ConsoleSurface<W> {
    fn render(&mut self, state: &PresentationState, anchor: Option<Rect>) {
        self.emit(&SurfaceLine::Render { state, anchor });
    }

    fn attention_cue(&mut self) {
        self.emit(&SurfaceLine::AttentionCue);
    }

    fn replace_draft(&mut self, element: &ElementHandle, text: &str) {
        self.emit(&SurfaceLine::ReplaceDraft { element, text });
    }
}
