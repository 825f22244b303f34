//! Core types for the `second-thought` crate.
//!
//! This crate watches a chat composer, decides when a draft is worth a second
//! look, asks a remote model how it will land and drives a small indicator
//! and detail view from the answer. [`Pipeline`] holds all of that state and
//! is driven by [`Runtime`] on a single-threaded tokio runtime.

pub mod analysis;
pub mod config;
pub mod context;
pub mod draft;
pub mod host;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod platform;
pub mod presentation;
pub mod runtime;
pub mod scheduler;
pub mod settings;
pub mod triviality;

pub use analysis::{AnalysisClient, AnalysisError, AnalysisResult, OpenRouterClient};
pub use config::Config;
pub use context::{ContextMessage, ContextWindow, Sender};
pub use orchestrator::{AnalysisJob, AnalysisRequest, PipelineState, RequestId};
pub use pipeline::{Effect, InputSignal, Pipeline, PipelineEvent, UserAction};
pub use platform::{ElementHandle, Page, Platform, PlatformAdapter};
pub use presentation::{CloseReason, PresentationState};
pub use runtime::{Runtime, Surface};
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore};
pub use triviality::is_trivial;
