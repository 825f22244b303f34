use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::analysis::FailureSeverity;

/// Timers that drive the pipeline, in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Quiet period after the last input signal before a draft is read.
    pub debounce_ms: u64,
    /// Minimum gap between composer rescans triggered by page mutations.
    pub mutation_throttle_ms: u64,
    pub request_timeout_ms: u64,
    /// How long a successful result stays on the indicator.
    pub auto_hide_ms: u64,
    /// Delay between a significant result and its attention cue.
    pub cue_delay_ms: u64,
    /// Failure display window for timeouts.
    pub failure_brief_ms: u64,
    /// Failure display window for other network failures.
    pub failure_notice_ms: u64,
    /// Failure display window for credential, upstream and empty-draft failures.
    pub failure_serious_ms: u64,
    /// Delay before the composer is re-read after a suggestion is applied.
    pub apply_resync_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            mutation_throttle_ms: 500,
            request_timeout_ms: 15_000,
            auto_hide_ms: 8000,
            cue_delay_ms: 600,
            failure_brief_ms: 2000,
            failure_notice_ms: 3000,
            failure_serious_ms: 4000,
            apply_resync_ms: 100,
        }
    }
}

impl TimingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn mutation_throttle(&self) -> Duration {
        Duration::from_millis(self.mutation_throttle_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn auto_hide(&self) -> Duration {
        Duration::from_millis(self.auto_hide_ms)
    }

    pub fn cue_delay(&self) -> Duration {
        Duration::from_millis(self.cue_delay_ms)
    }

    pub fn apply_resync(&self) -> Duration {
        Duration::from_millis(self.apply_resync_ms)
    }

    /// How long a failure of the given severity stays visible.
    pub fn failure_window(&self, severity: FailureSeverity) -> Duration {
        Duration::from_millis(match severity {
            FailureSeverity::Brief => self.failure_brief_ms,
            FailureSeverity::Notice => self.failure_notice_ms,
            FailureSeverity::Serious => self.failure_serious_ms,
        })
    }
}

/// Remote analysis service settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub api_url: String,
    /// Model used when the settings store has no selection.
    pub default_model: String,
    pub transport_timeout_ms: u64,
    /// Number of history messages included in the prompt.
    pub prompt_messages: usize,
    /// Per-message character cap in the prompt.
    pub prompt_message_chars: usize,
    pub temperature: f64,
    pub max_tokens: u32,
    pub referer: String,
    pub title: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://openrouter.ai/api/v1/chat/completions".into(),
            default_model: "mistralai/devstral-2512:free".into(),
            transport_timeout_ms: 30_000,
            prompt_messages: 5,
            prompt_message_chars: 100,
            temperature: 0.7,
            max_tokens: 1000,
            referer: "https://github.com/second-thought".into(),
            title: "Second Thought".into(),
        }
    }
}

impl ServiceConfig {
    pub fn transport_timeout(&self) -> Duration {
        Duration::from_millis(self.transport_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timing: TimingConfig,
    pub service: ServiceConfig,
}

/// Load a [`Config`] from a TOML file.
///
/// Missing tables and keys take their defaults.
///
/// # Examples
///
/// ```no_run
/// use second_thought::config::load;
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let cfg = load("second-thought.toml").await.unwrap();
/// assert_eq!(cfg.timing.debounce_ms, 1000);
/// # });
/// ```
pub async fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(toml::from_str(&text)?)
}
