use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

use super::normalize::normalize_content;
use super::{AnalysisClient, AnalysisError, AnalysisResult};
use crate::config::ServiceConfig;
use crate::context::ContextWindow;

const SYSTEM_PROMPT: &str = include_str!("prompt.txt");

/// [`AnalysisClient`] backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    service: ServiceConfig,
}

#[derive(Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenRouterClient {
    pub fn new(service: ServiceConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(service.transport_timeout())
            .build()?;
        Ok(Self { http, service })
    }

    pub fn service(&self) -> &ServiceConfig {
        &self.service
    }

    /// The user turn: numbered history followed by the quoted draft.
    pub fn user_message(&self, draft: &str, context: &ContextWindow) -> String {
        let lines: Vec<String> = context
            .latest(self.service.prompt_messages)
            .enumerate()
            .map(|(i, msg)| format!("{}. {}", i + 1, msg.render(self.service.prompt_message_chars)))
            .collect();
        let history = if lines.is_empty() {
            "No previous conversation history available.".to_string()
        } else {
            format!("Conversation history (oldest first):\n{}", lines.join("\n"))
        };
        format!(
            "{history}\n\nDraft message to analyze: \"{draft}\"\n\nRemember: reply with the JSON object only, no markdown."
        )
    }

    fn request_body(&self, draft: &str, context: &ContextWindow, model: &str) -> Value {
        json!({
            "model": model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": self.user_message(draft, context)}
            ],
            "temperature": self.service.temperature,
            "max_tokens": self.service.max_tokens
        })
    }
}

/// Best human-readable reason for a failed call.
fn upstream_message(body: &str, status: StatusCode) -> String {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let field = |pointer: &str| match parsed.pointer(pointer) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    field("/error/message")
        .or_else(|| field("/message"))
        .or_else(|| field("/error/status"))
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Unknown API error".to_string())
}

#[async_trait(?Send)]
impl AnalysisClient for OpenRouterClient {
    async fn analyze(
        &self,
        draft: &str,
        context: &ContextWindow,
        credential: Option<&str>,
        model: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let credential = credential
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(AnalysisError::MissingCredential)?;
        if draft.trim().is_empty() {
            return Err(AnalysisError::EmptyDraft);
        }

        let body = self.request_body(draft, context, model);
        trace!(target: "llm", url = %self.service.api_url, %body, "analysis prompt");
        let resp = self
            .http
            .post(&self.service.api_url)
            .bearer_auth(credential)
            .header("HTTP-Referer", &self.service.referer)
            .header("X-Title", &self.service.title)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            let message = upstream_message(&text, status);
            warn!(status = status.as_u16(), %message, "analysis service rejected request");
            return Err(AnalysisError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        debug!(target: "llm", response = %text, "analysis response");
        let content = serde_json::from_str::<Completion>(&text)
            .ok()
            .and_then(|c| c.choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|message| message.content);
        Ok(normalize_content(content.as_deref(), draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextMessage, Sender};

    #[test]
    fn prompt_numbers_the_latest_history() {
        let client = OpenRouterClient::new(ServiceConfig::default()).unwrap();
        let context = ContextWindow::from_messages(
            12,
            (0..8).map(|i| ContextMessage::new(Sender::Them, format!("m{i}"))),
        );
        let message = client.user_message("see you", &context);
        assert!(message.starts_with("Conversation history (oldest first):\n1. [Them]: m3\n"));
        assert!(message.contains("5. [Them]: m7\n"));
        assert!(!message.contains("m2"));
        assert!(message.contains("Draft message to analyze: \"see you\""));
    }

    #[test]
    fn prompt_without_history() {
        let client = OpenRouterClient::new(ServiceConfig::default()).unwrap();
        let message = client.user_message("hello there friend", &ContextWindow::new(10));
        assert!(message.starts_with("No previous conversation history available."));
    }

    #[test]
    fn history_lines_are_truncated() {
        let client = OpenRouterClient::new(ServiceConfig {
            prompt_message_chars: 4,
            ..ServiceConfig::default()
        })
        .unwrap();
        let context =
            ContextWindow::from_messages(10, [ContextMessage::new(Sender::Me, "abcdefgh")]);
        assert!(client.user_message("x", &context).contains("1. [Me]: abcd\n"));
    }

    #[test]
    fn extracts_upstream_messages_in_order() {
        let bad = StatusCode::BAD_REQUEST;
        assert_eq!(
            upstream_message(r#"{"error":{"message":"bad model","status":"X"},"message":"m"}"#, bad),
            "bad model"
        );
        assert_eq!(upstream_message(r#"{"message":"top"}"#, bad), "top");
        assert_eq!(upstream_message(r#"{"error":{"status":"QUOTA"}}"#, bad), "QUOTA");
        assert_eq!(upstream_message("<html>", bad), "Bad Request");
        assert_eq!(
            upstream_message("", StatusCode::from_u16(599).unwrap()),
            "Unknown API error"
        );
    }
}
