//! Lenient decoding of the analysis service's message content.
//!
//! Models wrap their JSON in code fences or prose and drop fields at will.
//! Everything here degrades to the neutral defaults rather than failing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{
    AnalysisResult, NEUTRAL_EMOJI, NEUTRAL_EMOTION, NEUTRAL_SCORE, UNKNOWN_PERCEPTION,
};

static OPEN_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```(?:json)?\s*").expect("valid regex"));

static CLOSE_FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").expect("valid regex"));

/// Removes a leading ```` ```json ```` or ```` ``` ```` fence and a trailing fence.
pub fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let start = OPEN_FENCE_RE.find(trimmed).map_or(0, |m| m.end());
    let body = &trimmed[start..];
    let end = CLOSE_FENCE_RE.find(body).map_or(body.len(), |m| m.start());
    &body[..end]
}

/// The first well-formed JSON object embedded in `text`.
pub fn first_json_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(pos, _)| {
        let mut values = serde_json::Deserializer::from_str(&text[pos..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

/// Builds a result from a decoded object, defaulting each missing or
/// unusable field independently.
pub fn from_object(object: &Map<String, Value>, draft: &str) -> AnalysisResult {
    let text = |key: &str, default: &str| -> String {
        match object.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Null) | None => default.to_string(),
            Some(other) => {
                debug!(field = key, value = %other, "unexpected field type");
                default.to_string()
            }
        }
    };
    AnalysisResult {
        relationship_score: object
            .get("relationship_score")
            .and_then(score)
            .unwrap_or(NEUTRAL_SCORE),
        primary_emotion: text("primary_emotion", NEUTRAL_EMOTION),
        emoji: text("emoji", NEUTRAL_EMOJI),
        tone: text("tone", NEUTRAL_EMOTION),
        recipient_feeling: text("recipient_feeling", NEUTRAL_EMOTION),
        perception_analysis: text("perception_analysis", UNKNOWN_PERCEPTION),
        improved_draft: text("improved_draft", draft),
        has_significant_emotion: object
            .get("has_significant_emotion")
            .and_then(flag)
            .unwrap_or(false),
    }
}

/// Turns the service's message content into a complete result.
///
/// No content, or content without any JSON object, yields
/// [`AnalysisResult::could_not_analyze`].
pub fn normalize_content(content: Option<&str>, draft: &str) -> AnalysisResult {
    let Some(content) = content.filter(|c| !c.trim().is_empty()) else {
        warn!("analysis response had no content");
        return AnalysisResult::could_not_analyze(draft);
    };
    match first_json_object(strip_fences(content)) {
        Some(object) => from_object(&object, draft),
        None => {
            warn!(content_len = content.len(), "no JSON object in analysis response");
            AnalysisResult::could_not_analyze(draft)
        }
    }
}

fn score(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then(|| n.round().clamp(0.0, 100.0) as u8)
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}
