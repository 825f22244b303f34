use once_cell::sync::Lazy;
use regex::Regex;

use super::{Direction, ElementHandle, Page, Platform, PlatformAdapter, recent_nodes};
use crate::context::{ContextMessage, Sender};

/// Candidate hints in order of preference; the empty hint matches any editable.
const COMPOSER_HINTS: [&str; 4] = ["data-tab=10", "role=textbox", "compose-box", ""];

/// A composer's bottom edge lies below this share of the viewport height.
const BOTTOM_THRESHOLD: f64 = 0.7;

// "[10:32, 1/2/2024] Alice: "
static METADATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[[^\]]*\]\s*([^:]+):").expect("valid regex"));

/// Adapter for WhatsApp Web.
pub struct WhatsApp;

impl PlatformAdapter for WhatsApp {
    fn platform(&self) -> Platform {
        Platform::WhatsApp
    }

    fn context_limit(&self) -> usize {
        10
    }

    fn find_draft_element(&self, page: &Page) -> Option<ElementHandle> {
        let threshold = page.viewport_height * BOTTOM_THRESHOLD;
        for hint in COMPOSER_HINTS {
            let found = page.editables.iter().find(|node| {
                (hint.is_empty() || node.has_hint(hint))
                    && (node.has_hint("compose-box")
                        || node.rect.is_some_and(|r| r.bottom() > threshold))
            });
            if let Some(node) = found {
                return Some(node.handle.clone());
            }
        }
        page.focused_editable().map(|node| node.handle.clone())
    }

    fn find_recent_messages(&self, page: &Page, limit: usize) -> Vec<ContextMessage> {
        recent_nodes(page, limit)
            .map(|(_, node, text)| {
                if let Some(direction) = node.direction {
                    let sender = match direction {
                        Direction::Out => Sender::Me,
                        Direction::In => Sender::Them,
                    };
                    return ContextMessage::new(sender, text);
                }
                let author = node
                    .metadata
                    .as_deref()
                    .and_then(|m| METADATA_RE.captures(m))
                    .map(|caps| caps[1].trim().to_string());
                match author {
                    Some(author) => {
                        let sender = if page.account_name.as_deref() == Some(author.as_str()) {
                            Sender::Me
                        } else {
                            Sender::Unknown
                        };
                        ContextMessage::new(sender, text).by(author)
                    }
                    None => ContextMessage::new(Sender::Unknown, text),
                }
            })
            .collect()
    }
}
