//! Host page model and the per-platform adapters that query it.
//!
//! The browser bridge serializes the parts of the document the pipeline
//! cares about into a [`Page`]. A [`PlatformAdapter`] knows where a given
//! chat platform keeps its composer and its message list; the rest of the
//! pipeline never branches on platform identity.

mod discord;
mod whatsapp;

pub use discord::Discord;
pub use whatsapp::WhatsApp;

use serde::{Deserialize, Serialize};

use crate::context::ContextMessage;
use crate::draft::clean_editable_text;

/// Stable identifier of an element on the host page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounding box of an element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            top: self.top + dy,
            left: self.left + dx,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableKind {
    #[default]
    ContentEditable,
    /// `<input>` or `<textarea>`.
    TextField,
}

/// An editable element that might be the composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditableNode {
    pub handle: ElementHandle,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub kind: EditableKind,
    /// Viewport-relative bounding box.
    #[serde(default)]
    pub rect: Option<Rect>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Attribute hints such as `role=textbox`, `data-tab=10`,
    /// `compose-box`, `slate-editor` or `aria-label=Message #general`.
    #[serde(default)]
    pub hints: Vec<String>,
}

fn default_visible() -> bool {
    true
}

impl EditableNode {
    pub fn new(handle: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            handle: ElementHandle::new(handle),
            text: text.into(),
            kind: EditableKind::default(),
            rect: None,
            visible: true,
            hints: Vec::new(),
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn at(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Whether any hint starts with `prefix`.
    pub fn has_hint(&self, prefix: &str) -> bool {
        self.hints.iter().any(|h| h.starts_with(prefix))
    }
}

/// Direction class of a message bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

/// A rendered message in the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageNode {
    pub text: String,
    #[serde(default)]
    pub direction: Option<Direction>,
    /// Platform metadata attached to the bubble, e.g. WhatsApp's
    /// `[10:32, 1/2/2024] Alice: ` prefix.
    #[serde(default)]
    pub metadata: Option<String>,
    /// Author label rendered on this node; grouped follow-up messages have none.
    #[serde(default)]
    pub author: Option<String>,
}

impl MessageNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Structured snapshot of the host document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub viewport_height: f64,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
    #[serde(default)]
    pub focused: Option<ElementHandle>,
    #[serde(default)]
    pub editables: Vec<EditableNode>,
    #[serde(default)]
    pub messages: Vec<MessageNode>,
    /// Display name of the logged-in account, when the page shows it.
    #[serde(default)]
    pub account_name: Option<String>,
}

impl Page {
    pub fn editable(&self, handle: &ElementHandle) -> Option<&EditableNode> {
        self.editables.iter().find(|e| &e.handle == handle)
    }

    pub fn focused_editable(&self) -> Option<&EditableNode> {
        self.focused.as_ref().and_then(|h| self.editable(h))
    }

    /// Replaces the text of `handle`, returning `false` if it is not on the page.
    pub fn set_text(&mut self, handle: &ElementHandle, text: &str) -> bool {
        match self.editables.iter_mut().find(|e| &e.handle == handle) {
            Some(node) => {
                node.text = text.to_string();
                true
            }
            None => false,
        }
    }
}

/// Supported chat platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[value(name = "whatsapp")]
    WhatsApp,
    Discord,
}

impl Platform {
    /// Maps a page host name to a platform.
    ///
    /// ```
    /// use second_thought::platform::Platform;
    /// assert_eq!(Platform::detect("web.whatsapp.com"), Some(Platform::WhatsApp));
    /// assert_eq!(Platform::detect("discord.com"), Some(Platform::Discord));
    /// assert_eq!(Platform::detect("example.org"), None);
    /// ```
    pub fn detect(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        if host.contains("whatsapp") {
            Some(Platform::WhatsApp)
        } else if host.contains("discord") {
            Some(Platform::Discord)
        } else {
            None
        }
    }

    pub fn adapter(self) -> Box<dyn PlatformAdapter> {
        match self {
            Platform::WhatsApp => Box::new(WhatsApp),
            Platform::Discord => Box::new(Discord),
        }
    }
}

/// Element discovery and attribution for one chat platform.
pub trait PlatformAdapter {
    fn platform(&self) -> Platform;

    /// Maximum number of history messages to collect.
    fn context_limit(&self) -> usize;

    /// Locates the composer element, if the page currently shows one.
    fn find_draft_element(&self, page: &Page) -> Option<ElementHandle>;

    /// Recent messages, most recent last, at most `limit` entries.
    fn find_recent_messages(&self, page: &Page, limit: usize) -> Vec<ContextMessage>;

    /// Current text of the composer, or an empty string if it is gone.
    fn extract_draft_text(&self, page: &Page, handle: &ElementHandle) -> String {
        match page.editable(handle) {
            Some(node) => match node.kind {
                EditableKind::ContentEditable => clean_editable_text(&node.text),
                EditableKind::TextField => node.text.trim().to_string(),
            },
            None => String::new(),
        }
    }

    /// Document-relative position of `handle`.
    fn element_position(&self, page: &Page, handle: &ElementHandle) -> Option<Rect> {
        page.editable(handle)
            .and_then(|node| node.rect)
            .map(|rect| rect.offset(page.scroll_x, page.scroll_y))
    }
}

/// Trimmed text of the last `limit` message nodes, skipping empty bubbles.
fn recent_nodes(page: &Page, limit: usize) -> impl Iterator<Item = (usize, &MessageNode, &str)> {
    let start = page.messages.len().saturating_sub(limit);
    page.messages
        .iter()
        .enumerate()
        .skip(start)
        .filter_map(|(idx, node)| {
            let text = node.text.trim();
            (!text.is_empty()).then_some((idx, node, text))
        })
}
