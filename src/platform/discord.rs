use super::{EditableKind, ElementHandle, Page, Platform, PlatformAdapter, recent_nodes};
use crate::context::{ContextMessage, Sender};

const COMPOSER_HINTS: [&str; 4] = [
    "text-area",
    "slate-editor",
    "aria-label=Message",
    "role=textbox",
];

/// How far back to look for the author of a grouped message.
const AUTHOR_LOOKBACK: usize = 40;

/// Adapter for the Discord web client.
pub struct Discord;

impl Discord {
    /// Author of message `idx`, walking back over grouped follow-ups.
    fn author_of(page: &Page, idx: usize) -> Option<&str> {
        page.messages[..=idx]
            .iter()
            .rev()
            .take(AUTHOR_LOOKBACK + 1)
            .find_map(|node| node.author.as_deref())
            .map(str::trim)
            .filter(|author| !author.is_empty())
    }
}

impl PlatformAdapter for Discord {
    fn platform(&self) -> Platform {
        Platform::Discord
    }

    fn context_limit(&self) -> usize {
        12
    }

    fn find_draft_element(&self, page: &Page) -> Option<ElementHandle> {
        for hint in COMPOSER_HINTS {
            if let Some(node) = page
                .editables
                .iter()
                .find(|node| node.visible && node.has_hint(hint))
            {
                return Some(node.handle.clone());
            }
        }
        if let Some(node) = page
            .editables
            .iter()
            .find(|node| node.visible && node.has_hint("main"))
        {
            return Some(node.handle.clone());
        }
        page.focused_editable()
            .filter(|node| {
                node.has_hint("role=textbox")
                    || node.has_hint("slate-editor")
                    || node.kind == EditableKind::ContentEditable
            })
            .map(|node| node.handle.clone())
    }

    fn find_recent_messages(&self, page: &Page, limit: usize) -> Vec<ContextMessage> {
        let me = page.account_name.as_deref().map(str::trim);
        recent_nodes(page, limit)
            .map(|(idx, _, text)| match Self::author_of(page, idx) {
                Some(author) => {
                    let sender = if me == Some(author) {
                        Sender::Me
                    } else {
                        Sender::Them
                    };
                    ContextMessage::new(sender, text).by(author)
                }
                None => ContextMessage::new(Sender::Them, text),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{EditableNode, MessageNode};

    #[test]
    fn picks_visible_candidates_in_hint_order() {
        let page = Page {
            editables: vec![
                EditableNode::new("search", "").hint("role=textbox"),
                EditableNode::new("old", "").hint("slate-editor").hidden(),
                EditableNode::new("composer", "").hint("aria-label=Message #general"),
            ],
            ..Page::default()
        };
        assert_eq!(
            Discord.find_draft_element(&page),
            Some(ElementHandle::new("composer"))
        );
    }

    #[test]
    fn falls_back_to_main_area_then_focus() {
        let page = Page {
            editables: vec![EditableNode::new("thread", "").hint("main")],
            ..Page::default()
        };
        assert_eq!(Discord.find_draft_element(&page), Some(ElementHandle::new("thread")));

        let page = Page {
            focused: Some(ElementHandle::new("popup")),
            editables: vec![EditableNode::new("popup", "").hidden()],
            ..Page::default()
        };
        assert_eq!(Discord.find_draft_element(&page), Some(ElementHandle::new("popup")));
    }

    #[test]
    fn grouped_messages_inherit_the_previous_author() {
        let page = Page {
            account_name: Some("sam".into()),
            messages: vec![
                MessageNode {
                    author: Some("alex".into()),
                    ..MessageNode::new("you there?")
                },
                MessageNode::new("hello??"),
                MessageNode {
                    author: Some("sam".into()),
                    ..MessageNode::new("yes, sorry")
                },
                MessageNode::new("was driving"),
            ],
            ..Page::default()
        };
        let messages = Discord.find_recent_messages(&page, 12);
        let senders: Vec<_> = messages.iter().map(|m| m.sender).collect();
        assert_eq!(senders, [Sender::Them, Sender::Them, Sender::Me, Sender::Me]);
        assert_eq!(messages[1].author.as_deref(), Some("alex"));
        assert_eq!(messages[1].render(100), "[Them] (alex): hello??");
    }

    #[test]
    fn authorless_history_is_attributed_to_them() {
        let page = Page {
            messages: vec![MessageNode::new("orphan")],
            ..Page::default()
        };
        let messages = Discord.find_recent_messages(&page, 12);
        assert_eq!(messages[0].sender, Sender::Them);
        assert_eq!(messages[0].author, None);
    }

    #[test]
    fn author_lookup_is_bounded() {
        let mut messages = vec![MessageNode {
            author: Some("far".into()),
            ..MessageNode::new("start")
        }];
        messages.extend((0..AUTHOR_LOOKBACK + 1).map(|i| MessageNode::new(format!("m{i}"))));
        let page = Page {
            messages,
            ..Page::default()
        };
        let recent = Discord.find_recent_messages(&page, 1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].author, None);
    }
}
