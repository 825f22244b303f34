//! Draft text handling and change detection.
//!
//! Mutation observers fire far more often than the composer text actually
//! changes, so every path into the pipeline goes through [`has_changed`]
//! before any work is scheduled.

/// Characters chat editors sprinkle into content-editable composers.
const INVISIBLE: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Returns `true` when `previous` and `current` differ as drafts.
///
/// Absent and empty drafts are equivalent. Any other difference, including
/// empty to non-empty and back, counts as a change.
///
/// ```
/// use second_thought::draft::has_changed;
/// assert!(!has_changed(None, Some("")));
/// assert!(!has_changed(Some("hi there"), Some("hi there")));
/// assert!(has_changed(Some("hi there"), None));
/// ```
pub fn has_changed(previous: Option<&str>, current: Option<&str>) -> bool {
    let previous = previous.unwrap_or("");
    let current = current.unwrap_or("");
    if previous.is_empty() && current.is_empty() {
        return false;
    }
    previous != current
}

/// Normalizes raw composer text: drops zero-width characters and trims.
pub fn clean_editable_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !INVISIBLE.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Returns at most `max` characters of `text` without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_absent_are_the_same() {
        assert!(!has_changed(None, None));
        assert!(!has_changed(Some(""), None));
        assert!(!has_changed(None, Some("")));
        assert!(!has_changed(Some(""), Some("")));
    }

    #[test]
    fn change_detection_is_symmetric() {
        let drafts = [None, Some(""), Some("a"), Some("hey can we talk"), Some("a ")];
        for a in drafts {
            for b in drafts {
                let expected = !(a.unwrap_or("").is_empty() && b.unwrap_or("").is_empty())
                    && a.unwrap_or("") != b.unwrap_or("");
                assert_eq!(has_changed(a, b), expected, "{a:?} -> {b:?}");
                assert_eq!(has_changed(a, b), has_changed(b, a));
            }
        }
    }

    #[test]
    fn emptying_is_a_change() {
        assert!(has_changed(Some("draft"), Some("")));
        assert!(has_changed(None, Some("draft")));
    }

    #[test]
    fn strips_zero_width_characters() {
        assert_eq!(clean_editable_text("\u{200B} hello\u{FEFF} "), "hello");
        assert_eq!(clean_editable_text("\u{200D}"), "");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("😕😕😕", 1), "😕");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
