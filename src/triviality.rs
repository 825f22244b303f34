//! Classification of drafts that are not worth a remote analysis.

use once_cell::sync::Lazy;
use regex::Regex;

static ACKNOWLEDGEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(ok|k|kk|okay|yep|yeah|yes|no|nope|thanks|ty|thx|np|brb|be right back|ttyl|talk to you later|gtg|got to go|cya|see ya|hi|hey|hello|bye|goodbye|good night|gn|good morning|gm)$",
    )
    .expect("valid regex")
});

static LAUGHTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(lol|haha|hehe|lmao|rofl)$").expect("valid regex"));

static REACTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{Extended_Pictographic}\p{Emoji_Modifier}\u{FE0F}\u{200D}]+$")
        .expect("valid regex")
});

// Digits, '#' and '*' carry the Emoji property, so "42" counts.
static EMOJI_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{Emoji}+$").expect("valid regex"));

/// Returns `true` when `draft` is conversational filler.
///
/// ```
/// use second_thought::triviality::is_trivial;
/// assert!(is_trivial("ok"));
/// assert!(is_trivial("👍"));
/// assert!(is_trivial("   "));
/// assert!(!is_trivial("ok let's meet at the station tomorrow"));
/// ```
pub fn is_trivial(draft: &str) -> bool {
    let trimmed = draft.trim();
    if trimmed.is_empty() {
        return true;
    }

    let lowered = trimmed.to_lowercase();
    let words = lowered.split_whitespace().count();
    let chars = lowered.chars().count();

    if words < 3
        && chars < 15
        && (ACKNOWLEDGEMENT_RE.is_match(&lowered)
            || LAUGHTER_RE.is_match(&lowered)
            || REACTION_RE.is_match(&lowered))
    {
        return true;
    }

    chars <= 2 && EMOJI_ONLY_RE.is_match(&lowered)
}
