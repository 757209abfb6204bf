//! git::message
//!
//! Commit messages derived from the working tree status.

/// Leading word of every derived message.
pub const MESSAGE_PREFIX: &str = "Upd";

/// Maximum width of a derived message, marker included.
pub const MAX_MESSAGE_WIDTH: usize = 70;

/// Appended when the path list had to be cut.
pub const TRUNCATION_MARKER: &str = "...";

/// How `commit_all` picks its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitMessage {
    /// Use this text verbatim.
    Text(String),
    /// Build the message from the changed paths, see [`derived_message`].
    Derived,
}

impl CommitMessage {
    pub fn text(message: impl Into<String>) -> Self {
        Self::Text(message.into())
    }
}

/// Build `Upd <path> <path> ...`, shortened to [`MAX_MESSAGE_WIDTH`].
///
/// # Example
///
/// ```
/// use netboxgit::git::derived_message;
///
/// assert_eq!(
///     derived_message(["devices/devices.json"]),
///     "Upd devices/devices.json"
/// );
///
/// let many: Vec<String> = (0..20).map(|i| format!("devices/sw{i}.json")).collect();
/// let message = derived_message(many.iter().map(String::as_str));
/// assert!(message.ends_with("..."));
/// assert!(message.chars().count() <= 70);
/// ```
pub fn derived_message<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let words: Vec<&str> = std::iter::once(MESSAGE_PREFIX).chain(paths).collect();
    shorten(&words.join(" "), MAX_MESSAGE_WIDTH, TRUNCATION_MARKER)
}

/// Collapse whitespace, then cut at a word boundary so that the text plus
/// `marker` fits in `width` characters.
///
/// A first word that alone exceeds the budget is cut mid-word.
pub fn shorten(text: &str, width: usize, marker: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(marker.chars().count());
    let mut kept = String::new();
    let mut kept_len = 0;
    for word in &words {
        let word_len = word.chars().count();
        let needed = if kept.is_empty() { word_len } else { word_len + 1 };
        if kept_len + needed > budget {
            break;
        }
        if !kept.is_empty() {
            kept.push(' ');
        }
        kept.push_str(word);
        kept_len += needed;
    }

    if kept.is_empty() {
        kept = words
            .first()
            .map(|w| w.chars().take(budget).collect())
            .unwrap_or_default();
    }
    kept.push_str(marker);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_list_is_kept_whole() {
        assert_eq!(
            derived_message(["a.json", "b.json"]),
            "Upd a.json b.json"
        );
    }

    #[test]
    fn no_paths_is_just_the_prefix() {
        assert_eq!(derived_message([]), "Upd");
    }

    #[test]
    fn exactly_at_width_is_not_cut() {
        // "Upd " + 66 characters = 70
        let path = "x".repeat(66);
        let message = derived_message([path.as_str()]);
        assert_eq!(message.chars().count(), 70);
        assert!(!message.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn cut_at_word_boundary() {
        let paths: Vec<String> = (0..10).map(|i| format!("devices/sw{i}/eth0.json")).collect();
        let message = derived_message(paths.iter().map(String::as_str));

        assert!(message.starts_with("Upd devices/sw0/eth0.json"));
        assert!(message.ends_with("json..."));
        assert!(message.chars().count() <= MAX_MESSAGE_WIDTH);
    }

    #[test]
    fn overlong_first_word_is_cut_mid_word() {
        assert_eq!(shorten("abcdefghij", 8, "..."), "abcde...");
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(shorten("a   b\tc", 70, "..."), "a b c");
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(shorten(&"é".repeat(10), 8, "..."), "ééééé...");
    }
}
