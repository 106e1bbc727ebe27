//! Source preparation for the scanner.
//!
//! The scanner's contract is a cleaned string: `[* ... *]` block comments
//! removed, carriage returns stripped, and non-ASCII characters filtered
//! out. The CLI runs [`prepare`] on file contents before lexing.

/// Remove every `[* ... *]` block comment, shortest match first. An
/// unterminated comment runs to the end of the input.
pub fn strip_comments(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '[' && i + 1 < chars.len() && chars[i + 1] == '*' {
            i += 2;
            while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == ']') {
                i += 1;
            }
            // Skip the closing "*]" if present, otherwise we ran off the end.
            i = if i + 1 < chars.len() { i + 2 } else { chars.len() };
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Strip CRs from CRLF line endings so newline counting is uniform.
pub fn trim_carriage_returns(source: &str) -> String {
    source.replace('\r', "")
}

/// Drop every non-ASCII character. Returns the filtered string and
/// whether anything was removed, so the caller can warn.
pub fn filter_ascii(source: &str) -> (String, bool) {
    let filtered: String = source.chars().filter(char::is_ascii).collect();
    let changed = filtered.len() != source.len();
    (filtered, changed)
}

/// Full cleaning pass: comments, then line endings, then character set.
pub fn prepare(source: &str) -> String {
    let stripped = strip_comments(source);
    let normalized = trim_carriage_returns(&stripped);
    let (filtered, changed) = filter_ascii(&normalized);
    if changed {
        log::warn!("non-ASCII characters removed from the source");
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_removed() {
        assert_eq!(strip_comments("a [* comment *] b"), "a  b");
        assert_eq!(strip_comments("[* one *][* two *]x"), "x");
    }

    #[test]
    fn test_comment_matching_is_shortest() {
        assert_eq!(strip_comments("a [* x *] b [* y *] c"), "a  b  c");
    }

    #[test]
    fn test_unterminated_comment_runs_to_end() {
        assert_eq!(strip_comments("a [* never closed"), "a ");
    }

    #[test]
    fn test_carriage_returns_stripped() {
        assert_eq!(trim_carriage_returns("a\r\nb\r\n"), "a\nb\n");
    }

    #[test]
    fn test_non_ascii_filtered() {
        let (filtered, changed) = filter_ascii("x = 1; \u{00e9}");
        assert_eq!(filtered, "x = 1; ");
        assert!(changed);

        let (same, changed) = filter_ascii("x = 1;");
        assert_eq!(same, "x = 1;");
        assert!(!changed);
    }
}
