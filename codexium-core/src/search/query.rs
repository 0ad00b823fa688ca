//! Full-text query compilation
//!
//! Turns raw user input plus mode flags into an FTS5 `MATCH` expression.

use crate::search::{SearchMode, SearchOptions};
use tracing::trace;

/// Maximum token distance for proximity searches
pub const PROXIMITY_DISTANCE: u32 = 10;

/// Compile `raw` into an FTS5 query.
///
/// Returns an empty string when nothing searchable is left; callers treat
/// that as an empty query. `options.case_sensitive` does not change the
/// result: FTS5 case folding is fixed by the index tokenizer.
pub fn compile_query(raw: &str, options: SearchOptions) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let escaped = escape(trimmed);
    let compiled = match options.mode() {
        SearchMode::Wildcard => compile_wildcard(&escaped),
        SearchMode::Proximity => compile_proximity(&escaped),
        SearchMode::Phrase => compile_phrase(&escaped),
    };

    trace!(raw = trimmed, compiled = %compiled, mode = ?options.mode(), "Compiled search query");
    compiled
}

/// Double backslashes and quotes, drop ASCII control characters.
///
/// Tabs and line breaks separate terms, so they become spaces.
fn escape(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\"\""),
            '\t' | '\n' | '\r' => out.push(' '),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

fn compile_wildcard(escaped: &str) -> String {
    escaped
        .split_whitespace()
        .map(|term| term.replace('*', ""))
        .filter(|term| !term.is_empty())
        .map(|term| format!("{}*", fts_term(&term)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn compile_proximity(escaped: &str) -> String {
    let terms: Vec<&str> = escaped.split_whitespace().collect();
    match terms.as_slice() {
        [] => String::new(),
        [single] => fts_term(single),
        _ => {
            let quoted: Vec<String> = terms.iter().map(|term| fts_term(term)).collect();
            format!("NEAR({}, {})", quoted.join(" "), PROXIMITY_DISTANCE)
        }
    }
}

/// Quote a term unless FTS5 accepts it as a bareword.
///
/// Terms are already escaped, so wrapping them yields a valid FTS5 string.
fn fts_term(term: &str) -> String {
    if is_bareword(term) {
        term.to_string()
    } else {
        format!("\"{term}\"")
    }
}

fn is_bareword(term: &str) -> bool {
    !term.is_empty()
        && !matches!(term, "AND" | "OR" | "NOT" | "NEAR")
        && term
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii())
}

fn compile_phrase(escaped: &str) -> String {
    // Control characters may have been the only content
    if escaped.trim().is_empty() {
        return String::new();
    }
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn opts(case_sensitive: bool, fuzzy: bool, wildcards: bool) -> SearchOptions {
        SearchOptions {
            case_sensitive,
            fuzzy,
            wildcards,
        }
    }

    #[test]
    fn test_wildcard_terms() {
        assert_eq!(compile_query("hello world", opts(false, false, true)), "hello* world*");
        assert_eq!(compile_query("  pre*  *fix ", opts(false, false, true)), "pre* fix*");
        assert_eq!(compile_query("* **", opts(false, false, true)), "");
    }

    #[test]
    fn test_wildcard_beats_fuzzy() {
        assert_eq!(compile_query("a b", opts(false, true, true)), "a* b*");
    }

    #[test]
    fn test_proximity() {
        assert_eq!(compile_query("a b", opts(false, true, false)), "NEAR(a b, 10)");
        assert_eq!(
            compile_query("one  two\tthree", opts(false, true, false)),
            "NEAR(one two three, 10)"
        );
        assert_eq!(compile_query("single", opts(false, true, false)), "single");
    }

    #[test]
    fn test_line_breaks_separate_terms() {
        assert_eq!(
            compile_query("hello\nworld", opts(false, false, true)),
            "hello* world*"
        );
        assert_eq!(
            compile_query("one\r\ntwo", opts(false, true, false)),
            "NEAR(one two, 10)"
        );
        assert_eq!(
            compile_query("duty\tof care", opts(false, false, false)),
            "\"duty of care\""
        );
    }

    #[test]
    fn test_punctuated_terms_are_quoted() {
        assert_eq!(
            compile_query("don't stop", opts(false, false, true)),
            "\"don't\"* stop*"
        );
        assert_eq!(
            compile_query("C++ tutorial", opts(false, true, false)),
            "NEAR(\"C++\" tutorial, 10)"
        );
        assert_eq!(
            compile_query("cats AND dogs", opts(false, false, true)),
            "cats* \"AND\"* dogs*"
        );
        assert_eq!(
            compile_query("café_au lait2", opts(false, false, true)),
            "café_au* lait2*"
        );
    }

    #[test]
    fn test_phrase_default() {
        assert_eq!(
            compile_query("exact phrase", opts(false, false, false)),
            "\"exact phrase\""
        );
    }

    #[test]
    fn test_quotes_are_doubled() {
        assert_eq!(
            compile_query("quote\"me", opts(false, false, false)),
            "\"quote\"\"me\""
        );
    }

    #[test]
    fn test_backslash_doubled_and_controls_stripped() {
        assert_eq!(
            compile_query("a\\b\u{0007}c", opts(false, false, false)),
            "\"a\\\\bc\""
        );
    }

    #[test]
    fn test_blank_queries() {
        for mode in [opts(false, false, false), opts(false, true, false), opts(false, false, true)] {
            assert_eq!(compile_query("", mode), "");
            assert_eq!(compile_query("   ", mode), "");
            assert_eq!(compile_query("\u{0001}\u{0002}", mode), "");
        }
    }

    #[test]
    fn test_case_flag_does_not_change_query() {
        for (fuzzy, wildcards) in [(false, false), (true, false), (false, true)] {
            assert_eq!(
                compile_query("Mixed Case", opts(true, fuzzy, wildcards)),
                compile_query("Mixed Case", opts(false, fuzzy, wildcards))
            );
        }
    }
}
