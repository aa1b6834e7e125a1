//! Post-processing: deterministic cleanup of provider responses.
//!
//! Two independent passes live here:
//!
//! 1. [`normalise_response`] runs on every raw provider response exactly
//!    once. Models sometimes wrap the whole answer in a ` ```markdown ` fence
//!    despite the prompt, and some backends return CRLF line endings. The
//!    text itself is never altered.
//! 2. [`strip_markdown_formatting`] removes emphasis and highlight markers
//!    when plain-text output is requested. It runs on whole group text, after
//!    any fallback join, so it sees exactly what will be written.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean one raw provider response.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip an outer code fence that wraps the whole response
///
/// Zero-width joiners and other format characters are content (emoji
/// sequences, Persian and Indic spelling) and pass through untouched.
pub fn normalise_response(raw: &str) -> String {
    let s = normalise_line_endings(raw);
    strip_code_fence(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer code fence ───────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown)?\n(.*)\n```\s*$").unwrap());

/// Return the fenced body if the *whole* response is one fenced block.
///
/// A fence that only wraps part of the text is content and is left alone.
pub fn strip_code_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Plain-text stripping ─────────────────────────────────────────────────────

static RE_HIGHLIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r"==(.*?)==").unwrap());
static RE_BOLD_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static RE_BOLD_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.*?)__").unwrap());
static RE_ITALIC_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static RE_ITALIC_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(.*?)_").unwrap());

fn strip_once(input: &str) -> String {
    let s = RE_HIGHLIGHT.replace_all(input, "$1");
    let s = RE_BOLD_STAR.replace_all(&s, "$1");
    let s = RE_BOLD_UNDERSCORE.replace_all(&s, "$1");
    let s = RE_ITALIC_STAR.replace_all(&s, "$1");
    RE_ITALIC_UNDERSCORE.replace_all(&s, "$1").into_owned()
}

/// Remove `==highlight==`, `**bold**`, `__bold__`, `*italic*` and `_italic_`
/// markers, keeping the enclosed text.
///
/// Markers never span lines. The passes repeat until nothing changes, so
/// applying the function twice gives the same result as applying it once.
pub fn strip_markdown_formatting(input: &str) -> String {
    let mut current = strip_once(input);
    loop {
        let next = strip_once(&current);
        // Every effective pass removes marker characters, so this terminates.
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fence_markdown() {
        let input = "```markdown\n**Monday**\n\nWent for a walk.\n```";
        assert_eq!(strip_code_fence(input), "**Monday**\n\nWent for a walk.");
    }

    #[test]
    fn test_strip_fence_no_lang() {
        let input = "```\nHello\n```\n";
        assert_eq!(strip_code_fence(input), "Hello");
    }

    #[test]
    fn test_partial_fence_is_content() {
        let input = "Notes\n```\ncode\n```";
        assert_eq!(strip_code_fence(input), input);
    }

    #[test]
    fn test_no_fence_passthrough() {
        assert_eq!(strip_code_fence("Just text"), "Just text");
    }

    #[test]
    fn test_normalise_response_crlf_and_fence() {
        let raw = "```markdown\r\nLine one\r\nLine two\r\n```";
        assert_eq!(normalise_response(raw), "Line one\nLine two");
    }

    #[test]
    fn test_joiners_survive_normalisation() {
        let raw = "family: 👨\u{200D}👩\u{200D}👧\nfa: می\u{200C}خواهم\nsoft\u{00AD}hyphen";
        assert_eq!(normalise_response(raw), raw);

        let fenced = format!("```markdown\n{raw}\n```");
        assert_eq!(normalise_response(&fenced), raw);
    }

    #[test]
    fn test_strip_highlight_and_emphasis() {
        let input = "==Key== idea: **bold**, __also bold__, *it* and _it_.";
        assert_eq!(
            strip_markdown_formatting(input),
            "Key idea: bold, also bold, it and it."
        );
    }

    #[test]
    fn test_markers_do_not_span_lines() {
        let input = "5 * 3\nand 2 * 4";
        assert_eq!(strip_markdown_formatting(input), input);
    }

    #[test]
    fn test_strip_is_idempotent() {
        let samples = [
            "**==nested==**",
            "***triple***",
            "a_b_c_d",
            "____x____",
            "== spaced == and **==mixed**==",
            "plain",
            "",
        ];
        for s in samples {
            let once = strip_markdown_formatting(s);
            assert_eq!(strip_markdown_formatting(&once), once, "input: {s:?}");
        }
    }

    #[test]
    fn test_nested_markers_fully_removed() {
        assert_eq!(strip_markdown_formatting("**==nested==**"), "nested");
        assert_eq!(strip_markdown_formatting("***triple***"), "triple");
    }
}
