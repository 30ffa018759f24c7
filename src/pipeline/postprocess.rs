//! Deterministic cleanup of model-generated Markdown.
//!
//! Even a well-prompted vision model occasionally wraps its answer in
//! ```` ```markdown ```` fences, emits CRLF line endings, or sprinkles
//! zero-width characters copied from the page. These are cheap string
//! fixes, so they live here rather than in ever-longer prompt rules. Each
//! pass is a pure `&str -> String` function and independently tested.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean one page of raw model output.
///
/// Passes, in order:
/// 1. Strip a single outer ```` ```markdown ```` fence
/// 2. Normalise CRLF/CR to LF
/// 3. Trim trailing whitespace per line
/// 4. Collapse runs of 3+ blank lines to one blank line
/// 5. Strip invisible Unicode (ZWSP, BOM, soft hyphen, joiners)
/// 6. Trim leading/trailing blank lines
pub fn clean_page(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalize_line_endings(&s);
    let s = trim_line_ends(&s);
    let s = collapse_blank_lines(&s);
    let s = strip_invisible(&s);
    s.trim_matches('\n').to_string()
}

static OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_line_ends(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    BLANK_RUNS.replace_all(input, "\n\n").to_string()
}

fn strip_invisible(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}
