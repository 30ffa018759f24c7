//! Transcription prompts.
//!
//! Centralised so changing the default instruction is a one-place edit and
//! unit tests can inspect prompts without a live backend. Callers override
//! the default via [`crate::config::ConversionConfig::prompt`].

/// Default instruction sent with every page image.
///
/// Used when `ConversionConfig::prompt` is `None`.
pub const DEFAULT_PROMPT: &str = r#"Extract only the text visible in this document page.

Rules:
- Output clean Markdown that mirrors the original formatting exactly:
  headings, lists, tables, bold, italic, and any other visible styling.
- Keep the reading order a human would use.
- If a region is illegible, write 'illegible text' in its place.
- Do not describe the page, add commentary, or mention anything that is
  not present in the document.
- Do not wrap the output in ```markdown fences."#;

/// Compose the prompt actually sent to the backend.
///
/// Appends a language hint when one is configured, so the model does not
/// "helpfully" translate the document.
pub fn build_prompt(custom: Option<&str>, language: Option<&str>) -> String {
    let base = custom.unwrap_or(DEFAULT_PROMPT);
    match language {
        Some(lang) => format!("{base}\n\nThe text is in {lang}."),
        None => base.to_string(),
    }
}
