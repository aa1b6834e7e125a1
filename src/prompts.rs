//! Prompts sent to the vision backends.
//!
//! All wording lives here so that a prompt change is a one-file diff and
//! unit tests can inspect the exact text without a live backend.

/// Base prompt for transcribing handwritten pages.
pub const DEFAULT_PROMPT: &str = r#"You are an expert transcriber of handwritten documents. Your two most important goals are **semantic fidelity** (the text must mean the same thing) and **output purity** (you must only output the transcription).

**Output Purity: Provide ONLY the transcribed text as standard Markdown. Absolutely no introductions, summaries, or commentary.**

**1. Guiding Principles for Transcription**

* **Logic is Law:** The final transcription of any sentence **must** make logical sense. Be skeptical of odd phrases. Prefer the interpretation that fits the context of personal reflection over a purely visual match.
* **Be Conservative with Proper Nouns:**
    * Proper nouns are the most common source of error. **Do not guess or substitute a more common name.**
    * If a name is ambiguous, transcribe it phonetically as best you can, even if it does not form a known word.
* **Context Over Shape:** Use the surrounding words to resolve unclear handwriting.

**2. Formatting Rules (Strict)**

* **Paragraphs:** Join all lines of a visually contiguous block of text into one flowing paragraph. Separate distinct blocks with one blank line.
* **Headers:** Use Markdown bold for headers (highlighted or inverted text). **Do not** use '#' heading symbols.
* **Highlighting & Symbols:**
    * Only enclose text in `==highlight tags==` if it is explicitly highlighted.
    * Reproduce symbols such as dashes, exclamation points and stars (☆ or ★) exactly.

**Final Review:** Before finishing, check your output once more for misspelled proper nouns and make sure no introductory commentary was added.
"#;

/// Base prompt plus the caller's additional instructions, if any.
pub fn build_prompt(additional: &str) -> String {
    let additional = additional.trim();
    if additional.is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        format!("{DEFAULT_PROMPT}\n\nAdditional instructions: {additional}\n\n")
    }
}

/// Prompt for one call covering `pages` consecutive page images.
///
/// The model is told the page count and forbidden from inventing its own
/// page markers, since the assembler adds those itself when requested.
pub fn batch_prompt(pages: usize, base: &str) -> String {
    format!(
        "You are transcribing {pages} consecutive pages from a personal handwritten document. \
The pages are provided in order.

**CRITICAL: Output Format Requirements:**
- Transcribe all {pages} pages as continuous flowing text
- Preserve page boundaries by keeping natural paragraph breaks between pages
- Do NOT add page numbers, headers, or separators (no \"Page 1:\", \"---\", etc.)
- Keep style and formatting consistent across all pages
- If a sentence or thought continues across pages, keep it continuous

{base}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_forbids_heading_symbols() {
        assert!(DEFAULT_PROMPT.contains("'#'"));
        assert!(DEFAULT_PROMPT.contains("==highlight tags=="));
    }

    #[test]
    fn build_prompt_without_additional_is_default() {
        assert_eq!(build_prompt(""), DEFAULT_PROMPT);
        assert_eq!(build_prompt("   "), DEFAULT_PROMPT);
    }

    #[test]
    fn build_prompt_appends_additional() {
        let p = build_prompt("Names: Anouk, Teodor");
        assert!(p.starts_with(DEFAULT_PROMPT));
        assert!(p.ends_with("Additional instructions: Names: Anouk, Teodor\n\n"));
    }

    #[test]
    fn batch_prompt_states_page_count_and_keeps_base() {
        let p = batch_prompt(3, "BASE");
        assert!(p.contains("transcribing 3 consecutive pages"));
        assert!(p.contains("Transcribe all 3 pages"));
        assert!(p.contains("Do NOT add page numbers"));
        assert!(p.ends_with("BASE"));
    }
}
