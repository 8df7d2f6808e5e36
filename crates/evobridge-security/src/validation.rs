use std::sync::LazyLock;

use regex::Regex;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think regex"));
static PROMPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<prompt>.*?</prompt>").expect("valid prompt regex"));

/// Cleanup applied to model output before it is sent to WhatsApp.
pub struct OutputSanitizer;

impl OutputSanitizer {
    /// Remove `<think>…</think>` and `<prompt>…</prompt>` blocks, then trim.
    ///
    /// Only complete open/close pairs are removed; an unclosed tag is kept
    /// verbatim.
    pub fn strip_reasoning(raw: &str) -> String {
        let without_think = THINK_BLOCK.replace_all(raw, "");
        let without_prompt = PROMPT_BLOCK.replace_all(&without_think, "");
        without_prompt.trim().to_string()
    }
}
