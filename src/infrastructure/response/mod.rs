use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static CODE_FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z]*\s*\n?([\s\S]*?)\n?\s*```$").unwrap());

/// Strips wrappers models sometimes put around a JSON payload so that only
/// the document itself is left for the strict parser.
pub fn clean_model_json(response: &str) -> String {
    // Remove <think>...</think> and <think/> tags
    let mut cleaned = THINK_TAG_PATTERN.replace_all(response, "").to_string();

    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();

    cleaned = cleaned.trim().to_string();

    // Unwrap ```json ... ``` fences
    if let Some(captures) = CODE_FENCE_PATTERN.captures(&cleaned) {
        if let Some(inner) = captures.get(1) {
            cleaned = inner.as_str().trim().to_string();
        }
    }

    cleaned
}
