use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)```").expect("valid regex"));

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\]}])").expect("valid regex"));

pub fn strip_code_blocks(s: &str) -> String {
    let s = s.trim();
    if let Some(caps) = FENCED_BLOCK.captures(s) {
        return caps[1].trim().to_string();
    }
    s.to_string()
}

/// Cuts surrounding prose away from a JSON array reply.
pub fn extract_json_array(raw: &str) -> String {
    let text = strip_code_blocks(raw);
    if text.starts_with('[') {
        return text;
    }
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
        _ => text,
    }
}

pub fn remove_trailing_commas(json: &str) -> String {
    TRAILING_COMMA.replace_all(json, "$1").into_owned()
}

/// Lowercase, punctuation and whitespace removed.
pub fn normalize_for_similarity(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn char_bigrams(s: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

pub fn jaccard<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
