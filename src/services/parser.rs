use crate::core::error::{GenerationError, Result};
use crate::core::model::{StoryRecord, DIALOG_PLACEHOLDER};
use crate::utils::text::{extract_json_array, remove_trailing_commas};
use log::{debug, warn};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct ParseOptions<'a> {
    pub panel_count: usize,
    /// Minimum number of valid stories the batch must yield.
    pub expected_count: Option<usize>,
    /// Character per position, used when a story leaves `character` empty.
    pub character_plan: &'a [String],
    pub first_episode: u32,
}

const REQUIRED_FIELDS: [&str; 5] = ["title", "desc", "kick", "narration", "summary"];

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Rejects entries without the required string fields or a dialog array.
fn is_valid_entry(obj: &Map<String, Value>) -> bool {
    REQUIRED_FIELDS
        .iter()
        .all(|key| obj.get(*key).is_some_and(Value::is_string))
        && obj.get("dialog").is_some_and(Value::is_array)
}

fn normalize_dialog(raw: &[Value], panel_count: usize) -> Vec<String> {
    let mut lines: Vec<String> = raw
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .take(panel_count)
        .collect();
    lines.resize(panel_count, DIALOG_PLACEHOLDER.to_string());
    lines
}

fn to_record(obj: &Map<String, Value>, position: usize, options: &ParseOptions) -> StoryRecord {
    let dialog = obj
        .get("dialog")
        .and_then(Value::as_array)
        .map(|raw| normalize_dialog(raw, options.panel_count))
        .unwrap_or_else(|| vec![DIALOG_PLACEHOLDER.to_string(); options.panel_count]);

    let character = string_field(obj, "character")
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .or_else(|| options.character_plan.get(position).cloned())
        .unwrap_or_default();

    let theme = string_field(obj, "theme").filter(|t| !t.trim().is_empty());

    let episode = obj
        .get("episode")
        .and_then(Value::as_u64)
        .and_then(|e| u32::try_from(e).ok())
        .filter(|e| *e > 0)
        .unwrap_or_else(|| {
            let offset = u32::try_from(position).unwrap_or(u32::MAX);
            options.first_episode.max(1).saturating_add(offset)
        });

    StoryRecord {
        title: string_field(obj, "title").unwrap_or_default(),
        desc: string_field(obj, "desc").unwrap_or_default(),
        kick: string_field(obj, "kick").unwrap_or_default(),
        dialog,
        narration: string_field(obj, "narration").unwrap_or_default(),
        summary: string_field(obj, "summary").unwrap_or_default(),
        character,
        theme,
        episode: Some(episode),
    }
}

/// Extracts, repairs and normalizes the story array from a raw backend reply.
pub fn parse(raw: &str, options: &ParseOptions) -> Result<Vec<StoryRecord>> {
    let json = remove_trailing_commas(&extract_json_array(raw));
    let value: Value = serde_json::from_str(&json).map_err(|e| {
        GenerationError::MalformedResponse(format!("response is not valid JSON: {}", e))
    })?;

    let Value::Array(entries) = value else {
        return Err(GenerationError::MalformedResponse(
            "response is not a JSON array".to_string(),
        ));
    };

    let total = entries.len();
    let stories: Vec<StoryRecord> = entries
        .iter()
        .filter_map(Value::as_object)
        .filter(|obj| is_valid_entry(obj))
        .enumerate()
        .map(|(position, obj)| to_record(obj, position, options))
        .collect();

    if stories.len() < total {
        warn!("Dropped {} invalid stories from the reply", total - stories.len());
    }

    if let Some(expected) = options.expected_count {
        if stories.len() < expected {
            return Err(GenerationError::IncompleteBatch {
                expected,
                actual: stories.len(),
            });
        }
    }

    debug!("Parsed {} stories", stories.len());
    Ok(stories)
}
