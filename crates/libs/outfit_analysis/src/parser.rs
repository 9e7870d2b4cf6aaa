use crate::structs::NARRATIVE_FIELDS;
use crate::taxonomy::Category;
use crate::validator::check_category;
use serde_json::{Map, Value};
use std::fmt;

/// What a single model pass is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassTarget {
    /// Every clothing category at once.
    Primary,
    /// One category, re-examined in isolation.
    Focus(Category),
    /// The description, thermal and weather texts.
    Narrative,
}

impl PassTarget {
    /// Categories this pass may write.
    #[must_use]
    pub fn scope(self) -> Vec<Category> {
        match self {
            Self::Primary => Category::ALL.to_vec(),
            Self::Focus(category) => vec![category],
            Self::Narrative => Vec::new(),
        }
    }
}

impl fmt::Display for PassTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Focus(category) => write!(f, "{category}-focus"),
            Self::Narrative => f.write_str("narrative"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseStatus {
    /// Decoded payload: the `clothing_info` object (plus any narrative text)
    /// for primary passes, the validated category value for focus passes, the
    /// narrative object otherwise.
    Ok(Value),
    Malformed { reason: String },
}

/// Output of one model invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PassResult {
    pub target: PassTarget,
    pub raw_text: String,
    pub status: ParseStatus,
}

impl PassResult {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, ParseStatus::Ok(_))
    }

    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        match &self.status {
            ParseStatus::Ok(value) => Some(value),
            ParseStatus::Malformed { .. } => None,
        }
    }
}

/// Models like to wrap JSON in a markdown fence even when told not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json) on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn decode_object(raw_text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(strip_code_fence(raw_text)) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(format!("not valid JSON: {e}")),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn extract(target: PassTarget, mut object: Map<String, Value>) -> Result<Value, String> {
    match target {
        PassTarget::Primary => match object.remove("clothing_info") {
            Some(Value::Object(mut info)) => {
                // Prose next to the wrapper travels with the categories.
                for field in NARRATIVE_FIELDS {
                    if let Some(text) = object.remove(field) {
                        info.entry(field).or_insert(text);
                    }
                }
                Ok(Value::Object(info))
            }
            Some(other) => Err(format!(
                "`clothing_info` must be an object, got {}",
                json_kind(&other)
            )),
            // Some models drop the wrapper and answer with the categories directly.
            None if Category::ALL.iter().any(|c| object.contains_key(c.key())) => {
                Ok(Value::Object(object))
            }
            None => Err("no `clothing_info` in response".to_string()),
        },
        PassTarget::Focus(category) => {
            let key = category.key();
            let value = match object.remove(key) {
                Some(value) => value,
                None => match object.remove("clothing_info") {
                    Some(Value::Object(mut info)) if info.contains_key(key) => {
                        info.remove(key).unwrap_or(Value::Null)
                    }
                    _ => return Err(format!("no `{key}` in response")),
                },
            };
            // A focused answer must stand on its own; it replaces a prior value.
            check_category(category, Some(&value)).map_err(|e| e.to_string())?;
            Ok(value)
        }
        PassTarget::Narrative => {
            let has_text = NARRATIVE_FIELDS.iter().any(|field| {
                object
                    .get(*field)
                    .and_then(Value::as_str)
                    .is_some_and(|text| !text.trim().is_empty())
            });
            if has_text {
                Ok(Value::Object(object))
            } else {
                Err("no narrative text in response".to_string())
            }
        }
    }
}

/// Decode the raw text of one pass. Never fails: undecodable output is
/// reported through [`ParseStatus::Malformed`].
#[must_use]
pub fn parse(target: PassTarget, raw_text: impl Into<String>) -> PassResult {
    let raw_text = raw_text.into();
    let status = match decode_object(&raw_text).and_then(|object| extract(target, object)) {
        Ok(payload) => ParseStatus::Ok(payload),
        Err(reason) => ParseStatus::Malformed { reason },
    };
    PassResult {
        target,
        raw_text,
        status,
    }
}
