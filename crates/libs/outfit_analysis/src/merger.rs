use crate::parser::{ParseStatus, PassResult, PassTarget};
use crate::structs::{DESCRIPTION, NARRATIVE_FIELDS, THERMAL_PROPERTIES, WEATHER_APPROPRIATENESS};
use crate::taxonomy::Category;
use crate::validator::category_is_present;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("no primary pass to merge")]
    MissingPrimary,
    #[error("primary response could not be parsed: {0}")]
    MalformedPrimary(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NarrativeDraft {
    pub description: Option<String>,
    pub thermal_properties: Option<String>,
    pub weather_appropriateness: Option<String>,
}

impl NarrativeDraft {
    fn slot(&mut self, field: &str) -> Option<&mut Option<String>> {
        match field {
            DESCRIPTION => Some(&mut self.description),
            THERMAL_PROPERTIES => Some(&mut self.thermal_properties),
            WEATHER_APPROPRIATENESS => Some(&mut self.weather_appropriateness),
            _ => None,
        }
    }

    /// Overwrite every field for which `object` carries non-empty text.
    fn absorb(&mut self, object: &Map<String, Value>) -> usize {
        let mut written = 0;
        for field in NARRATIVE_FIELDS {
            let Some(text) = object.get(field).and_then(Value::as_str) else {
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }
            if let Some(slot) = self.slot(field) {
                *slot = Some(text.trim().to_string());
                written += 1;
            }
        }
        written
    }

    fn fill_missing(&mut self, fallback: &str) {
        for field in NARRATIVE_FIELDS {
            if let Some(slot) = self.slot(field) {
                slot.get_or_insert_with(|| fallback.to_string());
            }
        }
    }
}

/// The in-progress analysis. Category values stay raw JSON until validation;
/// a missing key means nothing has been asserted about that category yet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CandidateRecord {
    pub clothing_info: Map<String, Value>,
    #[serde(flatten)]
    pub narrative: NarrativeDraft,
}

impl CandidateRecord {
    /// Seed a candidate from the primary pass.
    pub fn from_primary(pass: &PassResult) -> Result<Self, MergeError> {
        if pass.target != PassTarget::Primary {
            return Err(MergeError::MissingPrimary);
        }
        let payload = match &pass.status {
            ParseStatus::Ok(Value::Object(payload)) => payload,
            ParseStatus::Ok(_) => {
                return Err(MergeError::MalformedPrimary(
                    "payload is not an object".to_string(),
                ));
            }
            ParseStatus::Malformed { reason } => {
                return Err(MergeError::MalformedPrimary(reason.clone()));
            }
        };

        let mut candidate = Self::default();
        for category in Category::ALL {
            if let Some(value) = payload.get(category.key()) {
                candidate
                    .clothing_info
                    .insert(category.key().to_string(), value.clone());
            }
        }
        // The primary pass is not asked for prose, but keep it when offered.
        candidate.narrative.absorb(payload);
        Ok(candidate)
    }

    /// Apply a supplementary pass. Returns `false` when it contributed
    /// nothing, leaving the candidate untouched.
    pub fn apply(&mut self, pass: &PassResult) -> bool {
        let Some(payload) = pass.payload() else {
            return false;
        };
        match pass.target {
            PassTarget::Primary => {
                debug!("Ignoring a second primary pass");
                false
            }
            PassTarget::Focus(category) => {
                self.clothing_info
                    .insert(category.key().to_string(), payload.clone());
                true
            }
            PassTarget::Narrative => payload
                .as_object()
                .is_some_and(|object| self.narrative.absorb(object) > 0),
        }
    }

    #[must_use]
    pub fn category(&self, category: Category) -> Option<&Value> {
        self.clothing_info.get(category.key())
    }

    /// A category is weak when no valid concrete value has been asserted:
    /// it is missing, unknown, absent, or holds something out of taxonomy.
    #[must_use]
    pub fn is_weak(&self, category: Category) -> bool {
        !category_is_present(category, self.category(category))
    }

    /// Substitute the fallback text for narrative fields no pass produced.
    pub fn finalize(&mut self, fallback: &str) {
        self.narrative.fill_missing(fallback);
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Fold an ordered list of passes into one candidate. The first pass must be
/// the primary pass; later passes win over earlier ones for the same field.
pub fn merge(passes: &[PassResult], fallback: &str) -> Result<CandidateRecord, MergeError> {
    let (primary, supplements) = passes.split_first().ok_or(MergeError::MissingPrimary)?;
    let mut candidate = CandidateRecord::from_primary(primary)?;
    for pass in supplements {
        candidate.apply(pass);
    }
    candidate.finalize(fallback);
    Ok(candidate)
}
