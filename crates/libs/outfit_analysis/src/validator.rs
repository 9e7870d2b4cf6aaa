//! Turns a merged candidate into a typed [`AnalysisResult`]. Values outside
//! the taxonomy are rejected with the offending field path, never coerced.

use crate::merger::CandidateRecord;
use crate::structs::{
    Accessories, AnalysisResult, ClothingInfo, DESCRIPTION, Eyewear, FullBody, Headwear,
    LowerBody, Narrative, Observation, THERMAL_PROPERTIES, UpperBody, UpperBodyItem,
    WEATHER_APPROPRIATENESS,
};
use crate::taxonomy::{
    AccessoryType, Category, EyewearType, FullBodyType, HeadwearType, LowerBodyType,
    NOT_APPLICABLE, UNKNOWN, is_sentinel,
};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("field `{field}` has invalid value {value}: {reason}")]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `clothing_info.eyewear.type`.
    pub field: String,
    /// The offending value as compact JSON.
    pub value: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &str, value: &Value, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

type Validated<T> = Result<T, ValidationError>;

/// An enumerated field: a concrete taxonomy value or one of the sentinels.
enum Choice<T> {
    Concrete(T),
    Unknown,
    NotApplicable,
}

impl<T> Choice<T> {
    fn concrete(self) -> Option<T> {
        match self {
            Self::Concrete(value) => Some(value),
            Self::Unknown | Self::NotApplicable => None,
        }
    }
}

fn choice<T: FromStr>(path: &str, object: &Map<String, Value>, name: &str) -> Validated<Choice<T>> {
    let field = format!("{path}.{name}");
    match object.get(name) {
        None | Some(Value::Null) => Ok(Choice::Unknown),
        Some(Value::String(s)) if s == UNKNOWN => Ok(Choice::Unknown),
        Some(Value::String(s)) if s == NOT_APPLICABLE => Ok(Choice::NotApplicable),
        Some(value @ Value::String(s)) => s
            .parse()
            .map(Choice::Concrete)
            .map_err(|_| ValidationError::new(&field, value, "not a permitted value")),
        Some(value) => Err(ValidationError::new(&field, value, "expected a string")),
    }
}

fn attribute<T: FromStr>(path: &str, object: &Map<String, Value>, name: &str) -> Validated<Option<T>> {
    Ok(choice(path, object, name)?.concrete())
}

fn flag(path: &str, object: &Map<String, Value>, name: &str) -> Validated<Option<bool>> {
    match object.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(value) => Err(ValidationError::new(
            &format!("{path}.{name}"),
            value,
            "expected a boolean",
        )),
    }
}

/// Resolve the top-level form of a category value: `null`, `false` or an object.
fn category_object<'a>(
    path: &str,
    value: Option<&'a Value>,
) -> Validated<Result<&'a Map<String, Value>, Observation<()>>> {
    match value {
        None | Some(Value::Null) => Ok(Err(Observation::Unknown)),
        Some(Value::Bool(false)) => Ok(Err(Observation::Absent)),
        Some(Value::Object(object)) => Ok(Ok(object)),
        Some(other) => Err(ValidationError::new(path, other, "expected an object, false or null")),
    }
}

fn rebrand<T>(observation: Observation<()>) -> Observation<T> {
    match observation {
        Observation::Absent => Observation::Absent,
        Observation::Unknown | Observation::Present(()) => Observation::Unknown,
    }
}

/// Three-valued resolution of a single-item category.
fn single<K, T>(
    path: &str,
    value: Option<&Value>,
    flag_name: &str,
    build: impl FnOnce(K, &Map<String, Value>) -> Validated<T>,
) -> Validated<Observation<T>>
where
    K: FromStr,
{
    let object = match category_object(path, value)? {
        Ok(object) => object,
        Err(observation) => return Ok(rebrand(observation)),
    };
    let flagged = flag(path, object, flag_name)?;
    match (flagged, choice::<K>(path, object, "type")?) {
        (_, Choice::NotApplicable) => Ok(Observation::Unknown),
        (Some(false), Choice::Unknown) => Ok(Observation::Absent),
        (Some(false), Choice::Concrete(_)) => Err(ValidationError::new(
            &format!("{path}.type"),
            object.get("type").unwrap_or(&Value::Null),
            format!("a concrete type contradicts `{flag_name}: false`"),
        )),
        (_, Choice::Unknown) => Ok(Observation::Unknown),
        (_, Choice::Concrete(kind)) => Ok(Observation::Present(build(kind, object)?)),
    }
}

fn items<'a>(path: &str, object: &'a Map<String, Value>) -> Validated<&'a [Value]> {
    match object.get("items") {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ValidationError::new(&format!("{path}.items"), other, "expected an array")),
    }
}

fn upper_body(value: Option<&Value>) -> Validated<Observation<UpperBody>> {
    let path = "clothing_info.upper_body";
    let object = match category_object(path, value)? {
        Ok(object) => object,
        Err(observation) => return Ok(rebrand(observation)),
    };
    let visible = flag(path, object, "visible")?;
    let raw_items = items(path, object)?;

    let mut garments = Vec::new();
    let mut not_applicable = false;
    for (index, item) in raw_items.iter().enumerate() {
        let item_path = format!("{path}.items[{index}]");
        let Value::Object(item) = item else {
            return Err(ValidationError::new(&item_path, item, "expected an object"));
        };
        match choice(&item_path, item, "type")? {
            Choice::Concrete(kind) => garments.push(UpperBodyItem {
                kind,
                sleeve_length: attribute(&item_path, item, "sleeve_length")?,
            }),
            Choice::NotApplicable => not_applicable = true,
            // An unassessable layer asserts nothing.
            Choice::Unknown => {}
        }
    }

    match (visible, garments.is_empty()) {
        (Some(false), false) => Err(ValidationError::new(
            &format!("{path}.items"),
            &Value::Array(raw_items.to_vec()),
            "garments listed while `visible: false`",
        )),
        (_, false) => Ok(Observation::Present(UpperBody { items: garments })),
        (_, true) if not_applicable => Ok(Observation::Unknown),
        (Some(false), true) => Ok(Observation::Absent),
        (Some(true), true) => Ok(Observation::Unknown),
        (None, true) if raw_items.is_empty() => Ok(Observation::Absent),
        (None, true) => Ok(Observation::Unknown),
    }
}

fn lower_body(value: Option<&Value>) -> Validated<Observation<LowerBody>> {
    let path = "clothing_info.lower_body";
    single(path, value, "visible", |kind: LowerBodyType, object| {
        Ok(LowerBody {
            kind,
            length: attribute(path, object, "length")?,
        })
    })
}

fn full_body(value: Option<&Value>) -> Validated<Observation<FullBody>> {
    let path = "clothing_info.full_body";
    single(path, value, "visible", |kind: FullBodyType, object| {
        Ok(FullBody {
            kind,
            sleeve_length: attribute(path, object, "sleeve_length")?,
            length: attribute(path, object, "length")?,
        })
    })
}

fn eyewear(value: Option<&Value>) -> Validated<Observation<Eyewear>> {
    let path = "clothing_info.eyewear";
    single(path, value, "wearing", |kind: EyewearType, object| {
        Ok(Eyewear {
            kind,
            frame_style: attribute(path, object, "frame_style")?,
        })
    })
}

fn headwear(value: Option<&Value>) -> Validated<Observation<Headwear>> {
    single("clothing_info.headwear", value, "wearing", |kind: HeadwearType, _| {
        Ok(Headwear { kind })
    })
}

fn accessories(value: Option<&Value>) -> Validated<Observation<Accessories>> {
    let path = "clothing_info.accessories";
    let object = match category_object(path, value)? {
        Ok(object) => object,
        Err(observation) => return Ok(rebrand(observation)),
    };
    let raw_items = items(path, object)?;
    if raw_items.is_empty() {
        return Ok(Observation::Absent);
    }

    let mut found: Vec<AccessoryType> = Vec::new();
    for (index, item) in raw_items.iter().enumerate() {
        let item_path = format!("{path}.items[{index}]");
        match item {
            Value::String(s) if is_sentinel(s) => {}
            Value::String(s) => found.push(
                s.parse::<AccessoryType>()
                    .map_err(|_| ValidationError::new(&item_path, item, "not a permitted value"))?,
            ),
            other => return Err(ValidationError::new(&item_path, other, "expected a string")),
        }
    }
    if found.is_empty() {
        Ok(Observation::Unknown)
    } else {
        Ok(Observation::Present(Accessories { items: found }))
    }
}

fn observe(category: Category, value: Option<&Value>) -> Validated<bool> {
    Ok(match category {
        Category::UpperBody => upper_body(value)?.is_present(),
        Category::LowerBody => lower_body(value)?.is_present(),
        Category::FullBody => full_body(value)?.is_present(),
        Category::Eyewear => eyewear(value)?.is_present(),
        Category::Headwear => headwear(value)?.is_present(),
        Category::Accessories => accessories(value)?.is_present(),
    })
}

/// Check one category value on its own, as it would be checked inside a
/// merged candidate.
pub fn check_category(category: Category, value: Option<&Value>) -> Result<(), ValidationError> {
    observe(category, value).map(|_| ())
}

/// Whether a candidate category value validates to a concrete observation.
#[must_use]
pub fn category_is_present(category: Category, value: Option<&Value>) -> bool {
    observe(category, value).unwrap_or(false)
}

fn narrative_text(field: &str, value: Option<&String>) -> Validated<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.clone()),
        Some(text) => Err(ValidationError::new(
            field,
            &Value::String(text.clone()),
            "narrative text must not be empty",
        )),
        None => Err(ValidationError::new(field, &Value::Null, "narrative text is missing")),
    }
}

/// Check a merged candidate against the taxonomy.
pub fn validate(candidate: &CandidateRecord) -> Result<AnalysisResult, ValidationError> {
    let clothing_info = ClothingInfo {
        upper_body: upper_body(candidate.category(Category::UpperBody))?,
        lower_body: lower_body(candidate.category(Category::LowerBody))?,
        full_body: full_body(candidate.category(Category::FullBody))?,
        eyewear: eyewear(candidate.category(Category::Eyewear))?,
        headwear: headwear(candidate.category(Category::Headwear))?,
        accessories: accessories(candidate.category(Category::Accessories))?,
    };
    let draft = &candidate.narrative;
    let narrative = Narrative {
        description: narrative_text(DESCRIPTION, draft.description.as_ref())?,
        thermal_properties: narrative_text(THERMAL_PROPERTIES, draft.thermal_properties.as_ref())?,
        weather_appropriateness: narrative_text(
            WEATHER_APPROPRIATENESS,
            draft.weather_appropriateness.as_ref(),
        )?,
    };
    Ok(AnalysisResult {
        clothing_info,
        narrative,
    })
}
