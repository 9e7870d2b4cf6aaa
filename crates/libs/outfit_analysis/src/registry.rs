//! JSON schema hints handed to the model. Built from the taxonomy so the
//! constraint and the validator always agree on permitted values.

use crate::parser::PassTarget;
use crate::structs::NARRATIVE_FIELDS;
use crate::taxonomy::{AttributeSpec, Category, CategoryShape, SENTINELS};
use serde_json::{Map, Value, json};

/// Permitted values plus the sentinels, as a JSON `enum`.
fn enum_schema(values: &[&str]) -> Value {
    let all: Vec<&str> = values.iter().copied().chain(SENTINELS).collect();
    json!({ "type": "string", "enum": all })
}

fn typed_object(type_values: &[&str], flag: Option<&str>, attributes: &[AttributeSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    if let Some(flag) = flag {
        properties.insert(flag.to_string(), json!({ "type": "boolean" }));
        required.push(flag.to_string());
    }
    properties.insert("type".to_string(), enum_schema(type_values));
    required.push("type".to_string());
    for attribute in attributes {
        properties.insert(attribute.name.to_string(), enum_schema(attribute.values));
        required.push(attribute.name.to_string());
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Schema of one category's value, nullable.
#[must_use]
pub fn category_schema(category: Category) -> Value {
    let object = match category.shape() {
        CategoryShape::Single { flag, attributes } => {
            typed_object(category.type_values(), Some(flag), attributes)
        }
        CategoryShape::Items { flag, attributes } => json!({
            "type": "object",
            "properties": {
                flag: { "type": "boolean" },
                "items": {
                    "type": "array",
                    "items": typed_object(category.type_values(), None, attributes)
                }
            },
            "required": [flag, "items"],
            "additionalProperties": false
        }),
        CategoryShape::Tags => json!({
            "type": "object",
            "properties": {
                "items": { "type": "array", "items": enum_schema(category.type_values()) }
            },
            "required": ["items"],
            "additionalProperties": false
        }),
    };
    json!({ "anyOf": [object, { "type": "null" }] })
}

fn object_of(entries: impl IntoIterator<Item = (String, Value)>) -> Value {
    let properties: Map<String, Value> = entries.into_iter().collect();
    let required: Vec<&String> = properties.keys().collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

/// Shape of the attribute extraction response: `{"clothing_info": {..}}`.
#[must_use]
pub fn primary_schema() -> Value {
    let clothing_info = object_of(
        Category::ALL
            .into_iter()
            .map(|c| (c.key().to_string(), category_schema(c))),
    );
    object_of([("clothing_info".to_string(), clothing_info)])
}

/// Shape of a single-category response: `{"<category>": {..}}`.
#[must_use]
pub fn focus_schema(category: Category) -> Value {
    object_of([(category.key().to_string(), category_schema(category))])
}

/// Shape of the narrative response: three required strings.
#[must_use]
pub fn narrative_schema() -> Value {
    object_of(
        NARRATIVE_FIELDS
            .into_iter()
            .map(|field| (field.to_string(), json!({ "type": "string", "minLength": 1 }))),
    )
}

#[must_use]
pub fn schema_for(target: PassTarget) -> Value {
    match target {
        PassTarget::Primary => primary_schema(),
        PassTarget::Focus(category) => focus_schema(category),
        PassTarget::Narrative => narrative_schema(),
    }
}
