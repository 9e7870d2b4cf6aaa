use crate::parser::PassTarget;
use crate::taxonomy::{Category, CategoryShape, NOT_APPLICABLE, UNKNOWN};
use std::fmt::Write;

mod policy {
    pub const VISIBILITY: &str = "Only report items that are fully visible and clearly \
    identifiable. Do NOT include anything partially visible, obscured, cropped by the frame or \
    ambiguous, and never infer an item from context.";

    pub const BODY_REGIONS: &str = "Look at which body regions are in frame before answering. \
    When a body region is not in frame at all (for example only the upper body is shown), \
    every field of the categories for that region must be \"not applicable\". Never guess \
    what is worn outside the frame.";

    pub const EYEWEAR: &str = "Pay extra attention to eyewear. Thin, rimless or light \
    coloured frames are easy to miss: inspect the area around the eyes and the bridge of the \
    nose closely before deciding that no eyewear is worn.";

    pub const LAYERING: &str = "Clothing can be layered; list every fully visible upper body \
    layer as a separate item.";

    pub const NARRATIVE: &str = r"
Describe the outfit of the person in this photo and fill the schema fields.
description:
    A short, factual description of the visible outfit. Mention colours, materials and how
    the garments are layered when these are clearly visible.

thermal_properties:
    How warm or cool this outfit is: insulation, breathability and coverage, based on the
    visible garments and their apparent materials.

weather_appropriateness:
    The weather and temperature range this outfit suits, and conditions it would be
    uncomfortable in.

Always fill every field. When part of the person is not visible, answer based on what is
visible and state that limitation explicitly instead of leaving a field empty.
";
}

fn quoted(values: &[&str]) -> String {
    values
        .iter()
        .map(|value| format!("\"{value}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Instruction lines for one category, with its permitted values spelled out.
fn category_rules(category: Category) -> String {
    let mut rules = String::new();
    let types = quoted(category.type_values());
    let _ = match category.shape() {
        CategoryShape::Single { flag, .. } => writeln!(
            rules,
            "- {key}: set \"{flag}\" and pick \"type\" from: {types}.",
            key = category.key(),
        ),
        CategoryShape::Items { flag, .. } => writeln!(
            rules,
            "- {key}: set \"{flag}\" and list each garment in \"items\", with \"type\" from: {types}.",
            key = category.key(),
        ),
        CategoryShape::Tags => writeln!(
            rules,
            "- {key}: list the accessories in \"items\", choosing from: {types}. Use an empty \
            list when none are worn.",
            key = category.key(),
        ),
    };
    for attribute in category.attributes() {
        let _ = writeln!(
            rules,
            "    \"{}\" is one of: {}. Only give it when it is fully visible and unambiguous.",
            attribute.name,
            quoted(attribute.values),
        );
    }
    rules
}

fn sentinel_rules() -> String {
    format!(
        "Use \"{UNKNOWN}\" for any field you cannot assess with certainty and \
        \"{NOT_APPLICABLE}\" for fields of a body region that is not in frame. When an item is \
        clearly not worn, set the presence flag to false and the type to \"{UNKNOWN}\". Use null \
        for a whole category only when nothing at all can be said about it."
    )
}

/// Instructions for the primary pass: every category in one response.
#[must_use]
pub fn build_primary_prompt() -> String {
    let mut prompt = String::from(
        "Analyze only the clearly visible clothing and accessories of the person in this image \
        and fill the `clothing_info` schema. Follow these rules strictly:\n\n",
    );
    for (i, rule) in [
        policy::VISIBILITY,
        policy::BODY_REGIONS,
        policy::EYEWEAR,
        policy::LAYERING,
    ]
    .iter()
    .enumerate()
    {
        let _ = writeln!(prompt, "{}. {rule}", i + 1);
    }
    prompt.push_str("\nCategories and their permitted values:\n");
    for category in Category::ALL {
        prompt.push_str(&category_rules(category));
    }
    let _ = write!(prompt, "\n{}\n", sentinel_rules());
    prompt.push_str("Answer with the JSON object only.");
    prompt
}

/// Instructions for a supplementary pass: one category in isolation, or the
/// narrative fields.
#[must_use]
pub fn build_supplementary_prompt(target: PassTarget) -> String {
    match target {
        PassTarget::Primary => build_primary_prompt(),
        PassTarget::Focus(category) => {
            let mut prompt = format!(
                "Look again at this image and examine only the {label} of the person. Ignore \
                every other part of the outfit.\n\n{}\n",
                policy::VISIBILITY,
                label = category.label(),
            );
            if category == Category::Eyewear {
                let _ = writeln!(prompt, "{}", policy::EYEWEAR);
            }
            prompt.push('\n');
            prompt.push_str(&category_rules(category));
            let _ = write!(
                prompt,
                "\n{}\nAnswer with a JSON object holding only the `{}` key.",
                sentinel_rules(),
                category.key()
            );
            prompt
        }
        PassTarget::Narrative => policy::NARRATIVE.trim().to_string(),
    }
}

#[must_use]
pub fn prompt_for(target: PassTarget) -> String {
    match target {
        PassTarget::Primary => build_primary_prompt(),
        other => build_supplementary_prompt(other),
    }
}
