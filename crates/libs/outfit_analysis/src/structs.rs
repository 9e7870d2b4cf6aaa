use crate::taxonomy::{
    AccessoryType, EyewearType, FrameStyle, FullBodyType, GarmentLength, HeadwearType,
    LowerBodyType, SleeveLength, UpperBodyType,
};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

pub const DESCRIPTION: &str = "description";
pub const THERMAL_PROPERTIES: &str = "thermal_properties";
pub const WEATHER_APPROPRIATENESS: &str = "weather_appropriateness";
pub const NARRATIVE_FIELDS: [&str; 3] = [DESCRIPTION, THERMAL_PROPERTIES, WEATHER_APPROPRIATENESS];

/// Used when no narrative pass produced text for a field.
pub const FALLBACK_NARRATIVE: &str = "description could not be generated";

/// Three-valued observation of a clothing category.
///
/// Serialized as `null` (unknown / not assessable), `false` (known absent) or
/// the populated object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation<T> {
    /// Not assessable, e.g. the body region is out of frame.
    Unknown,
    Absent,
    Present(T),
}

impl<T> Default for Observation<T> {
    fn default() -> Self {
        Self::Unknown
    }
}

impl<T> Observation<T> {
    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    #[must_use]
    pub const fn as_present(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Serialize> Serialize for Observation<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unknown => serializer.serialize_none(),
            Self::Absent => serializer.serialize_bool(false),
            Self::Present(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Observation<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Flag(bool),
            Value(T),
        }

        match Option::<Repr<T>>::deserialize(deserializer)? {
            None => Ok(Self::Unknown),
            Some(Repr::Flag(false)) => Ok(Self::Absent),
            Some(Repr::Flag(true)) => Err(de::Error::custom(
                "`true` is not a valid observation, expected an object",
            )),
            Some(Repr::Value(value)) => Ok(Self::Present(value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpperBodyItem {
    #[serde(rename = "type")]
    pub kind: UpperBodyType,
    pub sleeve_length: Option<SleeveLength>,
}

/// Possibly layered upper body garments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpperBody {
    pub items: Vec<UpperBodyItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowerBody {
    #[serde(rename = "type")]
    pub kind: LowerBodyType,
    pub length: Option<GarmentLength>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullBody {
    #[serde(rename = "type")]
    pub kind: FullBodyType,
    pub sleeve_length: Option<SleeveLength>,
    pub length: Option<GarmentLength>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eyewear {
    #[serde(rename = "type")]
    pub kind: EyewearType,
    pub frame_style: Option<FrameStyle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headwear {
    #[serde(rename = "type")]
    pub kind: HeadwearType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessories {
    pub items: Vec<AccessoryType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClothingInfo {
    pub upper_body: Observation<UpperBody>,
    pub lower_body: Observation<LowerBody>,
    pub full_body: Observation<FullBody>,
    pub eyewear: Observation<Eyewear>,
    pub headwear: Observation<Headwear>,
    pub accessories: Observation<Accessories>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub description: String,
    pub thermal_properties: String,
    pub weather_appropriateness: String,
}

/// Validated outcome of analysing one photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub clothing_info: ClothingInfo,
    #[serde(flatten)]
    pub narrative: Narrative,
}
