//! The clothing taxonomy. Every permitted value lives in exactly one enum
//! below; prompts, the JSON schema hints and validation all read from here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sentinel for a field that could not be assessed.
pub const UNKNOWN: &str = "unknown";
/// Sentinel for a field whose body region is not in frame.
pub const NOT_APPLICABLE: &str = "not applicable";
/// Every enumerated field accepts these next to its concrete values.
pub const SENTINELS: [&str; 2] = [UNKNOWN, NOT_APPLICABLE];

#[must_use]
pub fn is_sentinel(value: &str) -> bool {
    SENTINELS.contains(&value)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{0}' is not a permitted value")]
pub struct UnknownValue(pub String);

macro_rules! taxonomy_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant,)+
        }

        impl $name {
            /// Permitted values, in prompt order.
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    other => Err(UnknownValue(other.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

taxonomy_enum!(
    UpperBodyType {
        ShortSleeveTop => "short sleeve top",
        LongSleeveTop => "long sleeve top",
        ShortSleeveOutwear => "short sleeve outwear",
        LongSleeveOutwear => "long sleeve outwear",
        Vest => "vest",
        Sweater => "sweater",
        Cape => "cape",
    }
);

taxonomy_enum!(
    LowerBodyType {
        Shorts => "shorts",
        Pants => "pants",
        Skirt => "skirt",
    }
);

taxonomy_enum!(
    FullBodyType {
        ShortSleeveDress => "short sleeve dress",
        LongSleeveDress => "long sleeve dress",
        VestDress => "vest dress",
        SlingDress => "sling dress",
        Jumpsuit => "jumpsuit",
    }
);

taxonomy_enum!(
    EyewearType {
        Glasses => "glasses",
        Sunglasses => "sunglasses",
        Goggles => "goggles",
    }
);

taxonomy_enum!(
    HeadwearType {
        Hat => "hat",
        Cap => "cap",
        Beanie => "beanie",
        Hood => "hood",
        Helmet => "helmet",
    }
);

taxonomy_enum!(
    AccessoryType {
        Glove => "glove",
        Scarf => "scarf",
        Belt => "belt",
        Bag => "bag",
        Watch => "watch",
        Tie => "tie",
    }
);

taxonomy_enum!(
    SleeveLength {
        Short => "short",
        Long => "long",
        Sleeveless => "sleeveless",
    }
);

taxonomy_enum!(
    /// Hem length of lower and full body garments.
    GarmentLength {
        Short => "short",
        KneeLength => "knee length",
        Midi => "midi",
        AnkleLength => "ankle length",
    }
);

taxonomy_enum!(
    FrameStyle {
        Thin => "thin",
        Thick => "thick",
        Rimless => "rimless",
    }
);

/// A sub-attribute of a category, e.g. the sleeve length of a top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub values: &'static [&'static str],
}

pub const SLEEVE_LENGTH: AttributeSpec = AttributeSpec {
    name: "sleeve_length",
    values: SleeveLength::VALUES,
};
pub const GARMENT_LENGTH: AttributeSpec = AttributeSpec {
    name: "length",
    values: GarmentLength::VALUES,
};
pub const FRAME_STYLE: AttributeSpec = AttributeSpec {
    name: "frame_style",
    values: FrameStyle::VALUES,
};

const SLEEVED: &[AttributeSpec] = &[SLEEVE_LENGTH];
const HEMMED: &[AttributeSpec] = &[GARMENT_LENGTH];
const DRESS: &[AttributeSpec] = &[SLEEVE_LENGTH, GARMENT_LENGTH];
const FRAMED: &[AttributeSpec] = &[FRAME_STYLE];

/// How a category is laid out in model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryShape {
    /// `{<flag>: bool, "type": .., <attributes>..}`
    Single {
        flag: &'static str,
        attributes: &'static [AttributeSpec],
    },
    /// `{<flag>: bool, "items": [{"type": .., <attributes>..}]}` for layered garments.
    Items {
        flag: &'static str,
        attributes: &'static [AttributeSpec],
    },
    /// `{"items": [..]}` of bare type values.
    Tags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    UpperBody,
    LowerBody,
    FullBody,
    Eyewear,
    Headwear,
    Accessories,
}

impl Category {
    pub const ALL: [Self; 6] = [
        Self::UpperBody,
        Self::LowerBody,
        Self::FullBody,
        Self::Eyewear,
        Self::Headwear,
        Self::Accessories,
    ];

    /// JSON key of the category inside `clothing_info`.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::UpperBody => "upper_body",
            Self::LowerBody => "lower_body",
            Self::FullBody => "full_body",
            Self::Eyewear => "eyewear",
            Self::Headwear => "headwear",
            Self::Accessories => "accessories",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UpperBody => "upper body clothing",
            Self::LowerBody => "lower body clothing",
            Self::FullBody => "full body clothing",
            Self::Eyewear => "eyewear",
            Self::Headwear => "headwear",
            Self::Accessories => "accessories",
        }
    }

    #[must_use]
    pub const fn type_values(self) -> &'static [&'static str] {
        match self {
            Self::UpperBody => UpperBodyType::VALUES,
            Self::LowerBody => LowerBodyType::VALUES,
            Self::FullBody => FullBodyType::VALUES,
            Self::Eyewear => EyewearType::VALUES,
            Self::Headwear => HeadwearType::VALUES,
            Self::Accessories => AccessoryType::VALUES,
        }
    }

    #[must_use]
    pub const fn shape(self) -> CategoryShape {
        match self {
            Self::UpperBody => CategoryShape::Items {
                flag: "visible",
                attributes: SLEEVED,
            },
            Self::LowerBody => CategoryShape::Single {
                flag: "visible",
                attributes: HEMMED,
            },
            Self::FullBody => CategoryShape::Single {
                flag: "visible",
                attributes: DRESS,
            },
            Self::Eyewear => CategoryShape::Single {
                flag: "wearing",
                attributes: FRAMED,
            },
            Self::Headwear => CategoryShape::Single {
                flag: "wearing",
                attributes: &[],
            },
            Self::Accessories => CategoryShape::Tags,
        }
    }

    #[must_use]
    pub fn attributes(self) -> &'static [AttributeSpec] {
        match self.shape() {
            CategoryShape::Single { attributes, .. } | CategoryShape::Items { attributes, .. } => {
                attributes
            }
            CategoryShape::Tags => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| UnknownValue(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip_through_from_str() {
        for value in EyewearType::VALUES {
            let parsed: EyewearType = value.parse().expect("listed value parses");
            assert_eq!(parsed.as_str(), *value);
        }
        assert_eq!("knee length".parse(), Ok(GarmentLength::KneeLength));
    }

    #[test]
    fn parsing_is_exact() {
        assert!("Glasses".parse::<EyewearType>().is_err());
        assert!(" glasses".parse::<EyewearType>().is_err());
        assert!("monocle".parse::<EyewearType>().is_err());
    }

    #[test]
    fn sentinels_are_not_concrete_values() {
        for category in Category::ALL {
            for sentinel in SENTINELS {
                assert!(!category.type_values().contains(&sentinel), "{category}");
            }
            for attribute in category.attributes() {
                for sentinel in SENTINELS {
                    assert!(!attribute.values.contains(&sentinel), "{}", attribute.name);
                }
            }
        }
    }

    #[test]
    fn category_keys_parse_back() {
        for category in Category::ALL {
            assert_eq!(category.key().parse(), Ok(category));
        }
        assert!("shoes".parse::<Category>().is_err());
    }

    #[test]
    fn serde_uses_taxonomy_spelling() {
        let json = serde_json::to_string(&UpperBodyType::LongSleeveOutwear).expect("serializes");
        assert_eq!(json, "\"long sleeve outwear\"");
        let parsed: FrameStyle = serde_json::from_str("\"rimless\"").expect("deserializes");
        assert_eq!(parsed, FrameStyle::Rimless);
    }
}
