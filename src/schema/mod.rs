//! Static shape schema for slide changesets.
//!
//! Knows which shape categories exist, which of them may be added or modified,
//! which fields each category accepts, and how the loose type names produced by
//! language models fold onto the canonical ones.

mod index;

pub use index::ShapeIndex;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape category as used by the changeset schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    #[serde(rename = "textbox")]
    Textbox,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "chart")]
    Chart,
    #[serde(rename = "autoShape")]
    AutoShape,
    #[serde(rename = "line")]
    Line,
    #[serde(rename = "placeholder")]
    Placeholder,
    #[serde(rename = "group")]
    Group,
    #[serde(rename = "icon")]
    Icon,
}

/// Shape types an existing shape may be modified as.
pub const MODIFIABLE_TYPES: [ShapeType; 6] = [
    ShapeType::Placeholder,
    ShapeType::Textbox,
    ShapeType::Image,
    ShapeType::Chart,
    ShapeType::AutoShape,
    ShapeType::Line,
];

/// Shape types accepted in the `added` list. Kept to the narrowest safe subset.
pub const ADDABLE_TYPES: [ShapeType; 2] = [ShapeType::Image, ShapeType::Textbox];

/// Fields moved from a placeholder edit into its nested text box update.
pub const PLACEHOLDER_TEXTBOX_FIELDS: [&str; 7] = [
    "name",
    "inheritStylesFrom",
    "pos",
    "size",
    "style",
    "xml",
    "fontInfo",
];

/// Fields a line update must never carry; lines use start/end anchors instead.
pub const LINE_FORBIDDEN_FIELDS: [&str; 3] = ["pos", "size", "details"];

impl ShapeType {
    /// Canonical schema name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeType::Textbox => "textbox",
            ShapeType::Image => "image",
            ShapeType::Chart => "chart",
            ShapeType::AutoShape => "autoShape",
            ShapeType::Line => "line",
            ShapeType::Placeholder => "placeholder",
            ShapeType::Group => "group",
            ShapeType::Icon => "icon",
        }
    }

    /// Resolves a loosely written type name.
    ///
    /// Matching is case-insensitive after trimming and folds the synonyms
    /// models commonly emit ("text box", "picture", "connector", ...).
    /// Returns `None` for anything unrecognized.
    pub fn normalize(raw: &str) -> Option<ShapeType> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let shape_type = match trimmed.to_lowercase().as_str() {
            "textbox" | "text box" | "text_box" | "text-box" | "text" => ShapeType::Textbox,
            "autoshape" | "auto_shape" | "auto-shape" | "auto shape" => ShapeType::AutoShape,
            "image" | "picture" | "img" => ShapeType::Image,
            "chart" => ShapeType::Chart,
            "line" | "connector" => ShapeType::Line,
            "placeholder" => ShapeType::Placeholder,
            "group" => ShapeType::Group,
            "icon" => ShapeType::Icon,
            _ => return None,
        };
        Some(shape_type)
    }

    /// Normalizes a JSON value, treating anything but a string as unknown.
    pub fn from_value(value: Option<&serde_json::Value>) -> Option<ShapeType> {
        value.and_then(|v| v.as_str()).and_then(ShapeType::normalize)
    }

    /// Whether existing shapes of this type may appear in `modified`.
    pub fn is_modifiable(&self) -> bool {
        MODIFIABLE_TYPES.contains(self)
    }

    /// Whether new shapes of this type may appear in `added`.
    pub fn is_addable(&self) -> bool {
        ADDABLE_TYPES.contains(self)
    }

    /// Fields the schema accepts on an update of this shape type, besides
    /// `id` and `shapeType`. Placeholders accept only the nested `shape`
    /// and `zIndex`; group and icon shapes accept no updates at all.
    pub fn update_fields(&self) -> &'static [&'static str] {
        match self {
            ShapeType::Textbox => &["inheritStylesFrom", "size", "pos", "rotation", "name", "style", "xml", "fontInfo", "zIndex"],
            ShapeType::Image => &["inheritStylesFrom", "size", "pos", "rotation", "autoShapeType", "zIndex"],
            ShapeType::Chart => &["inheritStylesFrom", "size", "pos", "rotation", "zIndex"],
            ShapeType::AutoShape => &["inheritStylesFrom", "size", "pos", "rotation", "details", "fill", "xml", "zIndex"],
            ShapeType::Line => &["inheritStylesFrom", "rotation", "startPos", "endPos", "startFrom", "endFrom", "zIndex"],
            ShapeType::Placeholder => &["shape", "zIndex"],
            ShapeType::Group | ShapeType::Icon => &[],
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
