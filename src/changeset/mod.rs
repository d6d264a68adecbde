//! Typed slide changesets and the sanitizer that produces them.
//!
//! A [`Changeset`] is the only shape of edit the benchmark service accepts:
//! every variant is closed over the schema in [`crate::schema`], so a value of
//! this type can be serialized and submitted without further validation.
//!
//! # Example
//!
//! ```
//! use deckbench::changeset::sanitize;
//! use deckbench::schema::ShapeIndex;
//! use serde_json::json;
//!
//! let index = ShapeIndex::from_datamodel(&json!({"shapes": [{"id": 4, "shapeType": "textbox"}]}));
//! let raw = json!({"modified": [{"id": "4", "shapeType": "image", "size": {"width": 3, "height": 2}}]});
//!
//! let changeset = sanitize(&raw, &index);
//! assert_eq!(changeset.modified.len(), 1);
//! assert_eq!(changeset.modified[0].shape_type().as_str(), "textbox");
//! ```

pub mod sanitizer;
pub mod summary;

pub use sanitizer::{sanitize, ChangesetSanitizer};
pub use summary::ChangesetSummary;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::ShapeType;

/// Additions, modifications and deletions against one slide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Changeset {
    #[serde(default)]
    pub added: Vec<AddedShape>,
    #[serde(default)]
    pub modified: Vec<ModifiedShape>,
    #[serde(default)]
    pub deleted: Vec<DeletedShape>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Serializes to the JSON string carried in a submission body.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A newly added shape. Only image and text box additions survive sanitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddedShape {
    /// Temporary id; not stable across submissions.
    #[serde(rename = "_id")]
    pub synthetic_id: String,
    #[serde(rename = "shapeType")]
    pub shape_type: ShapeType,
    pub pos: Map<String, Value>,
    pub size: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An update to an existing shape, discriminated by its authoritative type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shapeType")]
pub enum ModifiedShape {
    #[serde(rename = "textbox")]
    Textbox(ShapePatch),
    #[serde(rename = "image")]
    Image(ShapePatch),
    #[serde(rename = "chart")]
    Chart(ShapePatch),
    #[serde(rename = "autoShape")]
    AutoShape(ShapePatch),
    /// Never carries `pos`, `size` or `details`.
    #[serde(rename = "line")]
    Line(ShapePatch),
    /// Placeholders are edited through their child text box.
    #[serde(rename = "placeholder")]
    Placeholder(PlaceholderPatch),
}

impl ModifiedShape {
    pub fn id(&self) -> i64 {
        match self {
            ModifiedShape::Textbox(p)
            | ModifiedShape::Image(p)
            | ModifiedShape::Chart(p)
            | ModifiedShape::AutoShape(p)
            | ModifiedShape::Line(p) => p.id,
            ModifiedShape::Placeholder(p) => p.id,
        }
    }

    pub fn shape_type(&self) -> ShapeType {
        match self {
            ModifiedShape::Textbox(_) => ShapeType::Textbox,
            ModifiedShape::Image(_) => ShapeType::Image,
            ModifiedShape::Chart(_) => ShapeType::Chart,
            ModifiedShape::AutoShape(_) => ShapeType::AutoShape,
            ModifiedShape::Line(_) => ShapeType::Line,
            ModifiedShape::Placeholder(_) => ShapeType::Placeholder,
        }
    }
}

/// Field-level patch for a non-placeholder shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePatch {
    pub id: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Placeholder update wrapping exactly one text box update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderPatch {
    pub id: i64,
    pub shape: TextboxPatch,
    #[serde(rename = "zIndex", default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
}

/// The text box update nested inside a placeholder edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextboxPatch {
    pub id: i64,
    #[serde(rename = "shapeType")]
    pub shape_type: TextboxTag,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Single-valued discriminator pinning a nested shape to `textbox`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextboxTag {
    #[default]
    #[serde(rename = "textbox")]
    Textbox,
}

/// A deletion carries only the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedShape {
    pub id: i64,
}

/// Coerces a JSON value to an integer shape id.
///
/// Integers pass through, finite floats truncate toward zero, and strings are
/// parsed after trimming. Booleans, nulls and containers are not ids.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
