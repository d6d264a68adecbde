//! Authoritative shape lookup for one case.

use std::collections::HashMap;

use serde_json::Value;

use super::ShapeType;
use crate::changeset::coerce_int;

/// Id → type and id → details maps taken from the case's document model.
///
/// Built once per case and only read afterwards; the sanitizer consults it to
/// decide which ids exist and what type they really are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeIndex {
    id_to_type: HashMap<i64, String>,
    id_to_details: HashMap<i64, Value>,
}

impl ShapeIndex {
    /// Creates an index from explicit maps.
    pub fn new(id_to_type: HashMap<i64, String>, id_to_details: HashMap<i64, Value>) -> Self {
        Self {
            id_to_type,
            id_to_details,
        }
    }

    /// Builds the index from a datamodel payload.
    ///
    /// Accepts either `{slides: [{shapes: [...]}, ...]}` (only the first slide
    /// is indexed) or `{shapes: [...]}`. Shapes without an integer-coercible id
    /// are skipped; a shape only gets a type entry when `shapeType` is a string
    /// and a details entry when `details` is an object.
    pub fn from_datamodel(datamodel: &Value) -> Self {
        let shapes = datamodel
            .get("slides")
            .and_then(Value::as_array)
            .and_then(|slides| slides.first())
            .and_then(|slide| slide.get("shapes"))
            .or_else(|| datamodel.get("shapes"))
            .and_then(Value::as_array);

        let mut index = Self::default();
        let Some(shapes) = shapes else {
            return index;
        };

        for shape in shapes {
            let Some(id) = shape.get("id").and_then(coerce_int) else {
                continue;
            };
            if let Some(shape_type) = shape.get("shapeType").and_then(Value::as_str) {
                index.id_to_type.insert(id, shape_type.to_string());
            }
            if let Some(details) = shape.get("details").filter(|d| d.is_object()) {
                index.id_to_details.insert(id, details.clone());
            }
        }
        index
    }

    /// Whether the id is known to the document model.
    pub fn contains(&self, id: i64) -> bool {
        self.id_to_type.contains_key(&id)
    }

    /// Raw type string recorded for the id.
    pub fn raw_type(&self, id: i64) -> Option<&str> {
        self.id_to_type.get(&id).map(String::as_str)
    }

    /// Normalized type for the id, if it is known and recognizable.
    pub fn shape_type(&self, id: i64) -> Option<ShapeType> {
        self.raw_type(id).and_then(ShapeType::normalize)
    }

    /// Details object recorded for the id.
    pub fn details(&self, id: i64) -> Option<&Value> {
        self.id_to_details.get(&id)
    }

    /// Number of indexed shapes.
    pub fn len(&self) -> usize {
        self.id_to_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_datamodel_first_slide() {
        let datamodel = json!({
            "slides": [
                {"shapes": [
                    {"id": 1, "shapeType": "textbox"},
                    {"id": "2", "shapeType": "autoShape", "details": {"autoShapeType": "rect"}},
                    {"id": 3, "shapeType": "line", "details": "not-an-object"}
                ]},
                {"shapes": [{"id": 99, "shapeType": "image"}]}
            ]
        });

        let index = ShapeIndex::from_datamodel(&datamodel);
        assert_eq!(index.len(), 3);
        assert_eq!(index.shape_type(1), Some(ShapeType::Textbox));
        assert_eq!(index.shape_type(2), Some(ShapeType::AutoShape));
        assert_eq!(index.details(2), Some(&json!({"autoShapeType": "rect"})));
        assert!(index.details(3).is_none());
        assert!(!index.contains(99));
    }

    #[test]
    fn test_from_datamodel_flat_shapes() {
        let datamodel = json!({"shapes": [{"id": 5, "shapeType": "Picture"}]});
        let index = ShapeIndex::from_datamodel(&datamodel);
        assert_eq!(index.raw_type(5), Some("Picture"));
        assert_eq!(index.shape_type(5), Some(ShapeType::Image));
    }

    #[test]
    fn test_from_datamodel_skips_bad_entries() {
        let datamodel = json!({"shapes": [
            "garbage",
            {"id": "abc", "shapeType": "textbox"},
            {"id": 7},
            {"id": 8, "shapeType": "hologram"}
        ]});
        let index = ShapeIndex::from_datamodel(&datamodel);
        assert_eq!(index.len(), 1);
        assert!(index.contains(8));
        assert_eq!(index.shape_type(8), None);
    }

    #[test]
    fn test_from_datamodel_empty_or_malformed() {
        assert!(ShapeIndex::from_datamodel(&json!({})).is_empty());
        assert!(ShapeIndex::from_datamodel(&json!({"slides": []})).is_empty());
        assert!(ShapeIndex::from_datamodel(&json!([1, 2, 3])).is_empty());
    }
}
