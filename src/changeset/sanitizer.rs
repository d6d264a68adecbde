//! Repair of untrusted changeset proposals.
//!
//! Model output is unreliable, so sanitation repairs what it can and drops
//! what it cannot, one entry at a time. A bad field never takes sibling edits
//! down with it and [`ChangesetSanitizer::sanitize`] never fails.

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::{
    coerce_int, AddedShape, Changeset, DeletedShape, ModifiedShape, PlaceholderPatch, ShapePatch,
    TextboxPatch, TextboxTag,
};
use crate::schema::{ShapeIndex, ShapeType, LINE_FORBIDDEN_FIELDS, PLACEHOLDER_TEXTBOX_FIELDS};

/// Sanitizes `raw` against the authoritative shapes in `index`.
pub fn sanitize(raw: &Value, index: &ShapeIndex) -> Changeset {
    ChangesetSanitizer::new(index).sanitize(raw)
}

/// Turns arbitrary JSON into a schema-valid [`Changeset`].
#[derive(Debug, Clone, Copy)]
pub struct ChangesetSanitizer<'a> {
    index: &'a ShapeIndex,
}

impl<'a> ChangesetSanitizer<'a> {
    pub fn new(index: &'a ShapeIndex) -> Self {
        Self { index }
    }

    /// Sanitizes a raw proposal. Entries that cannot be repaired are dropped.
    pub fn sanitize(&self, raw: &Value) -> Changeset {
        let added_raw = entries(raw, "added");
        let modified_raw = entries(raw, "modified");
        let deleted_raw = entries(raw, "deleted");

        let changeset = Changeset {
            added: added_raw.iter().filter_map(|e| self.sanitize_added(e)).collect(),
            modified: modified_raw
                .iter()
                .filter_map(|e| self.sanitize_modified(e))
                .collect(),
            deleted: deleted_raw
                .iter()
                .filter_map(|e| self.sanitize_deleted(e))
                .collect(),
        };

        let dropped = (added_raw.len() - changeset.added.len())
            + (modified_raw.len() - changeset.modified.len())
            + (deleted_raw.len() - changeset.deleted.len());
        if dropped > 0 {
            debug!(dropped, "Dropped changeset entries that could not be repaired");
        }

        changeset
    }

    fn sanitize_added(&self, entry: &Value) -> Option<AddedShape> {
        let obj = entry.as_object()?;
        let shape_type = ShapeType::from_value(obj.get("shapeType")).filter(ShapeType::is_addable)?;

        let pos = obj.get("pos")?.as_object()?.clone();
        let mut size = obj.get("size")?.as_object()?.clone();
        normalize_size_keys(&mut size);

        let synthetic_id = match obj.get("_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("NEW-{}", Uuid::new_v4().simple()),
        };

        let extra = without_keys(obj, &["_id", "shapeType", "pos", "size"]);

        Some(AddedShape {
            synthetic_id,
            shape_type,
            pos,
            size,
            extra,
        })
    }

    fn sanitize_modified(&self, entry: &Value) -> Option<ModifiedShape> {
        let obj = entry.as_object()?;
        let id = coerce_int(obj.get("id")?)?;
        if !self.index.contains(id) {
            return None;
        }

        // The document model's type wins over whatever the client asserted.
        let shape_type = self.index.shape_type(id).filter(ShapeType::is_modifiable)?;

        let mut fields = without_keys(obj, &["id", "shapeType"]);
        normalize_size_field(&mut fields);

        let edit = match shape_type {
            ShapeType::Textbox => ModifiedShape::Textbox(ShapePatch { id, fields }),
            ShapeType::Image => ModifiedShape::Image(ShapePatch { id, fields }),
            ShapeType::Chart => ModifiedShape::Chart(ShapePatch { id, fields }),
            ShapeType::Line => {
                for key in LINE_FORBIDDEN_FIELDS {
                    fields.remove(key);
                }
                ModifiedShape::Line(ShapePatch { id, fields })
            }
            ShapeType::AutoShape => {
                if !fields.contains_key("details") {
                    if let Some(details) = self.index.details(id) {
                        fields.insert("details".to_string(), details.clone());
                    }
                }
                ModifiedShape::AutoShape(ShapePatch { id, fields })
            }
            ShapeType::Placeholder => ModifiedShape::Placeholder(placeholder_patch(id, fields)),
            ShapeType::Group | ShapeType::Icon => return None,
        };

        Some(edit)
    }

    fn sanitize_deleted(&self, entry: &Value) -> Option<DeletedShape> {
        let id = coerce_int(entry.as_object()?.get("id")?)?;
        self.index.contains(id).then_some(DeletedShape { id })
    }
}

/// Rebuilds a placeholder edit as an update of its child text box.
fn placeholder_patch(id: i64, mut outer: Map<String, Value>) -> PlaceholderPatch {
    let mut nested = match outer.remove("shape") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    nested.remove("id");
    nested.remove("shapeType");

    for key in PLACEHOLDER_TEXTBOX_FIELDS {
        if let Some(value) = outer.remove(key) {
            nested.insert(key.to_string(), value);
        }
    }
    normalize_size_field(&mut nested);

    PlaceholderPatch {
        id,
        shape: TextboxPatch {
            id,
            shape_type: TextboxTag::Textbox,
            fields: nested,
        },
        z_index: outer.get("zIndex").and_then(Value::as_i64),
    }
}

/// Returns `raw[key]` when it is an array, otherwise nothing.
fn entries<'v>(raw: &'v Value, key: &str) -> &'v [Value] {
    raw.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn without_keys(obj: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    obj.iter()
        .filter(|(k, _)| !keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn normalize_size_field(fields: &mut Map<String, Value>) {
    if let Some(Value::Object(size)) = fields.get_mut("size") {
        normalize_size_keys(size);
    }
}

/// Maps `width`/`height` onto `w`/`h` and removes the long names.
fn normalize_size_keys(size: &mut Map<String, Value>) {
    if let Some(width) = size.remove("width") {
        size.entry("w").or_insert(width);
    }
    if let Some(height) = size.remove("height") {
        size.entry("h").or_insert(height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_index() -> ShapeIndex {
        ShapeIndex::from_datamodel(&json!({
            "slides": [{"shapes": [
                {"id": 1, "shapeType": "textbox"},
                {"id": 2, "shapeType": "placeholder"},
                {"id": 3, "shapeType": "line"},
                {"id": 4, "shapeType": "autoShape", "details": {"autoShapeType": "rect"}},
                {"id": 5, "shapeType": "group"},
                {"id": 6, "shapeType": "icon"},
                {"id": 7, "shapeType": "image"},
                {"id": 8, "shapeType": "chart"},
                {"id": 9, "shapeType": "autoShape"}
            ]}]
        }))
    }

    fn to_value(changeset: &Changeset) -> Value {
        serde_json::to_value(changeset).expect("changeset serializes")
    }

    #[test]
    fn test_non_object_input_yields_empty() {
        let index = test_index();
        assert!(sanitize(&json!(null), &index).is_empty());
        assert!(sanitize(&json!("text"), &index).is_empty());
        assert!(sanitize(&json!([1, 2]), &index).is_empty());
    }

    #[test]
    fn test_non_sequence_lists_become_empty() {
        let index = test_index();
        let raw = json!({"added": {"shapeType": "image"}, "modified": "nope", "deleted": 3});
        assert!(sanitize(&raw, &index).is_empty());
    }

    #[test]
    fn test_added_picture_with_width_height() {
        let index = test_index();
        let raw = json!({"added": [{
            "shapeType": "picture",
            "pos": {"topLeft": [10, 20]},
            "size": {"width": 10, "height": 5}
        }]});

        let changeset = sanitize(&raw, &index);
        assert_eq!(changeset.added.len(), 1);
        let added = &changeset.added[0];
        assert_eq!(added.shape_type, ShapeType::Image);
        assert_eq!(Value::Object(added.size.clone()), json!({"w": 10, "h": 5}));
        assert!(added.synthetic_id.starts_with("NEW-"));
        assert_eq!(added.synthetic_id.len(), 4 + 32);
    }

    #[test]
    fn test_added_keeps_explicit_short_size_keys() {
        let index = test_index();
        let raw = json!({"added": [{
            "_id": "mine",
            "shapeType": "textbox",
            "pos": {"center": [1, 1]},
            "size": {"w": 4, "width": 40, "height": 2}
        }]});

        let changeset = sanitize(&raw, &index);
        let added = &changeset.added[0];
        assert_eq!(added.synthetic_id, "mine");
        assert_eq!(Value::Object(added.size.clone()), json!({"w": 4, "h": 2}));
    }

    #[test]
    fn test_added_drops_unsafe_types_and_missing_geometry() {
        let index = test_index();
        let raw = json!({"added": [
            {"shapeType": "chart", "pos": {}, "size": {}},
            {"shapeType": "autoShape", "pos": {}, "size": {}},
            {"shapeType": "textbox", "size": {"w": 1, "h": 1}},
            {"shapeType": "image", "pos": {"topLeft": [0, 0]}},
            {"shapeType": "image", "pos": [0, 0], "size": {"w": 1, "h": 1}},
            {"pos": {}, "size": {}},
            "not-an-object",
            {"shapeType": "img", "pos": {"topLeft": [0, 0]}, "size": {"w": 1, "h": 1}}
        ]});

        let changeset = sanitize(&raw, &index);
        assert_eq!(changeset.added.len(), 1);
        assert_eq!(changeset.added[0].shape_type, ShapeType::Image);
    }

    #[test]
    fn test_modified_unknown_id_is_dropped() {
        let index = test_index();
        let raw = json!({"modified": [
            {"id": 404, "shapeType": "textbox", "pos": {"topLeft": [0, 0]}},
            {"shapeType": "textbox"},
            {"id": "abc", "shapeType": "textbox"}
        ]});
        assert!(sanitize(&raw, &index).modified.is_empty());
    }

    #[test]
    fn test_modified_authoritative_type_wins() {
        let index = test_index();
        let raw = json!({"modified": [{"id": "7", "shapeType": "textbox", "rotation": 15}]});

        let changeset = sanitize(&raw, &index);
        assert_eq!(
            to_value(&changeset)["modified"][0],
            json!({"id": 7, "shapeType": "image", "rotation": 15})
        );
    }

    #[test]
    fn test_modified_group_and_icon_are_dropped() {
        let index = test_index();
        let raw = json!({"modified": [
            {"id": 5, "shapeType": "textbox", "pos": {"topLeft": [0, 0]}},
            {"id": 6, "shapeType": "image"}
        ]});
        assert!(sanitize(&raw, &index).modified.is_empty());
    }

    #[test]
    fn test_modified_line_strips_geometry_and_details() {
        let index = test_index();
        let raw = json!({"modified": [{
            "id": 3,
            "shapeType": "connector",
            "pos": {"topLeft": [0, 0]},
            "size": {"width": 5, "height": 5},
            "details": {"x": 1},
            "startPos": [0, 0],
            "endPos": [10, 10]
        }]});

        let changeset = sanitize(&raw, &index);
        assert_eq!(
            to_value(&changeset)["modified"][0],
            json!({"id": 3, "shapeType": "line", "startPos": [0, 0], "endPos": [10, 10]})
        );
    }

    #[test]
    fn test_modified_autoshape_copies_details_forward() {
        let index = test_index();
        let raw = json!({"modified": [
            {"id": 4, "shapeType": "autoShape", "pos": {"topLeft": [1, 2]}},
            {"id": 9, "shapeType": "autoShape", "pos": {"topLeft": [1, 2]}}
        ]});

        let value = to_value(&sanitize(&raw, &index));
        assert_eq!(value["modified"][0]["details"], json!({"autoShapeType": "rect"}));
        assert!(value["modified"][1].get("details").is_none());
    }

    #[test]
    fn test_modified_autoshape_keeps_client_details() {
        let index = test_index();
        let raw = json!({"modified": [{"id": 4, "details": {"autoShapeType": "ellipse"}}]});

        let value = to_value(&sanitize(&raw, &index));
        assert_eq!(value["modified"][0]["details"], json!({"autoShapeType": "ellipse"}));
    }

    #[test]
    fn test_modified_placeholder_is_restructured() {
        let index = test_index();
        let raw = json!({"modified": [{
            "id": 2,
            "shapeType": "textbox",
            "pos": {"topLeft": [5, 5]},
            "size": {"width": 100, "height": 50},
            "xml": "<p>Hi</p>",
            "name": "Title",
            "rotation": 45,
            "zIndex": 3
        }]});

        let changeset = sanitize(&raw, &index);
        assert_eq!(
            to_value(&changeset)["modified"][0],
            json!({
                "id": 2,
                "shapeType": "placeholder",
                "shape": {
                    "id": 2,
                    "shapeType": "textbox",
                    "pos": {"topLeft": [5, 5]},
                    "size": {"w": 100, "h": 50},
                    "xml": "<p>Hi</p>",
                    "name": "Title"
                },
                "zIndex": 3
            })
        );
    }

    #[test]
    fn test_modified_placeholder_merges_existing_nested_shape() {
        let index = test_index();
        let raw = json!({"modified": [{
            "id": 2,
            "shapeType": "placeholder",
            "shape": {"id": 77, "shapeType": "image", "style": {"bold": true}},
            "style": {"bold": false},
            "zIndex": "high"
        }]});

        let changeset = sanitize(&raw, &index);
        assert_eq!(
            to_value(&changeset)["modified"][0],
            json!({
                "id": 2,
                "shapeType": "placeholder",
                "shape": {"id": 2, "shapeType": "textbox", "style": {"bold": false}}
            })
        );
    }

    #[test]
    fn test_modified_placeholder_minimal_shape() {
        let index = test_index();
        let raw = json!({"modified": [{"id": 2, "shape": "garbage"}]});

        let changeset = sanitize(&raw, &index);
        assert_eq!(
            to_value(&changeset)["modified"][0],
            json!({"id": 2, "shapeType": "placeholder", "shape": {"id": 2, "shapeType": "textbox"}})
        );
    }

    #[test]
    fn test_deleted_keeps_only_known_ids() {
        let index = test_index();
        let raw = json!({"deleted": [
            {"id": "5", "shapeType": "group", "unloadItems": true},
            {"id": 404},
            {"id": null},
            {},
            8
        ]});

        let changeset = sanitize(&raw, &index);
        assert_eq!(changeset.deleted, vec![DeletedShape { id: 5 }]);
    }

    #[test]
    fn test_bad_entries_do_not_affect_siblings() {
        let index = test_index();
        let raw = json!({"modified": [
            {"id": 404},
            {"id": 1, "pos": {"topLeft": [0, 0]}},
            {"id": 6},
            {"id": 8, "size": {"w": 3, "h": 3}}
        ]});

        let ids: Vec<i64> = sanitize(&raw, &index).modified.iter().map(ModifiedShape::id).collect();
        assert_eq!(ids, vec![1, 8]);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let index = test_index();
        let raw = json!({
            "added": [
                {"shapeType": "Picture", "pos": {"topLeft": [0, 0]}, "size": {"width": 10, "height": 5}},
                {"shapeType": "text box", "pos": {"center": [1, 1]}, "size": {"w": 1, "h": 1}, "xml": "x"},
                {"shapeType": "chart", "pos": {}, "size": {}}
            ],
            "modified": [
                {"id": 1, "shapeType": "image", "size": {"width": 2}},
                {"id": "2", "xml": "<p/>", "pos": {"topLeft": [0, 0]}, "zIndex": 4},
                {"id": 3, "pos": {"topLeft": [0, 0]}, "endPos": [1, 1]},
                {"id": 4},
                {"id": 5},
                {"id": 99}
            ],
            "deleted": [{"id": 7, "extra": true}, {"id": "x"}]
        });

        let once = sanitize(&raw, &index);
        let twice = sanitize(&to_value(&once), &index);
        assert_eq!(once, twice);
    }
}
