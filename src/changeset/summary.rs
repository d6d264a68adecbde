//! Log-friendly summary of a sanitized changeset.

use serde::{Deserialize, Serialize};

use super::{Changeset, ModifiedShape};
use crate::schema::ShapeType;

/// Maximum number of ids listed per section.
const MAX_LISTED_IDS: usize = 12;

/// Approximate size of a changeset, for logs and event details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangesetSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    /// Edited keys other than `id`/`shapeType`, counting nested placeholder keys.
    pub approx_fields_changed: usize,
    /// Edited keys the schema does not list for their shape type.
    pub unrecognized_fields: usize,
    pub added_ids: Vec<String>,
    pub modified_ids: Vec<i64>,
    pub deleted_ids: Vec<i64>,
}

impl ChangesetSummary {
    pub fn from_changeset(changeset: &Changeset) -> Self {
        let mut approx_fields_changed = 0;
        let mut unrecognized_fields = 0;

        for edit in &changeset.modified {
            match edit {
                ModifiedShape::Placeholder(p) => {
                    approx_fields_changed += 1 + usize::from(p.z_index.is_some()) + p.shape.fields.len();
                    unrecognized_fields += count_unrecognized(ShapeType::Textbox, p.shape.fields.keys());
                }
                ModifiedShape::Textbox(p)
                | ModifiedShape::Image(p)
                | ModifiedShape::Chart(p)
                | ModifiedShape::AutoShape(p)
                | ModifiedShape::Line(p) => {
                    approx_fields_changed += p.fields.len();
                    unrecognized_fields += count_unrecognized(edit.shape_type(), p.fields.keys());
                }
            }
        }

        Self {
            added: changeset.added.len(),
            modified: changeset.modified.len(),
            deleted: changeset.deleted.len(),
            approx_fields_changed,
            unrecognized_fields,
            added_ids: changeset
                .added
                .iter()
                .take(MAX_LISTED_IDS)
                .map(|a| a.synthetic_id.clone())
                .collect(),
            modified_ids: changeset
                .modified
                .iter()
                .take(MAX_LISTED_IDS)
                .map(ModifiedShape::id)
                .collect(),
            deleted_ids: changeset
                .deleted
                .iter()
                .take(MAX_LISTED_IDS)
                .map(|d| d.id)
                .collect(),
        }
    }
}

fn count_unrecognized<'a>(shape_type: ShapeType, keys: impl Iterator<Item = &'a String>) -> usize {
    let known = shape_type.update_fields();
    keys.filter(|k| !known.contains(&k.as_str())).count()
}
