use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};

use crate::models::stone::{StoneData, StoneField};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub stone_id: i64,
    pub editor: String,
    /// `{field: {"from": old, "to": new}}`
    pub changes: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl ChangeLogEntry {
    /// Builds an entry for an edit, or `None` when nothing changed.
    pub fn for_edit(
        stone_id: i64,
        editor: &str,
        before: &StoneData,
        after: &StoneData,
    ) -> Option<Self> {
        let changes = diff(before, after);
        if changes.is_empty() {
            return None;
        }
        Some(Self {
            stone_id,
            editor: editor.to_string(),
            changes: JsonValue::Object(changes),
            created_at: Utc::now(),
        })
    }
}

pub fn diff(before: &StoneData, after: &StoneData) -> Map<String, JsonValue> {
    StoneField::ALL
        .iter()
        .filter(|field| before.get(**field) != after.get(**field))
        .map(|field| {
            (
                field.as_str().to_string(),
                json!({ "from": before.get(*field), "to": after.get(*field) }),
            )
        })
        .collect()
}
