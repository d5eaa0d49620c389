//! Catalog entries and the mapping between the stones table's column names
//! and the field names used everywhere else in the crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoneData {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rock_type: String,
    #[serde(default)]
    pub finishes: String,
    #[serde(default)]
    pub availability: String,
    #[serde(default)]
    pub base_color: String,
    #[serde(default)]
    pub characteristics: String,
    /// Stored filename or absolute URL of the stone's picture.
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoneRecord {
    pub id: i64,
    #[serde(flatten)]
    pub data: StoneData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoneField {
    Name,
    Category,
    RockType,
    Finishes,
    Availability,
    BaseColor,
    Characteristics,
    Image,
}

/// Column name in the hosted `stones` table for every field.
pub const STONE_COLUMNS: [(StoneField, &str); 8] = [
    (StoneField::Name, "Nome"),
    (StoneField::Category, "Categoria"),
    (StoneField::RockType, "Tipologia"),
    (StoneField::Finishes, "Finiture"),
    (StoneField::Availability, "Disponibilita"),
    (StoneField::BaseColor, "Colore_base"),
    (StoneField::Characteristics, "Caratteristiche"),
    (StoneField::Image, "Immagine"),
];

pub const STONE_ID_COLUMN: &str = "id";

impl StoneField {
    pub const ALL: [StoneField; 8] = [
        StoneField::Name,
        StoneField::Category,
        StoneField::RockType,
        StoneField::Finishes,
        StoneField::Availability,
        StoneField::BaseColor,
        StoneField::Characteristics,
        StoneField::Image,
    ];

    pub fn column(&self) -> &'static str {
        STONE_COLUMNS
            .iter()
            .find(|(field, _)| field == self)
            .map(|(_, column)| *column)
            .unwrap_or_default()
    }

    pub fn from_column(column: &str) -> Option<StoneField> {
        STONE_COLUMNS
            .iter()
            .find(|(_, c)| *c == column)
            .map(|(field, _)| *field)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoneField::Name => "name",
            StoneField::Category => "category",
            StoneField::RockType => "rock_type",
            StoneField::Finishes => "finishes",
            StoneField::Availability => "availability",
            StoneField::BaseColor => "base_color",
            StoneField::Characteristics => "characteristics",
            StoneField::Image => "image",
        }
    }
}

impl StoneData {
    pub fn get(&self, field: StoneField) -> &str {
        match field {
            StoneField::Name => &self.name,
            StoneField::Category => &self.category,
            StoneField::RockType => &self.rock_type,
            StoneField::Finishes => &self.finishes,
            StoneField::Availability => &self.availability,
            StoneField::BaseColor => &self.base_color,
            StoneField::Characteristics => &self.characteristics,
            StoneField::Image => &self.image,
        }
    }

    pub fn set(&mut self, field: StoneField, value: String) {
        match field {
            StoneField::Name => self.name = value,
            StoneField::Category => self.category = value,
            StoneField::RockType => self.rock_type = value,
            StoneField::Finishes => self.finishes = value,
            StoneField::Availability => self.availability = value,
            StoneField::BaseColor => self.base_color = value,
            StoneField::Characteristics => self.characteristics = value,
            StoneField::Image => self.image = value,
        }
    }

    /// Column-keyed view of the record, ready to be bound into a statement.
    pub fn to_columns(&self) -> BTreeMap<&'static str, String> {
        STONE_COLUMNS
            .iter()
            .map(|(field, column)| (*column, self.get(*field).to_string()))
            .collect()
    }

    /// Rebuilds a record from a column-keyed row. Unknown columns are an
    /// error; missing ones stay empty.
    pub fn from_columns<'a, I>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let mut data = StoneData::default();
        for (column, value) in columns {
            let field = StoneField::from_column(column).ok_or_else(|| {
                Error::Fetch(format!("unexpected column '{}' in stones table", column))
            })?;
            data.set(field, value);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample() -> StoneData {
        StoneData {
            name: "Bianco Carrara".into(),
            category: "Marble".into(),
            rock_type: "Metamorphic".into(),
            finishes: "Polished, Honed".into(),
            availability: "In stock".into(),
            base_color: "White".into(),
            characteristics: "Fine grain with grey veining".into(),
            image: "carrara.jpg".into(),
        }
    }

    #[test]
    fn every_field_has_exactly_one_column() {
        let fields: HashSet<_> = STONE_COLUMNS.iter().map(|(f, _)| *f).collect();
        let columns: HashSet<_> = STONE_COLUMNS.iter().map(|(_, c)| *c).collect();
        assert_eq!(fields.len(), StoneField::ALL.len());
        assert_eq!(columns.len(), StoneField::ALL.len());
        for field in StoneField::ALL {
            assert_eq!(StoneField::from_column(field.column()), Some(field));
        }
    }

    #[test]
    fn legacy_column_names_are_preserved() {
        assert_eq!(StoneField::Name.column(), "Nome");
        assert_eq!(StoneField::Category.column(), "Categoria");
        assert_eq!(StoneField::from_column("Colore_base"), Some(StoneField::BaseColor));
        assert_eq!(StoneField::from_column("nome"), None);
    }

    #[test]
    fn map_then_unmap_reproduces_the_record() {
        let original = sample();
        let columns = original.to_columns();
        assert_eq!(columns.get("Tipologia").map(String::as_str), Some("Metamorphic"));
        let back = StoneData::from_columns(columns.iter().map(|(c, v)| (*c, v.clone()))).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = StoneData::from_columns(vec![("Prezzo", "10".to_string())]).unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[test]
    fn serialized_record_uses_internal_names() {
        let record = StoneRecord { id: 7, data: sample() };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["rock_type"], "Metamorphic");
        assert!(json.get("Nome").is_none());
    }
}
