use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::material::Material;
use crate::models::stone::{StoneData, StoneRecord};
use crate::services::filter::{CatalogQueryState, FilterOptions, StoneFilter};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStonePayload {
    #[validate(length(min = 1, max = 200))]
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
    #[serde(default)]
    pub image: String,
}

impl From<CreateStonePayload> for StoneData {
    fn from(value: CreateStonePayload) -> Self {
        Self {
            name: value.name.trim().to_string(),
            category: value.category,
            rock_type: value.rock_type,
            finishes: value.finishes,
            availability: value.availability,
            base_color: value.base_color,
            characteristics: value.characteristics,
            image: value.image,
        }
    }
}

/// Partial edit; absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateStonePayload {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category: Option<String>,
    pub rock_type: Option<String>,
    pub finishes: Option<String>,
    pub availability: Option<String>,
    pub base_color: Option<String>,
    pub characteristics: Option<String>,
    pub image: Option<String>,
}

impl UpdateStonePayload {
    pub fn apply_to(self, data: &StoneData) -> StoneData {
        StoneData {
            name: self
                .name
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| data.name.clone()),
            category: self.category.unwrap_or_else(|| data.category.clone()),
            rock_type: self.rock_type.unwrap_or_else(|| data.rock_type.clone()),
            finishes: self.finishes.unwrap_or_else(|| data.finishes.clone()),
            availability: self.availability.unwrap_or_else(|| data.availability.clone()),
            base_color: self.base_color.unwrap_or_else(|| data.base_color.clone()),
            characteristics: self
                .characteristics
                .unwrap_or_else(|| data.characteristics.clone()),
            image: self.image.unwrap_or_else(|| data.image.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoneListQuery {
    pub page: Option<usize>,
    pub category: Option<String>,
    pub rock_type: Option<String>,
    pub base_color: Option<String>,
    pub search: Option<String>,
}

impl StoneListQuery {
    pub fn filter(&self) -> StoneFilter {
        StoneFilter {
            category: self.category.clone(),
            rock_type: self.rock_type.clone(),
            base_color: self.base_color.clone(),
            search: self.search.clone(),
        }
    }

    pub fn state(&self) -> CatalogQueryState {
        CatalogQueryState::new(self.filter(), self.page.unwrap_or(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoneResponse {
    pub id: i64,
    #[serde(flatten)]
    pub data: StoneData,
    pub image_url: String,
}

impl StoneResponse {
    pub fn new(record: StoneRecord, image_url: String) -> Self {
        Self {
            id: record.id,
            data: record.data,
            image_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoneListResponse {
    pub items: Vec<StoneResponse>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub filters: FilterOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStoneResponse {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUploadResponse {
    pub path: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialResponse {
    pub id: i64,
    pub name: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialListResponse {
    pub items: Vec<MaterialResponse>,
}

impl MaterialResponse {
    pub fn new(material: Material, image_url: String) -> Self {
        Self {
            id: material.id,
            name: material.name,
            image_url,
        }
    }
}
