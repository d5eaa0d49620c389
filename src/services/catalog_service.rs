use std::path::Path as StdPath;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::dto::stone_dto::UpdateStonePayload;
use crate::error::{Error, Result};
use crate::gateway::storage::{
    material_object_path, resolve_image_url, stone_image_path,
};
use crate::gateway::{ObjectStorage, StoneGateway};
use crate::models::change_log::ChangeLogEntry;
use crate::models::material::Material;
use crate::models::stone::{StoneData, StoneRecord};
use crate::services::filter::{
    filter_stones, page_count, paginate, CatalogQueryState, FilterOptions,
};
use crate::utils::time::upload_stamp;

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub page_size: usize,
    pub placeholder_image_url: String,
    pub max_upload_bytes: usize,
}

pub struct CatalogPage {
    pub items: Vec<StoneRecord>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub options: FilterOptions,
}

pub struct UploadedImage {
    pub path: String,
    pub url: String,
}

#[derive(Clone)]
pub struct CatalogService {
    stones: Arc<dyn StoneGateway>,
    storage: Arc<dyn ObjectStorage>,
    settings: Arc<CatalogSettings>,
    image_base_url: String,
    cache: Arc<RwLock<Option<Arc<Vec<StoneRecord>>>>>,
}

impl CatalogService {
    pub fn new(
        stones: Arc<dyn StoneGateway>,
        storage: Arc<dyn ObjectStorage>,
        settings: CatalogSettings,
    ) -> Self {
        let image_base_url = storage.public_url("");
        Self {
            stones,
            storage,
            settings: Arc::new(settings),
            image_base_url,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub fn page_size(&self) -> usize {
        self.settings.page_size.max(1)
    }

    pub fn image_url(&self, stored: &str) -> String {
        resolve_image_url(
            &self.image_base_url,
            stored,
            &self.settings.placeholder_image_url,
        )
    }

    /// Every record, from the cache when it is warm.
    pub async fn stones(&self) -> Result<Arc<Vec<StoneRecord>>> {
        if let Some(records) = self.cache.read().await.as_ref() {
            return Ok(records.clone());
        }
        let mut guard = self.cache.write().await;
        if let Some(records) = guard.as_ref() {
            return Ok(records.clone());
        }
        let records = Arc::new(self.stones.list_stones().await?);
        tracing::debug!(count = records.len(), "stone cache reloaded");
        *guard = Some(records.clone());
        Ok(records)
    }

    async fn invalidate(&self) {
        self.cache.write().await.take();
    }

    pub async fn browse(&self, query: &CatalogQueryState) -> Result<CatalogPage> {
        let records = self.stones().await?;
        let matching = filter_stones(&records, query.filter());
        let per_page = self.page_size();
        let page = query.page();
        Ok(CatalogPage {
            total: matching.len(),
            total_pages: page_count(matching.len(), per_page),
            items: paginate(&matching, page, per_page).to_vec(),
            page,
            per_page,
            options: FilterOptions::from_records(&records),
        })
    }

    pub async fn filter_options(&self) -> Result<FilterOptions> {
        let records = self.stones().await?;
        Ok(FilterOptions::from_records(&records))
    }

    pub async fn get(&self, id: i64) -> Result<StoneRecord> {
        let records = self.stones().await?;
        records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Stone {} not found", id)))
    }

    pub async fn create(&self, data: StoneData) -> Result<i64> {
        let res = self.stones.create_stone(&data).await;
        self.invalidate().await;
        let id = res?;
        tracing::info!(stone_id = id, name = %data.name, "stone created");
        Ok(id)
    }

    pub async fn update(
        &self,
        id: i64,
        patch: UpdateStonePayload,
        editor: &str,
    ) -> Result<StoneRecord> {
        let current = self
            .stones
            .get_stone(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Stone {} not found", id)))?;
        let next = patch.apply_to(&current.data);
        self.write_edit(id, &current.data, next, editor).await
    }

    async fn write_edit(
        &self,
        id: i64,
        before: &StoneData,
        after: StoneData,
        editor: &str,
    ) -> Result<StoneRecord> {
        let res = self.stones.update_stone(id, &after).await;
        self.invalidate().await;
        res?;

        if let Some(entry) = ChangeLogEntry::for_edit(id, editor, before, &after) {
            if let Err(e) = self.stones.append_change_log(&entry).await {
                tracing::warn!(stone_id = id, error = %e, "change log entry not written");
            }
        }
        tracing::info!(stone_id = id, editor, "stone updated");
        Ok(StoneRecord { id, data: after })
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = self.stones.delete_stone(id).await;
        self.invalidate().await;
        res?;
        tracing::info!(stone_id = id, "stone deleted");
        Ok(())
    }

    pub async fn materials(&self) -> Result<Vec<Material>> {
        self.stones.list_materials().await
    }

    /// Uploads the picture, then points the record at it. The two calls are
    /// independent: if the record update fails the object stays in storage.
    pub async fn upload_stone_image(
        &self,
        id: i64,
        filename: &str,
        bytes: Vec<u8>,
        editor: &str,
    ) -> Result<(StoneRecord, UploadedImage)> {
        let (ext, content_type) = self.check_image(filename, &bytes)?;
        let current = self
            .stones
            .get_stone(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Stone {} not found", id)))?;

        let path = stone_image_path(id, upload_stamp(), Some(ext));
        let url = self.storage.upload(bytes, &path, content_type).await?;

        let mut next = current.data.clone();
        next.image = path.clone();
        let record = self
            .write_edit(id, &current.data, next, editor)
            .await
            .map_err(|e| {
                tracing::warn!(stone_id = id, path = %path, error = %e, "image uploaded but record not updated; object orphaned");
                e
            })?;
        Ok((record, UploadedImage { path, url }))
    }

    pub async fn upload_material_image(
        &self,
        material: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage> {
        let (_, content_type) = self.check_image(filename, &bytes)?;
        let materials = self.stones.list_materials().await?;
        let material = materials
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(material.trim()))
            .ok_or_else(|| Error::NotFound(format!("Material {} not found", material)))?;

        let path = material_object_path(&material.name, upload_stamp(), filename);
        let url = self.storage.upload(bytes, &path, content_type).await?;
        tracing::info!(material = %material.name, path = %path, "material image uploaded");
        Ok(UploadedImage { path, url })
    }

    /// Extension and content type of an acceptable image.
    fn check_image<'a>(&self, filename: &'a str, data: &[u8]) -> Result<(&'a str, &'static str)> {
        if data.is_empty() {
            return Err(Error::BadRequest("Empty file".into()));
        }
        if data.len() > self.settings.max_upload_bytes {
            return Err(Error::BadRequest(format!(
                "File exceeds the {} byte limit",
                self.settings.max_upload_bytes
            )));
        }
        let ext = StdPath::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let content_type = match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => {
                if !data.starts_with(&[0xFF, 0xD8]) {
                    return Err(Error::BadRequest("Invalid JPEG file content".into()));
                }
                "image/jpeg"
            }
            "png" => {
                if !data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
                    return Err(Error::BadRequest("Invalid PNG file content".into()));
                }
                "image/png"
            }
            "webp" => "image/webp",
            "gif" => "image/gif",
            other => {
                return Err(Error::BadRequest(format!(
                    "File type .{} is not allowed",
                    other
                )))
            }
        };
        Ok((ext, content_type))
    }
}
