use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::{with_timeout, ObjectStorage};
use crate::error::{Error, Result};

/// Supabase-style storage bucket reached over its REST API.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: Url,
    bucket: String,
    service_key: String,
    timeout: Duration,
}

impl SupabaseStorage {
    pub fn new(
        client: Client,
        base_url: &str,
        bucket: String,
        service_key: String,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid storage url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Storage url {} cannot be used as a base",
                base_url
            )));
        }
        Ok(Self {
            client,
            base_url,
            bucket,
            service_key,
            timeout,
        })
    }

    fn object_url(&self, public: bool, path: &str) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["storage", "v1", "object"]);
            if public {
                segments.push("public");
            }
            segments.push(&self.bucket);
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url.to_string()
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(&self, bytes: Vec<u8>, path: &str, content_type: &str) -> Result<String> {
        let target = self.object_url(false, path);
        let size = bytes.len();
        let response = with_timeout(self.timeout, Error::Upload, async {
            self.client
                .post(&target)
                .bearer_auth(&self.service_key)
                .header("apikey", &self.service_key)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .header("x-upsert", "true")
                .body(bytes)
                .send()
                .await
                .map_err(|e| Error::Upload(e.to_string()))
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, path, body = %body, "storage rejected upload");
            return Err(Error::Upload(format!("storage returned {}", status)));
        }
        tracing::info!(path, size, "object uploaded");
        Ok(self.public_url(path))
    }

    fn public_url(&self, path: &str) -> String {
        self.object_url(true, path)
    }
}

/// Last path component of a client-supplied filename with spaces replaced.
pub fn sanitize_filename(original: &str) -> String {
    let name = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim()
        .replace(' ', "_");
    if name.is_empty() || name == "." || name == ".." {
        "upload".to_string()
    } else {
        name
    }
}

/// `materials/<material>/<timestamp>_<filename>`
pub fn material_object_path(material: &str, timestamp: i64, original_filename: &str) -> String {
    format!(
        "materials/{}/{}_{}",
        sanitize_filename(material),
        timestamp,
        sanitize_filename(original_filename)
    )
}

/// `image_<stoneId>_<timestamp>.<ext>`
pub fn stone_image_path(stone_id: i64, timestamp: i64, ext: Option<&str>) -> String {
    let ext = ext
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "jpg".to_string());
    format!("image_{}_{}.{}", stone_id, timestamp, ext)
}

/// Turns a stored image reference into something a browser can load.
/// Path segments of the stored name are percent-encoded.
pub fn resolve_image_url(base: &str, name: &str, placeholder: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return placeholder.to_string();
    }
    if name.starts_with("http://") || name.starts_with("https://") {
        return name.to_string();
    }
    match Url::parse(base) {
        Ok(url) if !url.cannot_be_a_base() => join_segments(url, name).to_string(),
        // relative base such as "/media": encode against a scratch origin
        _ => match Url::parse("http://localhost/") {
            Ok(scratch) => format!(
                "{}{}",
                base.trim_end_matches('/'),
                join_segments(scratch, name).path()
            ),
            Err(_) => format!("{}/{}", base.trim_end_matches('/'), name),
        },
    }
}

fn join_segments(mut url: Url, name: &str) -> Url {
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(name.split('/').filter(|s| !s.is_empty()));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SupabaseStorage {
        SupabaseStorage::new(
            Client::new(),
            "https://proj.supabase.co/",
            "stones".into(),
            "service".into(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn public_and_upload_urls_follow_the_bucket_layout() {
        let s = storage();
        assert_eq!(
            s.public_url("materials/Onice/17_a.png"),
            "https://proj.supabase.co/storage/v1/object/public/stones/materials/Onice/17_a.png"
        );
        assert_eq!(
            s.object_url(false, "image_4_9.jpg"),
            "https://proj.supabase.co/storage/v1/object/stones/image_4_9.jpg"
        );
    }

    #[test]
    fn material_paths_keep_the_original_name() {
        assert_eq!(
            material_object_path("Onice Miele", 1700000000000, "C:\\photos\\slab 1.JPG"),
            "materials/Onice_Miele/1700000000000_slab_1.JPG"
        );
        assert_eq!(material_object_path("Ardesia", 5, "../"), "materials/Ardesia/5_upload");
    }

    #[test]
    fn stone_image_paths_lowercase_the_extension() {
        assert_eq!(stone_image_path(12, 99, Some("PNG")), "image_12_99.png");
        assert_eq!(stone_image_path(12, 99, None), "image_12_99.jpg");
    }

    #[test]
    fn image_urls_fall_back_to_placeholder() {
        let base = "https://cdn.example/public/stones/";
        assert_eq!(resolve_image_url(base, "  ", "/ph.png"), "/ph.png");
        assert_eq!(
            resolve_image_url(base, "image_1_2.jpg", "/ph.png"),
            "https://cdn.example/public/stones/image_1_2.jpg"
        );
        assert_eq!(
            resolve_image_url(base, "https://elsewhere/x.jpg", "/ph.png"),
            "https://elsewhere/x.jpg"
        );
    }

    #[test]
    fn image_urls_encode_awkward_names() {
        let base = "https://cdn.example/public/stones/";
        assert_eq!(
            resolve_image_url(base, "materials/Onice/17_vena #1?.jpg", "/ph.png"),
            "https://cdn.example/public/stones/materials/Onice/17_vena%20%231%3F.jpg"
        );
        assert_eq!(
            resolve_image_url(base, "materials/Pietra/3_città.png", "/ph.png"),
            "https://cdn.example/public/stones/materials/Pietra/3_citt%C3%A0.png"
        );
        assert_eq!(
            resolve_image_url(&storage().public_url(""), "a b.jpg", "/ph.png"),
            storage().public_url("a b.jpg")
        );
        assert_eq!(
            resolve_image_url("/media", "x #2.jpg", "/ph.png"),
            "/media/x%20%232.jpg"
        );
    }
}
