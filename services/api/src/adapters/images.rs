//! services/api/src/adapters/images.rs
//!
//! Adapters implementing the `ImageStore` port.

use academy_core::domain::StoredImage;
use academy_core::ports::{ImageStore, PortError, PortResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::ImageStoreConfig;

const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

//=========================================================================================
// Cloudinary adapter
//=========================================================================================

/// Stores review images in Cloudinary.
///
/// Uploads go through an upload preset; deletions use the admin API with basic auth.
#[derive(Clone)]
pub struct CloudinaryAdapter {
    client: reqwest::Client,
    config: ImageStoreConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

impl CloudinaryAdapter {
    /// Creates a new `CloudinaryAdapter`.
    pub fn new(client: reqwest::Client, config: ImageStoreConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", CLOUDINARY_API, self.config.cloud_name, path)
    }
}

#[async_trait]
impl ImageStore for CloudinaryAdapter {
    async fn upload_image(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: Vec<u8>,
    ) -> PortResult<StoredImage> {
        let mut part = Part::bytes(data).file_name(file_name.to_string());
        if let Some(mime) = content_type {
            part = part
                .mime_str(mime)
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.config.upload_preset.clone())
            .text("folder", self.config.folder.clone());

        let response = self
            .client
            .post(self.endpoint("image/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Image upload failed ({}): {}",
                status, body
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(StoredImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn delete_image(&self, public_id: &str) -> PortResult<()> {
        let response = self
            .client
            .delete(self.endpoint("resources/image/upload"))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .query(&[("public_ids[]", public_id)])
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unexpected(format!(
                "Image deletion for {} failed ({})",
                public_id, status
            )));
        }
        Ok(())
    }
}

//=========================================================================================
// Unconfigured store
//=========================================================================================

/// Stands in when no image store is configured: every call fails.
#[derive(Clone, Default)]
pub struct UnavailableImageStore;

#[async_trait]
impl ImageStore for UnavailableImageStore {
    async fn upload_image(
        &self,
        _file_name: &str,
        _content_type: Option<&str>,
        _data: Vec<u8>,
    ) -> PortResult<StoredImage> {
        Err(PortError::Unexpected("Image store is not configured".to_string()))
    }

    async fn delete_image(&self, _public_id: &str) -> PortResult<()> {
        Err(PortError::Unexpected("Image store is not configured".to_string()))
    }
}
