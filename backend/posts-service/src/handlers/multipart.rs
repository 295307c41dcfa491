//! Multipart form reading for signup and post creation.

use crate::error::{AppError, Result};
use crate::services::storage::{extension_for, FileStorage};
use actix_multipart::Multipart;
use futures_util::stream::StreamExt;
use std::collections::HashMap;

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;
const IMAGE_FIELD: &str = "image";

#[derive(Debug)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub image: Option<UploadedImage>,
}

impl MultipartForm {
    /// Text value of a field, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn optional_text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }
}

/// Drain the payload into text fields plus at most one `image` file.
pub async fn read_form(mut payload: Multipart, max_image_bytes: usize) -> Result<MultipartForm> {
    let mut form = MultipartForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            tracing::debug!(error = %e, "malformed multipart payload");
            AppError::Validation("Malformed multipart body.".into())
        })?;

        let name = field.name().unwrap_or_default().to_string();
        let is_file = name == IMAGE_FIELD;
        let content_type = field.content_type().map(|m| m.essence_str().to_string());

        if is_file {
            let essence = content_type.as_deref().unwrap_or_default();
            if extension_for(essence).is_none() {
                return Err(AppError::Validation(
                    "Only PNG and JPEG images are accepted.".into(),
                ));
            }
        }

        let limit = if is_file {
            max_image_bytes
        } else {
            MAX_TEXT_FIELD_BYTES
        };
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::debug!(error = %e, field = %name, "error reading multipart field");
                AppError::Validation("Malformed multipart body.".into())
            })?;
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::Validation(format!(
                    "Field '{}' exceeds {} bytes.",
                    name, limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if is_file {
            if !bytes.is_empty() {
                form.image = Some(UploadedImage {
                    bytes,
                    content_type: content_type.unwrap_or_default(),
                });
            }
        } else {
            let value = String::from_utf8(bytes)
                .map_err(|_| AppError::Validation(format!("Field '{}' is not UTF-8.", name)))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Persist an uploaded image and return its reference.
pub async fn store_image(
    files: &dyn FileStorage,
    image: Option<UploadedImage>,
) -> Result<Option<String>> {
    let Some(image) = image else {
        return Ok(None);
    };

    let reference = files
        .save(image.bytes, &image.content_type)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to store uploaded image");
            AppError::operation_failed("Could not store the uploaded image, please try again.")
        })?;
    Ok(Some(reference))
}
