//! Multipart form parsing for the upload and search endpoints.

use actix_multipart::Multipart;
use catalens_common::CatalogError;
use futures_util::StreamExt;
use std::collections::HashMap;

use crate::error::ApiResult;

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Parts accepted in one form, file included
pub const MAX_FORM_PARTS: usize = 16;

/// File part of a form
#[derive(Debug)]
pub struct FilePart {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: Option<String>,
}

/// A parsed form: text fields plus at most one file
#[derive(Debug, Default)]
pub struct ImageForm {
    pub fields: HashMap<String, String>,
    pub image: Option<FilePart>,
}

impl ImageForm {
    /// Read the whole form
    ///
    /// The file part is taken from the field named `file_field`; it may not
    /// exceed `max_file_bytes`.
    pub async fn read(
        mut payload: Multipart,
        file_field: &str,
        max_file_bytes: usize,
    ) -> ApiResult<Self> {
        let mut form = ImageForm::default();
        let mut parts = 0usize;

        while let Some(field) = payload.next().await {
            let mut field = field?;
            parts += 1;
            if parts > MAX_FORM_PARTS {
                return Err(CatalogError::invalid_input(format!(
                    "Form has more than {} parts",
                    MAX_FORM_PARTS
                ))
                .into());
            }

            let content_disposition = field.content_disposition();
            let name = match content_disposition.get_name() {
                Some(name) => name.to_string(),
                None => continue,
            };

            if name == file_field {
                let filename = content_disposition.get_filename().map(|f| f.to_string());
                let content_type = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let data = chunk?;
                    if bytes.len() + data.len() > max_file_bytes {
                        return Err(CatalogError::invalid_input(format!(
                            "Image exceeds the {} byte limit",
                            max_file_bytes
                        ))
                        .into());
                    }
                    bytes.extend_from_slice(&data);
                }

                form.image = Some(FilePart {
                    bytes,
                    content_type,
                    filename,
                });
            } else {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let data = chunk?;
                    if bytes.len() + data.len() > MAX_TEXT_FIELD_BYTES {
                        return Err(CatalogError::invalid_input(format!(
                            "Field {} is too long",
                            name
                        ))
                        .into());
                    }
                    bytes.extend_from_slice(&data);
                }
                let value = String::from_utf8(bytes).map_err(|_| {
                    CatalogError::invalid_input(format!("Field {} is not valid UTF-8", name))
                })?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// A text field that must be present and non-blank
    pub fn required(&self, name: &str) -> ApiResult<String> {
        match self.fields.get(name) {
            Some(value) if !value.trim().is_empty() => Ok(value.clone()),
            _ => Err(CatalogError::invalid_input(format!("{} is required", name)).into()),
        }
    }

    /// A text field, treating blank as absent
    pub fn optional(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .filter(|value| !value.trim().is_empty())
            .cloned()
    }

    /// Optional positive integer field
    pub fn limit(&self) -> ApiResult<Option<usize>> {
        match self.optional("limit") {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map(Some)
                .map_err(|_| CatalogError::invalid_input("limit must be a positive integer").into()),
        }
    }

    /// The file part, which must be present
    pub fn take_image(&mut self) -> ApiResult<FilePart> {
        self.image
            .take()
            .ok_or_else(|| CatalogError::invalid_input("image file is required").into())
    }
}
