use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::{state::AppState, storage::StoredObject};

const PREFIX: &str = "rentals";

pub struct UploadItem<'a> {
    pub body: Bytes,
    pub content_type: &'a str,
}

/// Stores a rental picture and returns its file name, which is the locator
/// kept on the rental row.
pub async fn store_picture(st: &AppState, img: UploadItem<'_>) -> anyhow::Result<String> {
    let ext = ext_from_mime(img.content_type)
        .with_context(|| format!("unsupported picture type {}", img.content_type))?;
    let file = format!("{}.{}", Uuid::new_v4(), ext);
    let key = object_key(&file);
    let content_type = mime_from_ext(ext).unwrap_or(img.content_type);
    st.storage
        .put_object(&key, img.body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(file)
}

pub async fn load_picture(st: &AppState, file: &str) -> anyhow::Result<Option<StoredObject>> {
    if !is_picture_name(file) {
        return Ok(None);
    }
    let key = object_key(file);
    let mut obj = st
        .storage
        .get_object(&key)
        .await
        .with_context(|| format!("get_object {}", key))?;
    if let Some(o) = obj.as_mut() {
        if o.content_type.is_none() {
            o.content_type = file
                .rsplit_once('.')
                .and_then(|(_, ext)| mime_from_ext(ext))
                .map(str::to_string);
        }
    }
    Ok(obj)
}

/// Best effort; used to undo an upload whose rental was never saved.
pub async fn discard_picture(st: &AppState, file: &str) {
    let key = object_key(file);
    if let Err(e) = st.storage.delete_object(&key).await {
        tracing::warn!(error = %e, %key, "failed to discard orphaned picture");
    }
}

/// Public URL under which a stored picture is served.
pub fn picture_url(file: &str) -> String {
    format!("/api/rentals/image/{}", file)
}

pub fn is_supported_mime(ct: &str) -> bool {
    ext_from_mime(ct).is_some()
}

fn object_key(file: &str) -> String {
    format!("{}/{}", PREFIX, file)
}

/// Only names this module generated: `<uuid>.<known ext>`.
fn is_picture_name(file: &str) -> bool {
    match file.rsplit_once('.') {
        Some((stem, ext)) => Uuid::parse_str(stem).is_ok() && mime_from_ext(ext).is_some(),
        None => false,
    }
}

/// Matches on the media type alone: case-insensitive, parameters dropped.
fn ext_from_mime(ct: &str) -> Option<&'static str> {
    let essence = ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

fn mime_from_ext(ext: &str) -> Option<&'static str> {
    match ext {
        "jpg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
