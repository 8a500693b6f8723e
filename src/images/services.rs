use std::io::Cursor;

use anyhow::Context;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use rand::RngCore;
use tracing::{info, warn};

use crate::error::{BlogError, Result};
use crate::forms::{extension_allowed, file_extension, IMAGE_EXTENSIONS};
use crate::storage::StorageClient;

/// Longest side of a stored avatar, in pixels.
pub const THUMBNAIL_SIZE: u32 = 125;

pub struct Upload {
    pub filename: String,
    pub body: Bytes,
}

/// Random 16-hex-digit name keeping `ext`.
pub fn random_filename(ext: &str) -> String {
    let mut raw = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut raw);
    let hex: String = raw.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}.{}", hex, ext)
}

fn format_for(ext: &str) -> Option<ImageFormat> {
    match ext {
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "png" => Some(ImageFormat::Png),
        _ => None,
    }
}

/// Decode, shrink to fit within [`THUMBNAIL_SIZE`] (never enlarged) and
/// re-encode as `format`.
pub fn thumbnail(body: &[u8], format: ImageFormat) -> Result<Vec<u8>> {
    let img = image::load_from_memory(body).map_err(|e| {
        warn!(error = %e, "uploaded image could not be decoded");
        BlogError::UnsupportedFormat
    })?;
    let img = if img.width() > THUMBNAIL_SIZE || img.height() > THUMBNAIL_SIZE {
        img.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
    } else {
        img
    };
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).context("encode thumbnail")?;
    Ok(out.into_inner())
}

/// Store an uploaded avatar and return the generated file name.
pub async fn ingest(storage: &dyn StorageClient, upload: Upload) -> Result<String> {
    if !extension_allowed(&upload.filename, IMAGE_EXTENSIONS) {
        return Err(BlogError::UnsupportedFormat);
    }
    let ext = file_extension(&upload.filename).ok_or(BlogError::UnsupportedFormat)?;
    let format = format_for(&ext).ok_or(BlogError::UnsupportedFormat)?;

    let body = upload.body;
    let encoded = tokio::task::spawn_blocking(move || thumbnail(&body, format))
        .await
        .context("thumbnail task")??;

    let mut filename = random_filename(&ext);
    while storage.exists(&filename).await? {
        filename = random_filename(&ext);
    }
    storage
        .put_object(&filename, Bytes::from(encoded))
        .await
        .with_context(|| format!("store avatar {}", filename))?;

    info!(%filename, "avatar stored");
    Ok(filename)
}
