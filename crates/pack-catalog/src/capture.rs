//! Thumbnail normalization and the on-disk naming convention.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::types::{CatalogError, CatalogResult};

/// Extension of every encoded thumbnail.
pub const THUMBNAIL_EXT: &str = "jpg";

/// Directory, relative to the artifact root, holding all thumbnails.
pub const THUMBNAIL_DIR: &str = "thumbs";

/// Target geometry and quality of a normalized thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSpec {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl ThumbnailSpec {
    pub fn new(width: u32, height: u32, quality: u8) -> CatalogResult<Self> {
        if width == 0 || height == 0 {
            return Err(CatalogError::InvalidSpec(format!(
                "thumbnail size must be non-zero, got {width}x{height}"
            )));
        }
        if !(1..=100).contains(&quality) {
            return Err(CatalogError::InvalidSpec(format!(
                "thumbnail quality must be 1-100, got {quality}"
            )));
        }
        Ok(Self {
            width,
            height,
            quality,
        })
    }
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 675,
            quality: 80,
        }
    }
}

/// Decode raw image bytes, cover-fit them to `spec`, and encode as JPEG.
pub fn normalize_thumbnail(raw: &[u8], spec: &ThumbnailSpec) -> CatalogResult<Vec<u8>> {
    let img = image::load_from_memory(raw)?;
    encode_cover(&img, spec)
}

/// Cover-fit an already decoded image and encode it.
pub fn encode_cover(img: &DynamicImage, spec: &ThumbnailSpec) -> CatalogResult<Vec<u8>> {
    let filled = img.resize_to_fill(spec.width, spec.height, FilterType::Lanczos3);
    let rgb = filled.to_rgb8();

    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, spec.quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Site-relative path of a page thumbnail: `thumbs/<category>/<slug>.jpg`.
///
/// Always uses `/` separators since the value is published as a URL path.
pub fn thumbnail_relative_path(category: &str, layout_slug: &str) -> String {
    format!("{THUMBNAIL_DIR}/{category}/{layout_slug}.{THUMBNAIL_EXT}")
}

/// Filesystem location of a page thumbnail under `artifact_root`.
pub fn thumbnail_file_path(artifact_root: &Path, category: &str, layout_slug: &str) -> PathBuf {
    artifact_root
        .join(THUMBNAIL_DIR)
        .join(category)
        .join(format!("{layout_slug}.{THUMBNAIL_EXT}"))
}

/// Write encoded thumbnail bytes, creating parent directories.
pub fn write_thumbnail(path: &Path, encoded: &[u8]) -> CatalogResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, encoded)?;
    Ok(())
}
