//! Converts composed images and their metadata into the caller's requested
//! representation.
//!
//! The output kind is a closed enum with one pure mapping per variant, so
//! an unrecognized kind cannot exist. The only runtime failure at this
//! boundary is a file sink refusing the artifact.

use crate::capture::NamedCapture;
use crate::error::Result;
use crate::image_ops;
use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Requested output representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportKind {
    /// PNG file under the given directory, named after the capture label
    /// and timestamp.
    File { dir: PathBuf },
    /// Structured record: base64 image plus page metadata.
    Record,
    /// Base64-encoded PNG string.
    Base64,
    /// The raw composed image.
    Image,
}

/// One exported capture.
#[derive(Debug, Clone)]
pub enum Exported {
    File(PathBuf),
    Record(CaptureRecord),
    Base64(String),
    Image(RgbaImage),
}

/// Structured capture record for report consumers.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureRecord {
    pub label: String,
    /// Base64 PNG payload.
    pub image: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub duration_millis: u64,
    pub captured_at: DateTime<Utc>,
}

/// Map one capture to the requested representation.
pub(crate) fn export(capture: NamedCapture, kind: &ExportKind) -> Result<Exported> {
    match kind {
        ExportKind::File { dir } => {
            let path = dir.join(file_name(&capture.label, capture.metadata.captured_at));
            std::fs::create_dir_all(dir)?;
            std::fs::write(&path, image_ops::encode_png(&capture.image)?)?;
            Ok(Exported::File(path))
        }
        ExportKind::Record => Ok(Exported::Record(CaptureRecord {
            image: image_ops::to_base64(&capture.image)?,
            label: capture.label,
            url: capture.metadata.url,
            title: capture.metadata.title,
            duration_millis: capture.metadata.duration_millis,
            captured_at: capture.metadata.captured_at,
        })),
        ExportKind::Base64 => Ok(Exported::Base64(image_ops::to_base64(&capture.image)?)),
        ExportKind::Image => Ok(Exported::Image(capture.image)),
    }
}

/// File name derived from the capture label and timestamp. Anything that
/// would not survive a file system lands as `_`.
fn file_name(label: &str, captured_at: DateTime<Utc>) -> String {
    let slug: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let slug = slug.trim_matches('_');
    let slug = if slug.is_empty() { "capture" } else { slug };
    format!("{}-{}.png", slug, captured_at.format("%Y%m%dT%H%M%S%3f"))
}

/// Write PNG bytes for an already-composed image to an explicit path.
/// Convenience for callers that manage their own layout.
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, image_ops::encode_png(image)?)?;
    Ok(())
}
