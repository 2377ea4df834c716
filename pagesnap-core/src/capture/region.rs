//! Element-region extraction from a composed page image.

use crate::error::{CaptureError, Result};
use crate::image_ops;
use crate::session::BrowserSession;
use image::RgbaImage;

/// Crop the composed page image down to one element's rectangle.
///
/// The element is measured in CSS pixels and every value is scaled
/// uniformly by the device pixel ratio to land in the composed image's
/// pixel space. An element that cannot be measured (missing, detached) is
/// a fatal scenario error; no partial image survives it.
pub(crate) async fn crop_to_element(
    session: &dyn BrowserSession,
    selector: &str,
    composed: &RgbaImage,
) -> Result<RgbaImage> {
    let rect = session.element_rect(selector).await.map_err(|e| {
        CaptureError::Scenario(format!("element '{selector}' could not be measured: {e}"))
    })?;
    let dpr = session.device_pixel_ratio().await.unwrap_or(1.0);

    let x = (rect.x * dpr).max(0.0).round() as u32;
    let y = (rect.y * dpr).max(0.0).round() as u32;
    let width = (rect.width * dpr).max(0.0).round() as u32;
    let height = (rect.height * dpr).max(0.0).round() as u32;

    Ok(image_ops::crop(composed, x, y, width, height))
}
