//! One-shot full-document capture attempts.
//!
//! Two protocols are tried in order: a vendor "full page screenshot"
//! command, then an out-of-band screenshot with the viewport overridden to
//! the full document layout size. Each attempt is tried exactly once; a
//! failure is logged and control falls through. When both fail the caller
//! falls back to scroll stitching.

use crate::image_ops;
use crate::session::BrowserSession;
use image::RgbaImage;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempt a one-shot full-page capture. `None` hands control to the
/// scroll stitcher.
///
/// A positive settle delay forces `None` outright: one-shot protocols have
/// no way to wait for lazily-loaded content between scroll positions.
pub(crate) async fn one_shot(
    session: &dyn BrowserSession,
    settle_delay: Duration,
) -> Option<RgbaImage> {
    if !settle_delay.is_zero() {
        debug!("settle delay requested, skipping one-shot protocols");
        return None;
    }

    match session.full_page_screenshot().await {
        Ok(Some(payload)) => match image_ops::from_base64(&payload) {
            Ok(img) => return Some(img),
            Err(e) => warn!(error = %e, "full-page screenshot payload did not decode"),
        },
        Ok(None) => debug!("engine exposes no full-page screenshot command"),
        Err(e) => warn!(error = %e, "full-page screenshot command failed"),
    }

    let content = match session.content_dimension().await {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "content dimension unavailable for viewport override");
            return None;
        }
    };
    let dpr = session.device_pixel_ratio().await.unwrap_or(1.0).max(f64::MIN_POSITIVE);
    let width = (f64::from(content.width) / dpr).ceil() as u32;
    let height = (f64::from(content.height) / dpr).ceil() as u32;

    match session.screenshot_with_viewport_override(width, height).await {
        Ok(Some(payload)) => match image_ops::from_base64(&payload) {
            Ok(img) => return Some(img),
            Err(e) => warn!(error = %e, "viewport-override payload did not decode"),
        },
        Ok(None) => debug!("engine cannot override the viewport"),
        Err(e) => warn!(error = %e, "viewport-override screenshot failed"),
    }

    None
}
