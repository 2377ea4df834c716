//! Iterative scroll→capture→composite loop.
//!
//! Produces a full-page image when no one-shot protocol succeeds: scroll,
//! settle, capture one viewport tile, crop away fixed header/footer bands,
//! composite onto the canvas, repeat until the content rectangle is covered.
//! Tiles run top-to-bottom within a horizontal band, then the band shifts
//! right. Every failure inside the loop degrades: a failed scroll skips the
//! adjustment, a failed capture ends the loop with whatever is composed.

use crate::config::{CaptureConfig, TestMode};
use crate::image_ops;
use crate::session::{BrowserSession, Dimension};
use image::RgbaImage;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on capture iterations.
///
/// Mirrors the long-standing formula of the source system, slack and all:
/// vertical step count times horizontal step count plus three, clamped to at
/// least one, and exactly one while a modal restricts the page to the
/// viewport. The clamp is intentional; callers rely on the bound never being
/// zero even for degenerate crop inputs.
fn iteration_bound(
    content: Dimension,
    viewport: Dimension,
    top: u32,
    bottom: u32,
    modal: bool,
) -> u32 {
    if modal {
        return 1;
    }

    let usable = i64::from(content.height) - i64::from(top) - i64::from(bottom);
    let step = (i64::from(viewport.height) - i64::from(top) - i64::from(bottom)).max(1);
    let vertical = if usable <= 0 {
        0
    } else {
        (usable + step - 1) / step
    };

    let stride = i64::from(viewport.width.max(1));
    let horizontal = (i64::from(content.width) + stride - 1) / stride;

    (vertical * horizontal + 3).max(1) as u32
}

/// Resolve header/footer crop heights: explicit configuration wins,
/// otherwise ask the session, otherwise zero.
async fn crop_bands(session: &dyn BrowserSession, config: &CaptureConfig) -> (u32, u32) {
    if let (Some(top), Some(bottom)) = (config.header_crop, config.footer_crop) {
        return (top, bottom);
    }
    let detected = match session.detect_fixed_chrome().await {
        Ok(bands) => bands,
        Err(e) => {
            debug!(error = %e, "fixed chrome detection failed, assuming none");
            (0, 0)
        }
    };
    (
        config.header_crop.unwrap_or(detected.0),
        config.footer_crop.unwrap_or(detected.1),
    )
}

/// Capture one tile with the given bands already cropped away. `None` means
/// the engine produced nothing usable; the caller stops the loop.
async fn capture_tile(
    session: &dyn BrowserSession,
    crop_top: u32,
    crop_bottom: u32,
) -> Option<RgbaImage> {
    let payload = match session.take_screenshot().await {
        Ok(data) => data,
        Err(e) => {
            warn!(error = %e, "tile capture returned nothing");
            return None;
        }
    };
    let tile = match image_ops::from_base64(&payload) {
        Ok(img) => img,
        Err(e) => {
            warn!(error = %e, "tile payload did not decode");
            return None;
        }
    };
    if crop_top == 0 && crop_bottom == 0 {
        return Some(tile);
    }
    let height = tile.height().saturating_sub(crop_top + crop_bottom);
    Some(image_ops::crop(&tile, 0, crop_top, tile.width(), height))
}

/// Stitch a full-page image by scrolling and compositing viewport tiles.
///
/// Returns `None` when the engine cannot produce images at all, or when the
/// very first tile fails. A failure after the first tile returns the partial
/// composition. The scroll position is restored to the origin on every exit
/// path that scrolled.
pub(crate) async fn stitch(
    session: &dyn BrowserSession,
    config: &CaptureConfig,
    settle_delay: Duration,
) -> Option<RgbaImage> {
    if !session.supports_screenshots() {
        warn!("engine cannot produce screenshots, skipping page stitch");
        return None;
    }

    let content = match session.content_dimension().await {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "content dimension unavailable, skipping page stitch");
            return None;
        }
    };
    let viewport = match session.viewport_dimension().await {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "viewport dimension unavailable, skipping page stitch");
            return None;
        }
    };
    let dpr = session.device_pixel_ratio().await.unwrap_or(1.0).max(f64::MIN_POSITIVE);
    let modal = session.is_modal_displayed().await.unwrap_or(false);
    let (top, bottom) = crop_bands(session, config).await;

    let mut max_loops = iteration_bound(content, viewport, top, bottom, modal);
    if session.scroll_to_top().await.is_err() {
        // Session cannot scroll; settle for one best-effort capture.
        max_loops = 1;
    }

    debug!(
        content_w = content.width,
        content_h = content.height,
        viewport_w = viewport.width,
        viewport_h = viewport.height,
        top,
        bottom,
        max_loops,
        "stitching page"
    );

    let app_test = config.test_mode == TestMode::App;
    let mut canvas: Option<RgbaImage> = None;
    let mut accumulated: u32 = 0;
    let mut scroll_x: u32 = 0;
    let mut loops = 0;

    while loops < max_loops {
        let crop_top = if accumulated == 0 { 0 } else { top };
        let crop_bottom =
            if accumulated + viewport.height.saturating_sub(crop_top) < content.height
                && max_loops != 1
            {
                bottom
            } else {
                0
            };

        let scroll_y = i64::from(accumulated) - i64::from(crop_top);
        if let Err(e) = session
            .scroll_to(f64::from(scroll_x) / dpr, scroll_y as f64 / dpr)
            .await
        {
            debug!(error = %e, "scroll adjustment failed, capturing in place");
        }
        if !settle_delay.is_zero() {
            tokio::time::sleep(settle_delay).await;
        }

        let Some(mut tile) = capture_tile(session, crop_top, crop_bottom).await else {
            warn!(loops, "capture stopped early, returning partial composition");
            break;
        };

        match canvas.take() {
            None => {
                let size = if max_loops == 1 { viewport } else { content };
                let blank = RgbaImage::new(size.width, size.height);
                canvas = Some(image_ops::concat(&blank, &tile, 0, 0));
                accumulated = tile.height();
            }
            Some(base) => {
                if accumulated + tile.height() > content.height
                    || scroll_x + tile.width() > content.width
                {
                    // The final scroll was clamped by the browser, so only
                    // the trailing part of this tile is new content.
                    let new_w = content.width.saturating_sub(scroll_x).min(tile.width());
                    let new_h = content.height.saturating_sub(accumulated).min(tile.height());
                    tile = image_ops::crop(
                        &tile,
                        tile.width() - new_w,
                        tile.height() - new_h,
                        new_w,
                        new_h,
                    );
                }
                canvas = Some(image_ops::concat(&base, &tile, scroll_x, accumulated));
                accumulated += tile.height();
            }
        }

        loops += 1;

        let height_covered = accumulated >= content.height;
        if (height_covered && scroll_x + tile.width() >= content.width) || app_test {
            break;
        }
        if height_covered {
            scroll_x += tile.width();
            accumulated = 0;
        }
    }

    if let Err(e) = session.scroll_to_top().await {
        debug!(error = %e, "could not restore scroll position");
    }

    canvas
}
