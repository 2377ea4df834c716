//! The seam between the capture engine and a live browser session.
//!
//! Everything the engine needs from the remote browser is behind
//! [`BrowserSession`], so the stitching and strategy logic can be exercised
//! against a scripted fake and the CDP adapter stays replaceable.
//!
//! Unless a method says otherwise, geometry is in device (physical) pixels,
//! the same space screenshots are delivered in. Scroll offsets are the one
//! exception: browsers script scrolling in CSS pixels, so `scroll_to` takes
//! CSS coordinates and callers divide by the device pixel ratio.

use crate::error::SessionResult;
use async_trait::async_trait;

/// Width and height in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// An element bounding rectangle in CSS pixels, document-relative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One live browser session.
///
/// Implementations must be usable from a single capture call at a time;
/// the engine never issues concurrent commands on one session.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Scroll the document to the given CSS-pixel offset.
    async fn scroll_to(&self, x: f64, y: f64) -> SessionResult<()>;

    /// Scroll the document back to its origin.
    async fn scroll_to_top(&self) -> SessionResult<()>;

    /// Full document layout size.
    async fn content_dimension(&self) -> SessionResult<Dimension>;

    /// Visible viewport size, scrollbars excluded.
    async fn viewport_dimension(&self) -> SessionResult<Dimension>;

    /// Scale factor between CSS pixels and screenshot pixels.
    async fn device_pixel_ratio(&self) -> SessionResult<f64>;

    /// Whether a blocking overlay currently restricts the page to the
    /// viewport.
    async fn is_modal_displayed(&self) -> SessionResult<bool>;

    /// Whether this engine can produce screenshots at all. No-GUI engines
    /// report `false` and the stitcher short-circuits without scrolling.
    fn supports_screenshots(&self) -> bool {
        true
    }

    /// One viewport screenshot as a base64 PNG.
    async fn take_screenshot(&self) -> SessionResult<String>;

    /// Vendor one-shot full-document screenshot, if the engine has such a
    /// command. `Ok(None)` means the command does not exist here.
    async fn full_page_screenshot(&self) -> SessionResult<Option<String>>;

    /// Out-of-band screenshot taken with the viewport overridden to the
    /// given CSS-pixel size. `Ok(None)` means the engine cannot do this.
    async fn screenshot_with_viewport_override(
        &self,
        width: u32,
        height: u32,
    ) -> SessionResult<Option<String>>;

    /// Unblock a JavaScript dialog if one is open.
    async fn dismiss_dialog(&self) -> SessionResult<()>;

    /// Auto-detected fixed header and footer heights, in device pixels.
    async fn detect_fixed_chrome(&self) -> SessionResult<(u32, u32)>;

    /// Document-relative bounding rectangle of the first element matching
    /// the selector. Errors when the element is missing or detached.
    async fn element_rect(&self, selector: &str) -> SessionResult<Rect>;

    async fn window_handles(&self) -> SessionResult<Vec<String>>;

    async fn active_window(&self) -> SessionResult<String>;

    async fn switch_to_window(&self, handle: &str) -> SessionResult<()>;

    async fn url(&self) -> SessionResult<String>;

    async fn title(&self) -> SessionResult<String>;

    async fn page_source(&self) -> SessionResult<String>;
}
