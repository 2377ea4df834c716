//! Capture strategy selection and the engine's data model.
//!
//! [`Snapshotter`] is the front door: it dispatches on the snapshot target
//! and test mode, drives window enumeration, picks between the one-shot
//! protocols and the scroll stitcher, and hands the composed images to the
//! export adapter. Everything it produces lives only for the duration of
//! one `capture` call.

mod protocol;
mod region;
mod stitcher;
mod windows;

use crate::config::{CaptureConfig, TestMode};
use crate::error::{CaptureError, Result};
use crate::export::{self, ExportKind, Exported};
use crate::image_ops;
use crate::session::BrowserSession;
use chrono::{DateTime, Utc};
use image::RgbaImage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What to capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotTarget {
    /// Desktop-level capture of whatever is currently visible.
    Screen,
    /// Desktop-level capture restricted to the primary window.
    MainScreen,
    /// The full scrollable document.
    Page,
    /// The visible viewport only.
    Viewport,
    /// One element, cropped out of the composed page. The rectangle is
    /// measured at capture time, never supplied by the caller.
    Element { selector: String },
}

/// Best-effort page metadata attached to every capture. Absence of any
/// field never fails the capture.
#[derive(Debug, Clone)]
pub struct CaptureMetadata {
    pub url: Option<String>,
    pub title: Option<String>,
    pub page_source: Option<String>,
    /// Wall-clock time since the enclosing capture call began.
    pub duration_millis: u64,
    pub captured_at: DateTime<Utc>,
}

/// One composed image with its metadata, one per enumerated window.
#[derive(Debug, Clone)]
pub struct NamedCapture {
    pub image: RgbaImage,
    pub metadata: CaptureMetadata,
    pub label: String,
}

/// Top-level capture dispatcher bound to one browser session.
pub struct Snapshotter {
    session: Arc<dyn BrowserSession>,
    config: CaptureConfig,
}

impl Snapshotter {
    pub fn new(session: Arc<dyn BrowserSession>, config: CaptureConfig) -> Self {
        Self { session, config }
    }

    /// Capture `target` and export every produced image as `export_kind`.
    ///
    /// Returns zero items when the capture degrades to nothing, one per
    /// enumerated window, or exactly one cropped to an element region.
    /// Unsupported target/mode combinations and unmeasurable elements fail;
    /// everything else degrades with a logged warning.
    pub async fn capture(
        &self,
        target: SnapshotTarget,
        export_kind: ExportKind,
        all_windows: bool,
        settle_delay: Duration,
    ) -> Result<Vec<Exported>> {
        let started = Instant::now();
        ensure_supported(&target, self.config.test_mode)?;

        if matches!(
            target,
            SnapshotTarget::Page | SnapshotTarget::Viewport | SnapshotTarget::Element { .. }
        ) {
            // A blocking dialog would wedge every scripted call below.
            if let Err(e) = self.session.dismiss_dialog().await {
                debug!(error = %e, "no dialog dismissed");
            }
        }

        let captures = match &target {
            SnapshotTarget::Screen => self.desktop_capture("screen", started).await,
            SnapshotTarget::MainScreen => self.main_screen_capture(started).await?,
            SnapshotTarget::Page | SnapshotTarget::Viewport => {
                let viewport_only = target == SnapshotTarget::Viewport;
                let scanned = windows::capture_windows(self.session.as_ref(), all_windows, |handle| {
                    Box::pin(self.compose_window(handle, viewport_only, settle_delay, started))
                })
                .await?;
                match scanned {
                    Some(captures) => captures,
                    None => self.desktop_capture("desktop", started).await,
                }
            }
            SnapshotTarget::Element { selector } => {
                let Some(base) = self.compose_page(settle_delay).await else {
                    warn!(selector = %selector, "no base image for element capture");
                    return Ok(Vec::new());
                };
                let cropped =
                    region::crop_to_element(self.session.as_ref(), selector, &base).await?;
                let metadata = self.collect_metadata(started).await;
                vec![NamedCapture {
                    image: cropped,
                    metadata,
                    label: selector.clone(),
                }]
            }
        };

        captures
            .into_iter()
            .map(|capture| export::export(capture, &export_kind))
            .collect()
    }

    /// Compose the full page: one-shot protocols first, scroll stitching as
    /// the fallback.
    async fn compose_page(&self, settle_delay: Duration) -> Option<RgbaImage> {
        if let Some(img) = protocol::one_shot(self.session.as_ref(), settle_delay).await {
            return Some(img);
        }
        stitcher::stitch(self.session.as_ref(), &self.config, settle_delay).await
    }

    /// Capture the currently focused window.
    async fn compose_window(
        &self,
        handle: String,
        viewport_only: bool,
        settle_delay: Duration,
        started: Instant,
    ) -> Result<Option<NamedCapture>> {
        let image = if viewport_only {
            self.raw_viewport().await
        } else {
            self.compose_page(settle_delay).await
        };
        let Some(image) = image else {
            return Ok(None);
        };
        let metadata = self.collect_metadata(started).await;
        let label = metadata
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or(handle);
        Ok(Some(NamedCapture {
            image,
            metadata,
            label,
        }))
    }

    /// One raw screenshot of the current surface, no scrolling, no crops.
    async fn raw_viewport(&self) -> Option<RgbaImage> {
        if !self.session.supports_screenshots() {
            warn!("engine cannot produce screenshots");
            return None;
        }
        let payload = match self.session.take_screenshot().await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "viewport capture failed");
                return None;
            }
        };
        match image_ops::from_base64(&payload) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!(error = %e, "viewport payload did not decode");
                None
            }
        }
    }

    /// Desktop-level capture: the closest this engine gets to "whatever is
    /// on screen". Also the degrade path when window enumeration is broken.
    async fn desktop_capture(&self, label: &str, started: Instant) -> Vec<NamedCapture> {
        let Some(image) = self.raw_viewport().await else {
            return Vec::new();
        };
        let metadata = self.collect_metadata(started).await;
        vec![NamedCapture {
            image,
            metadata,
            label: label.to_string(),
        }]
    }

    /// Capture the primary (first-opened) window, restoring focus after.
    async fn main_screen_capture(&self, started: Instant) -> Result<Vec<NamedCapture>> {
        let (active, handles) = match (
            self.session.active_window().await,
            self.session.window_handles().await,
        ) {
            (Ok(active), Ok(handles)) => (active, handles),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "window enumeration failed, degrading to desktop capture");
                return Ok(self.desktop_capture("desktop", started).await);
            }
        };

        let main = handles.first().cloned().unwrap_or_else(|| active.clone());
        let switched = main != active && self.session.switch_to_window(&main).await.is_ok();

        let mut captures = self.desktop_capture("main-screen", started).await;
        if let Some(capture) = captures.first_mut() {
            if let Some(title) = capture.metadata.title.clone().filter(|t| !t.is_empty()) {
                capture.label = title;
            }
        }

        if switched {
            if let Err(e) = self.session.switch_to_window(&active).await {
                warn!(handle = %active, error = %e, "could not restore window focus");
            }
        }
        Ok(captures)
    }

    /// Gather page metadata; every field is optional and collected
    /// best-effort.
    async fn collect_metadata(&self, started: Instant) -> CaptureMetadata {
        CaptureMetadata {
            url: self.session.url().await.ok(),
            title: self.session.title().await.ok(),
            page_source: self.session.page_source().await.ok(),
            duration_millis: started.elapsed().as_millis() as u64,
            captured_at: Utc::now(),
        }
    }
}

/// Reject target/mode combinations the engine cannot serve.
fn ensure_supported(target: &SnapshotTarget, mode: TestMode) -> Result<()> {
    let supported = match target {
        SnapshotTarget::Screen | SnapshotTarget::MainScreen => true,
        SnapshotTarget::Page | SnapshotTarget::Viewport | SnapshotTarget::Element { .. } => {
            mode != TestMode::Generic
        }
    };
    if supported {
        Ok(())
    } else {
        Err(CaptureError::Scenario(format!(
            "{target:?} capture is not available in a {mode:?} test"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_targets_need_a_browser_session() {
        assert!(ensure_supported(&SnapshotTarget::Page, TestMode::Web).is_ok());
        assert!(ensure_supported(&SnapshotTarget::Page, TestMode::App).is_ok());
        assert!(ensure_supported(&SnapshotTarget::Page, TestMode::Generic).is_err());
        assert!(ensure_supported(&SnapshotTarget::Viewport, TestMode::Generic).is_err());
    }

    #[test]
    fn element_capture_needs_web_or_app() {
        let element = SnapshotTarget::Element {
            selector: "#login".into(),
        };
        assert!(ensure_supported(&element, TestMode::Web).is_ok());
        assert!(ensure_supported(&element, TestMode::App).is_ok());

        let err = ensure_supported(&element, TestMode::Generic).unwrap_err();
        assert!(matches!(err, CaptureError::Scenario(_)));
    }

    #[test]
    fn screen_targets_work_everywhere() {
        for mode in [TestMode::Web, TestMode::App, TestMode::Generic] {
            assert!(ensure_supported(&SnapshotTarget::Screen, mode).is_ok());
            assert!(ensure_supported(&SnapshotTarget::MainScreen, mode).is_ok());
        }
    }
}
