//! CDP-backed implementation of the browser session seam.
//!
//! `CdpBrowser` owns the Chrome/Chromium process (launched or attached via
//! a CDP URL); `CdpSession` binds the capture engine to one page target and
//! implements [`BrowserSession`] with scripted geometry reads, CDP
//! screenshots, and target switching.

use crate::error::{SessionError, SessionResult};
use crate::session::{BrowserSession, Dimension, Rect};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    ClearDeviceMetricsOverrideParams, SetDeviceMetricsOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, HandleJavaScriptDialogParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Configuration for the browser process.
#[derive(Debug, Clone)]
pub struct CdpBrowserConfig {
    /// Custom Chrome/Chromium binary path.
    pub browser_path: Option<String>,
    /// Connect to an already-running browser via CDP URL instead of
    /// launching one.
    pub cdp_url: Option<String>,
    /// Run headless (default: true).
    pub headless: bool,
    /// Browser window size.
    pub window_size: (u32, u32),
}

impl Default for CdpBrowserConfig {
    fn default() -> Self {
        Self {
            browser_path: None,
            cdp_url: None,
            headless: true,
            window_size: (1280, 720),
        }
    }
}

/// Owns one browser instance for the lifetime of a capture run.
pub struct CdpBrowser {
    browser: Browser,
}

impl CdpBrowser {
    /// Attach to a running browser when a CDP URL is configured, launch a
    /// fresh one otherwise.
    pub async fn connect_or_launch(config: &CdpBrowserConfig) -> Result<Self> {
        let browser = if let Some(ref cdp_url) = config.cdp_url {
            let (browser, mut handler) = Browser::connect(cdp_url)
                .await
                .with_context(|| format!("Failed to connect to browser at {}", cdp_url))?;

            tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            browser
        } else {
            let mut builder = BrowserConfig::builder();

            if let Some(ref path) = config.browser_path {
                builder = builder.chrome_executable(path);
            }
            if !config.headless {
                builder = builder.with_head();
            }
            builder = builder
                .window_size(config.window_size.0, config.window_size.1)
                .arg("--disable-dev-shm-usage")
                .arg("--remote-allow-origins=*")
                .arg("--hide-scrollbars");

            let config = builder.build().map_err(|e| anyhow::anyhow!("{}", e))?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .context("Failed to launch browser")?;

            tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            browser
        };

        Ok(Self { browser })
    }

}

const FIXED_CHROME_JS: &str = r#"JSON.stringify((() => {
    let top = 0, bottom = 0;
    const vh = window.innerHeight;
    for (const el of document.querySelectorAll('body *')) {
        const style = window.getComputedStyle(el);
        if (style.position !== 'fixed' && style.position !== 'sticky') continue;
        const r = el.getBoundingClientRect();
        if (r.height <= 0 || r.height > vh / 2) continue;
        if (r.top <= 0) top = Math.max(top, r.bottom);
        else if (r.bottom >= vh) bottom = Math.max(bottom, vh - r.top);
    }
    return { top: Math.round(top), bottom: Math.round(bottom) };
})())"#;

const MODAL_PROBE_JS: &str = concat!(
    "!!document.querySelector('dialog[open], [role=\"dialog\"][aria-modal=\"true\"], ",
    "[aria-modal=\"true\"], .modal.show')"
);

const CONTENT_DIMENSION_JS: &str = r#"JSON.stringify({
    width: Math.max(document.documentElement.scrollWidth,
                    document.body ? document.body.scrollWidth : 0),
    height: Math.max(document.documentElement.scrollHeight,
                     document.body ? document.body.scrollHeight : 0)
})"#;

const VIEWPORT_DIMENSION_JS: &str = r#"JSON.stringify({
    width: document.documentElement.clientWidth,
    height: document.documentElement.clientHeight
})"#;

/// One live CDP page target, viewed through the capture engine's seam.
pub struct CdpSession {
    browser: Arc<CdpBrowser>,
    page: RwLock<Page>,
}

impl CdpSession {
    /// Bind a capture session to the browser's first page, creating a
    /// blank one when none exists yet.
    pub async fn bind(browser: Arc<CdpBrowser>) -> Result<Self> {
        let pages = browser
            .browser
            .pages()
            .await
            .context("Failed to list pages")?;
        let page = match pages.into_iter().next() {
            Some(page) => page,
            None => browser
                .browser
                .new_page("about:blank")
                .await
                .context("Failed to create new page")?,
        };
        Ok(Self {
            browser,
            page: RwLock::new(page),
        })
    }

    /// Navigate the bound page and wait for the load to settle.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page().await;
        page.goto(url)
            .await
            .with_context(|| format!("Navigation to {} failed", url))?;
        let _ = page.wait_for_navigation().await;
        Ok(())
    }

    async fn page(&self) -> Page {
        self.page.read().await.clone()
    }

    /// Evaluate an expression and discard its value.
    async fn eval_unit(&self, expression: String) -> SessionResult<()> {
        self.page()
            .await
            .evaluate_expression(expression)
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Script(e.to_string()))
    }

    /// Evaluate an expression producing a primitive value.
    async fn eval_value<T: serde::de::DeserializeOwned>(
        &self,
        expression: &str,
    ) -> SessionResult<T> {
        self.page()
            .await
            .evaluate_expression(expression)
            .await
            .map_err(|e| SessionError::Script(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| SessionError::Script(e.to_string()))
    }

    /// Evaluate an expression that JSON.stringify's its result, parsing
    /// the payload back into a value. Objects do not cross the CDP
    /// boundary by value, strings do.
    async fn eval_json(&self, expression: &str) -> SessionResult<serde_json::Value> {
        let payload: String = self.eval_value(expression).await?;
        serde_json::from_str(&payload).map_err(|e| SessionError::Script(e.to_string()))
    }

    async fn scaled_dimension(&self, expression: &str) -> SessionResult<Dimension> {
        let dpr = self.device_pixel_ratio().await?;
        let value = self.eval_json(expression).await?;
        let width = value["width"].as_f64().unwrap_or(0.0);
        let height = value["height"].as_f64().unwrap_or(0.0);
        Ok(Dimension::new(
            (width * dpr).round() as u32,
            (height * dpr).round() as u32,
        ))
    }

    async fn png_base64(&self, params: CaptureScreenshotParams) -> SessionResult<String> {
        let bytes = self
            .page()
            .await
            .screenshot(params)
            .await
            .map_err(|e| SessionError::Command(e.to_string()))?;
        Ok(BASE64.encode(&bytes))
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn scroll_to(&self, x: f64, y: f64) -> SessionResult<()> {
        self.eval_unit(format!("window.scrollTo({x}, {y})")).await
    }

    async fn scroll_to_top(&self) -> SessionResult<()> {
        self.eval_unit("window.scrollTo(0, 0)".to_string()).await
    }

    async fn content_dimension(&self) -> SessionResult<Dimension> {
        self.scaled_dimension(CONTENT_DIMENSION_JS).await
    }

    async fn viewport_dimension(&self) -> SessionResult<Dimension> {
        self.scaled_dimension(VIEWPORT_DIMENSION_JS).await
    }

    async fn device_pixel_ratio(&self) -> SessionResult<f64> {
        self.eval_value("window.devicePixelRatio").await
    }

    async fn is_modal_displayed(&self) -> SessionResult<bool> {
        self.eval_value(MODAL_PROBE_JS).await
    }

    async fn take_screenshot(&self) -> SessionResult<String> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.png_base64(params).await
    }

    async fn full_page_screenshot(&self) -> SessionResult<Option<String>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .capture_beyond_viewport(true)
            .build();
        self.png_base64(params).await.map(Some)
    }

    async fn screenshot_with_viewport_override(
        &self,
        width: u32,
        height: u32,
    ) -> SessionResult<Option<String>> {
        let page = self.page().await;
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(width))
            .height(i64::from(height))
            .device_scale_factor(0.0)
            .mobile(false)
            .build()
            .map_err(SessionError::Command)?;
        page.execute(params)
            .await
            .map_err(|e| SessionError::Command(e.to_string()))?;

        let shot = self
            .png_base64(
                CaptureScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await;

        // The override must come off even when the capture failed.
        let _ = page.execute(ClearDeviceMetricsOverrideParams::default()).await;

        shot.map(Some)
    }

    async fn dismiss_dialog(&self) -> SessionResult<()> {
        self.page()
            .await
            .execute(HandleJavaScriptDialogParams::new(true))
            .await
            .map(|_| ())
            .map_err(|e| SessionError::Command(e.to_string()))
    }

    async fn detect_fixed_chrome(&self) -> SessionResult<(u32, u32)> {
        let dpr = self.device_pixel_ratio().await?;
        let value = self.eval_json(FIXED_CHROME_JS).await?;
        let top = value["top"].as_f64().unwrap_or(0.0).max(0.0);
        let bottom = value["bottom"].as_f64().unwrap_or(0.0).max(0.0);
        Ok(((top * dpr).round() as u32, (bottom * dpr).round() as u32))
    }

    async fn element_rect(&self, selector: &str) -> SessionResult<Rect> {
        let quoted = serde_json::to_string(selector)
            .map_err(|e| SessionError::Script(e.to_string()))?;
        let script = format!(
            r#"JSON.stringify((() => {{
                const el = document.querySelector({quoted});
                if (!el) return null;
                const r = el.getBoundingClientRect();
                return {{
                    x: r.left + window.scrollX,
                    y: r.top + window.scrollY,
                    width: r.width,
                    height: r.height
                }};
            }})())"#
        );
        let value = self.eval_json(&script).await?;
        if value.is_null() {
            return Err(SessionError::Command(format!(
                "no element matches '{selector}'"
            )));
        }
        Ok(Rect {
            x: value["x"].as_f64().unwrap_or(0.0),
            y: value["y"].as_f64().unwrap_or(0.0),
            width: value["width"].as_f64().unwrap_or(0.0),
            height: value["height"].as_f64().unwrap_or(0.0),
        })
    }

    async fn window_handles(&self) -> SessionResult<Vec<String>> {
        let pages = self
            .browser
            .browser
            .pages()
            .await
            .map_err(|e| SessionError::Command(e.to_string()))?;
        Ok(pages
            .iter()
            .map(|page| page.target_id().inner().clone())
            .collect())
    }

    async fn active_window(&self) -> SessionResult<String> {
        Ok(self.page.read().await.target_id().inner().clone())
    }

    async fn switch_to_window(&self, handle: &str) -> SessionResult<()> {
        let pages = self
            .browser
            .browser
            .pages()
            .await
            .map_err(|e| SessionError::Command(e.to_string()))?;
        let page = pages
            .into_iter()
            .find(|page| page.target_id().inner() == handle)
            .ok_or_else(|| SessionError::UnknownWindow(handle.to_string()))?;
        page.bring_to_front()
            .await
            .map_err(|e| SessionError::Command(e.to_string()))?;
        *self.page.write().await = page;
        Ok(())
    }

    async fn url(&self) -> SessionResult<String> {
        self.page()
            .await
            .url()
            .await
            .map_err(|e| SessionError::Command(e.to_string()))
            .map(Option::unwrap_or_default)
    }

    async fn title(&self) -> SessionResult<String> {
        self.page()
            .await
            .get_title()
            .await
            .map_err(|e| SessionError::Command(e.to_string()))
            .map(Option::unwrap_or_default)
    }

    async fn page_source(&self) -> SessionResult<String> {
        self.page()
            .await
            .content()
            .await
            .map_err(|e| SessionError::Command(e.to_string()))
    }
}
