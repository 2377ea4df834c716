//! One-shot page capture binary.
//!
//! Launches (or attaches to) a Chrome/Chromium instance, navigates to a
//! URL, runs one capture through the engine, and writes the results.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pagesnap_core::browser::{CdpBrowser, CdpBrowserConfig, CdpSession};
use pagesnap_core::{
    CaptureConfig, ExportKind, Exported, SnapshotTarget, Snapshotter, TestMode,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "pagesnap", about = "Full-page browser screenshot capture")]
struct Cli {
    /// URL to capture
    #[clap(long)]
    url: String,

    /// What to capture
    #[clap(long, value_enum, default_value = "page")]
    target: Target,

    /// CSS selector of the element to capture (with --target element)
    #[clap(long)]
    selector: Option<String>,

    /// Capture every open window, not just the active one
    #[clap(long)]
    all_windows: bool,

    /// Wait after each scroll before capturing, in milliseconds
    #[clap(long, default_value = "0")]
    settle_delay_ms: u64,

    /// Fixed-header height to crop from non-initial tiles, in device
    /// pixels (auto-detected when omitted)
    #[clap(long)]
    header_crop: Option<u32>,

    /// Fixed-footer height to crop from non-final tiles, in device pixels
    /// (auto-detected when omitted)
    #[clap(long)]
    footer_crop: Option<u32>,

    /// Output representation
    #[clap(long, value_enum, default_value = "file")]
    export: Output,

    /// Directory for file exports
    #[clap(long, default_value = ".")]
    out: PathBuf,

    /// Custom Chrome/Chromium binary path
    #[clap(long)]
    browser_path: Option<String>,

    /// Connect to an already-running browser via CDP URL
    #[clap(long)]
    cdp_url: Option<String>,

    /// Run the browser headless
    #[clap(long, default_value = "true")]
    headless: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Target {
    Page,
    Viewport,
    Screen,
    MainScreen,
    Element,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Output {
    File,
    Base64,
    Record,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let target = match cli.target {
        Target::Page => SnapshotTarget::Page,
        Target::Viewport => SnapshotTarget::Viewport,
        Target::Screen => SnapshotTarget::Screen,
        Target::MainScreen => SnapshotTarget::MainScreen,
        Target::Element => SnapshotTarget::Element {
            selector: cli
                .selector
                .clone()
                .context("--selector is required with --target element")?,
        },
    };
    let export_kind = match cli.export {
        Output::File => ExportKind::File {
            dir: cli.out.clone(),
        },
        Output::Base64 => ExportKind::Base64,
        Output::Record => ExportKind::Record,
    };

    let browser = Arc::new(
        CdpBrowser::connect_or_launch(&CdpBrowserConfig {
            browser_path: cli.browser_path.clone(),
            cdp_url: cli.cdp_url.clone(),
            headless: cli.headless,
            ..Default::default()
        })
        .await?,
    );
    let session = CdpSession::bind(browser).await?;
    session.navigate(&cli.url).await?;

    let snapshotter = Snapshotter::new(
        Arc::new(session),
        CaptureConfig {
            header_crop: cli.header_crop,
            footer_crop: cli.footer_crop,
            test_mode: TestMode::Web,
        },
    );

    tracing::info!(url = %cli.url, target = ?cli.target, "capturing");

    let exported = snapshotter
        .capture(
            target,
            export_kind,
            cli.all_windows,
            Duration::from_millis(cli.settle_delay_ms),
        )
        .await?;

    if exported.is_empty() {
        tracing::warn!("capture produced no images");
    }
    for item in exported {
        match item {
            Exported::File(path) => println!("{}", path.display()),
            Exported::Base64(data) => println!("{data}"),
            Exported::Record(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            Exported::Image(image) => tracing::info!(
                width = image.width(),
                height = image.height(),
                "captured image"
            ),
        }
    }

    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
