//! Full-page screenshot capture and tile-stitching engine.
//!
//! Composes full-document screenshots out of a live browser session: a
//! one-shot protocol layer (vendor full-page command, viewport-override
//! capture) with a scroll-and-stitch fallback, multi-window enumeration
//! with guaranteed focus restoration, element-region extraction with
//! device-pixel-ratio correction, and a closed set of export
//! representations.
//!
//! The engine talks to the browser exclusively through the
//! [`session::BrowserSession`] trait; [`browser`] provides the CDP-backed
//! implementation. Strategy selection lives in [`capture::Snapshotter`].

pub mod browser;
pub mod capture;
pub mod config;
pub mod error;
pub mod export;
pub mod image_ops;
pub mod session;

pub use capture::{CaptureMetadata, NamedCapture, SnapshotTarget, Snapshotter};
pub use config::{CaptureConfig, TestMode};
pub use error::{CaptureError, Result, SessionError};
pub use export::{CaptureRecord, ExportKind, Exported};
pub use session::{BrowserSession, Dimension, Rect};
