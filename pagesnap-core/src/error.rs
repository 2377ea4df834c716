//! Error taxonomy for the capture engine.
//!
//! Two layers: `SessionError` is what the live-browser collaborator can
//! report, `CaptureError` is what callers of the engine see. Transient
//! per-tile and per-protocol failures appear in neither; they are logged
//! and degraded locally, never surfaced.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CaptureError>;
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Failure reported by the browser session collaborator.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A remote command (screenshot, focus switch, dialog) failed.
    #[error("browser command failed: {0}")]
    Command(String),

    /// In-page script evaluation failed or returned an unusable value.
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// No window with the given handle exists.
    #[error("unknown window handle: {0}")]
    UnknownWindow(String),
}

/// Caller-visible capture failure.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Contract violation: unsupported target/mode combination or an
    /// element that cannot be measured. Fatal, never retried.
    #[error("unsupported capture scenario: {0}")]
    Scenario(String),

    /// A collaborator failure that escaped the degrade layer (strategy
    /// selection time only).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// PNG encode/decode failure at an export boundary.
    #[error("image processing failed: {0}")]
    Image(String),

    /// The file sink rejected the artifact.
    #[error("export failed: {0}")]
    Export(#[from] std::io::Error),
}
