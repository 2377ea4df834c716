//! Engine configuration.

/// What kind of test the surrounding run is executing. Drives strategy
/// dispatch: page-level targets only make sense against a web or app
/// session, and app sessions cannot be scroll-stitched beyond one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestMode {
    #[default]
    Web,
    App,
    Generic,
}

/// Configuration for the capture engine.
#[derive(Debug, Clone, Default)]
pub struct CaptureConfig {
    /// Fixed-header height to crop from non-initial tiles, in device
    /// pixels. `None` asks the session to auto-detect.
    pub header_crop: Option<u32>,

    /// Fixed-footer height to crop from non-final tiles, in device pixels.
    /// `None` asks the session to auto-detect.
    pub footer_crop: Option<u32>,

    /// What kind of test this session belongs to.
    pub test_mode: TestMode,
}
