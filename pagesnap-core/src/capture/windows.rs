//! Window/tab enumeration with guaranteed focus restoration.

use crate::capture::NamedCapture;
use crate::error::Result;
use crate::session::BrowserSession;
use futures::future::BoxFuture;
use tracing::warn;

/// Capture every requested window, focusing each in turn.
///
/// With `all_windows`, every non-active handle is captured first, then
/// focus returns to the originally active handle and it is captured last.
/// The focus restore runs even when a per-window capture fails. A
/// `capture_one` call receives the handle it is capturing (focus has
/// already been switched) and may report "nothing captured" with
/// `Ok(None)`; such windows are skipped.
///
/// Returns `Ok(None)` when handle enumeration itself fails: the session
/// is too broken for window work and the caller degrades to a
/// desktop-level capture instead.
pub(crate) async fn capture_windows<'a, F>(
    session: &'a dyn BrowserSession,
    all_windows: bool,
    mut capture_one: F,
) -> Result<Option<Vec<NamedCapture>>>
where
    F: FnMut(String) -> BoxFuture<'a, Result<Option<NamedCapture>>>,
{
    let (active, handles) = match (session.active_window().await, session.window_handles().await) {
        (Ok(active), Ok(handles)) => (active, handles),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "window enumeration failed, degrading to desktop capture");
            return Ok(None);
        }
    };

    let mut captures = Vec::new();

    if all_windows {
        let mut failure = None;
        for handle in handles.iter().filter(|h| **h != active) {
            if let Err(e) = session.switch_to_window(handle).await {
                warn!(handle = %handle, error = %e, "could not focus window, skipping");
                continue;
            }
            match capture_one(handle.clone()).await {
                Ok(Some(capture)) => captures.push(capture),
                Ok(None) => warn!(handle = %handle, "window yielded no capture"),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        // Focus goes back to the original window no matter what happened
        // above.
        if let Err(e) = session.switch_to_window(&active).await {
            warn!(handle = %active, error = %e, "could not restore window focus");
        }
        if let Some(e) = failure {
            return Err(e);
        }
    }

    match capture_one(active.clone()).await? {
        Some(capture) => captures.push(capture),
        None => warn!(handle = %active, "active window yielded no capture"),
    }

    Ok(Some(captures))
}
