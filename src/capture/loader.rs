//! Asynchronous decoding of the host-supplied screenshot

use anyhow::Context;

use super::image::SourceImage;
use crate::session::lifecycle::Liveness;

/// Decode encoded image bytes off the event loop
///
/// Resolves to `Ok(None)` when the session was torn down while decoding, so
/// the result is never written into a disposed scene.
pub async fn decode_source(bytes: Vec<u8>, liveness: Liveness) -> anyhow::Result<Option<SourceImage>> {
    let rgba = tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes).map(|decoded| decoded.to_rgba8())
    })
    .await
    .context("Source decode task failed")?
    .context("Failed to decode source image")?;

    if !liveness.is_alive() {
        log::debug!("Session closed during decode, dropping {}x{} image", rgba.width(), rgba.height());
        return Ok(None);
    }

    Ok(Some(SourceImage::new(rgba)))
}
