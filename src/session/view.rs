//! Display zoom and the one-time auto fit

use crate::domain::Size;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 2.0;

/// Margin kept free around the canvas when fitting it into the container
pub const FIT_MARGIN: f32 = 64.0;

/// Steps used by zoom in/out
pub const ZOOM_PRESETS: [f32; 7] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// Clamp a user-requested zoom into the supported range
pub fn clamp_zoom(zoom: f32) -> f32 {
    if zoom.is_nan() {
        return 1.0;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Largest zoom up to 100% at which `extent` fits inside `container`
pub fn fit_zoom(container: Size, extent: Size) -> f32 {
    if extent.is_empty() {
        return 1.0;
    }
    let available_width = container.width - FIT_MARGIN;
    let available_height = container.height - FIT_MARGIN;
    let zoom = (available_width / extent.width)
        .min(available_height / extent.height)
        .min(1.0);
    zoom.max(MIN_ZOOM)
}

/// Zoom state of the display surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewport {
    /// Display scale; `0.0` until the first fit has been computed
    zoom: f32,
    container: Option<Size>,
    auto_fit_done: bool,
}

impl Viewport {
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Zoom to draw with, treating the pending state as 100%
    pub fn effective_zoom(&self) -> f32 {
        if self.zoom == 0.0 { 1.0 } else { self.zoom }
    }

    pub fn container(&self) -> Option<Size> {
        self.container
    }

    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        self.zoom = clamp_zoom(zoom);
        self.zoom
    }

    /// Next preset above the current zoom
    pub fn zoom_in(&mut self) -> f32 {
        let current = self.effective_zoom();
        let next = ZOOM_PRESETS
            .iter()
            .copied()
            .find(|preset| *preset > current + f32::EPSILON)
            .unwrap_or(MAX_ZOOM);
        self.set_zoom(next)
    }

    /// Next preset below the current zoom
    pub fn zoom_out(&mut self) -> f32 {
        let current = self.effective_zoom();
        let next = ZOOM_PRESETS
            .iter()
            .rev()
            .copied()
            .find(|preset| *preset < current - f32::EPSILON)
            .unwrap_or(MIN_ZOOM);
        self.set_zoom(next)
    }

    /// Reapply the fit formula against the last known container size
    pub fn zoom_to_fit(&mut self, extent: Size) -> f32 {
        match self.container {
            Some(container) => {
                self.zoom = fit_zoom(container, extent);
                self.zoom
            }
            None => self.effective_zoom(),
        }
    }

    /// Record the host container size
    ///
    /// Returns `true` exactly once: the first time both the container and a
    /// non-empty canvas extent are known, at which point the fit zoom is
    /// applied.
    pub fn set_container(&mut self, container: Size, extent: Size) -> bool {
        self.container = Some(container);
        self.try_auto_fit(extent)
    }

    /// Attempt the one-time fit after the canvas extent changed
    pub fn try_auto_fit(&mut self, extent: Size) -> bool {
        if self.auto_fit_done || extent.is_empty() {
            return false;
        }
        let Some(container) = self.container else {
            return false;
        };
        self.zoom = fit_zoom(container, extent);
        self.auto_fit_done = true;
        log::debug!("Auto-fit zoom computed: {}", self.zoom);
        true
    }
}
