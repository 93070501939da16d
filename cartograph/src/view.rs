//! The camera state that drives tile scheduling and rendering.

use cartograph_types::cartesian::{NewCartesianPoint2d, Point2d, Rect, Size};

/// Camera state: where the map is centered, how zoomed in it is, and the
/// on-screen area it is rendered into.
///
/// `zoom` is a continuous level (fractional values are valid); `resolution`
/// (map units per pixel) is derived from it the same way a Web-Mercator
/// viewer derives it: `resolution = base_resolution / 2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    center: Point2d,
    zoom: f64,
    pitch: f64,
    rotation: f64,
    viewport: Size,
}

/// Resolution (map units per pixel) at zoom level 0, for the Web-Mercator
/// projection used by tile sources in this crate.
pub const BASE_RESOLUTION: f64 = 156_543.033_928_41;

impl Default for View {
    fn default() -> Self {
        Self {
            center: Point2d::new(0.0, 0.0),
            zoom: 0.0,
            pitch: 0.0,
            rotation: 0.0,
            viewport: Size::new(0.0, 0.0),
        }
    }
}

impl View {
    /// Creates a new view centered at `center`, at the given `zoom` level,
    /// for a viewport of `viewport` pixels.
    pub fn new(center: Point2d, zoom: f64, viewport: Size) -> Self {
        Self {
            center,
            zoom,
            pitch: 0.0,
            rotation: 0.0,
            viewport,
        }
    }

    /// Map-unit position the view is centered on.
    pub fn center(&self) -> Point2d {
        self.center
    }

    /// Continuous zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Camera tilt, in radians, `0.0` is a straight top-down view.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Camera rotation around its vertical axis, in radians.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Size in pixels of the area the view is rendered into.
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Map units per pixel at the view's current zoom level.
    pub fn resolution(&self) -> f64 {
        BASE_RESOLUTION / 2f64.powf(self.zoom)
    }

    /// Integer zoom level to rasterize the tile grid at, clamped to
    /// `[0, max_zoom]`.
    pub fn integer_zoom(&self, max_zoom: u32) -> u32 {
        (self.zoom.max(0.0).round() as u32).min(max_zoom)
    }

    /// The map-unit bounding box currently covered by the viewport.
    pub fn bbox(&self) -> Rect {
        let half_width = self.viewport.half_width() * self.resolution();
        let half_height = self.viewport.half_height() * self.resolution();
        Rect::new(
            self.center.x() - half_width,
            self.center.y() - half_height,
            self.center.x() + half_width,
            self.center.y() + half_height,
        )
    }

    /// Returns a copy of this view centered on `center` instead.
    pub fn with_center(&self, center: Point2d) -> Self {
        Self { center, ..*self }
    }

    /// Returns a copy of this view at the given zoom level.
    pub fn with_zoom(&self, zoom: f64) -> Self {
        Self { zoom, ..*self }
    }

    /// Returns a copy of this view with the given pitch.
    pub fn with_pitch(&self, pitch: f64) -> Self {
        Self { pitch, ..*self }
    }

    /// Returns a copy of this view with the given rotation.
    pub fn with_rotation(&self, rotation: f64) -> Self {
        Self { rotation, ..*self }
    }

    /// Returns a copy of this view with the given viewport size.
    pub fn with_viewport(&self, viewport: Size) -> Self {
        Self { viewport, ..*self }
    }

    /// Zooms around `base_point` (e.g. a cursor position, in map units) by
    /// the given multiplicative factor.
    pub fn zoom_around(&self, factor: f64, base_point: Point2d) -> Self {
        let delta_zoom = -factor.log2();
        let zoom = self.zoom + delta_zoom;
        let k = 1.0 - 2f64.powf(-delta_zoom);
        let center = Point2d::new(
            self.center.x() + (base_point.x() - self.center.x()) * k,
            self.center.y() + (base_point.y() - self.center.y()) * k,
        );
        Self {
            center,
            zoom,
            ..*self
        }
    }

    /// Linearly interpolates between `self` and `target`; `k` in `[0, 1]`.
    pub fn interpolate(&self, target: &View, k: f64) -> Self {
        Self {
            center: Point2d::new(
                self.center.x() + (target.center.x() - self.center.x()) * k,
                self.center.y() + (target.center.y() - self.center.y()) * k,
            ),
            zoom: self.zoom + (target.zoom - self.zoom) * k,
            pitch: self.pitch + (target.pitch - self.pitch) * k,
            rotation: self.rotation + (target.rotation - self.rotation) * k,
            viewport: target.viewport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_halves_per_zoom_level() {
        let view = View::new(Point2d::new(0.0, 0.0), 0.0, Size::new(512.0, 512.0));
        let zoomed = view.with_zoom(1.0);
        assert!((view.resolution() / zoomed.resolution() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn integer_zoom_is_clamped_to_max() {
        let view = View::new(Point2d::new(0.0, 0.0), 25.0, Size::new(512.0, 512.0));
        assert_eq!(view.integer_zoom(18), 18);
    }

    #[test]
    fn interpolate_at_zero_returns_start() {
        let a = View::new(Point2d::new(0.0, 0.0), 2.0, Size::new(100.0, 100.0));
        let b = View::new(Point2d::new(10.0, 10.0), 5.0, Size::new(100.0, 100.0));
        let mid = a.interpolate(&b, 0.0);
        assert_eq!(mid.center(), a.center());
        assert_eq!(mid.zoom(), a.zoom());
    }
}
