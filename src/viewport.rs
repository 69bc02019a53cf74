//! Pan/zoom transform between screen (pointer) space and world (graph) space.
//!
//! Rendering and hit-testing both go through this type so the two always
//! agree on geometry.

use crate::geometry::{Point, Rectangle, Size, Vector};

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 3.0;

/// Largest pan offset accepted in either axis, in screen pixels
pub const PAN_LIMIT: f32 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    zoom: f32,
    /// Screen-space offset of the world origin
    pan: Vector,
    /// Size of the drawing surface, used for center-anchored zoom
    viewport_size: Size,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vector::ZERO,
            viewport_size: Size::new(0.0, 0.0),
        }
    }
}

impl ViewportTransform {
    pub fn new(viewport_size: Size) -> Self {
        Self {
            viewport_size,
            ..Default::default()
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> Vector {
        self.pan
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    /// Update the surface size (the host calls this every frame)
    pub fn set_viewport_size(&mut self, size: Size) {
        if size.width.is_finite() && size.height.is_finite() {
            self.viewport_size = size;
        }
    }

    /// `(point - pan) / zoom`
    pub fn screen_to_world(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.pan.x) / self.zoom,
            (point.y - self.pan.y) / self.zoom,
        )
    }

    /// `point * zoom + pan`
    pub fn world_to_screen(&self, point: Point) -> Point {
        Point::new(
            point.x * self.zoom + self.pan.x,
            point.y * self.zoom + self.pan.y,
        )
    }

    /// Convert a world-space rectangle to screen space
    pub fn world_rect_to_screen(&self, rect: &Rectangle) -> Rectangle {
        let top_left = self.world_to_screen(rect.origin());
        Rectangle::new(
            top_left.x,
            top_left.y,
            rect.width * self.zoom,
            rect.height * self.zoom,
        )
    }

    /// The part of the world currently on screen
    pub fn visible_world_rect(&self) -> Rectangle {
        let top_left = self.screen_to_world(Point::ZERO);
        Rectangle::new(
            top_left.x,
            top_left.y,
            self.viewport_size.width / self.zoom,
            self.viewport_size.height / self.zoom,
        )
    }

    /// Center of the drawing surface in screen space
    pub fn viewport_center(&self) -> Point {
        Point::new(self.viewport_size.width / 2.0, self.viewport_size.height / 2.0)
    }

    /// Multiply zoom by `factor` (clamped), keeping the world point under
    /// `anchor` fixed on screen. Without an anchor the viewport center is used.
    pub fn zoom_by(&mut self, factor: f32, anchor: Option<Point>) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let anchor = match anchor {
            Some(p) if p.is_finite() => p,
            Some(_) => return,
            None => self.viewport_center(),
        };

        let world_anchor = self.screen_to_world(anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        // Re-solve pan so world_anchor maps back onto anchor
        self.set_pan(Vector::new(
            anchor.x - world_anchor.x * self.zoom,
            anchor.y - world_anchor.y * self.zoom,
        ));
    }

    /// Set zoom directly around the viewport center
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom_by(zoom / self.zoom, None);
        }
    }

    /// Shift the view by a screen-space delta
    pub fn pan_by(&mut self, delta: Vector) {
        if delta.is_finite() {
            self.set_pan(self.pan + delta);
        }
    }

    pub fn set_pan(&mut self, pan: Vector) {
        if pan.is_finite() {
            self.pan = Vector::new(
                pan.x.clamp(-PAN_LIMIT, PAN_LIMIT),
                pan.y.clamp(-PAN_LIMIT, PAN_LIMIT),
            );
        }
    }

    /// Back to zoom 1.0 with the world origin at the top-left corner
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = Vector::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn test_identity_transform() {
        let viewport = ViewportTransform::new(Size::new(800.0, 600.0));
        let p = Point::new(12.0, 34.0);

        assert_eq!(viewport.screen_to_world(p), p);
        assert_eq!(viewport.world_to_screen(p), p);
    }

    #[test]
    fn test_transform_formulas() {
        let mut viewport = ViewportTransform::new(Size::new(800.0, 600.0));
        viewport.set_pan(Vector::new(100.0, 50.0));
        viewport.zoom = 2.0;

        assert_eq!(
            viewport.world_to_screen(Point::new(10.0, 10.0)),
            Point::new(120.0, 70.0)
        );
        assert_eq!(
            viewport.screen_to_world(Point::new(120.0, 70.0)),
            Point::new(10.0, 10.0)
        );
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut viewport = ViewportTransform::new(Size::new(800.0, 600.0));
        viewport.pan_by(Vector::new(-40.0, 25.0));
        let anchor = Point::new(300.0, 200.0);
        let world_before = viewport.screen_to_world(anchor);

        viewport.zoom_by(1.5, Some(anchor));

        assert!((viewport.zoom() - 1.5).abs() < 1e-6);
        assert_close(viewport.world_to_screen(world_before), anchor);
    }

    #[test]
    fn test_zoom_without_anchor_uses_center() {
        let mut viewport = ViewportTransform::new(Size::new(800.0, 600.0));
        let center_world = viewport.screen_to_world(Point::new(400.0, 300.0));

        viewport.zoom_by(0.5, None);

        assert_close(viewport.world_to_screen(center_world), Point::new(400.0, 300.0));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut viewport = ViewportTransform::new(Size::new(800.0, 600.0));

        for _ in 0..50 {
            viewport.zoom_by(2.0, None);
        }
        assert_eq!(viewport.zoom(), MAX_ZOOM);

        for _ in 0..50 {
            viewport.zoom_by(0.5, Some(Point::new(10.0, 10.0)));
        }
        assert_eq!(viewport.zoom(), MIN_ZOOM);
    }

    #[test]
    fn test_invalid_requests_are_ignored() {
        let mut viewport = ViewportTransform::new(Size::new(800.0, 600.0));
        let before = viewport;

        viewport.zoom_by(f32::NAN, None);
        viewport.zoom_by(0.0, None);
        viewport.zoom_by(-2.0, None);
        viewport.pan_by(Vector::new(f32::INFINITY, 0.0));

        assert_eq!(viewport, before);
    }

    #[test]
    fn test_pan_is_clamped() {
        let mut viewport = ViewportTransform::default();
        viewport.pan_by(Vector::new(5.0e6, -5.0e6));

        assert_eq!(viewport.pan(), Vector::new(PAN_LIMIT, -PAN_LIMIT));
    }

    #[test]
    fn test_visible_world_rect() {
        let mut viewport = ViewportTransform::new(Size::new(800.0, 600.0));
        viewport.set_pan(Vector::new(-100.0, -100.0));
        viewport.zoom = 2.0;

        let visible = viewport.visible_world_rect();
        assert_eq!(visible, Rectangle::new(50.0, 50.0, 400.0, 300.0));
    }
}
