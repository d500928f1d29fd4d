//! Overlay rendering: decoded detections onto a presentation surface
//!
//! The pipeline never owns layout, styling, or input handling; it only
//! pushes cleared-and-redrawn boxes to whatever surface the host supplies.

use crate::error::Result;
use crate::types::{DetectionSet, PixelBoundingBox};

/// Presentation surface the host renders the camera view on
///
/// `clear` removes the previous cycle's overlay; `draw_box` paints one
/// labeled box in the surface's own pixel space.
pub trait OverlaySurface: Send + 'static {
    /// Current surface size in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Remove all overlay drawings from the previous cycle
    fn clear(&mut self) -> Result<()>;

    /// Draw one labeled bounding box
    fn draw_box(&mut self, rect: PixelBoundingBox, label: &str, confidence: f32) -> Result<()>;
}

/// Draws a [`DetectionSet`] aligned to the current video frame
pub struct OverlayRenderer;

impl OverlayRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render one frame's detections
    ///
    /// Always clears the previous overlay first so stale boxes never
    /// accumulate, then maps each normalized box into the surface's pixel
    /// space. A failure here loses at most one overlay frame; the caller
    /// logs it and continues.
    pub fn render<V: OverlaySurface>(&self, detections: &DetectionSet, surface: &mut V) -> Result<()> {
        surface.clear()?;

        let (width, height) = surface.dimensions();
        for detection in detections.iter() {
            let rect = detection.bbox.to_pixels(width, height);
            surface.draw_box(rect, detection.class.name(), detection.confidence)?;
        }

        Ok(())
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectionError;
    use crate::types::{BoundingBox, Detection, SpeciesClass};

    #[derive(Default)]
    struct RecordingSurface {
        clears: usize,
        draws: Vec<(PixelBoundingBox, String, f32)>,
        fail_draw: bool,
    }

    impl OverlaySurface for RecordingSurface {
        fn dimensions(&self) -> (u32, u32) {
            (640, 480)
        }

        fn clear(&mut self) -> Result<()> {
            self.clears += 1;
            self.draws.clear();
            Ok(())
        }

        fn draw_box(&mut self, rect: PixelBoundingBox, label: &str, confidence: f32) -> Result<()> {
            if self.fail_draw {
                return Err(DetectionError::render("surface detached"));
            }
            self.draws.push((rect, label.to_string(), confidence));
            Ok(())
        }
    }

    fn lion_set() -> DetectionSet {
        DetectionSet::new(vec![Detection::new(
            SpeciesClass::Lion,
            0.9,
            BoundingBox::new(0.4, 0.4, 0.2, 0.2),
        )])
    }

    #[test]
    fn test_render_clears_then_draws_in_pixel_space() {
        let mut surface = RecordingSurface::default();
        OverlayRenderer::new().render(&lion_set(), &mut surface).unwrap();

        assert_eq!(surface.clears, 1);
        assert_eq!(surface.draws.len(), 1);

        let (rect, label, confidence) = &surface.draws[0];
        assert_eq!(*rect, PixelBoundingBox::new(256, 192, 128, 96));
        assert_eq!(label, "Lion");
        assert!((confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_empty_set_still_clears_previous_overlay() {
        let mut surface = RecordingSurface::default();
        let renderer = OverlayRenderer::new();

        renderer.render(&lion_set(), &mut surface).unwrap();
        renderer.render(&DetectionSet::new(Vec::new()), &mut surface).unwrap();

        assert_eq!(surface.clears, 2);
        assert!(surface.draws.is_empty());
    }

    #[test]
    fn test_draw_failure_propagates_as_render_error() {
        let mut surface = RecordingSurface {
            fail_draw: true,
            ..Default::default()
        };

        assert!(OverlayRenderer::new().render(&lion_set(), &mut surface).is_err());
    }
}
