//! Type definitions for the wildlife detection pipeline
//!
//! Coordinate convention: `BoundingBox` is always normalized to `[0, 1]`
//! relative to the source frame, with the origin at the top-left corner and
//! `(x, y)` naming that corner. Pixel-space coordinates exist only at the
//! overlay boundary (`PixelBoundingBox`).

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::Result;

/// Wildlife classes recognized by the detection model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeciesClass {
    Buffalo,
    Cheetah,
    Elephant,
    Giraffe,
    Hippo,
    Leopard,
    Lion,
    Rhino,
    WildDog,
    Zebra,
}

impl SpeciesClass {
    /// Create from the numeric class ID emitted by the model
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::Buffalo),
            1 => Some(Self::Cheetah),
            2 => Some(Self::Elephant),
            3 => Some(Self::Giraffe),
            4 => Some(Self::Hippo),
            5 => Some(Self::Leopard),
            6 => Some(Self::Lion),
            7 => Some(Self::Rhino),
            8 => Some(Self::WildDog),
            9 => Some(Self::Zebra),
            _ => None,
        }
    }

    /// Get the numeric class ID
    pub fn id(&self) -> u32 {
        match self {
            Self::Buffalo => 0,
            Self::Cheetah => 1,
            Self::Elephant => 2,
            Self::Giraffe => 3,
            Self::Hippo => 4,
            Self::Leopard => 5,
            Self::Lion => 6,
            Self::Rhino => 7,
            Self::WildDog => 8,
            Self::Zebra => 9,
        }
    }

    /// Display name for overlay labels
    pub fn name(&self) -> &'static str {
        match self {
            Self::Buffalo => "Buffalo",
            Self::Cheetah => "Cheetah",
            Self::Elephant => "Elephant",
            Self::Giraffe => "Giraffe",
            Self::Hippo => "Hippo",
            Self::Leopard => "Leopard",
            Self::Lion => "Lion",
            Self::Rhino => "Rhino",
            Self::WildDog => "Wild Dog",
            Self::Zebra => "Zebra",
        }
    }

    /// Overlay color (RGB), deterministic per class
    pub fn color(&self) -> [u8; 3] {
        // Golden angle hue spacing for visually distinct class colors
        let hue = (self.id() * 137) % 360;
        let c = 0.9 * 0.7;
        let x = c * (1.0 - ((hue as f32 / 60.0) % 2.0 - 1.0).abs());
        let m = 0.9 - c;

        let (r, g, b) = match hue / 60 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        [
            ((r + m) * 255.0) as u8,
            ((g + m) * 255.0) as u8,
            ((b + m) * 255.0) as u8,
        ]
    }

    /// All recognized classes
    pub fn all() -> Vec<Self> {
        vec![
            Self::Buffalo,
            Self::Cheetah,
            Self::Elephant,
            Self::Giraffe,
            Self::Hippo,
            Self::Leopard,
            Self::Lion,
            Self::Rhino,
            Self::WildDog,
            Self::Zebra,
        ]
    }
}

/// Bounding box in frame-relative normalized coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X coordinate of top-left corner (normalized 0-1)
    pub x: f32,
    /// Y coordinate of top-left corner (normalized 0-1)
    pub y: f32,
    /// Width of bounding box (normalized 0-1)
    pub width: f32,
    /// Height of bounding box (normalized 0-1)
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get center point coordinates
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Get area of bounding box
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Convert to pixel coordinates given target surface dimensions
    pub fn to_pixels(&self, surface_width: u32, surface_height: u32) -> PixelBoundingBox {
        PixelBoundingBox {
            x: (self.x * surface_width as f32) as u32,
            y: (self.y * surface_height as f32) as u32,
            width: (self.width * surface_width as f32) as u32,
            height: (self.height * surface_height as f32) as u32,
        }
    }

    /// Check if two bounding boxes intersect
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let x_overlap = self.x < other.x + other.width && self.x + self.width > other.x;
        let y_overlap = self.y < other.y + other.height && self.y + self.height > other.y;
        x_overlap && y_overlap
    }

    /// Calculate intersection over union (IoU) with another bounding box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        if !self.intersects(other) {
            return 0.0;
        }

        let x_left = self.x.max(other.x);
        let y_top = self.y.max(other.y);
        let x_right = (self.x + self.width).min(other.x + other.width);
        let y_bottom = (self.y + self.height).min(other.y + other.height);

        let intersection_area = (x_right - x_left) * (y_bottom - y_top);
        let union_area = self.area() + other.area() - intersection_area;

        intersection_area / union_area
    }
}

/// Bounding box in pixel coordinates of a presentation surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Single detection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detected species
    pub class: SpeciesClass,
    /// Detection confidence score (0-1)
    pub confidence: f32,
    /// Bounding box (normalized, top-left origin)
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class: SpeciesClass, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class,
            confidence,
            bbox,
        }
    }
}

/// Detections decoded from one frame, ordered by descending confidence
///
/// Immutable once produced; ties in confidence keep the order the candidates
/// appeared in the raw output tensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    pub(crate) fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.detections
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

/// A single captured video frame (RGB8)
///
/// Borrowed by the detection loop for exactly one cycle and never retained
/// past it.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB8 pixel data, row-major, `width * height * 3` bytes
    pub data: Vec<u8>,
    /// Capture timestamp
    pub timestamp: Instant,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Instant::now(),
        }
    }

    /// Check that the pixel buffer matches the declared dimensions
    pub fn validate(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == (self.width as usize * self.height as usize * 3)
    }
}

/// Spatial input shape expected by the detection model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorShape {
    pub width: u32,
    pub height: u32,
}

impl TensorShape {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Detection pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Identifier passed to the artifact store when loading the model
    pub artifact_id: String,
    /// Spatial input shape the model expects
    pub input_shape: TensorShape,
    /// Minimum confidence for a candidate to survive decoding
    pub confidence_threshold: f32,
    /// IoU threshold for non-maximum suppression
    pub iou_threshold: f32,
    /// Maximum number of detections kept per frame
    pub max_detections: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_id: "wildlife-yolo".to_string(),
            input_shape: TensorShape::new(640, 640),
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
            max_detections: 100,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_species_roundtrip() {
        for class in SpeciesClass::all() {
            assert_eq!(SpeciesClass::from_id(class.id()), Some(class));
        }
        assert_eq!(SpeciesClass::from_id(42), None);
        assert_eq!(SpeciesClass::Lion.name(), "Lion");
    }

    #[test]
    fn test_bounding_box_iou() {
        let a = BoundingBox::new(0.0, 0.0, 0.5, 0.5);
        let b = BoundingBox::new(0.25, 0.25, 0.5, 0.5);

        // Intersection is 0.25 * 0.25, union is 2 * 0.25 - 0.0625
        let iou = a.iou(&b);
        assert!((iou - 0.0625 / 0.4375).abs() < 1e-6);

        let far = BoundingBox::new(0.8, 0.8, 0.1, 0.1);
        assert_eq!(a.iou(&far), 0.0);
        assert!(!a.intersects(&far));
    }

    #[test]
    fn test_to_pixels() {
        let bbox = BoundingBox::new(0.4, 0.4, 0.2, 0.2);
        let px = bbox.to_pixels(640, 480);
        assert_eq!(px, PixelBoundingBox::new(256, 192, 128, 96));
    }

    #[test]
    fn test_frame_validation() {
        let good = RawFrame::new(2, 2, vec![0; 12]);
        assert!(good.validate());

        let zero_dim = RawFrame::new(0, 480, Vec::new());
        assert!(!zero_dim.validate());

        let short_buffer = RawFrame::new(2, 2, vec![0; 5]);
        assert!(!short_buffer.validate());
    }

    #[test]
    fn test_config_from_json() {
        let config = PipelineConfig::from_json(
            r#"{
                "artifact_id": "savanna-v2",
                "input_shape": {"width": 320, "height": 320},
                "confidence_threshold": 0.6,
                "iou_threshold": 0.5,
                "max_detections": 25
            }"#,
        )
        .unwrap();
        assert_eq!(config.artifact_id, "savanna-v2");
        assert_eq!(config.input_shape, TensorShape::new(320, 320));
        assert_eq!(config.max_detections, 25);

        assert!(PipelineConfig::from_json("not json").is_err());
    }
}
