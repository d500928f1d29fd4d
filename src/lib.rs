//! Live Wildlife Detection Pipeline
//!
//! An on-device detection pipeline that drives a live camera view: load a
//! detection model once, then repeatedly capture a frame, convert it to the
//! model's input tensor, run a forward pass, decode the output into labeled
//! bounding boxes, and render them synchronized to the video.
//!
//! The camera, the model runtime, the artifact storage, and the drawing
//! surface are all capability traits supplied by the host
//! ([`FrameSource`], [`InferenceEngine`], [`ArtifactStore`],
//! [`OverlaySurface`]); this crate owns only the orchestration between them.
//!
//! ```no_run
//! # use wildlife_detection::*;
//! # fn demo<S, E, V, A>(store: A, camera: S, runtime: E, view: V)
//! # where S: FrameSource, E: InferenceEngine, V: OverlaySurface, A: ArtifactStore {
//! let controller = DetectionController::new(
//!     PipelineConfig::default(),
//!     store,
//!     camera,
//!     runtime,
//!     view,
//!     IntervalPacer::from_fps(30.0),
//! );
//! let handle = controller.start();
//! // ... later:
//! handle.stop();
//! # }
//! ```

pub mod detector;
pub mod error;
pub mod model;
pub mod overlay;
pub mod pipeline;
pub mod postprocessing;
pub mod preprocessing;
pub mod types;

pub use detector::{InferenceEngine, RawOutput};
pub use error::{DetectionError, Result};
pub use model::{ArtifactStore, ModelHandle, ModelLoader, ModelState};
pub use overlay::{OverlayRenderer, OverlaySurface};
pub use pipeline::{
    DetectionController, FramePacer, FrameSource, IntervalPacer, LoopHandle, SessionState,
};
pub use postprocessing::DetectionDecoder;
pub use preprocessing::{FramePreprocessor, InputTensor};
pub use types::{
    BoundingBox, Detection, DetectionSet, PipelineConfig, PixelBoundingBox, RawFrame,
    SpeciesClass, TensorShape,
};

/// Get library version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
