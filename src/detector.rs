//! Inference engine capability boundary
//!
//! The pipeline orchestrates neural-network execution but does not
//! reimplement it: the model runtime is supplied as an implementation of
//! [`InferenceEngine`]. Any timeout policy the runtime needs is its own
//! responsibility; the loop simply waits for the call to return.

use ndarray::Array2;

use crate::error::Result;
use crate::model::ModelHandle;
use crate::preprocessing::InputTensor;

/// Raw model output: one row per candidate detection
///
/// Row layout is `[cx, cy, w, h, confidence, class_id]` with box coordinates
/// normalized to `[0, 1]` and `(cx, cy)` the box center.
pub type RawOutput = Array2<f32>;

/// One forward pass of the detection model
///
/// The runtime instance behind a handle is not guaranteed reentrant, so the
/// engine must be invoked at most once concurrently per [`ModelHandle`].
/// The `&mut self` receiver together with the strictly sequential detection
/// loop enforces that.
pub trait InferenceEngine: Send + 'static {
    /// Execute a forward pass on one input tensor
    fn run(&mut self, model: &ModelHandle, input: &InputTensor) -> Result<RawOutput>;

    /// Engine name for logging
    fn name(&self) -> &str {
        "inference-engine"
    }
}
