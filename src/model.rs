//! Model artifact loading and lifecycle
//!
//! The loader performs a one-time asynchronous acquisition of the model
//! artifact and turns it into a ready-to-run [`ModelHandle`]. Loading is
//! single-flight: concurrent `load()` calls for the same session await the
//! same pending acquisition instead of starting a second fetch.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::Mutex;

use crate::error::{DetectionError, Result};
use crate::types::TensorShape;

/// Storage capability the model artifact is fetched from
///
/// Format and location of the artifact are outside core scope; the fetch may
/// block (disk, asset bundle, platform storage) and is moved off the async
/// executor by the loader.
pub trait ArtifactStore: Send + Sync + 'static {
    fn fetch_artifact(&self, identifier: &str) -> Result<Vec<u8>>;
}

/// Lifecycle state of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ModelState {
    Unloaded = 0,
    Loading = 1,
    Ready = 2,
    Failed = 3,
}

/// A loaded, ready-to-run detection model
///
/// Opaque to everything except the inference engine consuming it. The native
/// runtime resources (here: the artifact bytes the runtime executes) live
/// exactly as long as the handle.
pub struct ModelHandle {
    input_shape: TensorShape,
    artifact: Vec<u8>,
}

impl ModelHandle {
    /// Spatial input shape the model expects
    pub fn input_shape(&self) -> TensorShape {
        self.input_shape
    }

    /// Serialized model parameters for the inference runtime
    pub fn artifact(&self) -> &[u8] {
        &self.artifact
    }
}

impl Drop for ModelHandle {
    fn drop(&mut self) {
        log::debug!("released model handle ({} artifact bytes)", self.artifact.len());
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("input_shape", &self.input_shape)
            .field("artifact_bytes", &self.artifact.len())
            .finish()
    }
}

/// One-shot model loader with idempotent-loading semantics
pub struct ModelLoader<A: ArtifactStore> {
    store: Arc<A>,
    artifact_id: String,
    input_shape: TensorShape,
    slot: Mutex<Option<Arc<ModelHandle>>>,
    state: AtomicU8,
    last_error: StdMutex<Option<String>>,
}

impl<A: ArtifactStore> ModelLoader<A> {
    pub fn new(store: A, artifact_id: impl Into<String>, input_shape: TensorShape) -> Self {
        Self {
            store: Arc::new(store),
            artifact_id: artifact_id.into(),
            input_shape,
            slot: Mutex::new(None),
            state: AtomicU8::new(ModelState::Unloaded as u8),
            last_error: StdMutex::new(None),
        }
    }

    /// Acquire the model, fetching the artifact on first call
    ///
    /// Repeated calls while a load is in flight await the same pending
    /// result; once loaded, the cached handle is returned without touching
    /// the store again. A failed load records the error and leaves the
    /// loader retryable.
    pub async fn load(&self) -> Result<Arc<ModelHandle>> {
        // Holding the slot lock across the fetch is what makes loading
        // single-flight: late callers queue on the lock and observe the
        // handle the first caller produced.
        let mut slot = self.slot.lock().await;
        if let Some(handle) = slot.as_ref() {
            return Ok(handle.clone());
        }

        self.set_state(ModelState::Loading);
        log::info!("loading model artifact '{}'", self.artifact_id);

        let store = self.store.clone();
        let id = self.artifact_id.clone();
        let fetched = tokio::task::spawn_blocking(move || store.fetch_artifact(&id))
            .await
            .map_err(|e| self.fail(format!("artifact fetch task failed: {e}")))?;

        let artifact = match fetched {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(format!("artifact '{}': {e}", self.artifact_id))),
        };
        if artifact.is_empty() {
            return Err(self.fail(format!("artifact '{}' is empty", self.artifact_id)));
        }

        log::info!(
            "model artifact '{}' loaded ({} bytes, input {}x{})",
            self.artifact_id,
            artifact.len(),
            self.input_shape.width,
            self.input_shape.height
        );

        let handle = Arc::new(ModelHandle {
            input_shape: self.input_shape,
            artifact,
        });
        *slot = Some(handle.clone());
        self.set_state(ModelState::Ready);
        Ok(handle)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ModelState {
        match self.state.load(Ordering::SeqCst) {
            0 => ModelState::Unloaded,
            1 => ModelState::Loading,
            2 => ModelState::Ready,
            _ => ModelState::Failed,
        }
    }

    /// Error message captured by the most recent failed load, if any
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|e| e.clone())
    }

    fn set_state(&self, state: ModelState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn fail(&self, msg: String) -> DetectionError {
        log::error!("model load failed: {msg}");
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(msg.clone());
        }
        self.set_state(ModelState::Failed);
        DetectionError::ModelLoad(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct StubStore {
        artifact: Result<Vec<u8>>,
        fetches: AtomicUsize,
        delay: Duration,
    }

    impl StubStore {
        fn ready(bytes: Vec<u8>) -> Self {
            Self {
                artifact: Ok(bytes),
                fetches: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                artifact: Err(DetectionError::model_load(msg)),
                fetches: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    impl ArtifactStore for StubStore {
        fn fetch_artifact(&self, _identifier: &str) -> Result<Vec<u8>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            match &self.artifact {
                Ok(bytes) => Ok(bytes.clone()),
                Err(_) => Err(DetectionError::model_load("artifact missing")),
            }
        }
    }

    #[tokio::test]
    async fn test_load_reaches_ready() {
        let loader = ModelLoader::new(
            StubStore::ready(vec![1, 2, 3]),
            "test-model",
            TensorShape::new(32, 32),
        );
        assert_eq!(loader.state(), ModelState::Unloaded);

        let handle = loader.load().await.unwrap();
        assert_eq!(loader.state(), ModelState::Ready);
        assert_eq!(handle.input_shape(), TensorShape::new(32, 32));
        assert_eq!(handle.artifact(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_repeated_load_reuses_handle() {
        let loader = ModelLoader::new(
            StubStore::ready(vec![7; 16]),
            "test-model",
            TensorShape::new(32, 32),
        );

        let first = loader.load().await.unwrap();
        let second = loader.load().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_loads_are_single_flight() {
        let mut store = StubStore::ready(vec![9; 64]);
        store.delay = Duration::from_millis(50);
        let loader = Arc::new(ModelLoader::new(store, "test-model", TensorShape::new(32, 32)));

        let a = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load().await }
        });
        let b = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load().await }
        });

        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loader.store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_captures_error() {
        let loader = ModelLoader::new(
            StubStore::failing("artifact missing"),
            "missing-model",
            TensorShape::new(32, 32),
        );

        let err = loader.load().await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(loader.state(), ModelState::Failed);
        assert!(loader.last_error().unwrap().contains("artifact missing"));
    }

    #[tokio::test]
    async fn test_empty_artifact_is_load_failure() {
        let loader = ModelLoader::new(
            StubStore::ready(Vec::new()),
            "empty-model",
            TensorShape::new(32, 32),
        );

        assert!(loader.load().await.is_err());
        assert_eq!(loader.state(), ModelState::Failed);
    }
}
