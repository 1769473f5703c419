// Classifier and loader traits — the swap-ready abstraction.
//
// The default implementation is a local ONNX model (see onnx.rs). Tests
// substitute fakes for both traits to exercise the detector's acquisition
// and failure paths deterministically.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::category::Category;

/// Runs multi-label classification over one text.
///
/// Implementations must be async: inference is either offloaded to a
/// blocking thread or performed by a remote service.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a single text, returning one confidence per category.
    ///
    /// Confidences are independent per-category probabilities in [0, 1];
    /// they do not sum to 1. Empty input is valid.
    async fn classify(&self, text: &str) -> Result<HashMap<Category, f64>>;
}

/// Performs the acquisition sequence and yields a ready classifier.
///
/// Invoked at most once per detector instance; the detector memoizes the
/// in-flight acquisition so concurrent first-time callers share it.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Classifier>>;
}
