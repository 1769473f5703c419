// Local ONNX inference adapter using the unbiased-toxic-roberta model.
//
// Runs entirely on the local CPU — no API calls, no per-message network
// dependency. The model outputs 7 toxicity categories as raw logits;
// sigmoid converts each to an independent 0-1 probability (multi-label,
// not multi-class).

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::download;
use super::traits::{Classifier, ModelLoader};
use crate::category::Category;
use crate::config::DetectorConfig;

/// The model's own match floor, passed at handle construction. A category
/// is considered a confident match when its probability reaches this floor.
/// Independent of the per-category filter thresholds in ThresholdTable.
pub const MATCH_CONFIDENCE_FLOOR: f64 = 0.9;

/// Labels in the order the model returns them.
const LABEL_ORDER: [Category; 7] = [
    Category::Toxicity,
    Category::SevereToxicity,
    Category::Obscene,
    Category::IdentityAttack,
    Category::Insult,
    Category::Threat,
    Category::SexualExplicit,
];

/// Local ONNX-based classifier. Holds the session behind Arc<Mutex> so
/// inference can be offloaded to spawn_blocking without blocking the
/// async runtime.
pub struct OnnxClassifier {
    // Arc+Mutex because:
    // 1. ort::Session::run takes &mut self, so we need interior mutability
    // 2. spawn_blocking requires 'static, so we need Arc for shared ownership
    // 3. We need Send+Sync for the Classifier trait
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    match_floor: f64,
}

impl OnnxClassifier {
    /// Load the ONNX model and tokenizer from the given directory.
    ///
    /// Expects `model_quantized.onnx` and `tokenizer.json` to exist in
    /// `model_dir`; run `download::download_bundle` first if they don't.
    pub fn load(model_dir: &Path, match_floor: f64) -> Result<Self> {
        let model_path = model_dir.join(download::MODEL_FILE);
        let tokenizer_path = model_dir.join(download::TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!("Model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        debug!("Loaded ONNX model from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            match_floor,
        })
    }
}

#[async_trait]
impl Classifier for OnnxClassifier {
    /// Tokenize, run one forward pass, apply sigmoid to the logits, and
    /// map the output row to per-category confidences.
    ///
    /// The CPU-bound tokenization and inference are offloaded to
    /// spawn_blocking so they don't block the tokio async runtime.
    async fn classify(&self, text: &str) -> Result<HashMap<Category, f64>> {
        // Clone Arc handles for the spawn_blocking closure ('static requirement)
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let match_floor = self.match_floor;
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

            let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let attention_mask: Vec<i64> =
                encoding.get_attention_mask().iter().map(|&m| m as i64).collect();
            let shape = [1_i64, input_ids.len() as i64];

            let input_ids_tensor = Tensor::from_array((shape, input_ids))
                .context("Failed to create input_ids tensor")?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
                .context("Failed to create attention_mask tensor")?;

            let logits = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor
                    })
                    .context("ONNX inference failed")?;

                // Output shape: [1, 7] — raw logits (pre-sigmoid)
                let (_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;

                data.to_vec()
            };

            if logits.len() < LABEL_ORDER.len() {
                anyhow::bail!(
                    "Model returned {} logits, expected {}",
                    logits.len(),
                    LABEL_ORDER.len()
                );
            }

            let confidences = map_logits(&logits[..LABEL_ORDER.len()]);

            let matches: Vec<&str> = confidences
                .iter()
                .filter(|(_, &v)| v >= match_floor)
                .map(|(c, _)| c.as_str())
                .collect();
            debug!(
                toxicity = confidences[&Category::Toxicity],
                confident_matches = ?matches,
                text_preview = %truncate_chars(&text, 50),
                "Classified text"
            );

            Ok(confidences)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Sigmoid activation: maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Convert one row of raw logits into the per-category confidence mapping.
fn map_logits(logits: &[f32]) -> HashMap<Category, f64> {
    LABEL_ORDER
        .iter()
        .zip(logits)
        .map(|(&category, &logit)| (category, sigmoid(logit as f64)))
        .collect()
}

/// Truncate to at most `max` characters on a char boundary, for log previews.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Default acquisition sequence: initialize the ONNX runtime, fetch the
/// model bundle, construct the classifier. Each stage reports failure
/// explicitly; nothing is memoized here — the detector owns exactly-once.
pub struct OnnxLoader {
    config: DetectorConfig,
}

impl OnnxLoader {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelLoader for OnnxLoader {
    async fn load(&self) -> Result<Arc<dyn Classifier>> {
        // Stage 1: tensor runtime
        ort::init()
            .with_name("palisade")
            .commit()
            .context("Failed to initialize ONNX runtime")?;
        info!("ONNX runtime initialized");

        // Stage 2: model bundle
        download::download_bundle(&self.config.model_url, &self.config.model_dir)
            .await
            .context("Failed to fetch model bundle")?;
        info!("Model bundle ready in {}", self.config.model_dir.display());

        // Stage 3: handle construction
        let classifier = OnnxClassifier::load(&self.config.model_dir, MATCH_CONFIDENCE_FLOOR)
            .context("Failed to construct model handle")?;
        info!("Toxicity model loaded");

        Ok(Arc::new(classifier))
    }
}
