// The toxicity detector — lazy model acquisition, threshold evaluation,
// and the allow/block filtering decision.
//
// Pre-screens outgoing chat messages locally before they reach the
// network. Complements server-side moderation; it only advises the caller
// whether to allow a candidate text.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::warn;

use crate::category::{Category, Severity, ThresholdTable};
use crate::config::{DetectorConfig, FailPolicy};
use crate::error::DetectorError;
use crate::model::onnx::OnnxLoader;
use crate::model::traits::{Classifier, ModelLoader};

/// The verdict for one text. Produced fresh per call; not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// True when at least one category exceeded its threshold.
    pub is_toxic: bool,
    /// Maximum confidence among the categories that exceeded their
    /// thresholds; 0 when none did.
    pub score: f64,
    /// Full per-category confidence mapping, regardless of verdict.
    pub categories: HashMap<Category, f64>,
    /// Coarse tier derived from `score`.
    pub severity: Severity,
}

impl DetectionResult {
    /// The fail-open default: not toxic, zero score, every category at 0.
    pub fn safe_default() -> Self {
        Self {
            is_toxic: false,
            score: 0.0,
            categories: Category::ALL.iter().map(|&c| (c, 0.0)).collect(),
            severity: Severity::Low,
        }
    }
}

/// The actionable outcome for one candidate message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    /// The candidate text, unchanged.
    pub text: String,
    pub detection: DetectionResult,
    /// Whether the caller should send the message.
    pub is_allowed: bool,
    /// Human-readable warning; present only when the text is toxic.
    pub warning: Option<String>,
}

/// Apply per-category thresholds to a confidence mapping and derive the
/// aggregate verdict.
///
/// A confidence must strictly exceed its category's cutoff to count. The
/// score is the maximum among exceeding categories only — a category with
/// the globally highest confidence that stayed under its own cutoff does
/// not contribute.
pub fn evaluate(categories: HashMap<Category, f64>, thresholds: &ThresholdTable) -> DetectionResult {
    let mut is_toxic = false;
    let mut score: f64 = 0.0;

    for (&category, &confidence) in &categories {
        if confidence > thresholds.get(category) {
            is_toxic = true;
            score = score.max(confidence);
        }
    }

    DetectionResult {
        is_toxic,
        score,
        categories,
        severity: Severity::from_score(score),
    }
}

/// Client-side toxicity detector.
///
/// The model is acquired lazily on first use and exactly once per
/// instance: concurrent first-time callers all await the same in-flight
/// acquisition. The handle lives for the detector's lifetime; there is no
/// teardown path.
pub struct ToxicityDetector {
    thresholds: ThresholdTable,
    fail_policy: FailPolicy,
    loader: Box<dyn ModelLoader>,
    model: OnceCell<Arc<dyn Classifier>>,
}

impl ToxicityDetector {
    /// Detector with the default ONNX acquisition sequence and config.
    pub fn new(config: DetectorConfig) -> Self {
        let thresholds = config.thresholds.clone();
        let fail_policy = config.fail_policy;
        Self {
            thresholds,
            fail_policy,
            loader: Box::new(OnnxLoader::new(config)),
            model: OnceCell::new(),
        }
    }

    /// Detector with a custom acquisition sequence. This is the seam tests
    /// use to substitute fakes; also how a caller plugs in a remote
    /// classifier.
    pub fn with_loader(config: DetectorConfig, loader: Box<dyn ModelLoader>) -> Self {
        Self {
            thresholds: config.thresholds,
            fail_policy: config.fail_policy,
            loader,
            model: OnceCell::new(),
        }
    }

    /// Ensure the model is ready, acquiring it if necessary.
    ///
    /// Idempotent: after the first success this returns immediately
    /// without touching the loader. On failure every concurrent waiter
    /// sees `DetectorError::Acquisition`; the cell stays empty, so a
    /// later call retries rather than observing a half-initialized
    /// handle or hanging forever.
    pub async fn init(&self) -> Result<(), DetectorError> {
        self.classifier().await.map(|_| ())
    }

    async fn classifier(&self) -> Result<&Arc<dyn Classifier>, DetectorError> {
        self.model
            .get_or_try_init(|| self.loader.load())
            .await
            .map_err(DetectorError::Acquisition)
    }

    /// Classify `text` and derive the toxicity verdict.
    ///
    /// Triggers acquisition on first use. Classification failures follow
    /// the configured fail policy: under `FailPolicy::Open` (the default)
    /// they are logged and absorbed into a safe, non-toxic result;
    /// under `FailPolicy::Closed` they surface as
    /// `DetectorError::Inference`.
    pub async fn detect_toxicity(&self, text: &str) -> Result<DetectionResult, DetectorError> {
        let classifier = self.classifier().await?;

        let categories = match classifier.classify(text).await {
            Ok(categories) => categories,
            Err(err) => match self.fail_policy {
                FailPolicy::Open => {
                    // Availability over strictness: a broken classifier
                    // must not block all chat.
                    warn!(error = %err, "Classification failed, treating message as non-toxic");
                    return Ok(DetectionResult::safe_default());
                }
                FailPolicy::Closed => return Err(DetectorError::Inference(err)),
            },
        };

        Ok(evaluate(categories, &self.thresholds))
    }

    /// Run the full pipeline and apply the filtering policy.
    ///
    /// A toxic message whose aggregate score stays in the Low tier is
    /// still allowed, with a warning attached; only Medium and High
    /// severity block the message.
    pub async fn filter_message(&self, text: &str) -> Result<FilterResult, DetectorError> {
        let detection = self.detect_toxicity(text).await?;

        let is_allowed = !detection.is_toxic || detection.severity == Severity::Low;
        let warning = detection.is_toxic.then(|| {
            format!(
                "Detected {} toxicity ({:.1}%)",
                detection.severity,
                detection.score * 100.0
            )
        });

        Ok(FilterResult {
            text: text.to_string(),
            detection,
            is_allowed,
            warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confidences(entries: &[(Category, f64)]) -> HashMap<Category, f64> {
        let mut map: HashMap<Category, f64> =
            Category::ALL.iter().map(|&c| (c, 0.0)).collect();
        for &(c, v) in entries {
            map.insert(c, v);
        }
        map
    }

    #[test]
    fn test_all_below_threshold_is_clean() {
        let result = evaluate(
            confidences(&[(Category::Toxicity, 0.5), (Category::Insult, 0.4)]),
            &ThresholdTable::default(),
        );
        assert!(!result.is_toxic);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.severity, Severity::Low);
    }

    #[test]
    fn test_clean_result_keeps_full_category_mapping() {
        let result = evaluate(
            confidences(&[(Category::Toxicity, 0.5)]),
            &ThresholdTable::default(),
        );
        assert_eq!(result.categories.len(), 7);
        assert_eq!(result.categories[&Category::Toxicity], 0.5);
    }

    #[test]
    fn test_score_is_max_among_exceeding_only() {
        // obscene 0.55 is the global max but under its 0.6 cutoff;
        // insult 0.52 exceeds its 0.5 cutoff and sets the score.
        let result = evaluate(
            confidences(&[(Category::Obscene, 0.55), (Category::Insult, 0.52)]),
            &ThresholdTable::default(),
        );
        assert!(result.is_toxic);
        assert!((result.score - 0.52).abs() < 1e-10);
    }

    #[test]
    fn test_exact_threshold_does_not_trigger() {
        let result = evaluate(
            confidences(&[(Category::Toxicity, 0.6)]),
            &ThresholdTable::default(),
        );
        assert!(!result.is_toxic);
    }

    #[test]
    fn test_unknown_category_uses_fallback_cutoff() {
        let table = ThresholdTable::new([]);
        let result = evaluate(confidences(&[(Category::Threat, 0.51)]), &table);
        assert!(result.is_toxic, "0.51 should exceed the 0.5 fallback");
    }

    #[test]
    fn test_safe_default_is_clean_and_complete() {
        let result = DetectionResult::safe_default();
        assert!(!result.is_toxic);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.severity, Severity::Low);
        assert_eq!(result.categories.len(), 7);
        assert!(result.categories.values().all(|&v| v == 0.0));
    }
}
