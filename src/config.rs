use std::env;
use std::path::PathBuf;

use crate::category::ThresholdTable;

/// What to do when the classification call itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailPolicy {
    /// Treat the message as non-toxic and allow it (default). The original
    /// deployment chose availability over strictness: a broken classifier
    /// must not block all chat.
    #[default]
    Open,
    /// Surface the inference error to the caller instead of defaulting.
    Closed,
}

/// Detector configuration, loadable from environment variables.
///
/// Everything has a working default: an unconfigured detector downloads the
/// pinned model bundle into the platform data directory and fails open.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Base URL of the model bundle (model + tokenizer files).
    pub model_url: String,
    /// Directory the bundle is downloaded into and loaded from.
    pub model_dir: PathBuf,
    /// Inference failure policy (default: fail-open).
    pub fail_policy: FailPolicy,
    /// Per-category cutoffs for the toxic verdict.
    pub thresholds: ThresholdTable,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_url: crate::model::download::DEFAULT_MODEL_URL.to_string(),
            model_dir: crate::model::download::default_model_dir(),
            fail_policy: FailPolicy::Open,
            thresholds: ThresholdTable::default(),
        }
    }
}

impl DetectorConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// - `PALISADE_MODEL_URL` — model bundle base URL
    /// - `PALISADE_MODEL_DIR` — model file directory
    /// - `PALISADE_FAIL_CLOSED` — exactly `1` or `true` opts into
    ///   fail-closed inference; any other value (or unset) means fail-open
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let fail_policy = match env::var("PALISADE_FAIL_CLOSED").as_deref() {
            Ok("1") | Ok("true") => FailPolicy::Closed,
            _ => FailPolicy::Open,
        };

        Self {
            model_url: env::var("PALISADE_MODEL_URL").unwrap_or(defaults.model_url),
            model_dir: env::var("PALISADE_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            fail_policy,
            thresholds: ThresholdTable::default(),
        }
    }
}
