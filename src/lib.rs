// Palisade: client-side toxicity pre-screening for chat messages
//
// Screens outgoing text against a local multi-label toxicity model before
// it reaches the network. Complements server-side moderation — this crate
// only advises the caller whether to allow a candidate message.

pub mod category;
pub mod config;
pub mod detector;
pub mod error;
pub mod model;

pub use category::{Category, Severity, ThresholdTable};
pub use config::{DetectorConfig, FailPolicy};
pub use detector::{DetectionResult, FilterResult, ToxicityDetector};
pub use error::DetectorError;
