// Toxicity categories and per-category thresholds.
//
// The category set is fixed by the model: seven independent labels with
// continuous 0-1 confidences (multi-label, not multi-class). The threshold
// table decides which confidences count toward the toxic verdict.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The closed set of toxicity labels the classifier produces.
///
/// Serialized names match the model's label strings (snake_case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    IdentityAttack,
    Insult,
    Obscene,
    SevereToxicity,
    SexualExplicit,
    Threat,
    Toxicity,
}

impl Category {
    /// Every category, in label order. The evaluator and the safe-default
    /// result both iterate this to guarantee full coverage.
    pub const ALL: [Category; 7] = [
        Category::IdentityAttack,
        Category::Insult,
        Category::Obscene,
        Category::SevereToxicity,
        Category::SexualExplicit,
        Category::Threat,
        Category::Toxicity,
    ];

    /// The model's label string for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::IdentityAttack => "identity_attack",
            Category::Insult => "insult",
            Category::Obscene => "obscene",
            Category::SevereToxicity => "severe_toxicity",
            Category::SexualExplicit => "sexual_explicit",
            Category::Threat => "threat",
            Category::Toxicity => "toxicity",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fallback cutoff for any category without an explicit threshold entry.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Per-category confidence cutoffs in [0, 1].
///
/// Read-only after construction. A confidence must strictly exceed its
/// category's cutoff to count toward the toxic verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdTable {
    thresholds: HashMap<Category, f64>,
}

impl Default for ThresholdTable {
    /// Default cutoffs, tuned per category: the rarer/noisier labels
    /// (sexual_explicit, severe_toxicity, threat) need more confidence
    /// before they count.
    fn default() -> Self {
        let thresholds = HashMap::from([
            (Category::IdentityAttack, 0.5),
            (Category::Insult, 0.5),
            (Category::Obscene, 0.6),
            (Category::SevereToxicity, 0.7),
            (Category::SexualExplicit, 0.8),
            (Category::Threat, 0.7),
            (Category::Toxicity, 0.6),
        ]);
        Self { thresholds }
    }
}

impl ThresholdTable {
    /// Build a table from explicit entries. Categories not listed fall back
    /// to [`DEFAULT_THRESHOLD`] on lookup.
    pub fn new(entries: impl IntoIterator<Item = (Category, f64)>) -> Self {
        Self {
            thresholds: entries.into_iter().collect(),
        }
    }

    /// The cutoff for a category, or [`DEFAULT_THRESHOLD`] if absent.
    pub fn get(&self, category: Category) -> f64 {
        self.thresholds
            .get(&category)
            .copied()
            .unwrap_or(DEFAULT_THRESHOLD)
    }

    /// Override a single category's cutoff.
    pub fn set(&mut self, category: Category, cutoff: f64) {
        self.thresholds.insert(category, cutoff);
    }
}

/// Coarse bucketing of the aggregate toxicity score, for UI/policy use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Derive the tier from an aggregate score. Boundaries are strict:
    /// exactly 0.6 is Low, exactly 0.8 is Medium.
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Severity::High
        } else if score > 0.6 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
