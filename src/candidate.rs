use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Shortest normalized token the normalizer lets through.
pub const NORMALIZED_MIN_LEN: usize = 2;
/// Longest normalized token the normalizer lets through.
pub const NORMALIZED_MAX_LEN: usize = 10;
/// Shortest candidate the orchestrator will score as a plate.
pub const MIN_PLATE_LEN: usize = 3;

/// Confidence assigned to a pass's full-text token, which carries none of its own.
pub const FULL_TEXT_CONFIDENCE: f64 = 50.0;

/// Tokens that show up on plates but are never the plate number itself:
/// jurisdiction names and registration boilerplate.
pub(crate) const NOISE_WORDS: &[&str] = &[
    // US states and DC
    "ALABAMA", "ALASKA", "ARIZONA", "ARKANSAS", "CALIFORNIA", "COLORADO",
    "CONNECTICUT", "DELAWARE", "FLORIDA", "GEORGIA", "HAWAII", "IDAHO",
    "ILLINOIS", "INDIANA", "IOWA", "KANSAS", "KENTUCKY", "LOUISIANA", "MAINE",
    "MARYLAND", "MASSACHUSETTS", "MICHIGAN", "MINNESOTA", "MISSISSIPPI",
    "MISSOURI", "MONTANA", "NEBRASKA", "NEVADA", "NEWHAMPSHIRE", "NEWJERSEY",
    "NEWMEXICO", "NEWYORK", "NORTHCAROLINA", "NORTHDAKOTA", "OHIO", "OKLAHOMA",
    "OREGON", "PENNSYLVANIA", "RHODEISLAND", "SOUTHCAROLINA", "SOUTHDAKOTA",
    "TENNESSEE", "TEXAS", "UTAH", "VERMONT", "VIRGINIA", "WASHINGTON",
    "WESTVIRGINIA", "WISCONSIN", "WYOMING", "COLUMBIA", "DC",
    // Split multi-word names as OCR returns them word by word
    "NEW", "NORTH", "SOUTH", "WEST", "RHODE", "ISLAND", "HAMPSHIRE", "JERSEY",
    "MEXICO", "YORK", "CAROLINA", "DAKOTA", "DISTRICT",
    // Registration boilerplate
    "LICENSE", "LICENCE", "PLATE", "PLATES", "EXPIRES", "EXPIRATION",
    "REGISTRATION", "REGISTERED", "STATE", "COUNTY", "VEHICLE", "MOTOR",
    "DEPARTMENT", "DMV", "USA", "AMERICA", "DEALER", "SAMPLE", "TAG",
];

static NOISE_VOCABULARY: Lazy<HashSet<&'static str>> =
    Lazy::new(|| NOISE_WORDS.iter().copied().collect());

/// A token as a recognizer reported it, tagged with the pass that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawToken {
    pub text: String,
    pub confidence: f64,
    /// Pass label, e.g. "auto" or "single-line-full". Diagnostic only.
    pub source: String,
    /// Position in collection order; lower wins ties.
    pub seq: usize,
}

/// Length windows applied to tokens before and after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateLimits {
    /// Normalizer window floor.
    #[serde(default = "default_min_len")]
    pub min_len: usize,
    /// Normalizer window ceiling.
    #[serde(default = "default_max_len")]
    pub max_len: usize,
    /// Plate-policy floor checked by the orchestrator before scoring.
    /// Kept apart from `min_len` on purpose.
    #[serde(default = "default_min_scored_len")]
    pub min_scored_len: usize,
}

fn default_min_len() -> usize { NORMALIZED_MIN_LEN }
fn default_max_len() -> usize { NORMALIZED_MAX_LEN }
fn default_min_scored_len() -> usize { MIN_PLATE_LEN }

impl Default for CandidateLimits {
    fn default() -> Self {
        Self {
            min_len: NORMALIZED_MIN_LEN,
            max_len: NORMALIZED_MAX_LEN,
            min_scored_len: MIN_PLATE_LEN,
        }
    }
}

/// A normalized token: `[A-Z0-9]+` inside the normalizer's length window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub text: String,
    pub confidence: f64,
    pub source: String,
    pub seq: usize,
}

impl Candidate {
    /// Normalize `raw` and keep it only if it fits the normalizer window.
    pub fn from_raw(raw: &RawToken, limits: &CandidateLimits) -> Option<Self> {
        let text = normalize(&raw.text);
        let len = text.len();
        if len < limits.min_len || len > limits.max_len {
            return None;
        }
        Some(Self {
            text,
            confidence: raw.confidence,
            source: raw.source.clone(),
            seq: raw.seq,
        })
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Strip everything outside `[A-Za-z0-9]` and upper-case the rest.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// True iff `text` is exactly a noise-vocabulary word. Expects normalized input.
pub fn is_noise(text: &str) -> bool {
    NOISE_VOCABULARY.contains(text)
}
