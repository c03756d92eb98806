use serde::Serialize;

use crate::candidate::Candidate;

/// Max contribution of recognizer confidence (0–100 scale).
const CONFIDENCE_WEIGHT: f64 = 30.0;
const LENGTH_IDEAL: f64 = 30.0;
const LENGTH_NEAR: f64 = 20.0;
const LENGTH_ACCEPTABLE: f64 = 10.0;
const MIXED_CLASSES: f64 = 40.0;
const SINGLE_CLASS: f64 = 15.0;
const ALL_LETTERS_PENALTY: f64 = -20.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
}

/// Plausibility of `candidate` as a plate string. Only relative order matters.
///
/// Additive terms:
/// - confidence: `confidence / 100 × 30`
/// - length: 5–7 → +30, 4–8 → +20, 3–9 → +10
/// - character mix: letters and digits → +40, one class only → +15
/// - more than 4 characters, letters only → −20
pub fn score(candidate: &Candidate) -> f64 {
    let text = candidate.text.as_str();
    let len = text.chars().count();
    let has_letter = text.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = text.chars().any(|c| c.is_ascii_digit());

    let confidence = candidate.confidence / 100.0 * CONFIDENCE_WEIGHT;

    let length = match len {
        5..=7 => LENGTH_IDEAL,
        4..=8 => LENGTH_NEAR,
        3..=9 => LENGTH_ACCEPTABLE,
        _ => 0.0,
    };

    let mix = match (has_letter, has_digit) {
        (true, true) => MIXED_CLASSES,
        (true, false) | (false, true) => SINGLE_CLASS,
        (false, false) => 0.0,
    };

    let penalty = if has_letter && !has_digit && len > 4 {
        ALL_LETTERS_PENALTY
    } else {
        0.0
    };

    confidence + length + mix + penalty
}

/// Score every candidate and keep the best.
///
/// Candidates are folded in ascending `seq`; a later candidate replaces the
/// current best only with a strictly greater score, so exact ties go to the
/// earliest-collected one regardless of the order they arrive in.
pub fn select_best<I>(candidates: I) -> Option<ScoredCandidate>
where
    I: IntoIterator<Item = Candidate>,
{
    let mut ordered: Vec<Candidate> = candidates.into_iter().collect();
    ordered.sort_by_key(|c| c.seq);

    let mut best: Option<ScoredCandidate> = None;
    for candidate in ordered {
        let s = score(&candidate);
        tracing::debug!(
            text = %candidate.text,
            source = %candidate.source,
            confidence = candidate.confidence,
            score = s,
            "scored candidate"
        );
        if best.as_ref().map_or(true, |b| s > b.score) {
            best = Some(ScoredCandidate { candidate, score: s });
        }
    }
    best
}
