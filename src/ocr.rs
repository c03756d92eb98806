pub mod tesseract;

use image::DynamicImage;
use rayon::prelude::*;
use serde::Serialize;

use crate::candidate::{is_noise, Candidate, CandidateLimits, RawToken, FULL_TEXT_CONFIDENCE};
use crate::error::OcrError;
use crate::scoring::{select_best, ScoredCandidate};

// ── Public types ─────────────────────────────────────────────────────────────

/// How the OCR engine should assume text is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentationMode {
    Auto,
    SingleBlock,
    SingleLine,
}

impl SegmentationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentationMode::Auto => "auto",
            SegmentationMode::SingleBlock => "single-block",
            SegmentationMode::SingleLine => "single-line",
        }
    }
}

/// Pass order. Fixed so that tie-breaks are reproducible.
pub const PASS_ORDER: [SegmentationMode; 3] = [
    SegmentationMode::Auto,
    SegmentationMode::SingleBlock,
    SegmentationMode::SingleLine,
];

/// One word as the OCR engine reported it. `confidence` is 0–100.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f64,
}

/// Output of one OCR pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recognition {
    pub full_text: String,
    pub words: Vec<OcrWord>,
}

/// Every OCR backend implements this.
/// `recognize` is called once per segmentation mode, possibly from several
/// threads at once.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;
    fn recognize(&self, image: &DynamicImage, mode: SegmentationMode) -> Result<Recognition, OcrError>;
}

/// What a single pass produced. A failed pass and an empty pass are
/// different outcomes even though both contribute zero candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutcome {
    pub mode: SegmentationMode,
    pub result: Result<Recognition, OcrError>,
}

impl PassOutcome {
    /// Word tokens first, then the full-text token, numbered from `first_seq`.
    fn tokens(&self, first_seq: usize) -> Vec<RawToken> {
        let Ok(recognition) = &self.result else {
            return Vec::new();
        };
        let mode = self.mode.as_str();
        recognition
            .words
            .iter()
            .map(|w| (w.text.clone(), w.confidence, mode.to_string()))
            .chain(std::iter::once((
                recognition.full_text.clone(),
                FULL_TEXT_CONFIDENCE,
                format!("{mode}-full"),
            )))
            .enumerate()
            .map(|(i, (text, confidence, source))| RawToken {
                text,
                confidence,
                source,
                seq: first_seq + i,
            })
            .collect()
    }
}

/// Result of the multi-pass OCR ranking.
#[derive(Debug, Clone)]
pub struct OcrRanking {
    pub passes: Vec<PassOutcome>,
    pub best: Option<ScoredCandidate>,
}

impl OcrRanking {
    /// Text of the best candidate, or empty when nothing survived.
    pub fn plate(&self) -> String {
        self.best
            .as_ref()
            .map(|b| b.candidate.text.clone())
            .unwrap_or_default()
    }
}

// ── Orchestration ────────────────────────────────────────────────────────────

/// Run every pass in `PASS_ORDER` against `image` and pick the best candidate
/// across all of them.
///
/// - `parallel`: run passes concurrently on the rayon pool. Outcomes are
///   collected in pass order either way, so the result does not depend on
///   which pass finishes first.
/// - A pass that fails contributes nothing; remaining passes still run.
pub fn extract_via_ocr(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    parallel: bool,
    limits: &CandidateLimits,
) -> OcrRanking {
    let passes = run_passes(engine, image, parallel);
    let tokens = collect_tokens(&passes);
    let best = rank_tokens(&tokens, limits);

    match &best {
        Some(b) => tracing::debug!(
            engine = engine.name(),
            text = %b.candidate.text,
            source = %b.candidate.source,
            score = b.score,
            "OCR best candidate"
        ),
        None => tracing::debug!(engine = engine.name(), "OCR produced no plausible candidate"),
    }

    OcrRanking { passes, best }
}

/// Invoke `engine` once per mode. The returned vector is in `PASS_ORDER`.
pub fn run_passes(engine: &dyn OcrEngine, image: &DynamicImage, parallel: bool) -> Vec<PassOutcome> {
    let run = |&mode: &SegmentationMode| {
        let result = engine.recognize(image, mode);
        match &result {
            Ok(r) => tracing::debug!(
                mode = mode.as_str(),
                words = r.words.len(),
                full_text = %r.full_text.trim(),
                "OCR pass complete"
            ),
            Err(e) => tracing::warn!(mode = mode.as_str(), error = %e, "OCR pass failed"),
        }
        PassOutcome { mode, result }
    };

    if parallel {
        PASS_ORDER.par_iter().map(run).collect()
    } else {
        PASS_ORDER.iter().map(run).collect()
    }
}

/// Flatten pass outcomes into raw tokens with stable sequence numbers.
pub fn collect_tokens(passes: &[PassOutcome]) -> Vec<RawToken> {
    let mut tokens = Vec::new();
    for pass in passes {
        let next = tokens.len();
        tokens.extend(pass.tokens(next));
    }
    tokens
}

/// Normalize, filter and score `tokens`; return the best survivor.
///
/// Filters, in order: normalizer window (`min_len..=max_len`), plate-length
/// floor (`min_scored_len`), noise vocabulary.
pub fn rank_tokens(tokens: &[RawToken], limits: &CandidateLimits) -> Option<ScoredCandidate> {
    let survivors = tokens
        .iter()
        .filter_map(|t| Candidate::from_raw(t, limits))
        .filter(|c| c.len() >= limits.min_scored_len)
        .filter(|c| {
            let noise = is_noise(&c.text);
            if noise {
                tracing::trace!(text = %c.text, "rejected noise word");
            }
            !noise
        });
    select_best(survivors)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine returning canned outcomes per mode. Modes with no entry
    /// succeed with an empty recognition.
    #[derive(Default)]
    pub(crate) struct ScriptedEngine {
        pub outcomes: HashMap<SegmentationMode, Result<Recognition, OcrError>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedEngine {
        pub fn with(mut self, mode: SegmentationMode, result: Result<Recognition, OcrError>) -> Self {
            self.outcomes.insert(mode, result);
            self
        }
    }

    impl OcrEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn recognize(&self, _image: &DynamicImage, mode: SegmentationMode) -> Result<Recognition, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes.get(&mode).cloned().unwrap_or_else(|| Ok(Recognition::default()))
        }
    }

    pub(crate) fn words(full_text: &str, words: &[(&str, f64)]) -> Recognition {
        Recognition {
            full_text: full_text.to_string(),
            words: words
                .iter()
                .map(|(t, c)| OcrWord { text: t.to_string(), confidence: *c })
                .collect(),
        }
    }

    fn blank() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    fn rank(engine: &ScriptedEngine, parallel: bool) -> OcrRanking {
        extract_via_ocr(engine, &blank(), parallel, &CandidateLimits::default())
    }

    #[test]
    fn noise_and_short_words_are_dropped() {
        let engine = ScriptedEngine::default().with(
            SegmentationMode::Auto,
            Ok(words("ABC123 CALIFORNIA OF", &[("ABC123", 92.0), ("CALIFORNIA", 95.0), ("OF", 99.0)])),
        );
        let ranking = rank(&engine, false);
        assert_eq!(ranking.plate(), "ABC123");
        assert_eq!(ranking.best.unwrap().candidate.source, "auto");
    }

    #[test]
    fn higher_confidence_wins_across_passes() {
        let engine = ScriptedEngine::default()
            .with(SegmentationMode::Auto, Ok(words("", &[("XY1Z345", 60.0)])))
            .with(SegmentationMode::SingleLine, Ok(words("", &[("XY12345", 80.0)])));
        assert_eq!(rank(&engine, false).plate(), "XY12345");
    }

    #[test]
    fn nothing_plausible_yields_empty() {
        let engine = ScriptedEngine::default()
            .with(SegmentationMode::Auto, Ok(words("TEXAS", &[("TEXAS", 90.0), ("AB", 99.0)])))
            .with(SegmentationMode::SingleBlock, Ok(words("7", &[("LICENSE", 80.0), ("PLATE", 80.0)])))
            .with(SegmentationMode::SingleLine, Ok(words("", &[("EXPIRES", 80.0), ("1-2", 99.0)])));
        let ranking = rank(&engine, true);
        assert_eq!(ranking.plate(), "");
        assert!(ranking.best.is_none());
    }

    #[test]
    fn every_noise_word_is_excluded_at_full_confidence() {
        let limits = CandidateLimits::default();
        for (seq, word) in crate::candidate::NOISE_WORDS.iter().enumerate() {
            let tokens = vec![RawToken {
                text: word.to_string(),
                confidence: 100.0,
                source: "auto".to_string(),
                seq,
            }];
            assert!(rank_tokens(&tokens, &limits).is_none(), "{word} was scored");
        }
    }

    #[test]
    fn two_character_tokens_are_never_scored() {
        let tokens = vec![RawToken {
            text: "Z9".to_string(),
            confidence: 100.0,
            source: "auto".to_string(),
            seq: 0,
        }];
        assert!(rank_tokens(&tokens, &CandidateLimits::default()).is_none());

        // Lowering the plate floor lets the same token through the scorer.
        let relaxed = CandidateLimits { min_scored_len: 2, ..CandidateLimits::default() };
        assert_eq!(rank_tokens(&tokens, &relaxed).unwrap().candidate.text, "Z9");
    }

    #[test]
    fn failed_pass_does_not_abort_remaining_passes() {
        let engine = ScriptedEngine::default()
            .with(SegmentationMode::Auto, Err(OcrError::Recognize("boom".into())))
            .with(SegmentationMode::SingleBlock, Ok(Recognition::default()))
            .with(SegmentationMode::SingleLine, Ok(words("", &[("8KLM442", 70.0)])));
        let ranking = rank(&engine, true);

        assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
        assert_eq!(ranking.plate(), "8KLM442");
        assert!(ranking.passes[0].result.is_err());
        assert_eq!(ranking.passes[1].result, Ok(Recognition::default()));
    }

    #[test]
    fn full_text_token_uses_fixed_confidence() {
        let engine = ScriptedEngine::default()
            .with(SegmentationMode::SingleBlock, Ok(words("4gh-j82", &[])));
        let best = rank(&engine, false).best.unwrap();
        assert_eq!(best.candidate.text, "4GHJ82");
        assert_eq!(best.candidate.source, "single-block-full");
        assert_eq!(best.candidate.confidence, FULL_TEXT_CONFIDENCE);
    }

    #[test]
    fn sequence_follows_pass_then_word_order() {
        let passes = vec![
            PassOutcome { mode: SegmentationMode::Auto, result: Ok(words("full a", &[("a1", 1.0), ("a2", 2.0)])) },
            PassOutcome { mode: SegmentationMode::SingleBlock, result: Err(OcrError::Init("x".into())) },
            PassOutcome { mode: SegmentationMode::SingleLine, result: Ok(words("full c", &[("c1", 3.0)])) },
        ];
        let tokens = collect_tokens(&passes);
        let labels: Vec<(usize, &str, &str)> = tokens
            .iter()
            .map(|t| (t.seq, t.text.as_str(), t.source.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![
                (0, "a1", "auto"),
                (1, "a2", "auto"),
                (2, "full a", "auto-full"),
                (3, "c1", "single-line"),
                (4, "full c", "single-line-full"),
            ]
        );
    }

    #[test]
    fn ties_resolve_to_earliest_pass_in_parallel_and_sequential_runs() {
        let engine = ScriptedEngine::default()
            .with(SegmentationMode::Auto, Ok(words("", &[("AAA111", 75.0)])))
            .with(SegmentationMode::SingleBlock, Ok(words("", &[("BBB222", 75.0)])))
            .with(SegmentationMode::SingleLine, Ok(words("", &[("CCC333", 75.0)])));
        for _ in 0..20 {
            assert_eq!(rank(&engine, true).plate(), "AAA111");
        }
        assert_eq!(rank(&engine, false).plate(), "AAA111");
    }

    #[test]
    fn passes_are_reported_in_fixed_order() {
        let engine = ScriptedEngine::default();
        let modes: Vec<SegmentationMode> = rank(&engine, true).passes.iter().map(|p| p.mode).collect();
        assert_eq!(modes, PASS_ORDER.to_vec());
    }
}
