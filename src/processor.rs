use image::DynamicImage;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::candidate::CandidateLimits;
use crate::config::{EngineConfig, DEFAULT_PLATE_SERVICE_TIMEOUT_SECS};
use crate::error::{ExtractError, OcrError, PlateServiceError};
use crate::ocr::{extract_via_ocr, OcrEngine, OcrRanking, PassOutcome, SegmentationMode, PASS_ORDER};
use crate::remote::{PlateRecognizerClient, PlateService};
use crate::scoring::ScoredCandidate;

/// Where the returned plate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Remote,
    Ocr,
    NotFound,
}

/// What the remote service contributed to this extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteStatus {
    NotConfigured,
    Failed { error: String },
    NoGuesses,
    Accepted { plate: String, score: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassSummary {
    pub mode: SegmentationMode,
    pub ok: bool,
    pub words: usize,
    pub error: Option<String>,
}

impl From<&PassOutcome> for PassSummary {
    fn from(pass: &PassOutcome) -> Self {
        match &pass.result {
            Ok(r) => Self { mode: pass.mode, ok: true, words: r.words.len(), error: None },
            Err(e) => Self { mode: pass.mode, ok: false, words: 0, error: Some(e.to_string()) },
        }
    }
}

/// Outcome of one extraction. An empty `plate` is a normal result: no
/// candidate was plausible enough and the caller should ask for manual entry.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub plate: String,
    pub origin: Origin,
    pub remote: RemoteStatus,
    /// Best local OCR candidate; `None` when OCR did not run or found nothing.
    pub best: Option<ScoredCandidate>,
    /// Local OCR passes in pass order; empty when the remote short-circuited.
    pub passes: Vec<PassSummary>,
}

/// Validated input: the encoded bytes for the remote service and the decoded
/// image for local OCR.
struct PlateImage {
    encoded: Vec<u8>,
    decoded: Arc<DynamicImage>,
}

impl PlateImage {
    fn decode(bytes: &[u8]) -> Result<Self, ExtractError> {
        if bytes.is_empty() {
            return Err(ExtractError::EmptyImage);
        }
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self {
            encoded: bytes.to_vec(),
            decoded: Arc::new(decoded),
        })
    }
}

/// Plate extraction engine: remote service first, multi-pass OCR otherwise.
///
/// Stateless between calls apart from the immutable config, so one extractor
/// can serve concurrent requests.
pub struct PlateExtractor {
    ocr: Arc<dyn OcrEngine>,
    remote: Option<Arc<dyn PlateService>>,
    remote_timeout: Duration,
    limits: CandidateLimits,
    parallel_passes: bool,
}

impl PlateExtractor {
    /// Build from `config`. A `PlateRecognizerClient` is attached only when
    /// an API key is configured.
    pub fn new(config: &EngineConfig, ocr: Arc<dyn OcrEngine>) -> Result<Self, PlateServiceError> {
        let remote: Option<Arc<dyn PlateService>> = match (config.plate_service_key(), &config.plate_service) {
            (Some(_), Some(svc)) => Some(Arc::new(PlateRecognizerClient::new(svc)?)),
            _ => None,
        };
        let extractor = Self::with_services(config, ocr, remote);
        if extractor.has_plate_service() {
            tracing::info!("Plate service configured; OCR is the fallback");
        }
        Ok(extractor)
    }

    /// Build with explicit collaborators. `remote` is only queried when
    /// `config` carries an API key; without one, or with `remote = None`,
    /// the remote step is skipped.
    pub fn with_services(
        config: &EngineConfig,
        ocr: Arc<dyn OcrEngine>,
        remote: Option<Arc<dyn PlateService>>,
    ) -> Self {
        let timeout_secs = config
            .plate_service
            .as_ref()
            .map_or(DEFAULT_PLATE_SERVICE_TIMEOUT_SECS, |s| s.timeout_secs);
        let remote = remote.filter(|_| config.plate_service_key().is_some());
        Self {
            ocr,
            remote,
            remote_timeout: Duration::from_secs(timeout_secs),
            limits: config.limits,
            parallel_passes: config.ocr.parallel_passes,
        }
    }

    /// Upper bound on the remote call; on expiry the call counts as failed.
    pub fn remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn has_plate_service(&self) -> bool {
        self.remote.is_some()
    }

    /// Public entry point: the plate string, or empty when none was found.
    pub async fn extract_plate_text(&self, image: &[u8]) -> Result<String, ExtractError> {
        Ok(self.extract(image).await?.plate)
    }

    /// Full extraction with diagnostics.
    ///
    /// Errors only on unreadable input. Recognizer failures are recorded in
    /// the report and otherwise ignored.
    pub async fn extract(&self, image: &[u8]) -> Result<Extraction, ExtractError> {
        let image = PlateImage::decode(image)?;

        let remote = self.query_remote(&image.encoded).await;
        if let RemoteStatus::Accepted { plate, score } = &remote {
            tracing::info!(plate = %plate, score = *score, "Plate from remote service");
            // A blank first guess still ends the search: the no-candidate outcome.
            let origin = if plate.is_empty() { Origin::NotFound } else { Origin::Remote };
            return Ok(Extraction {
                plate: plate.clone(),
                origin,
                remote,
                best: None,
                passes: Vec::new(),
            });
        }

        let ranking = self.run_ocr(image.decoded).await;
        let plate = ranking.plate();
        let origin = if plate.is_empty() { Origin::NotFound } else { Origin::Ocr };
        match origin {
            Origin::Ocr => tracing::info!(plate = %plate, "Plate from OCR"),
            _ => tracing::info!("No plausible plate found"),
        }

        Ok(Extraction {
            plate,
            origin,
            remote,
            best: ranking.best,
            passes: ranking.passes.iter().map(PassSummary::from).collect(),
        })
    }

    /// One call, no retry. Errors and empty guess lists fall through.
    async fn query_remote(&self, image: &[u8]) -> RemoteStatus {
        let Some(service) = &self.remote else {
            return RemoteStatus::NotConfigured;
        };

        let result = match tokio::time::timeout(self.remote_timeout, service.recognize_plate(image)).await {
            Ok(r) => r,
            Err(_) => Err(PlateServiceError::Timeout),
        };

        match result {
            Ok(guesses) => match guesses.first() {
                Some(guess) => RemoteStatus::Accepted {
                    plate: guess.plate.to_uppercase(),
                    score: guess.score,
                },
                None => {
                    tracing::debug!(service = service.name(), "Plate service returned no guesses");
                    RemoteStatus::NoGuesses
                }
            },
            Err(e) => {
                tracing::warn!(service = service.name(), error = %e, "Plate service failed, falling back to OCR");
                RemoteStatus::Failed { error: e.to_string() }
            }
        }
    }

    async fn run_ocr(&self, image: Arc<DynamicImage>) -> OcrRanking {
        let engine = Arc::clone(&self.ocr);
        let limits = self.limits;
        let parallel = self.parallel_passes;

        match tokio::task::spawn_blocking(move || extract_via_ocr(engine.as_ref(), &image, parallel, &limits)).await {
            Ok(ranking) => ranking,
            Err(e) => {
                tracing::warn!(error = %e, "OCR worker did not complete");
                let error = OcrError::Worker(e.to_string());
                OcrRanking {
                    passes: PASS_ORDER
                        .iter()
                        .map(|&mode| PassOutcome { mode, result: Err(error.clone()) })
                        .collect(),
                    best: None,
                }
            }
        }
    }
}
