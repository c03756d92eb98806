//! License plate text extraction.
//!
//! A configured remote plate-recognition service is asked first; otherwise
//! (or when it fails or sees nothing) the image goes through several OCR
//! segmentation passes and the most plausible token wins.

pub mod candidate;
pub mod config;
pub mod error;
pub mod ocr;
pub mod processor;
pub mod remote;
pub mod scoring;

pub use config::{load_config, save_config, EngineConfig};
pub use error::{ExtractError, OcrError, PlateServiceError};
pub use ocr::{OcrEngine, Recognition, SegmentationMode};
pub use processor::{Extraction, Origin, PlateExtractor, RemoteStatus};
pub use remote::{PlateGuess, PlateService};
