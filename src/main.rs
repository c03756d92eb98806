use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use platescan_lib::ocr::tesseract::TesseractEngine;
use platescan_lib::{load_config, EngineConfig, PlateExtractor};

/// Exit status when no plausible plate was found.
const EXIT_NOT_FOUND: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "platescan", version, about = "Read the license plate text from a photo")]
struct Args {
    /// Image file (PNG or JPEG)
    image: PathBuf,

    /// JSON engine config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Plate service API key
    #[arg(long, env = "PLATESCAN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OCR languages, e.g. "eng,deu"
    #[arg(long, value_delimiter = ',')]
    languages: Option<Vec<String>>,

    /// Directory containing tessdata/
    #[arg(long)]
    tessdata_dir: Option<String>,

    /// Run OCR passes one after another
    #[arg(long)]
    sequential: bool,

    /// Print the full extraction report as JSON
    #[arg(long)]
    report: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    }
    .with_api_key(args.api_key.clone());
    if let Some(languages) = args.languages.clone() {
        config.ocr.languages = languages;
    }
    if args.tessdata_dir.is_some() {
        config.ocr.tessdata_dir = args.tessdata_dir.clone();
    }
    if args.sequential {
        config.ocr.parallel_passes = false;
    }

    let engine = TesseractEngine {
        languages: config.ocr.languages.clone(),
        tessdata_dir: config.ocr.tessdata_dir.clone(),
    };
    let extractor = PlateExtractor::new(&config, Arc::new(engine))?;

    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("Cannot read {}", args.image.display()))?;
    let extraction = extractor
        .extract(&bytes)
        .await
        .with_context(|| format!("Cannot process {}", args.image.display()))?;

    if args.report {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
    } else if !extraction.plate.is_empty() {
        println!("{}", extraction.plate);
    }

    if extraction.plate.is_empty() {
        eprintln!("No plate found; enter it manually.");
        return Ok(ExitCode::from(EXIT_NOT_FOUND));
    }
    Ok(ExitCode::SUCCESS)
}
