use super::OcrWord;

#[cfg(feature = "tesseract")]
pub use engine::TesseractEngine;

#[cfg(feature = "tesseract")]
mod engine {
    use image::DynamicImage;
    use tesseract::{PageSegMode, Tesseract};

    use super::{build_lang, parse_tsv_words};
    use crate::error::OcrError;
    use crate::ocr::{OcrEngine, Recognition, SegmentationMode};

    /// Tesseract via the C API. A fresh instance is created per pass, so
    /// concurrent passes never share engine state.
    pub struct TesseractEngine {
        pub languages: Vec<String>,
        /// Directory containing `tessdata/`; `None` uses the system default.
        pub tessdata_dir: Option<String>,
    }

    impl OcrEngine for TesseractEngine {
        fn name(&self) -> &str {
            "tesseract"
        }

        fn recognize(&self, image: &DynamicImage, mode: SegmentationMode) -> Result<Recognition, OcrError> {
            let lang = build_lang(&self.languages);
            let rgb = image.to_rgb8();
            let (w, h) = (rgb.width() as i32, rgb.height() as i32);
            let bytes = rgb.into_raw();

            let mut tess = Tesseract::new(self.tessdata_dir.as_deref(), Some(&lang))
                .map_err(|e| OcrError::Init(e.to_string()))?
                .set_frame(&bytes, w, h, 3, w * 3)
                .map_err(|e| OcrError::Init(e.to_string()))?;
            tess.set_page_seg_mode(page_seg_mode(mode));
            let mut tess = tess
                .recognize()
                .map_err(|e| OcrError::Recognize(e.to_string()))?;

            let full_text = tess
                .get_text()
                .map_err(|e| OcrError::Recognize(e.to_string()))?;
            let tsv = tess
                .get_tsv_text(0)
                .map_err(|e| OcrError::Recognize(e.to_string()))?;

            Ok(Recognition {
                full_text,
                words: parse_tsv_words(&tsv),
            })
        }
    }

    fn page_seg_mode(mode: SegmentationMode) -> PageSegMode {
        match mode {
            SegmentationMode::Auto => PageSegMode::PsmAuto,
            SegmentationMode::SingleBlock => PageSegMode::PsmSingleBlock,
            SegmentationMode::SingleLine => PageSegMode::PsmSingleLine,
        }
    }
}

/// Word rows from Tesseract TSV output.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Only level 5 (word) rows with a
/// non-negative confidence and non-empty text are kept. A header row, if
/// present, fails the level parse and is skipped.
pub fn parse_tsv_words(tsv: &str) -> Vec<OcrWord> {
    tsv.lines()
        .filter_map(|row| {
            let fields: Vec<&str> = row.split('\t').collect();
            if fields.len() < 12 {
                return None;
            }
            let level: i32 = fields[0].trim().parse().ok()?;
            if level != 5 {
                return None;
            }
            let confidence: f64 = fields[10].trim().parse().ok()?;
            let text = fields[11].trim();
            if confidence < 0.0 || text.is_empty() {
                return None;
            }
            Some(OcrWord {
                text: text.to_string(),
                confidence,
            })
        })
        .collect()
}

/// Tesseract language string from `ocr.languages`, e.g. `["eng", "deu"]` →
/// `"eng+deu"`. Blank entries are skipped; nothing left means English.
pub fn build_lang(languages: &[String]) -> String {
    let codes: Vec<&str> = languages
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| if l == "en" { "eng" } else { l })
        .collect();
    if codes.is_empty() {
        "eng".to_string()
    } else {
        codes.join("+")
    }
}
