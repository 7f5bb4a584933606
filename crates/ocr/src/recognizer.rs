use thiserror::Error;

use crate::types::Orientation;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine rejected the page image: {0}")]
    BadImage(String),
    #[error("OCR engine failed: {0}")]
    Engine(String),
    #[error("No OCR engine compiled in (enable the `tesseract` feature)")]
    NotAvailable,
}

/// The OCR collaborator: page image in, text out, plus an orientation hint.
///
/// Image bytes are PNG or JPEG.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;

    /// Clockwise turn needed to read the page upright. Engines without
    /// orientation detection report every page upright.
    fn detect_orientation(&self, _image_bytes: &[u8]) -> Result<Orientation, OcrError> {
        Ok(Orientation::Upright)
    }
}

/// Canned OCR output for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    pub text: String,
    pub orientation: Orientation,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn with_orientation(self, orientation: Orientation) -> Self {
        Self { orientation, ..self }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }

    fn detect_orientation(&self, _image_bytes: &[u8]) -> Result<Orientation, OcrError> {
        Ok(self.orientation)
    }
}

/// The turn whose recognition scored highest. Ties keep the earlier
/// candidate, so a page with no readable text stays upright.
pub fn best_orientation(scores: impl IntoIterator<Item = (Orientation, i32)>) -> Orientation {
    let mut best: Option<(Orientation, i32)> = None;
    for (orientation, score) in scores {
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((orientation, score));
        }
    }
    best.map(|(o, _)| o).unwrap_or_default()
}

/// Stand-in when no engine is compiled in; scanned pages yield no text.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRecognizer;

impl OcrBackend for UnavailableRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use leptess::LepTess;

    use super::{best_orientation, OcrBackend, OcrError};
    use crate::preprocess::{encode_as_png, rotate_upright};
    use crate::types::Orientation;

    const TURNS: [Orientation; 4] = [
        Orientation::Upright,
        Orientation::Rotate90,
        Orientation::Rotate180,
        Orientation::Rotate270,
    ];

    /// Tesseract through leptess. A fresh engine per page keeps the backend
    /// `Sync` without locking.
    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }

        fn engine(&self) -> Result<LepTess, OcrError> {
            LepTess::new(self.data_path.as_deref(), &self.lang).map_err(|e| {
                OcrError::Engine(format!("cannot load '{}' language data: {e}", self.lang))
            })
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            let mut engine = self.engine()?;
            engine
                .set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::BadImage(e.to_string()))?;
            engine.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }

        /// Recognizes the page at each quarter turn and keeps the one
        /// Tesseract is most confident about.
        fn detect_orientation(&self, image_bytes: &[u8]) -> Result<Orientation, OcrError> {
            let page = image::load_from_memory(image_bytes)
                .map_err(|e| OcrError::BadImage(e.to_string()))?;
            let mut engine = self.engine()?;

            let mut scores = Vec::with_capacity(TURNS.len());
            for turn in TURNS {
                let png = encode_as_png(&rotate_upright(page.clone(), turn))
                    .map_err(|e| OcrError::BadImage(e.to_string()))?;
                engine
                    .set_image_from_mem(&png)
                    .map_err(|e| OcrError::BadImage(e.to_string()))?;
                let confidence = engine.mean_text_conf();
                tracing::trace!("Orientation {turn}: confidence {confidence}");
                scores.push((turn, confidence));
            }
            Ok(best_orientation(scores))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use image::{DynamicImage, GrayImage, Luma};

        #[test]
        fn blank_page_stays_upright() {
            let blank = GrayImage::from_fn(64, 64, |_, _| Luma([255]));
            let png = encode_as_png(&DynamicImage::ImageLuma8(blank)).unwrap();
            let ocr = TesseractRecognizer::new(None, "eng");
            assert_eq!(ocr.detect_orientation(&png).unwrap(), Orientation::Upright);
        }

        #[test]
        fn undecodable_page_is_a_bad_image() {
            let ocr = TesseractRecognizer::new(None, "eng");
            assert!(matches!(ocr.detect_orientation(b"nope"), Err(OcrError::BadImage(_))));
        }
    }
}
