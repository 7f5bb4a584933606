use thiserror::Error;

use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Recognizes the text of one scanned statement page.
///
/// decode → grayscale/contrast → orientation → rotate → OCR.
pub struct PageOcr<R: OcrBackend> {
    recognizer: R,
}

impl<R: OcrBackend> PageOcr<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Run the page image (JPEG / PNG bytes) through preprocessing and OCR.
    pub fn recognize_page(&self, image_bytes: &[u8]) -> Result<String, PipelineError> {
        let img = preprocess::prepare_for_ocr_from_bytes(image_bytes)?;
        let png = preprocess::encode_as_png(&img)?;

        // A failed orientation probe is not fatal; the page is read as-is.
        let orientation = match self.recognizer.detect_orientation(&png) {
            Ok(o) => o,
            Err(e) => {
                tracing::debug!("Orientation detection failed, assuming upright: {e}");
                Default::default()
            }
        };

        let png = if orientation.degrees() == 0 {
            png
        } else {
            tracing::debug!("Rotating page image by {orientation}");
            preprocess::encode_as_png(&preprocess::rotate_upright(img, orientation))?
        };

        let text = self.recognizer.recognize(&png)?;
        tracing::debug!("OCR produced {} chars", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::{MockRecognizer, UnavailableRecognizer};
    use crate::types::Orientation;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use std::io::Cursor;
    use std::sync::Mutex;

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(8, 4, |x, _| Luma([(x * 30) as u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    /// Records the dimensions of every image handed to `recognize`.
    struct SizeProbe {
        orientation: Orientation,
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl OcrBackend for SizeProbe {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            let img = image::load_from_memory(image_bytes)
                .map_err(|e| OcrError::BadImage(e.to_string()))?;
            self.seen.lock().unwrap().push((img.width(), img.height()));
            Ok(String::new())
        }

        fn detect_orientation(&self, _image_bytes: &[u8]) -> Result<Orientation, OcrError> {
            Ok(self.orientation)
        }
    }

    #[test]
    fn recognizes_page_text() {
        let ocr = PageOcr::new(MockRecognizer::new("Conta: 25165-8\nSALDO 1.000,00"));
        let text = ocr.recognize_page(&tiny_png()).unwrap();
        assert!(text.contains("25165-8"));
    }

    #[test]
    fn sideways_page_is_rotated_before_recognition() {
        let probe = SizeProbe { orientation: Orientation::Rotate90, seen: Mutex::new(vec![]) };
        let ocr = PageOcr::new(probe);
        ocr.recognize_page(&tiny_png()).unwrap();
        // 8x4 is upscaled to 16x8, then turned a quarter.
        assert_eq!(ocr.recognizer().seen.lock().unwrap().as_slice(), &[(8, 16)]);
    }

    #[test]
    fn upright_page_keeps_dimensions() {
        let probe = SizeProbe { orientation: Orientation::Upright, seen: Mutex::new(vec![]) };
        let ocr = PageOcr::new(probe);
        ocr.recognize_page(&tiny_png()).unwrap();
        assert_eq!(ocr.recognizer().seen.lock().unwrap().as_slice(), &[(16, 8)]);
    }

    #[test]
    fn undecodable_image_is_a_preprocess_error() {
        let ocr = PageOcr::new(MockRecognizer::new("x"));
        let err = ocr.recognize_page(b"not an image").unwrap_err();
        assert!(matches!(err, PipelineError::Preprocess(_)));
    }

    #[test]
    fn missing_engine_surfaces_as_ocr_error() {
        let ocr = PageOcr::new(UnavailableRecognizer);
        let err = ocr.recognize_page(&tiny_png()).unwrap_err();
        assert!(matches!(err, PipelineError::Ocr(OcrError::NotAvailable)));
    }
}
