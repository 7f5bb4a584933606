use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use thiserror::Error;

use crate::types::Orientation;

/// Contrast gain applied around the mean luminance.
pub const CONTRAST_FACTOR: f32 = 2.0;

/// Scans smaller than this on both sides are upscaled 2x before OCR.
const SMALL_SCAN: u32 = 1000;
/// Scans larger than this on either side are brought down to it.
const MAX_SIDE: u32 = 2800;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Page image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Page image could not be re-encoded: {0}")]
    Encode(String),
}

/// Decode a scanned page and prepare it for recognition: resize into the
/// working range, grayscale, then boost contrast.
pub fn prepare_for_ocr_from_bytes(data: &[u8]) -> Result<DynamicImage, PreprocessError> {
    let scan = image::load_from_memory(data)?;
    let gray = to_working_size(scan).into_luma8();
    Ok(DynamicImage::ImageLuma8(boost_contrast(gray, CONTRAST_FACTOR)))
}

/// Turn the image clockwise by the hinted amount so text reads upright.
pub fn rotate_upright(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Upright => img,
        Orientation::Rotate90 => img.rotate90(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::Rotate270 => img.rotate270(),
    }
}

pub fn encode_as_png(img: &DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(png.into_inner())
}

fn to_working_size(scan: DynamicImage) -> DynamicImage {
    let (w, h) = (scan.width(), scan.height());
    if w > MAX_SIDE || h > MAX_SIDE {
        scan.resize(MAX_SIDE, MAX_SIDE, FilterType::Lanczos3)
    } else if w < SMALL_SCAN && h < SMALL_SCAN {
        scan.resize_exact(w * 2, h * 2, FilterType::Triangle)
    } else {
        scan
    }
}

/// Push every pixel away from the mean luminance by `factor`, clamped.
fn boost_contrast(mut gray: GrayImage, factor: f32) -> GrayImage {
    let count = (gray.width() as u64 * gray.height() as u64).max(1);
    let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    let mean = sum as f32 / count as f32;

    for Luma([v]) in gray.pixels_mut() {
        *v = (mean + (*v as f32 - mean) * factor).round().clamp(0.0, 255.0) as u8;
    }
    gray
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([f(x, y)]))
    }

    fn png(img: GrayImage) -> Vec<u8> {
        encode_as_png(&DynamicImage::ImageLuma8(img)).unwrap()
    }

    #[test]
    fn flat_page_is_unchanged_by_contrast() {
        let out = boost_contrast(gray(4, 4, |_, _| 128), CONTRAST_FACTOR);
        assert!(out.pixels().all(|p| p[0] == 128));
    }

    #[test]
    fn contrast_pushes_ink_and_paper_apart() {
        // Half ink (100), half paper (200): mean 150.
        let out = boost_contrast(gray(4, 1, |x, _| if x < 2 { 100 } else { 200 }), 2.0);
        assert_eq!(out.get_pixel(0, 0)[0], 50);
        assert_eq!(out.get_pixel(3, 0)[0], 250);
    }

    #[test]
    fn contrast_clamps_at_the_ends() {
        let out = boost_contrast(gray(2, 1, |x, _| if x == 0 { 0 } else { 255 }), 4.0);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn small_scan_is_doubled() {
        let prepared = prepare_for_ocr_from_bytes(&png(gray(10, 6, |_, _| 90))).unwrap();
        assert_eq!((prepared.width(), prepared.height()), (20, 12));
    }

    #[test]
    fn oversized_scan_is_reduced() {
        let big = to_working_size(DynamicImage::ImageLuma8(gray(3000, 1500, |_, _| 200)));
        assert!(big.width() <= MAX_SIDE && big.height() <= MAX_SIDE);
    }

    #[test]
    fn quarter_turns_swap_dimensions() {
        let img = DynamicImage::ImageLuma8(gray(40, 10, |_, _| 50));
        let turned = rotate_upright(img.clone(), Orientation::Rotate90);
        assert_eq!((turned.width(), turned.height()), (10, 40));
        let turned = rotate_upright(img.clone(), Orientation::Rotate270);
        assert_eq!((turned.width(), turned.height()), (10, 40));
        let flipped = rotate_upright(img, Orientation::Rotate180);
        assert_eq!((flipped.width(), flipped.height()), (40, 10));
    }

    #[test]
    fn rotate90_moves_top_left_pixel_to_top_right() {
        let img = gray(3, 2, |x, y| if (x, y) == (0, 0) { 255 } else { 0 });
        let turned =
            rotate_upright(DynamicImage::ImageLuma8(img), Orientation::Rotate90).to_luma8();
        // 3x2 becomes 2x3; a clockwise turn puts the old top-left at top-right.
        assert_eq!(turned.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn prepared_page_encodes_as_png() {
        let prepared = prepare_for_ocr_from_bytes(&png(gray(4, 4, |x, _| x as u8 * 40))).unwrap();
        let out = encode_as_png(&prepared).unwrap();
        assert_eq!(&out[..4], b"\x89PNG");
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(prepare_for_ocr_from_bytes(b"nope"), Err(PreprocessError::Decode(_))));
    }
}
