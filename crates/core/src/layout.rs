use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An axis-aligned rectangle in page space, origin at the top-left corner,
/// `y` growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Whether the two rectangles share any area.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Full-width horizontal strip around this rectangle's vertical extent.
    pub fn band(&self, margin: f32, page_width: f32) -> Rect {
        Rect::new(0.0, self.y0 - margin, page_width, self.y1 + margin)
    }
}

/// Stroke colour of a highlight annotation, RGB components in 0.0–1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl HighlightColor {
    pub const ACCOUNT_ANCHOR: HighlightColor = HighlightColor { r: 1.0, g: 0.6, b: 0.0 };
    pub const NAME_ANCHOR: HighlightColor = HighlightColor { r: 0.0, g: 0.8, b: 1.0 };
    pub const CONFIRMED_VALUE: HighlightColor = HighlightColor { r: 0.0, g: 1.0, b: 0.0 };
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document unreadable: {0}")]
    Unreadable(String),
    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
    #[error("Annotation write failed: {0}")]
    AnnotationWrite(String),
}

/// The master ledger as seen by the matcher: positioned text that can be
/// searched by literal and marked with highlights.
///
/// Implementations own the annotation state. Writes go through `&mut self`,
/// so a single matcher pass is the only writer.
pub trait TargetDocument {
    fn page_count(&self) -> usize;

    fn page_width(&self, page: usize) -> Result<f32, DocumentError>;

    fn page_text(&self, page: usize) -> Result<String, DocumentError>;

    /// Bounding boxes of every occurrence of `needle` on `page`. With a clip
    /// region, only occurrences overlapping it are returned.
    fn search(
        &self,
        page: usize,
        needle: &str,
        clip: Option<&Rect>,
    ) -> Result<Vec<Rect>, DocumentError>;

    fn highlight(
        &mut self,
        page: usize,
        rect: Rect,
        color: HighlightColor,
    ) -> Result<(), DocumentError>;

    /// Serialise the document with every highlight added so far.
    fn save(&self) -> Result<Vec<u8>, DocumentError>;
}
