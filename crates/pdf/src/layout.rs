use std::path::Path;

use ledgermark_core::{DocumentError, HighlightColor, Rect, TargetDocument};
use serde::{Deserialize, Serialize};

/// A run of text on a page with its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub spans: Vec<TextSpan>,
}

/// Positioned text of every page of the master document, as produced by an
/// external layout engine. Coordinates use a top-left origin.
///
/// ```json
/// { "pages": [ { "width": 595, "height": 842,
///   "spans": [ { "text": "25165-8", "rect": { "x0": 40, "y0": 100, "x1": 90, "y1": 112 } } ] } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutIndex {
    pub pages: Vec<PageLayout>,
}

impl LayoutIndex {
    pub fn from_json(s: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(s).map_err(|e| DocumentError::Unreadable(format!("layout index: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| DocumentError::Unreadable(format!("{}: {e}", path.display())))?;
        Self::from_json(&s)
    }

    pub fn page(&self, page: usize) -> Result<&PageLayout, DocumentError> {
        self.pages
            .get(page)
            .ok_or(DocumentError::PageOutOfRange { page, count: self.pages.len() })
    }
}

/// A highlight placed on the document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightMark {
    pub page: usize,
    pub rect: Rect,
    pub color: HighlightColor,
}

/// In-memory target document over a [`LayoutIndex`]. Highlights are kept as
/// marks and saved as JSON.
#[derive(Debug, Clone, Default)]
pub struct PositionedDocument {
    layout: LayoutIndex,
    marks: Vec<HighlightMark>,
}

impl PositionedDocument {
    pub fn new(layout: LayoutIndex) -> Self {
        Self { layout, marks: Vec::new() }
    }

    pub fn layout(&self) -> &LayoutIndex {
        &self.layout
    }

    pub fn marks(&self) -> &[HighlightMark] {
        &self.marks
    }

    pub(crate) fn push_mark(
        &mut self,
        page: usize,
        rect: Rect,
        color: HighlightColor,
    ) -> Result<(), DocumentError> {
        self.layout.page(page)?;
        self.marks.push(HighlightMark { page, rect, color });
        Ok(())
    }
}

impl TargetDocument for PositionedDocument {
    fn page_count(&self) -> usize {
        self.layout.pages.len()
    }

    fn page_width(&self, page: usize) -> Result<f32, DocumentError> {
        Ok(self.layout.page(page)?.width)
    }

    fn page_text(&self, page: usize) -> Result<String, DocumentError> {
        let spans = &self.layout.page(page)?.spans;
        Ok(spans.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join("\n"))
    }

    /// Case-insensitive literal search within each span. A hit inside a longer
    /// span gets a box proportional to its character offsets.
    fn search(
        &self,
        page: usize,
        needle: &str,
        clip: Option<&Rect>,
    ) -> Result<Vec<Rect>, DocumentError> {
        let layout = self.layout.page(page)?;
        let needle: Vec<char> = needle.chars().collect();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for span in &layout.spans {
            let hay: Vec<char> = span.text.chars().collect();
            for start in find_all(&hay, &needle) {
                let rect = sub_rect(&span.rect, hay.len(), start, needle.len());
                if clip.map_or(true, |c| c.intersects(&rect)) {
                    hits.push(rect);
                }
            }
        }
        Ok(hits)
    }

    fn highlight(
        &mut self,
        page: usize,
        rect: Rect,
        color: HighlightColor,
    ) -> Result<(), DocumentError> {
        self.push_mark(page, rect, color)
    }

    fn save(&self) -> Result<Vec<u8>, DocumentError> {
        serde_json::to_vec_pretty(&self.marks)
            .map_err(|e| DocumentError::AnnotationWrite(e.to_string()))
    }
}

/// Non-overlapping match offsets, in characters.
fn find_all(hay: &[char], needle: &[char]) -> Vec<usize> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + needle.len() <= hay.len() {
        let hit = hay[i..i + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()));
        if hit {
            out.push(i);
            i += needle.len();
        } else {
            i += 1;
        }
    }
    out
}

fn sub_rect(span: &Rect, total: usize, start: usize, len: usize) -> Rect {
    if total == 0 || len >= total {
        return *span;
    }
    let per_char = span.width() / total as f32;
    let x0 = span.x0 + per_char * start as f32;
    Rect::new(x0, span.y0, x0 + per_char * len as f32, span.y1)
}
