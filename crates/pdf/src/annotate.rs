use ledgermark_core::{DocumentError, HighlightColor, Rect, TargetDocument};
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::layout::{LayoutIndex, PositionedDocument};

const HIGHLIGHT_OPACITY: f32 = 0.4;

/// The master PDF, opened for annotation. Text positions come from the
/// layout index; highlights are written into the PDF as Highlight
/// annotations.
pub struct LopdfTarget {
    doc: Document,
    page_ids: Vec<ObjectId>,
    positioned: PositionedDocument,
}

impl LopdfTarget {
    /// The layout index must describe exactly the pages of `pdf_bytes`.
    pub fn open(pdf_bytes: &[u8], layout: LayoutIndex) -> Result<Self, DocumentError> {
        let doc = Document::load_mem(pdf_bytes)
            .map_err(|e| DocumentError::Unreadable(e.to_string()))?;
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

        if page_ids.len() != layout.pages.len() {
            return Err(DocumentError::Unreadable(format!(
                "layout index has {} pages but the PDF has {}",
                layout.pages.len(),
                page_ids.len()
            )));
        }

        Ok(Self { doc, page_ids, positioned: PositionedDocument::new(layout) })
    }

    pub fn positioned(&self) -> &PositionedDocument {
        &self.positioned
    }

    fn page_id(&self, page: usize) -> Result<ObjectId, DocumentError> {
        self.page_ids
            .get(page)
            .copied()
            .ok_or(DocumentError::PageOutOfRange { page, count: self.page_ids.len() })
    }

    /// Height from the page's MediaBox, else the layout's.
    fn page_height(&self, page: usize, page_id: ObjectId) -> Result<f32, DocumentError> {
        let from_media_box = self
            .doc
            .get_dictionary(page_id)
            .ok()
            .and_then(|d| d.get(b"MediaBox").ok())
            .and_then(|o| o.as_array().ok())
            .filter(|arr| arr.len() >= 4)
            .and_then(|arr| Some(arr[3].as_float().ok()? - arr[1].as_float().ok()?));
        match from_media_box {
            Some(h) => Ok(h),
            None => Ok(self.positioned.layout().page(page)?.height),
        }
    }
}

impl TargetDocument for LopdfTarget {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_width(&self, page: usize) -> Result<f32, DocumentError> {
        self.positioned.page_width(page)
    }

    fn page_text(&self, page: usize) -> Result<String, DocumentError> {
        self.positioned.page_text(page)
    }

    fn search(
        &self,
        page: usize,
        needle: &str,
        clip: Option<&Rect>,
    ) -> Result<Vec<Rect>, DocumentError> {
        self.positioned.search(page, needle, clip)
    }

    fn highlight(
        &mut self,
        page: usize,
        rect: Rect,
        color: HighlightColor,
    ) -> Result<(), DocumentError> {
        let page_id = self.page_id(page)?;
        let height = self.page_height(page, page_id)?;
        let annot = highlight_annotation(&rect, height, color);
        let annot_id = self.doc.add_object(Object::Dictionary(annot));
        add_annotation_to_page(&mut self.doc, page_id, annot_id)?;
        self.positioned.push_mark(page, rect, color)
    }

    fn save(&self) -> Result<Vec<u8>, DocumentError> {
        // save_to needs &mut; work on a copy so the target stays reusable.
        let mut doc = self.doc.clone();
        let mut out = Vec::new();
        doc.save_to(&mut out).map_err(|e| DocumentError::AnnotationWrite(e.to_string()))?;
        Ok(out)
    }
}

/// PDF user space has its origin bottom-left; layout rects are top-left.
fn highlight_annotation(rect: &Rect, page_height: f32, color: HighlightColor) -> Dictionary {
    let left = rect.x0;
    let right = rect.x1;
    let bottom = page_height - rect.y1;
    let top = page_height - rect.y0;

    let mut annot = Dictionary::new();
    annot.set("Type", Object::Name(b"Annot".to_vec()));
    annot.set("Subtype", Object::Name(b"Highlight".to_vec()));
    annot.set(
        "Rect",
        Object::Array(vec![
            Object::Real(left),
            Object::Real(bottom),
            Object::Real(right),
            Object::Real(top),
        ]),
    );
    annot.set(
        "QuadPoints",
        Object::Array(vec![
            Object::Real(left),
            Object::Real(top),
            Object::Real(right),
            Object::Real(top),
            Object::Real(left),
            Object::Real(bottom),
            Object::Real(right),
            Object::Real(bottom),
        ]),
    );
    annot.set("CA", Object::Real(HIGHLIGHT_OPACITY));
    annot.set(
        "C",
        Object::Array(vec![Object::Real(color.r), Object::Real(color.g), Object::Real(color.b)]),
    );
    annot
}

fn add_annotation_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    annot_id: ObjectId,
) -> Result<(), DocumentError> {
    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| DocumentError::AnnotationWrite(e.to_string()))?;

    if let Object::Dictionary(ref mut page_dict) = page {
        if let Ok(Object::Array(ref mut arr)) = page_dict.get_mut(b"Annots") {
            arr.push(Object::Reference(annot_id));
        } else {
            page_dict.set("Annots", Object::Array(vec![Object::Reference(annot_id)]));
        }
        Ok(())
    } else {
        Err(DocumentError::AnnotationWrite(format!("object {page_id:?} is not a page dictionary")))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::layout::{PageLayout, TextSpan};
    use lopdf::dictionary;

    pub(crate) fn blank_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => Object::Reference(pages_id),
                    "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                }))
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn one_page_layout() -> LayoutIndex {
        LayoutIndex {
            pages: vec![PageLayout {
                width: 595.0,
                height: 842.0,
                spans: vec![TextSpan {
                    text: "25165-8".into(),
                    rect: Rect::new(40.0, 100.0, 90.0, 112.0),
                }],
            }],
        }
    }

    fn annots(pdf: &[u8]) -> Vec<Dictionary> {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        match page.get(b"Annots") {
            Ok(Object::Array(arr)) => arr
                .iter()
                .map(|o| doc.get_dictionary(o.as_reference().unwrap()).unwrap().clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn page_count_mismatch_is_rejected() {
        let err = LopdfTarget::open(&blank_pdf(2), one_page_layout()).err().unwrap();
        assert!(matches!(err, DocumentError::Unreadable(_)));
    }

    #[test]
    fn garbage_is_unreadable() {
        assert!(matches!(
            LopdfTarget::open(b"not a pdf", one_page_layout()),
            Err(DocumentError::Unreadable(_))
        ));
    }

    #[test]
    fn highlight_is_written_with_flipped_y() {
        let mut target = LopdfTarget::open(&blank_pdf(1), one_page_layout()).unwrap();
        let hit = target.search(0, "25165-8", None).unwrap()[0];
        target.highlight(0, hit, HighlightColor::ACCOUNT_ANCHOR).unwrap();

        let saved = target.save().unwrap();
        let annots = annots(&saved);
        assert_eq!(annots.len(), 1);

        let a = &annots[0];
        assert_eq!(a.get(b"Subtype").unwrap().as_name().unwrap(), b"Highlight");
        let r: Vec<f32> = a
            .get(b"Rect")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect();
        assert_eq!(r, vec![40.0, 730.0, 90.0, 742.0]);
        let c: Vec<f32> = a
            .get(b"C")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect();
        assert_eq!(c, vec![1.0, 0.6, 0.0]);
    }

    #[test]
    fn highlights_accumulate_on_the_page() {
        let mut target = LopdfTarget::open(&blank_pdf(1), one_page_layout()).unwrap();
        let r = Rect::new(300.0, 100.0, 350.0, 112.0);
        target.highlight(0, r, HighlightColor::CONFIRMED_VALUE).unwrap();
        target.highlight(0, r, HighlightColor::CONFIRMED_VALUE).unwrap();
        assert_eq!(annots(&target.save().unwrap()).len(), 2);
        assert_eq!(target.positioned().marks().len(), 2);
    }

    #[test]
    fn highlight_on_missing_page_fails() {
        let mut target = LopdfTarget::open(&blank_pdf(1), one_page_layout()).unwrap();
        assert!(matches!(
            target.highlight(5, Rect::new(0.0, 0.0, 1.0, 1.0), HighlightColor::NAME_ANCHOR),
            Err(DocumentError::PageOutOfRange { page: 5, count: 1 })
        ));
    }
}
