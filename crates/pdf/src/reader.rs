use ledgermark_core::DocumentError;
use ledgermark_ocr::{OcrBackend, PageOcr};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Produces the full text of a statement document, pages in order.
pub trait TextSource: Send + Sync {
    fn read_text(&self, bytes: &[u8]) -> Result<String, DocumentError>;
}

/// Reads statement PDFs: the text layer where there is one, OCR of the
/// embedded page scan where there isn't.
pub struct PdfStatementReader<B: OcrBackend> {
    ocr: PageOcr<B>,
}

impl<B: OcrBackend> PdfStatementReader<B> {
    pub fn new(backend: B) -> Self {
        Self { ocr: PageOcr::new(backend) }
    }

    /// Text of each page.
    pub fn pages(&self, bytes: &[u8]) -> Result<Vec<String>, DocumentError> {
        let doc = Document::load_mem(bytes).map_err(|e| DocumentError::Unreadable(e.to_string()))?;
        let layer = text_layer(bytes);

        let mut pages = Vec::new();
        for (index, (&page_num, &page_id)) in doc.get_pages().iter().enumerate() {
            match layer.get(index) {
                Some(text) if !text.trim().is_empty() => pages.push(text.clone()),
                _ => pages.push(self.ocr_page(&doc, page_num, page_id)),
            }
        }
        Ok(pages)
    }

    /// Image-only page: OCR every embedded JPEG scan. Failures leave the page blank.
    fn ocr_page(&self, doc: &Document, page_num: u32, page_id: ObjectId) -> String {
        let scans = page_jpegs(doc, page_id);
        if scans.is_empty() {
            tracing::debug!("Page {page_num} has neither text nor a scanned image");
            return String::new();
        }

        let mut text = String::new();
        for scan in scans {
            match self.ocr.recognize_page(&scan) {
                Ok(t) => {
                    text.push_str(&t);
                    text.push('\n');
                }
                Err(e) => tracing::warn!("OCR of page {page_num} failed: {e}"),
            }
        }
        text
    }
}

impl<B: OcrBackend> TextSource for PdfStatementReader<B> {
    fn read_text(&self, bytes: &[u8]) -> Result<String, DocumentError> {
        Ok(self.pages(bytes)?.join("\n"))
    }
}

/// Decoded text of every page, fonts' `/ToUnicode` maps applied. Empty when
/// pdf-extract cannot decode the document, which sends every page to OCR.
fn text_layer(bytes: &[u8]) -> Vec<String> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes)) {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            tracing::warn!("Text layer could not be decoded: {e}");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!("Text layer decoder aborted on this document");
            Vec::new()
        }
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Resources of the page, inherited from ancestors when absent.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    loop {
        if let Some(res) = node.get(b"Resources").ok().and_then(|o| resolve(doc, o)) {
            return res.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
}

fn is_dct(filter: &Object) -> bool {
    match filter {
        Object::Name(name) => name.as_slice() == b"DCTDecode",
        Object::Array(items) => items.len() == 1 && is_dct(&items[0]),
        _ => false,
    }
}

/// Raw bytes of the page's DCT-encoded image XObjects, which are JPEG files as-is.
fn page_jpegs(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
    let Some(xobjects) = page_resources(doc, page_id)
        .and_then(|r| r.get(b"XObject").ok())
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_, obj)| match resolve(doc, obj)? {
            Object::Stream(stream) => Some(stream),
            _ => None,
        })
        .filter(|stream| {
            let is_image = matches!(
                stream.dict.get(b"Subtype"),
                Ok(Object::Name(n)) if n.as_slice() == b"Image"
            );
            let jpeg = stream.dict.get(b"Filter").map(is_dct).unwrap_or(false);
            is_image && jpeg
        })
        .map(|stream| stream.content.clone())
        .collect()
}
