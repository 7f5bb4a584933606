pub mod annotate;
pub mod layout;
pub mod reader;

pub use annotate::LopdfTarget;
pub use layout::{HighlightMark, LayoutIndex, PageLayout, PositionedDocument, TextSpan};
pub use reader::{PdfStatementReader, TextSource};
