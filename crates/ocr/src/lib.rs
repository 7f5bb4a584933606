pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use pipeline::{PageOcr, PipelineError};
pub use preprocess::{encode_as_png, prepare_for_ocr_from_bytes, rotate_upright, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, UnavailableRecognizer};
pub use types::Orientation;
