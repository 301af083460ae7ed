mod ocr;

pub use ocr::{
    demo_text, is_supported_mime, validate, ImagePayload, OcrMode, OcrOutcome, OcrService,
    DEMO_DELAY, SUPPORTED_MIME_TYPES,
};
