use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::services::OcrService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ocr: OcrService,
    /// Cancelled on shutdown; each request works under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, ocr: OcrService, shutdown: CancellationToken) -> Self {
        Self {
            config: Arc::new(config),
            ocr,
            shutdown,
        }
    }
}
