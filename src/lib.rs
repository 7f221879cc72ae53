//! UI Refine: screenshot-driven UI/UX and code review.
//!
//! Domains:
//!   - encoding.rs  — screenshot blobs ↔ base64 data URLs
//!   - record.rs    — analysis records and their status machine
//!   - store.rs     — record collection mirrored to durable storage
//!   - llm/         — request building + Gemini gateway
//!   - pipeline.rs  — submit / analyze / delete / clear orchestration
//!   - settings.rs  — env files, API key resolution, data directory
//!
//! The `ui-refine` binary (main.rs) is a thin CLI over [`ReviewPipeline`].

pub mod encoding;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod record;
pub mod settings;
pub mod store;

pub use error::{AnalysisError, EncodeError, StoreError, SubmitError, TransitionError};
pub use pipeline::{AnalysisOutcome, ReviewPipeline};
pub use record::{AnalysisRecord, AnalysisState, AnalysisStatus, NewAnalysis};
pub use store::{FileStorage, MemoryStorage, RecordStore, Storage};

use llm::{GeminiProvider, ReviewProvider};
use settings::Settings;

/// Load env files and start logging. Call once, before anything else.
pub fn init() {
    settings::load_env_files();
    // try_init: tests and embedders may already have a logger.
    let _ = env_logger::try_init();
}

/// Build the production pipeline: file-backed store in the data directory
/// and a Gemini gateway.
pub fn open_pipeline(settings: &Settings) -> ReviewPipeline<FileStorage, GeminiProvider> {
    log::info!("[STARTUP] Data directory: {}", settings.data_dir.display());
    let store = RecordStore::open(FileStorage::new(&settings.data_dir));
    let provider = GeminiProvider::new(settings.api_key.clone(), settings.model.clone());
    if provider.is_configured() {
        log::info!("[STARTUP] Gemini model: {}", provider.model());
    } else {
        log::error!(
            "[STARTUP] {} is not set. Analysis is disabled until a key is configured.",
            llm::gemini::GEMINI_ENV_KEY
        );
    }
    ReviewPipeline::new(store, provider)
}
