//! Review pipeline: submission and the analyze flow.
//!
//! submit:   validate → encode screenshot → PENDING record → persist
//! analyze:  config check → PENDING/ERROR → ANALYZING (persist)
//!           → build request → provider call → COMPLETED | ERROR (persist)
//!
//! The pipeline owns the store, and `begin_analysis` takes `&mut self`, so
//! one pipeline never runs two attempts at once. A record already marked
//! ANALYZING is refused without touching the provider.

use crate::encoding;
use crate::error::{StoreError, SubmitError, TransitionError};
use crate::llm::{self, ReviewProvider};
use crate::record::{AnalysisRecord, NewAnalysis};
use crate::settings::ApiKeyStatus;
use crate::store::{RecordStore, Storage};

/// Notice returned when the trigger is pressed without a configured key.
pub const NOT_CONFIGURED_NOTICE: &str =
    "Gemini API Key (GEMINI_API_KEY) is not configured. Cannot perform analysis.";

/// Result of pressing "begin analysis" on one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// No credential; the record was not touched.
    NotConfigured(String),
    NotFound,
    /// The record's status does not allow a new attempt.
    Refused(TransitionError),
    Completed(AnalysisRecord),
    Failed(AnalysisRecord),
}

pub struct ReviewPipeline<S: Storage, P: ReviewProvider> {
    store: RecordStore<S>,
    provider: P,
}

impl<S: Storage, P: ReviewProvider> ReviewPipeline<S, P> {
    pub fn new(store: RecordStore<S>, provider: P) -> Self {
        Self { store, provider }
    }

    pub fn api_key_status(&self) -> ApiKeyStatus {
        ApiKeyStatus::from_configured(self.provider.is_configured())
    }

    /// Create a PENDING record from user input.
    ///
    /// A screenshot that cannot be encoded is logged and the record is
    /// still created; the missing preview surfaces as a validation error
    /// when analysis is attempted.
    pub fn submit(&mut self, new: NewAnalysis) -> Result<AnalysisRecord, SubmitError> {
        if new.screen_name.trim().is_empty() {
            return Err(SubmitError::MissingScreenName);
        }
        let screenshot = new.screenshot.as_ref().ok_or(SubmitError::MissingScreenshot)?;

        let preview = match encoding::encode(screenshot) {
            Ok(data_url) => Some(data_url),
            Err(e) => {
                log::error!("[PIPELINE] Error creating screenshot preview: {}", e);
                None
            }
        };

        let record = AnalysisRecord::pending(new, preview);
        self.store.insert(record.clone())?;
        log::info!("[PIPELINE] Submitted {} ({})", record.id, record.screen_name);
        Ok(record)
    }

    /// Run one analysis attempt for `id`.
    ///
    /// Only storage failures are returned as `Err`; everything that goes
    /// wrong with the attempt itself ends up on the record.
    pub async fn begin_analysis(&mut self, id: &str) -> Result<AnalysisOutcome, StoreError> {
        if !self.provider.is_configured() {
            log::warn!("[PIPELINE] Analysis of {} refused: provider not configured", id);
            return Ok(AnalysisOutcome::NotConfigured(NOT_CONFIGURED_NOTICE.to_string()));
        }

        let mut refused = None;
        let found = self.store.update_by_id(id, |record| {
            if let Err(e) = record.begin_analysis() {
                refused = Some(e);
            }
        })?;
        if !found {
            return Ok(AnalysisOutcome::NotFound);
        }
        if let Some(e) = refused {
            log::warn!("[PIPELINE] Analysis of {} refused: {}", id, e);
            return Ok(AnalysisOutcome::Refused(e));
        }

        let start = std::time::Instant::now();
        log::info!("[PIPELINE] Analyzing {}", id);

        let request = match self.store.get(id) {
            Some(record) => llm::build_request(record),
            None => return Ok(AnalysisOutcome::NotFound),
        };
        let result = match request {
            Ok(request) => self.provider.analyze(&request).await,
            Err(e) => Err(e),
        };

        let succeeded = result.is_ok();
        self.store.update_by_id(id, |record| {
            let transition = match result {
                Ok(report) => record.complete(report),
                Err(e) => {
                    log::error!("[PIPELINE] Error during analysis of {}: {}", record.id, e);
                    record.fail(e.to_string())
                }
            };
            if let Err(e) = transition {
                log::error!("[PIPELINE] Could not record result for {}: {}", record.id, e);
            }
        })?;

        log::info!(
            "[PIPELINE] {} finished in {}ms (success: {})",
            id,
            start.elapsed().as_millis(),
            succeeded
        );

        let record = match self.store.get(id) {
            Some(record) => record.clone(),
            None => return Ok(AnalysisOutcome::NotFound),
        };
        Ok(if succeeded {
            AnalysisOutcome::Completed(record)
        } else {
            AnalysisOutcome::Failed(record)
        })
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        self.store.delete_by_id(id)
    }

    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        self.store.clear_all()
    }

    pub fn records(&self) -> &[AnalysisRecord] {
        self.store.records()
    }

    pub fn get(&self, id: &str) -> Option<&AnalysisRecord> {
        self.store.get(id)
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RecordStore<S> {
        &mut self.store
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}
