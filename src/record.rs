//! Analysis records and their status machine.
//!
//! Lifecycle:
//!   Pending ──begin──▶ Analyzing ──complete──▶ Completed
//!                          │
//!                          └──fail──▶ Error ──begin──▶ Analyzing
//!
//! The report and the error message live inside [`AnalysisState`], so a
//! record can never carry a report unless it is completed, or an error
//! unless it failed. On disk the record is flattened back into the
//! loosely-typed JSON shape (`StoredRecord`); entries whose status
//! and fields disagree are rejected on load.

use crate::encoding::Screenshot;
use crate::error::TransitionError;
use serde::{Deserialize, Serialize};

/// Language tag assumed for a code snippet submitted without one.
pub const DEFAULT_CODE_LANGUAGE: &str = "tsx";

/// Message stored on records found mid-analysis at startup.
pub const INTERRUPTED_MESSAGE: &str =
    "Analysis was interrupted before it finished. Run the analysis again.";

/// Wire-level status tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Analyzing,
    Completed,
    Error,
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Status together with the data that only exists in that status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisState {
    Pending,
    Analyzing,
    Completed { report: String },
    Error { message: String },
}

impl AnalysisState {
    pub fn status(&self) -> AnalysisStatus {
        match self {
            AnalysisState::Pending => AnalysisStatus::Pending,
            AnalysisState::Analyzing => AnalysisStatus::Analyzing,
            AnalysisState::Completed { .. } => AnalysisStatus::Completed,
            AnalysisState::Error { .. } => AnalysisStatus::Error,
        }
    }

    /// Whether the "begin analysis" trigger may be offered.
    pub fn can_begin(&self) -> bool {
        matches!(self, AnalysisState::Pending | AnalysisState::Error { .. })
    }
}

/// Fields supplied by the user when adding a screen.
#[derive(Debug, Clone, Default)]
pub struct NewAnalysis {
    pub screen_name: String,
    pub url: Option<String>,
    pub screenshot: Option<Screenshot>,
    pub code_snippet: Option<String>,
    pub code_language: Option<String>,
}

/// One screenshot review request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "StoredRecord", try_from = "StoredRecord")]
pub struct AnalysisRecord {
    pub id: String,
    pub screen_name: String,
    pub url: Option<String>,
    /// Session-only blob; never serialized.
    pub screenshot: Option<Screenshot>,
    /// Base64 data URL; survives reload.
    pub screenshot_preview: Option<String>,
    pub code_snippet: Option<String>,
    pub code_language: Option<String>,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    state: AnalysisState,
}

impl AnalysisRecord {
    /// Build a fresh PENDING record with a new id and the current time.
    pub fn pending(new: NewAnalysis, screenshot_preview: Option<String>) -> Self {
        let code_snippet = non_blank(new.code_snippet);
        let code_language = if code_snippet.is_some() {
            Some(non_blank(new.code_language).unwrap_or_else(|| DEFAULT_CODE_LANGUAGE.to_string()))
        } else {
            None
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            screen_name: new.screen_name.trim().to_string(),
            url: non_blank(new.url),
            screenshot: new.screenshot,
            screenshot_preview,
            code_snippet,
            code_language,
            timestamp: now_millis(),
            state: AnalysisState::Pending,
        }
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn status(&self) -> AnalysisStatus {
        self.state.status()
    }

    pub fn analysis_report(&self) -> Option<&str> {
        match &self.state {
            AnalysisState::Completed { report } => Some(report),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            AnalysisState::Error { message } => Some(message),
            _ => None,
        }
    }

    /// PENDING or ERROR → ANALYZING. Clears any previous error.
    pub fn begin_analysis(&mut self) -> Result<(), TransitionError> {
        match self.state {
            AnalysisState::Pending | AnalysisState::Error { .. } => {
                self.state = AnalysisState::Analyzing;
                Ok(())
            }
            AnalysisState::Analyzing => Err(TransitionError::AlreadyAnalyzing),
            AnalysisState::Completed { .. } => Err(TransitionError::AlreadyCompleted),
        }
    }

    /// ANALYZING → COMPLETED.
    pub fn complete(&mut self, report: String) -> Result<(), TransitionError> {
        if self.state != AnalysisState::Analyzing {
            return Err(TransitionError::NotAnalyzing);
        }
        self.state = AnalysisState::Completed { report };
        Ok(())
    }

    /// ANALYZING → ERROR.
    pub fn fail(&mut self, message: String) -> Result<(), TransitionError> {
        if self.state != AnalysisState::Analyzing {
            return Err(TransitionError::NotAnalyzing);
        }
        self.state = AnalysisState::Error { message };
        Ok(())
    }

    /// A record persisted as ANALYZING has no call behind it any more.
    /// Moves it to ERROR so the trigger is offered again. Returns whether
    /// anything changed.
    pub fn recover_interrupted(&mut self) -> bool {
        self.fail(INTERRUPTED_MESSAGE.to_string()).is_ok()
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ── Persisted shape ──────────────────────────────────────────────────

/// Flat JSON form of a record, one element of the `screenAnalyses` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    id: String,
    screen_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(
        default,
        alias = "screenshotPreviewUrl",
        skip_serializing_if = "Option::is_none"
    )]
    screenshot_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analysis_report: Option<String>,
    status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: i64,
}

impl From<AnalysisRecord> for StoredRecord {
    fn from(record: AnalysisRecord) -> Self {
        let status = record.status();
        let (analysis_report, error) = match record.state {
            AnalysisState::Completed { report } => (Some(report), None),
            AnalysisState::Error { message } => (None, Some(message)),
            AnalysisState::Pending | AnalysisState::Analyzing => (None, None),
        };
        Self {
            id: record.id,
            screen_name: record.screen_name,
            url: record.url,
            screenshot_preview: record.screenshot_preview,
            code_snippet: record.code_snippet,
            code_language: record.code_language,
            analysis_report,
            status,
            error,
            timestamp: record.timestamp,
        }
    }
}

impl TryFrom<StoredRecord> for AnalysisRecord {
    type Error = String;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        let state = match (stored.status, stored.analysis_report, stored.error) {
            (AnalysisStatus::Pending, None, None) => AnalysisState::Pending,
            (AnalysisStatus::Analyzing, None, None) => AnalysisState::Analyzing,
            (AnalysisStatus::Completed, Some(report), None) => AnalysisState::Completed { report },
            (AnalysisStatus::Error, None, Some(message)) => AnalysisState::Error { message },
            (status, report, error) => {
                return Err(format!(
                    "record {} has status {} but report={} error={}",
                    stored.id,
                    status,
                    report.is_some(),
                    error.is_some()
                ))
            }
        };
        Ok(Self {
            id: stored.id,
            screen_name: stored.screen_name,
            url: non_blank(stored.url),
            screenshot: None,
            screenshot_preview: stored.screenshot_preview,
            code_snippet: stored.code_snippet,
            code_language: stored.code_language,
            timestamp: stored.timestamp,
            state,
        })
    }
}
