//! Analysis request builder.
//!
//! Turns a record into the ordered parts of a provider call:
//! instruction text, then the inline image, then the code snippet when
//! there is one. The order is part of the provider contract.

use crate::encoding;
use crate::error::AnalysisError;
use crate::record::AnalysisRecord;
use serde::Serialize;

use super::prompts;

/// Inline image payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Raw base64, no data URL header.
    pub data: String,
}

/// One content part, serialized in Gemini's shape:
/// `{"text": ...}` or `{"inlineData": {"mimeType": ..., "data": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentPart {
    Text(String),
    InlineData(InlineData),
}

/// Ordered parts of one review request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub parts: Vec<ContentPart>,
}

/// Build the request for `record`.
///
/// The persisted preview is the primary image source. A record created in
/// this session without a preview falls back to its in-memory blob. A
/// malformed preview fails immediately instead of falling through to a
/// generic "missing" error.
pub fn build_request(record: &AnalysisRecord) -> Result<AnalysisRequest, AnalysisError> {
    let (data, mime_type) = screenshot_payload(record)?;

    let code = record.code_snippet.as_deref();
    let language = record.code_language.as_deref();

    let mut parts = vec![
        ContentPart::Text(prompts::build_review_prompt(
            Some(record.screen_name.as_str()).filter(|s| !s.is_empty()),
            record.url.as_deref(),
            language,
            code.is_some(),
        )),
        ContentPart::InlineData(InlineData { mime_type, data }),
    ];
    if let Some(snippet) = code {
        parts.push(ContentPart::Text(prompts::build_code_part(snippet, language)));
    }

    log::debug!(
        "[REQUEST] Built {} parts for {} (code: {})",
        parts.len(),
        record.id,
        code.is_some()
    );
    Ok(AnalysisRequest { parts })
}

fn screenshot_payload(record: &AnalysisRecord) -> Result<(String, String), AnalysisError> {
    if let Some(preview) = record.screenshot_preview.as_deref() {
        return encoding::extract_payload(preview).map_err(|e| {
            log::warn!("[REQUEST] Bad screenshot preview on {}: {}", record.id, e);
            AnalysisError::Validation(format!(
                "Screenshot preview is not a valid base64 data URL ({}). Add the screen again with a fresh screenshot.",
                e
            ))
        });
    }

    if let Some(screenshot) = record.screenshot.as_ref() {
        let data_url = encoding::encode(screenshot).map_err(|e| {
            AnalysisError::Validation(format!("Screenshot could not be read: {}", e))
        })?;
        return encoding::extract_payload(&data_url)
            .map_err(|e| AnalysisError::Validation(e.to_string()));
    }

    Err(AnalysisError::Validation(
        "Screenshot data is missing. Please add the screen again with a valid screenshot."
            .to_string(),
    ))
}
