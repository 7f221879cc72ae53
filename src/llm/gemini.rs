//! Gemini gateway: one non-streaming `generateContent` call per review.
//!
//! - API key in the `x-goog-api-key` header
//! - Parts go out in the order the request builder produced them
//! - Report text is every `candidates[0].content.parts[*].text` joined
//! - Failures are classified into `AnalysisError` here, so the pipeline only
//!   ever stores a display string

use super::provider::{ProviderInfo, ReviewProvider};
use super::request::AnalysisRequest;
use crate::error::AnalysisError;
use reqwest::StatusCode;

pub const GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_ENV_KEY: &str = "GEMINI_API_KEY";

/// Gemini Flash pricing, used only for the cost log line.
const INPUT_COST_PER_MILLION: f64 = 0.30;
const OUTPUT_COST_PER_MILLION: f64 = 2.50;

pub struct GeminiProvider {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Blank keys count as absent.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the gateway at another host (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxy settings).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: "gemini".to_string(),
            name: format!("Google Gemini ({})", self.model),
            env_key: GEMINI_ENV_KEY.to_string(),
            model: self.model.clone(),
            configured: self.is_configured(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl ReviewProvider for GeminiProvider {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, AnalysisError> {
        let api_key = match self.api_key.as_deref() {
            Some(key) => key,
            None => {
                log::warn!("[LLM] No {} set, refusing analysis", GEMINI_ENV_KEY);
                return Err(AnalysisError::Config);
            }
        };

        log::info!("[LLM] Provider: gemini");
        log::info!("[LLM] Model: {}", self.model);
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "contents": [
                    {
                        "role": "user",
                        "parts": request.parts,
                    }
                ]
            }))
            .send()
            .await
            .map_err(|e| {
                log::error!("[LLM] HTTP request failed: {}", e);
                AnalysisError::Network(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            log::error!("[LLM] Failed to read response body: {}", e);
            AnalysisError::Network(e.to_string())
        })?;
        log::info!("[LLM] Response {} in {}ms", status, start.elapsed().as_millis());

        if !status.is_success() {
            log::error!("[LLM] Gemini API returned {}: {}", status, body);
            return Err(classify_failure(status, &body, &self.model));
        }

        let json: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            log::error!("[LLM] Unparseable success body: {}", e);
            AnalysisError::Provider(format!("Unreadable response: {}", e))
        })?;

        if let Some(usage) = json.get("usageMetadata") {
            let input_tokens = usage["promptTokenCount"].as_u64().unwrap_or(0);
            let output_tokens = usage["candidatesTokenCount"].as_u64().unwrap_or(0);
            let cost = (input_tokens as f64 * INPUT_COST_PER_MILLION
                + output_tokens as f64 * OUTPUT_COST_PER_MILLION)
                / 1_000_000.0;
            log::info!(
                "[LLM] Tokens in/out: {}/{} (~${:.6})",
                input_tokens,
                output_tokens,
                cost
            );
        }

        if let Some(reason) = json
            .pointer("/promptFeedback/blockReason")
            .and_then(|r| r.as_str())
        {
            log::warn!("[LLM] Prompt blocked: {}", reason);
            return Err(AnalysisError::Provider(format!(
                "The request was blocked by Gemini ({})",
                reason
            )));
        }

        match extract_report_text(&json) {
            Some(text) => {
                log::info!("[LLM] Report: {} chars", text.len());
                Ok(text)
            }
            None => {
                log::warn!("[LLM] Empty response body: {}", body);
                Err(AnalysisError::EmptyResponse)
            }
        }
    }
}

/// Map a non-success HTTP response to an error kind.
///
/// Gemini answers a bad key with 400 + `API_KEY_INVALID`, so the body is
/// checked as well as the status.
pub fn classify_failure(status: StatusCode, body: &str, model: &str) -> AnalysisError {
    let lower = body.to_lowercase();
    let detail = error_detail(body);

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || lower.contains("api_key_invalid")
        || lower.contains("api key not valid")
    {
        return AnalysisError::Auth;
    }

    if status == StatusCode::NOT_FOUND || (lower.contains("model") && lower.contains("not found")) {
        return AnalysisError::Provider(format!(
            "The Gemini model '{}' is not found or not available. Details: {}",
            model, detail
        ));
    }

    AnalysisError::Provider(format!("HTTP {}: {}", status.as_u16(), detail))
}

/// `error.message` from a Gemini error body, or the raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "Unknown API error".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

/// Join the text parts of the first candidate. `None` if there is no
/// non-blank text.
pub fn extract_report_text(json: &serde_json::Value) -> Option<String> {
    let parts = json
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
