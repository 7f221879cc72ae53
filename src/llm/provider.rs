//! Review provider trait: the seam between the pipeline and the network.
//!
//! `GeminiProvider` is the production implementation. Tests plug in stubs.

use crate::error::AnalysisError;
use serde::Serialize;
use std::future::Future;

use super::request::AnalysisRequest;

/// A service that turns a screenshot review request into report text.
pub trait ReviewProvider {
    /// Whether a credential is present. Checked before any attempt.
    fn is_configured(&self) -> bool;

    /// Run one review. Errors are already classified for display.
    fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> impl Future<Output = Result<String, AnalysisError>> + Send;
}

/// Provider metadata shown by the `status` command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub env_key: String,
    pub model: String,
    pub configured: bool,
}
