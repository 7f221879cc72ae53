//! LLM domain: request building and the provider gateway.
//!
//! Public API for the review half of UI Refine.
//!
//!   - prompts.rs  — instruction text and code part
//!   - request.rs  — record → ordered content parts
//!   - provider.rs — `ReviewProvider` trait + provider metadata
//!   - gemini.rs   — Google Gemini implementation

pub mod gemini;
pub mod prompts;
pub mod provider;
pub mod request;

pub use gemini::GeminiProvider;
pub use provider::{ProviderInfo, ReviewProvider};
pub use request::{build_request, AnalysisRequest, ContentPart, InlineData};
