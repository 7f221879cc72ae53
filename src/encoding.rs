//! Screenshot blobs and their base64 data URL form.
//!
//! A `Screenshot` only lives for the session that submitted it. The data URL
//! produced by [`encode`] is what gets persisted and what analysis payloads
//! are rebuilt from after a reload.

use crate::error::{EncodeError, SubmitError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::borrow::Cow;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Largest screenshot accepted at submission.
pub const MAX_SCREENSHOT_BYTES: u64 = 5 * 1024 * 1024;

/// Enough leading bytes for `image::guess_format` to tell the supported types apart.
const SNIFF_LEN: u64 = 32;

/// Image types the provider accepts inline.
pub const SUPPORTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlobSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// An in-memory (or on-disk) screenshot with its declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    mime_type: String,
    source: BlobSource,
}

impl Screenshot {
    /// Open a screenshot file for submission.
    ///
    /// The MIME type is sniffed from the file's magic bytes, not its
    /// extension. Rejects files over 5 MiB and anything that is not PNG,
    /// JPEG, WEBP or GIF. Only the header is read here; the full read
    /// happens in [`encode`], which checks the same limits again.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SubmitError> {
        let path = path.as_ref();
        let unreadable = |e: std::io::Error| {
            SubmitError::InvalidScreenshot(format!("Failed to read {}: {}", path.display(), e))
        };
        let file = std::fs::File::open(path).map_err(unreadable)?;
        let len = file.metadata().map_err(unreadable)?.len();
        if len > MAX_SCREENSHOT_BYTES {
            return Err(SubmitError::InvalidScreenshot(
                "Screenshot file size should not exceed 5MB.".to_string(),
            ));
        }

        let mut header = Vec::new();
        file.take(SNIFF_LEN)
            .read_to_end(&mut header)
            .map_err(unreadable)?;
        let mime_type = sniff_mime_type(&header).ok_or_else(|| {
            SubmitError::InvalidScreenshot(
                "Invalid file type. Please upload PNG, JPG, WEBP or GIF.".to_string(),
            )
        })?;

        log::info!(
            "[ENCODE] Screenshot {} accepted ({}, {} bytes)",
            path.display(),
            mime_type,
            len
        );
        Ok(Self {
            mime_type: mime_type.to_string(),
            source: BlobSource::File(path.to_path_buf()),
        })
    }

    /// Wrap bytes that are already in memory. The MIME type is taken as given.
    pub fn from_bytes(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            source: BlobSource::Bytes(bytes),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The bytes to encode. A file is re-checked against the size limit
    /// and the type sniffed at submission, since it may have changed since.
    fn read(&self) -> Result<Cow<'_, [u8]>, EncodeError> {
        let path = match &self.source {
            BlobSource::Bytes(bytes) => return Ok(Cow::Borrowed(bytes.as_slice())),
            BlobSource::File(path) => path,
        };
        let bytes = std::fs::read(path)
            .map_err(|e| EncodeError::Unreadable(format!("{}: {}", path.display(), e)))?;
        if bytes.len() as u64 > MAX_SCREENSHOT_BYTES
            || sniff_mime_type(&bytes) != Some(self.mime_type.as_str())
        {
            return Err(EncodeError::Unreadable(format!(
                "{} changed since it was selected",
                path.display()
            )));
        }
        Ok(Cow::Owned(bytes))
    }
}

fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(bytes).ok()?;
    let mime = format.to_mime_type();
    SUPPORTED_MIME_TYPES.contains(&mime).then_some(mime)
}

/// Encode a screenshot as `data:<mime>;base64,<payload>`.
pub fn encode(screenshot: &Screenshot) -> Result<String, EncodeError> {
    let bytes = screenshot.read()?;
    Ok(format!(
        "data:{};base64,{}",
        screenshot.mime_type,
        STANDARD.encode(bytes)
    ))
}

/// Split a data URL into `(base64_payload, mime_type)`.
///
/// The payload is checked to be valid standard base64 so a corrupt preview
/// is caught here rather than by the provider.
pub fn extract_payload(data_url: &str) -> Result<(String, String), EncodeError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| EncodeError::Format("missing `data:` prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| EncodeError::Format("missing `,` separator".to_string()))?;

    let mut params = header.split(';');
    let mime_type = params.next().unwrap_or_default().trim();
    if !params.any(|p| p == "base64") {
        return Err(EncodeError::Format("header lacks `;base64` marker".to_string()));
    }
    if mime_type.is_empty() {
        return Err(EncodeError::Format("empty MIME type".to_string()));
    }
    if STANDARD.decode(payload).is_err() {
        return Err(EncodeError::Format("payload is not valid base64".to_string()));
    }

    Ok((payload.to_string(), mime_type.to_string()))
}
