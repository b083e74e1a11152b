//! `data:` URLs for embedding a video in the page.
//!
//! The processed video is small enough to inline, which keeps the rendered
//! page self-contained: `data:video/mp4;base64,AAAA...`.

use std::fmt::{Display, Formatter, Result as FmtResult};

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::VehicountError;

/// MIME type of every video the player embeds.
pub const VIDEO_MP4: &str = "video/mp4";

/// A base64 `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime_type: String,
    url: String,
}

impl DataUrl {
    /// Encode `bytes` as a `data:{mime_type};base64,...` URL.
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            url: format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)),
        }
    }

    /// Split a `data:` URL back into its MIME type and decoded bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VehicountError::InvalidDataUrl`] if the prefix is missing, the
    /// URL is not base64-encoded, or the payload is not valid base64.
    pub fn decode(url: &str) -> Result<(String, Vec<u8>), VehicountError> {
        let invalid = |reason: &str| VehicountError::InvalidDataUrl(reason.to_string());

        let rest = url.strip_prefix("data:").ok_or_else(|| invalid("missing data: prefix"))?;
        let (header, payload) = rest.split_once(',').ok_or_else(|| invalid("missing payload"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| invalid("not base64-encoded"))?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|error| invalid(&error.to_string()))?;

        Ok((mime_type.to_string(), bytes))
    }

    /// MIME type the URL declares.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The full URL.
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Display for DataUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.url)
    }
}
