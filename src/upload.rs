//! Uploaded video files.
//!
//! [`UploadedVideo`] holds the bytes a user submitted together with the
//! media type derived from the file name. Only MP4 and AVI uploads are
//! accepted; anything else is rejected before a request is made.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::error::VehicountError;

/// Container types accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// MPEG-4 (`.mp4`).
    Mp4,
    /// Audio Video Interleave (`.avi`).
    Avi,
}

impl MediaKind {
    /// Guess the kind from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, extension) = file_name.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "mp4" => Some(MediaKind::Mp4),
            "avi" => Some(MediaKind::Avi),
            _ => None,
        }
    }

    /// MIME type sent with the multipart part.
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaKind::Mp4 => "video/mp4",
            MediaKind::Avi => "video/x-msvideo",
        }
    }
}

/// A video received from the user, held in memory until it is forwarded.
#[derive(Clone)]
pub struct UploadedVideo {
    file_name: String,
    kind: MediaKind,
    bytes: Vec<u8>,
}

impl Debug for UploadedVideo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("UploadedVideo")
            .field("file_name", &self.file_name)
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl UploadedVideo {
    /// Wrap an upload, validating its extension and size.
    ///
    /// # Errors
    ///
    /// Returns [`VehicountError::InvalidUpload`] if the file is empty or is
    /// not an `.mp4` / `.avi` file.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, VehicountError> {
        let file_name = file_name.into();
        let kind = MediaKind::from_file_name(&file_name).ok_or_else(|| {
            VehicountError::InvalidUpload {
                file_name: file_name.clone(),
                reason: "only .mp4 and .avi files are accepted".to_string(),
            }
        })?;

        if bytes.is_empty() {
            return Err(VehicountError::InvalidUpload {
                file_name,
                reason: "file is empty".to_string(),
            });
        }

        Ok(Self {
            file_name,
            kind,
            bytes,
        })
    }

    /// Name the user gave the file.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Container type.
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Raw file contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(MediaKind::from_file_name("traffic.MP4"), Some(MediaKind::Mp4));
        assert_eq!(MediaKind::from_file_name("a.b.avi"), Some(MediaKind::Avi));
        assert_eq!(MediaKind::from_file_name("clip.mkv"), None);
        assert_eq!(MediaKind::from_file_name("mp4"), None);
    }

    #[test]
    fn rejects_unsupported_and_empty() {
        let error = UploadedVideo::new("notes.txt", vec![1, 2, 3]).unwrap_err();
        assert!(error.to_string().contains("only .mp4 and .avi"));

        let error = UploadedVideo::new("clip.mp4", Vec::new()).unwrap_err();
        assert!(error.to_string().contains("empty"));
    }

    #[test]
    fn debug_hides_payload() {
        let upload = UploadedVideo::new("clip.avi", vec![0; 64]).unwrap();
        let debug = format!("{upload:?}");
        assert!(debug.contains("len: 64"));
        assert_eq!(upload.kind().mime_type(), "video/x-msvideo");
    }
}
