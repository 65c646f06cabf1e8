//! User-attached images, carried as base64 data URIs.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Upper bound on attachment size, before encoding.
pub const MAX_ATTACHMENT_BYTES: usize = 20 * 1024 * 1024;

const SUPPORTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("not a base64 data URI")]
    NotDataUri,
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("attachment payload is not valid base64")]
    InvalidBase64,
    #[error("image is {bytes} bytes; the limit is {MAX_ATTACHMENT_BYTES}")]
    TooLarge { bytes: usize },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A validated `data:<mime>;base64,<payload>` image.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    mime_type: String,
    data: String,
}

impl std::fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("mime_type", &self.mime_type)
            .field("encoded_len", &self.data.len())
            .finish()
    }
}

impl ImageAttachment {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Result<Self, AttachmentError> {
        let mime_type = normalize_mime(mime_type)?;
        if bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(AttachmentError::TooLarge { bytes: bytes.len() });
        }
        Ok(Self {
            mime_type,
            data: STANDARD.encode(bytes),
        })
    }

    /// Read an image file; the type comes from the extension.
    pub fn from_file(path: &Path) -> Result<Self, AttachmentError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let mime_type = match extension.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            other => return Err(AttachmentError::UnsupportedType(format!(".{other}"))),
        };
        let bytes = std::fs::read(path).map_err(|source| AttachmentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(mime_type, &bytes)
    }

    pub fn parse_data_uri(uri: &str) -> Result<Self, AttachmentError> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or(AttachmentError::NotDataUri)?;
        let (header, data) = rest.split_once(',').ok_or(AttachmentError::NotDataUri)?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or(AttachmentError::NotDataUri)?;
        let mime_type = normalize_mime(mime_type)?;

        let decoded = STANDARD
            .decode(data)
            .map_err(|_| AttachmentError::InvalidBase64)?;
        if decoded.len() > MAX_ATTACHMENT_BYTES {
            return Err(AttachmentError::TooLarge {
                bytes: decoded.len(),
            });
        }
        Ok(Self {
            mime_type,
            data: data.to_string(),
        })
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload without the `data:` prefix.
    #[must_use]
    pub fn base64_data(&self) -> &str {
        &self.data
    }

    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

fn normalize_mime(raw: &str) -> Result<String, AttachmentError> {
    let mime = raw.trim().to_ascii_lowercase();
    let mime = if mime == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        mime
    };
    if SUPPORTED_MIME_TYPES.contains(&mime.as_str()) {
        Ok(mime)
    } else {
        Err(AttachmentError::UnsupportedType(raw.to_string()))
    }
}
