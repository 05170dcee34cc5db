//! Encoded image type and data URL helpers.

use crate::error::{EditError, Result};
use base64::Engine;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Content type assumed when a data URL carries no usable marker.
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// Declared type for files whose extension is not recognized.
const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// Prefix of exported file names.
const DOWNLOAD_PREFIX: &str = "visionai-edit-";

const DATA_URL_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Image formats recognized from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Maps a MIME type back to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        None
    }
}

/// An image held as a self-describing data URL.
///
/// Instances are immutable: an edit produces a new `EncodedImage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    content: String,
    content_type: String,
}

impl EncodedImage {
    /// Encodes raw bytes under the given content type.
    pub fn from_bytes(data: &[u8], content_type: &str) -> Self {
        let payload = base64::engine::general_purpose::STANDARD.encode(data);
        Self::from_base64(payload, content_type)
    }

    /// Wraps an already base64-encoded payload.
    pub fn from_base64(payload: impl AsRef<str>, content_type: &str) -> Self {
        Self {
            content: format!(
                "{DATA_URL_SCHEME}{content_type}{BASE64_MARKER}{}",
                payload.as_ref()
            ),
            content_type: content_type.to_string(),
        }
    }

    /// Wraps a data URL, reading the content type from its marker.
    pub fn from_data_url(content: impl Into<String>) -> Self {
        let content = content.into();
        let content_type = extract_content_type(&content);
        Self {
            content,
            content_type,
        }
    }

    /// Returns the full data URL.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the content type label (e.g. `image/png`).
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the base64 payload without the data URL marker.
    pub fn payload(&self) -> &str {
        strip_encoding_marker(&self.content)
    }

    /// Returns the format matching the content type, if known.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime_type(&self.content_type)
    }

    /// Decodes the payload back to raw bytes.
    ///
    /// Embedded whitespace and missing padding are tolerated.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let cleaned: String = self
            .payload()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
            return Ok(data);
        }

        base64::engine::general_purpose::STANDARD_NO_PAD
            .decode(&cleaned)
            .map_err(|e| EditError::Decode(e.to_string()))
    }

    /// Writes the decoded image to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.decode()?)?;
        Ok(())
    }

    /// Writes the decoded image into `dir` under a timestamped download name.
    pub fn export(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let path = dir
            .as_ref()
            .join(download_filename(timestamp_ms, &self.content_type));
        self.save(&path)?;
        tracing::debug!(path = %path.display(), "exported image");
        Ok(path)
    }
}

/// Reads a file and encodes it as a data URL.
///
/// The content type comes from the file's magic bytes, falling back to the
/// type declared by its extension.
pub fn encode_file(path: impl AsRef<Path>) -> Result<EncodedImage> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| EditError::Read(format!("{}: {e}", path.display())))?;
    encode_reader(file, declared_type_for_path(path))
}

/// Reads all bytes from `reader` and encodes them as a data URL.
pub fn encode_reader<R: Read>(mut reader: R, declared_type: &str) -> Result<EncodedImage> {
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|e| EditError::Read(e.to_string()))?;

    let content_type = match ImageFormat::from_magic_bytes(&data) {
        Some(format) => format.mime_type(),
        None if declared_type.is_empty() => UNKNOWN_CONTENT_TYPE,
        None => declared_type,
    };

    Ok(EncodedImage::from_bytes(&data, content_type))
}

/// Returns the payload portion of a data URL.
///
/// Everything up to and including the first `,` is discarded. The input is
/// returned unchanged when there is no `,` or nothing follows it.
pub fn strip_encoding_marker(encoded: &str) -> &str {
    match encoded.split_once(',') {
        Some((_, payload)) if !payload.is_empty() => payload,
        _ => encoded,
    }
}

/// Parses the content type from a `data:<type>;base64,` prefix.
///
/// Best-effort only: returns [`DEFAULT_CONTENT_TYPE`] when the marker is
/// absent or malformed.
pub fn extract_content_type(encoded: &str) -> String {
    let Some(rest) = encoded.strip_prefix(DATA_URL_SCHEME) else {
        return DEFAULT_CONTENT_TYPE.to_string();
    };

    // The marker must sit on the first line.
    let line = rest.split(['\n', '\r']).next().unwrap_or_default();
    match line.rfind(BASE64_MARKER) {
        Some(end) if end > 0 => line[..end].to_string(),
        _ => DEFAULT_CONTENT_TYPE.to_string(),
    }
}

/// Returns true if `content_type` names an image type.
pub fn is_image_type(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// Returns the content type a user-selected file declares through its
/// extension.
pub fn declared_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => UNKNOWN_CONTENT_TYPE,
    }
}

/// Builds the download file name for an image exported at `timestamp_ms`.
pub fn download_filename(timestamp_ms: u64, content_type: &str) -> String {
    let ext = ImageFormat::from_mime_type(content_type)
        .map(|f| f.extension())
        .unwrap_or("png");
    format!("{DOWNLOAD_PREFIX}{timestamp_ms}.{ext}")
}
