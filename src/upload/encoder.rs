//! Upload ingestion and the base64 transport encoding.

use std::fmt::Display;
use std::path::Path;

use axum::body::Bytes;
use base64::{Engine, engine::general_purpose::STANDARD};
use futures::{Stream, StreamExt};
use serde::Serialize;

use super::media::MediaType;

/// Default upload ceiling (10MB).
pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Shown to the user for every [`DecodeError`].
pub const UNREADABLE_FILE: &str =
    "We couldn't read that file. Please upload a PDF, PNG, JPG or WEBP report and try again.";

/// Errors raised while reading or decoding an uploaded file.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The request carried no file.
    #[error("no file was attached")]
    Missing,

    /// The upload stream failed part-way through.
    #[error("failed to read upload: {0}")]
    Read(String),

    /// The declared (or guessed) type is not one we accept.
    #[error("unsupported media type: {0}")]
    UnsupportedType(String),

    /// Zero bytes were received.
    #[error("uploaded file is empty")]
    Empty,

    /// The file exceeded the configured ceiling.
    #[error("file exceeds {limit} bytes")]
    TooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The bytes do not look like the declared type.
    #[error("declared {declared} but content looks like {detected}")]
    ContentMismatch {
        /// Type the browser declared.
        declared: MediaType,
        /// Type sniffed from the content, or "unknown".
        detected: String,
    },

    /// A payload did not contain valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl DecodeError {
    /// Message safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        UNREADABLE_FILE
    }
}

/// Limits applied while ingesting an upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Maximum accepted size in bytes.
    pub max_bytes: usize,
    /// Reject files whose magic bytes disagree with the declared type.
    pub verify_content_type: bool,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            verify_content_type: true,
        }
    }
}

/// A report file held in memory for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    name: String,
    media_type: MediaType,
    bytes: Bytes,
}

impl UploadedFile {
    /// Build a file from bytes already in memory.
    pub fn new(name: impl AsRef<str>, media_type: MediaType, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: sanitize_file_name(name.as_ref()),
            media_type,
            bytes: bytes.into(),
        }
    }

    /// Sanitized file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Media type as declared by the uploader.
    #[must_use]
    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Raw content.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the content, for serving it back.
    #[must_use]
    pub fn content(&self) -> Bytes {
        self.bytes.clone()
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Byte-free summary for views and logs.
    #[must_use]
    pub fn summary(&self) -> FileSummary {
        FileSummary {
            name: self.name.clone(),
            media_type: self.media_type,
            size: self.size(),
        }
    }
}

/// What views need to know about a file, without its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    /// Sanitized file name.
    pub name: String,
    /// Declared media type.
    pub media_type: MediaType,
    /// Size in bytes.
    pub size: usize,
}

impl FileSummary {
    /// Size rounded to whole kilobytes, as shown in the preview.
    #[must_use]
    pub fn size_kb(&self) -> usize {
        (self.size + 512) / 1024
    }
}

/// Text-safe representation of a file, ready to inline in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    media_type: String,
    data: String,
}

impl EncodedPayload {
    /// Declared media type, verbatim.
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Base64 data.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }
}

/// Read an upload stream into an [`UploadedFile`].
///
/// `declared` is the content type the client sent; when absent the type is
/// guessed from `name`. The stream is consumed chunk by chunk so oversize
/// uploads are cut off as soon as they cross the limit.
pub async fn ingest<S, B, E>(
    name: &str,
    declared: Option<&str>,
    stream: S,
    limits: UploadLimits,
) -> Result<UploadedFile, DecodeError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let media_type = match declared.filter(|d| !d.trim().is_empty()) {
        Some(mime) if mime != "application/octet-stream" => MediaType::from_mime(mime)
            .ok_or_else(|| DecodeError::UnsupportedType(mime.to_string()))?,
        _ => MediaType::from_file_name(name)
            .ok_or_else(|| DecodeError::UnsupportedType(name.to_string()))?,
    };

    let mut buf = Vec::new();
    futures::pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DecodeError::Read(e.to_string()))?;
        let chunk = chunk.as_ref();
        if buf.len() + chunk.len() > limits.max_bytes {
            return Err(DecodeError::TooLarge {
                limit: limits.max_bytes,
            });
        }
        buf.extend_from_slice(chunk);
    }

    if buf.is_empty() {
        return Err(DecodeError::Empty);
    }

    if limits.verify_content_type {
        let detected = MediaType::sniff(&buf);
        if detected != Some(media_type) {
            return Err(DecodeError::ContentMismatch {
                declared: media_type,
                detected: detected.map_or_else(|| "unknown".to_string(), String::from),
            });
        }
    }

    Ok(UploadedFile::new(name, media_type, buf))
}

/// Encode a file for transport.
#[must_use]
pub fn encode(file: &UploadedFile) -> EncodedPayload {
    EncodedPayload {
        media_type: file.media_type().as_mime().to_string(),
        data: STANDARD.encode(file.bytes()),
    }
}

/// Recover the exact bytes from a payload.
pub fn decode(payload: &EncodedPayload) -> Result<Vec<u8>, DecodeError> {
    Ok(STANDARD.decode(payload.data())?)
}

/// Strip path components and control characters, limit length.
fn sanitize_file_name(original: &str) -> String {
    let name = Path::new(original.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let clean: String = name
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "report".to_string()
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF";

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<&'static [u8], Infallible>> {
        futures::stream::iter(parts.to_vec().into_iter().map(Ok))
    }

    #[test]
    fn test_round_trip_preserves_bytes() {
        let mut all: Vec<u8> = (0..=255).collect();
        all.extend_from_slice(&[0, 0, 0xFF, 0xFE, b'\n', b'\r']);

        for len in [0, 1, 2, 3, 4, 5, 255, all.len()] {
            let file = UploadedFile::new("blob.pdf", MediaType::Pdf, all[..len].to_vec());
            let payload = encode(&file);
            assert!(payload.data().is_ascii());
            assert_eq!(decode(&payload).unwrap(), &all[..len]);
        }
    }

    #[test]
    fn test_encode_preserves_declared_type() {
        // Declared type wins even if the content says otherwise.
        let file = UploadedFile::new("scan.png", MediaType::Png, PDF.to_vec());
        assert_eq!(encode(&file).media_type(), "image/png");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let payload = EncodedPayload {
            media_type: "application/pdf".into(),
            data: "not base64!!".into(),
        };
        assert!(matches!(decode(&payload), Err(DecodeError::Base64(_))));
    }

    #[tokio::test]
    async fn test_ingest_concatenates_chunks() {
        let file = ingest(
            "report.pdf",
            Some("application/pdf"),
            chunks(&[&PDF[..5], &PDF[5..]]),
            UploadLimits::default(),
        )
        .await
        .unwrap();

        assert_eq!(file.name(), "report.pdf");
        assert_eq!(file.media_type(), MediaType::Pdf);
        assert_eq!(file.bytes(), PDF);
    }

    #[tokio::test]
    async fn test_ingest_guesses_type_from_name() {
        let file = ingest("report.pdf", None, chunks(&[PDF]), UploadLimits::default())
            .await
            .unwrap();
        assert_eq!(file.media_type(), MediaType::Pdf);

        let file = ingest(
            "report.pdf",
            Some("application/octet-stream"),
            chunks(&[PDF]),
            UploadLimits::default(),
        )
        .await
        .unwrap();
        assert_eq!(file.media_type(), MediaType::Pdf);
    }

    #[tokio::test]
    async fn test_ingest_rejects_unsupported_type() {
        let err = ingest(
            "notes.txt",
            Some("text/plain"),
            chunks(&[b"hello"]),
            UploadLimits::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedType(_)));
    }

    #[tokio::test]
    async fn test_ingest_rejects_empty() {
        let err = ingest(
            "report.pdf",
            Some("application/pdf"),
            chunks(&[]),
            UploadLimits::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DecodeError::Empty));
    }

    #[tokio::test]
    async fn test_ingest_enforces_limit() {
        let limits = UploadLimits {
            max_bytes: 10,
            verify_content_type: false,
        };
        let err = ingest(
            "report.pdf",
            Some("application/pdf"),
            chunks(&[&PDF[..6], &PDF[6..]]),
            limits,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge { limit: 10 }));
    }

    #[tokio::test]
    async fn test_ingest_surfaces_stream_failure() {
        let stream = futures::stream::iter(vec![Ok(&PDF[..4]), Err("connection reset")]);
        let err = ingest(
            "report.pdf",
            Some("application/pdf"),
            stream,
            UploadLimits::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DecodeError::Read(msg) if msg == "connection reset"));
    }

    #[tokio::test]
    async fn test_ingest_detects_content_mismatch() {
        let err = ingest(
            "photo.png",
            Some("image/png"),
            chunks(&[PDF]),
            UploadLimits::default(),
        )
        .await
        .unwrap_err();
        match err {
            DecodeError::ContentMismatch { declared, detected } => {
                assert_eq!(declared, MediaType::Png);
                assert_eq!(detected, "application/pdf");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let relaxed = UploadLimits {
            verify_content_type: false,
            ..UploadLimits::default()
        };
        let file = ingest("photo.png", Some("image/png"), chunks(&[PDF]), relaxed)
            .await
            .unwrap();
        assert_eq!(file.media_type(), MediaType::Png);
    }

    #[tokio::test]
    async fn test_ingest_accepts_pdf_with_leading_bytes() {
        let bom_pdf: &[u8] = b"\xEF\xBB\xBF%PDF-1.4\n%%EOF";
        let file = ingest(
            "report.pdf",
            Some("application/pdf"),
            chunks(&[bom_pdf]),
            UploadLimits::default(),
        )
        .await
        .unwrap();
        assert_eq!(file.media_type(), MediaType::Pdf);
        assert_eq!(file.bytes(), bom_pdf);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\scans\\mri.png"), "C:scansmri.png");
        assert_eq!(sanitize_file_name(""), "report");
        assert_eq!(sanitize_file_name("a\u{0}b.pdf"), "ab.pdf");
    }

    #[test]
    fn test_summary_size_kb() {
        let file = UploadedFile::new("r.pdf", MediaType::Pdf, vec![0u8; 2 * 1024 * 1024]);
        assert_eq!(file.summary().size_kb(), 2048);
        assert_eq!(file.summary().size, 2 * 1024 * 1024);
    }
}
