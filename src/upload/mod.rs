//! Report ingestion and transport encoding.
//!
//! Uploaded reports arrive as multipart streams, are checked against the
//! accepted [`MediaType`]s and the configured size ceiling, and are held as
//! an [`UploadedFile`] until an analysis attempt turns them into an
//! [`EncodedPayload`].
//!
//! # Example
//!
//! ```rust
//! use report_lens::upload::{MediaType, UploadedFile, decode, encode};
//!
//! let file = UploadedFile::new("report.pdf", MediaType::Pdf, b"%PDF-1.7".to_vec());
//! let payload = encode(&file);
//! assert_eq!(payload.media_type(), "application/pdf");
//! assert_eq!(decode(&payload).unwrap(), b"%PDF-1.7");
//! ```

mod encoder;
mod media;
mod multipart;

pub use encoder::{
    DEFAULT_MAX_BYTES, DecodeError, EncodedPayload, FileSummary, UNREADABLE_FILE, UploadLimits,
    UploadedFile, decode, encode, ingest,
};
pub use media::MediaType;
pub use multipart::{FILE_FIELD, read_report};
