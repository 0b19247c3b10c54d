//! Pulls the report out of a `multipart/form-data` request.

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;

use super::encoder::{DecodeError, UploadLimits, UploadedFile, ingest};

/// Form field carrying the report.
pub const FILE_FIELD: &str = "file";

/// Read the `file` field, skipping any other fields.
///
/// An empty file input (no file name) counts as [`DecodeError::Missing`].
pub async fn read_report(
    multipart: &mut Multipart,
    limits: UploadLimits,
) -> Result<UploadedFile, DecodeError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, limits))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = match field.file_name() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => return Err(DecodeError::Missing),
        };
        let declared = field.content_type().map(str::to_string);

        return ingest(&name, declared.as_deref(), field, limits).await;
    }

    Err(DecodeError::Missing)
}

fn multipart_error(err: &MultipartError, limits: UploadLimits) -> DecodeError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        DecodeError::TooLarge {
            limit: limits.max_bytes,
        }
    } else {
        DecodeError::Read(err.body_text())
    }
}
