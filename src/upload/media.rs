//! Accepted report media types.

use serde::{Deserialize, Serialize};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Media types a report can be uploaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MediaType {
    /// `image/png`
    Png,
    /// `image/jpeg`
    Jpeg,
    /// `image/webp`
    Webp,
    /// `application/pdf`
    Pdf,
}

impl MediaType {
    /// Bytes searched for the PDF header.
    pub const PDF_HEADER_WINDOW: usize = 1024;

    /// Every accepted type, in the order shown to users.
    pub const ALL: [Self; 4] = [Self::Pdf, Self::Png, Self::Jpeg, Self::Webp];

    /// The canonical MIME string.
    #[must_use]
    pub fn as_mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Pdf => "application/pdf",
        }
    }

    /// Short label for the upload hint ("PDF, PNG, JPG, WEBP").
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPG",
            Self::Webp => "WEBP",
            Self::Pdf => "PDF",
        }
    }

    /// Whether previews can render the file inline as an image.
    #[must_use]
    pub fn is_image(self) -> bool {
        !matches!(self, Self::Pdf)
    }

    /// Parse a declared content type.
    ///
    /// Matching is case-insensitive and ignores parameters such as
    /// `; charset=binary`.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_mime().eq_ignore_ascii_case(essence))
    }

    /// Guess the type from a file name when the browser sent none.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        mime_guess::from_path(name)
            .iter()
            .find_map(|m| Self::from_mime(m.essence_str()))
    }

    /// Detect the type from the leading magic bytes.
    ///
    /// The `%PDF-` header may start anywhere in the first
    /// [`PDF_HEADER_WINDOW`](Self::PDF_HEADER_WINDOW) bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => {
                let window = &bytes[..bytes.len().min(Self::PDF_HEADER_WINDOW)];
                window
                    .windows(PDF_MAGIC.len())
                    .any(|w| w == PDF_MAGIC)
                    .then_some(Self::Pdf)
            }
        }
    }

    /// Comma separated list used in the upload hint.
    #[must_use]
    pub fn accepted_labels() -> String {
        Self::ALL.map(Self::label).join(", ")
    }

    /// Value for the `accept` attribute of a file input.
    #[must_use]
    pub fn accept_attribute() -> String {
        Self::ALL.map(Self::as_mime).join(",")
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_mime())
    }
}

impl From<MediaType> for String {
    fn from(value: MediaType) -> Self {
        value.as_mime().to_string()
    }
}

impl TryFrom<String> for MediaType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_mime(&value).ok_or_else(|| format!("unsupported media type: {value}"))
    }
}
