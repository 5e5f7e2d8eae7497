use bytes::Bytes;
use common::error::AppError;
use mime::Mime;

/// Media types accepted as a PDF document.
const ACCEPTED_MEDIA_TYPES: [&str; 2] = ["application/pdf", "application/x-pdf"];

/// A single uploaded file, as received at the ingestion boundary.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    /// Media type declared by the client, if any.
    pub media_type: Option<String>,
    pub bytes: Bytes,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, media_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            media_type,
            bytes,
        }
    }

    /// The declared media type, or a guess from the file name when the
    /// client declared none.
    pub fn effective_media_type(&self) -> Option<Mime> {
        match self.media_type.as_deref().map(str::trim) {
            Some(declared) if !declared.is_empty() => declared.parse().ok(),
            _ => mime_guess::from_path(&self.file_name).first(),
        }
    }

    /// Rejects anything that is not a non-empty PDF before it reaches storage.
    pub fn validate(&self) -> Result<(), AppError> {
        let media_type = self.effective_media_type();
        let accepted = media_type
            .as_ref()
            .is_some_and(|m| ACCEPTED_MEDIA_TYPES.contains(&m.essence_str()));

        if !accepted {
            let declared = media_type.map_or_else(|| "unknown".to_string(), |m| m.to_string());
            return Err(AppError::InvalidDocument(format!(
                "'{}' has media type {declared}; only PDF documents are accepted",
                self.file_name
            )));
        }

        if self.bytes.is_empty() {
            return Err(AppError::InvalidDocument(format!(
                "'{}' is empty",
                self.file_name
            )));
        }

        Ok(())
    }
}
