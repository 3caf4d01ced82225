/// Upload validation and data-URI encoding
///
/// Exactly one image per upload ends up in a draft. The declared MIME type
/// is checked first, then the payload's magic bytes; only an upload that
/// passes both is base64-encoded, off the main thread.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::ImageFormat;
use thiserror::Error;
use tokio::task;

/// MIME types an upload may declare
///
/// Exported so a shell can configure its file picker with the same set
/// `validate` enforces.
pub const ACCEPTED_MIME_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// Map an accepted MIME type to the format its payload must sniff as
fn expected_format(mime: &str) -> Option<ImageFormat> {
    match mime {
        "image/jpeg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        _ => None,
    }
}

/// A single candidate upload: declared type plus binary payload
#[derive(Debug, Clone)]
pub struct PhotoFile {
    /// Original filename, kept for messages only
    pub name: String,
    /// Declared MIME type, e.g. "image/png"
    pub mime: String,
    /// Raw file bytes
    pub bytes: Vec<u8>,
}

/// Why an upload was rejected
#[derive(Debug, Error)]
pub enum PhotoError {
    /// Declared type is not one of the accepted MIME types
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    /// Payload bytes do not look like the declared type
    #[error("payload of '{name}' is not valid {mime} data")]
    PayloadMismatch { name: String, mime: String },
    /// Background encode task did not complete
    #[error("encode task failed: {0}")]
    TaskFailed(String),
}

/// Check an upload against the accept policy
///
/// The declared MIME type must be exactly one of ACCEPTED_MIME_TYPES, and
/// the payload's magic bytes must agree with it. A mislabeled payload is
/// rejected the same way as a wrong declared type, so nothing that is not
/// actually a JPEG or PNG can reach the store.
///
/// # Arguments
/// * `file` - The candidate upload
///
/// # Returns
/// * `Ok(())` - The upload is acceptable
/// * `Err(PhotoError)` - Rejection reason; the caller leaves its draft unchanged
pub fn validate(file: &PhotoFile) -> Result<(), PhotoError> {
    let expected = match expected_format(&file.mime) {
        Some(format) => format,
        None => return Err(PhotoError::UnsupportedType(file.mime.clone())),
    };

    match image::guess_format(&file.bytes) {
        Ok(format) if format == expected => Ok(()),
        _ => Err(PhotoError::PayloadMismatch {
            name: file.name.clone(),
            mime: file.mime.clone(),
        }),
    }
}

/// Encode an accepted upload into a storable data URI
///
/// Runs the base64 step on the blocking pool because payloads can be
/// several megabytes. This is the only suspension point in the edit core.
///
/// # Arguments
/// * `file` - An upload that already passed `validate`
///
/// # Returns
/// * `Ok(String)` - "data:<mime>;base64,<payload>"
/// * `Err(PhotoError)` - The background task could not be joined
pub async fn encode_data_uri(file: PhotoFile) -> Result<String, PhotoError> {
    task::spawn_blocking(move || {
        format!("data:{};base64,{}", file.mime, BASE64.encode(&file.bytes))
    })
    .await
    .map_err(|e| PhotoError::TaskFailed(e.to_string()))
}
