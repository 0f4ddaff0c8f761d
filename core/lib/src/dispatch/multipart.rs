//! Buffers a `multipart/form-data` body into named parts via [`multer`].
//!
//! Only classes with a byte-stream/buffer parameter set the
//! multipart-enabled flag; callers check that before
//! reaching for this module.

use multer::Multipart;

use crate::error::{Error, Result};

use super::request::MultipartPart;

/// Maximum bytes buffered across an entire multipart body. Any larger body
/// is rejected rather than exhausting memory.
const MAX_BUFFERED_BYTES: usize = 32 * 1024 * 1024;

/// Drains an already-constructed [`multer::Multipart`] into buffered
/// parts. Building the `Multipart` from the framework's body stream is the
/// adapter's job; this only owns what happens after.
pub async fn buffer_multipart(mut multipart: Multipart<'_>) -> Result<Vec<MultipartPart>> {
    let mut parts = Vec::new();
    let mut total = 0usize;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| Error::Argument(e.to_string()))? {
        let name = field.name().map(str::to_owned).unwrap_or_default();
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(|m| m.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| Error::Argument(e.to_string()))? {
            total += chunk.len();
            if total > MAX_BUFFERED_BYTES {
                return Err(Error::Argument("multipart body exceeds the buffered size limit".into()));
            }
            bytes.extend_from_slice(&chunk);
        }

        parts.push(MultipartPart { name, file_name, content_type, bytes });
    }

    Ok(parts)
}
