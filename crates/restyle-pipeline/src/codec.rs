//! Image codec: raw bytes to transport payloads and back to display URIs.
//!
//! Stateless and deterministic. The transport form is standard base64
//! tagged with the MIME type the `image` crate sniffs from the bytes.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::types::{CodecError, EncodedImage};

/// Encode raw image bytes into a transport payload.
///
/// The format is detected from the leading signature and the image is
/// fully decoded once, so any payload returned here is known to be
/// readable image data.
///
/// # Errors
///
/// Returns [`CodecError::EmptyInput`] if `bytes` is empty.
/// Returns [`CodecError::UnrecognizedFormat`] if no known image
/// signature matches.
/// Returns [`CodecError::ImageDecode`] if the data is corrupt or the
/// format is not supported.
pub fn encode(bytes: &[u8]) -> Result<EncodedImage, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::EmptyInput);
    }

    let format = image::guess_format(bytes).map_err(|_| CodecError::UnrecognizedFormat)?;
    image::load_from_memory_with_format(bytes, format)?;

    Ok(EncodedImage::new(format.to_mime_type(), BASE64.encode(bytes)))
}

/// Turn a transport payload into a displayable `data:` URI.
#[must_use]
pub fn decode(payload: &EncodedImage) -> String {
    format!("data:{};base64,{}", payload.mime_type(), payload.data())
}

/// Raw bytes of a payload.
pub(crate) fn payload_bytes(payload: &EncodedImage) -> Result<Vec<u8>, CodecError> {
    Ok(BASE64.decode(payload.data())?)
}
