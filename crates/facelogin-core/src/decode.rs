//! Image input decoding: base64 data URIs and raw image bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("image data is not a data URI: missing ',' separator")]
    MissingSeparator,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unreadable image: {0}")]
    Image(#[from] image::ImageError),
}

/// Return the payload of a `"<header>,<payload>"` data URI.
///
/// Only the text after the first comma is payload; the header is ignored.
pub fn data_uri_payload(data_uri: &str) -> Result<&str, DecodeError> {
    data_uri
        .split_once(',')
        .map(|(_, payload)| payload)
        .ok_or(DecodeError::MissingSeparator)
}

/// Decode a `data:<mime>;base64,<payload>` string into raw image bytes.
pub fn decode_data_uri(data_uri: &str) -> Result<Vec<u8>, DecodeError> {
    let payload = data_uri_payload(data_uri)?;
    Ok(STANDARD.decode(payload.trim())?)
}

/// Decode encoded image bytes (PNG, JPEG, ...) into an RGB8 image.
pub fn load_rgb(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_payload_after_first_comma() {
        assert_eq!(data_uri_payload("data:image/png;base64,abc,def").unwrap(), "abc,def");
    }

    #[test]
    fn test_missing_comma_is_rejected() {
        assert!(matches!(
            decode_data_uri("aGVsbG8="),
            Err(DecodeError::MissingSeparator)
        ));
    }

    #[test]
    fn test_header_is_ignored() {
        let bytes = decode_data_uri("anything-at-all,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            decode_data_uri("data:image/png;base64,***"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn test_load_rgb_png() {
        let img = RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png).unwrap();

        let loaded = load_rgb(&png).unwrap();
        assert_eq!(loaded.dimensions(), (4, 3));
        assert_eq!(loaded.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_load_rgb_garbage() {
        assert!(matches!(load_rgb(b"not an image"), Err(DecodeError::Image(_))));
    }
}
