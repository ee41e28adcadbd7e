use crate::error::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbImage;

/// Decode the `img` field of an inbound video event into a raster image.
///
/// The payload is a base64-encoded still frame in whatever container the
/// device produced (JPEG in practice; the format is sniffed from the bytes).
/// The result is always normalized to 8-bit RGB, row-major — callers never
/// see BGR or alpha channels.
pub fn decode_frame(b64: &str) -> Result<RgbImage> {
    let bytes = STANDARD.decode(b64)?;
    let image = image::load_from_memory(&bytes)?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WeheadError;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    /// 4x3 test pattern, PNG-encoded and base64'd the way the device sends it.
    fn encoded_test_frame() -> String {
        let image = RgbImage::from_fn(4, 3, |x, y| {
            if (x, y) == (0, 0) {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        STANDARD.encode(buffer.into_inner())
    }

    #[test]
    fn decodes_known_frame_to_rgb() {
        let decoded = decode_frame(&encoded_test_frame()).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 3);
        // RGB order, not BGR: the red corner pixel stays red.
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(decoded.get_pixel(3, 2), &Rgb([0, 0, 255]));
    }

    #[test]
    fn rejects_malformed_base64() {
        let err = decode_frame("!!! not base64 !!!").unwrap_err();
        assert!(matches!(err, WeheadError::Base64(_)));
    }

    #[test]
    fn rejects_bytes_that_are_not_an_image() {
        let garbage = STANDARD.encode(b"definitely not a jpeg");
        let err = decode_frame(&garbage).unwrap_err();
        assert!(matches!(err, WeheadError::Image(_)));
    }
}
