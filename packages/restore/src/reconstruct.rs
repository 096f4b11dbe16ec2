//! Turns a resized variant's bytes into a stand-in original.
//!
//! No resampling happens: the variant is decoded and re-encoded in the
//! format it was stored in, so the restored original has exactly the
//! variant's pixels and dimensions.

use std::io::Cursor;

use image::ImageFormat;

use crate::GroupError;

/// Re-encoded image ready for upload.
#[derive(Debug, Clone)]
pub struct Reconstructed {
    /// Encoded bytes.
    pub data: Vec<u8>,
    /// Format detected from the source and used for encoding.
    pub format: ImageFormat,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
}

impl Reconstructed {
    /// MIME type to upload the bytes with.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Decodes `data` (downloaded from `key`) and re-encodes it in the same
/// format.
///
/// The format is sniffed from the bytes rather than trusted from the key's
/// extension.
///
/// # Errors
///
/// * [`GroupError::UnsupportedFormat`] if the bytes are not a recognisable
///   image.
/// * [`GroupError::DecodeFailed`] if decoding fails.
/// * [`GroupError::EncodeFailed`] if re-encoding fails.
pub fn reconstruct(key: &str, data: &[u8]) -> Result<Reconstructed, GroupError> {
    let format = image::guess_format(data).map_err(|source| GroupError::UnsupportedFormat {
        key: key.to_string(),
        source,
    })?;

    let img = image::load_from_memory_with_format(data, format).map_err(|source| {
        GroupError::DecodeFailed {
            key: key.to_string(),
            source,
        }
    })?;

    let mut buf = Vec::with_capacity(data.len());
    img.write_to(&mut Cursor::new(&mut buf), format)
        .map_err(|source| GroupError::EncodeFailed {
            key: key.to_string(),
            source,
        })?;

    Ok(Reconstructed {
        data: buf,
        format,
        width: img.width(),
        height: img.height(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encodes a solid-colour RGB image of the given size.
    pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([200, 40, 40]);
        }
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, format)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn reencodes_jpeg_at_same_dimensions() {
        let source = encoded_image(60, 40, ImageFormat::Jpeg);
        let out = reconstruct("a-60x40.jpg", &source).unwrap();

        assert_eq!(out.format, ImageFormat::Jpeg);
        assert_eq!((out.width, out.height), (60, 40));
        assert_eq!(out.content_type(), "image/jpeg");

        let decoded = image::load_from_memory(&out.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (60, 40));
    }

    #[test]
    fn keeps_png_as_png() {
        let source = encoded_image(8, 4, ImageFormat::Png);
        let out = reconstruct("a-8x4.png", &source).unwrap();
        assert_eq!(out.format, ImageFormat::Png);
        assert_eq!(out.content_type(), "image/png");
        assert_eq!(image::guess_format(&out.data).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn format_comes_from_bytes_not_extension() {
        let source = encoded_image(8, 8, ImageFormat::Png);
        let out = reconstruct("mislabelled-8x8.jpg", &source).unwrap();
        assert_eq!(out.format, ImageFormat::Png);
    }

    #[test]
    fn rejects_non_image_bytes() {
        let err = reconstruct("a-1x1.jpg", b"definitely not an image").unwrap_err();
        assert!(matches!(err, GroupError::UnsupportedFormat { .. }));
    }

    #[test]
    fn truncated_image_fails_to_decode() {
        let mut source = encoded_image(32, 32, ImageFormat::Png);
        source.truncate(source.len() / 2);
        let err = reconstruct("a-32x32.png", &source).unwrap_err();
        assert!(matches!(err, GroupError::DecodeFailed { .. }));
    }
}
