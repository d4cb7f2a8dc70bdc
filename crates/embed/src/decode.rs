use catalens_common::{CatalogError, Result};
use image::{ImageFormat, RgbImage};
use std::sync::Arc;

/// Whether a declared content type denotes an image
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type.trim().to_ascii_lowercase().starts_with("image/")
}

/// An uploaded image that has been validated and decoded
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Raw bytes as received
    pub bytes: Arc<Vec<u8>>,

    /// Declared content type
    pub content_type: String,

    /// Format sniffed from the bytes
    pub format: Option<ImageFormat>,

    /// Pixels converted to RGB8
    pub pixels: Arc<RgbImage>,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// File extension used when persisting the raw bytes
    ///
    /// Prefers the sniffed format, then the declared subtype.
    pub fn extension(&self) -> String {
        if let Some(ext) = self.format.and_then(|f| f.extensions_str().first()) {
            return ext.to_string();
        }

        let subtype = self
            .content_type
            .split(';')
            .next()
            .and_then(|ct| ct.trim().split('/').nth(1))
            .unwrap_or("");
        let subtype: String = subtype
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        if subtype.is_empty() {
            "img".to_string()
        } else {
            subtype
        }
    }
}

/// Validate the content type and decode the bytes
///
/// Both a non-image content type and undecodable bytes are `InvalidInput`.
pub fn decode_image(bytes: Vec<u8>, content_type: &str) -> Result<DecodedImage> {
    if !is_image_content_type(content_type) {
        return Err(CatalogError::invalid_input(format!(
            "File must be an image (got content type '{}')",
            content_type
        )));
    }

    if bytes.is_empty() {
        return Err(CatalogError::invalid_input("Image payload is empty"));
    }

    let format = image::guess_format(&bytes).ok();
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| CatalogError::invalid_input(format!("Could not decode image: {}", e)))?;

    let pixels = decoded.to_rgb8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(CatalogError::invalid_input("Image has no pixels"));
    }

    Ok(DecodedImage {
        bytes: Arc::new(bytes),
        content_type: content_type.trim().to_string(),
        format,
        pixels: Arc::new(pixels),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgb};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_content_type_check() {
        assert!(is_image_content_type("image/png"));
        assert!(is_image_content_type("IMAGE/JPEG"));
        assert!(!is_image_content_type("text/plain"));
        assert!(!is_image_content_type("application/octet-stream"));
    }

    #[test]
    fn test_decode_png() {
        let decoded = decode_image(png(4, 3), "image/png").unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 3);
        assert_eq!(decoded.format, Some(ImageFormat::Png));
        assert_eq!(decoded.extension(), "png");
    }

    #[test]
    fn test_rejects_text_payload() {
        let err = decode_image(b"hello".to_vec(), "text/plain").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_garbage_declared_as_image() {
        let err = decode_image(b"definitely not pixels".to_vec(), "image/png").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));

        let err = decode_image(Vec::new(), "image/png").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[test]
    fn test_extension_falls_back_to_subtype() {
        let decoded = decode_image(png(1, 1), "image/x-Custom; q=1").unwrap();
        let fallback = DecodedImage {
            format: None,
            ..decoded
        };
        assert_eq!(fallback.extension(), "xcustom");
    }
}
