//! Encoded image payloads and the few conversions the app needs.
//!
//! Images travel through the app as opaque compressed bytes tagged with a
//! mime type. Nothing here looks inside the payload except to decode it for
//! display, or to re-encode a raw frame as JPEG.
//!
//! # Data URIs
//!
//! Browsers and some capture tools hand out images as
//! `data:image/jpeg;base64,<payload>`. The scheme header is stripped before
//! anything is sent to the transform service, which expects the bare base64
//! payload and an explicit mime type.

use crate::error::{AppError, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{DynamicImage, ImageFormat};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";

/// JPEG quality used when re-encoding frames.
const JPEG_QUALITY: u8 = 90;

/// A compressed still image and its mime type.
///
/// The payload is reference-counted, so cloning an image to hand it to the
/// session, the worker thread and the slider is cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Arc<[u8]>,
    mime_type: String,
}

impl EncodedImage {
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Decodes a base64 payload that is already stripped of any scheme header.
    pub fn from_base64(data: &str, mime_type: impl Into<String>) -> Result<Self> {
        let bytes = BASE64
            .decode(data.trim())
            .map_err(|e| AppError::image(format!("Invalid base64 payload: {}", e)))?;
        Ok(Self::new(bytes, mime_type))
    }

    /// Parses a `data:<mime>;base64,<payload>` URI.
    ///
    /// Input without a scheme header is taken as a bare base64 JPEG payload.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let mime = data_uri_mime(uri).unwrap_or(MIME_JPEG).to_string();
        Self::from_base64(strip_data_uri_prefix(uri), mime)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Base64 payload without a scheme header, ready for transmission.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// File extension matching the mime type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            MIME_JPEG | "image/jpg" => "jpg",
            MIME_PNG => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Removes a `data:...,` header if present and returns the payload part.
pub fn strip_data_uri_prefix(input: &str) -> &str {
    if input.starts_with("data:") {
        match input.split_once(',') {
            Some((_, payload)) => payload,
            None => input,
        }
    } else {
        input
    }
}

fn data_uri_mime(input: &str) -> Option<&str> {
    let header = input.strip_prefix("data:")?.split_once(',')?.0;
    let mime = header.split(';').next()?;
    (!mime.is_empty()).then_some(mime)
}

/// Conversions between encoded payloads and decoded pixels.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Encodes a decoded image as JPEG.
    pub fn encode_jpeg(image: &DynamicImage) -> Result<EncodedImage> {
        let mut buffer: Vec<u8> = Vec::new();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);

        // JPEG has no alpha channel
        image
            .to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|e| AppError::image(format!("Failed to encode image: {}", e)))?;

        Ok(EncodedImage::new(buffer, MIME_JPEG))
    }

    /// Encodes a decoded image as PNG.
    pub fn encode_png(image: &DynamicImage) -> Result<EncodedImage> {
        let mut buffer: Vec<u8> = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| AppError::image(format!("Failed to encode image: {}", e)))?;
        Ok(EncodedImage::new(buffer, MIME_PNG))
    }

    /// Decodes the payload into pixels, sniffing the actual format.
    pub fn decode(encoded: &EncodedImage) -> Result<DynamicImage> {
        image::load_from_memory(encoded.bytes())
            .map_err(|e| AppError::image(format!("Failed to decode {}: {}", encoded.mime_type(), e)))
    }

    /// Flips the image left to right, keeping PNG payloads as PNG.
    pub fn mirror(encoded: &EncodedImage) -> Result<EncodedImage> {
        let flipped = Self::decode(encoded)?.fliph();
        if encoded.mime_type() == MIME_PNG {
            Self::encode_png(&flipped)
        } else {
            Self::encode_jpeg(&flipped)
        }
    }

    /// Loads an image file. JPEG and PNG files are kept as-is; anything else
    /// the decoder understands is re-encoded as JPEG. A text file holding a
    /// `data:` URI is accepted too.
    pub fn load_file(path: &Path) -> Result<EncodedImage> {
        let bytes = std::fs::read(path)?;
        if bytes.starts_with(b"data:") {
            let uri = std::str::from_utf8(&bytes).map_err(|e| {
                AppError::image(format!("Data URI in {} is not UTF-8: {}", path.display(), e))
            })?;
            return EncodedImage::from_data_uri(uri.trim());
        }
        let format = image::guess_format(&bytes).map_err(|e| {
            AppError::image(format!("Unrecognized image file {}: {}", path.display(), e))
        })?;

        match format {
            ImageFormat::Jpeg => Ok(EncodedImage::new(bytes, MIME_JPEG)),
            ImageFormat::Png => Ok(EncodedImage::new(bytes, MIME_PNG)),
            _ => {
                let decoded = image::load_from_memory_with_format(&bytes, format)
                    .map_err(|e| AppError::image(format!("Failed to decode image: {}", e)))?;
                Self::encode_jpeg(&decoded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([200, 180, 150])))
    }

    #[test]
    fn strips_data_uri_header() {
        assert_eq!(strip_data_uri_prefix("data:image/jpeg;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri_prefix("QUJD"), "QUJD");
        // Not a data URI, commas are left alone
        assert_eq!(strip_data_uri_prefix("a,b"), "a,b");
    }

    #[test]
    fn parses_data_uri_with_mime() {
        let img = EncodedImage::from_data_uri("data:image/png;base64,QUJD").unwrap();
        assert_eq!(img.mime_type(), MIME_PNG);
        assert_eq!(img.bytes(), b"ABC");
        assert_eq!(img.extension(), "png");
    }

    #[test]
    fn bare_payload_defaults_to_jpeg() {
        let img = EncodedImage::from_data_uri("QUJD").unwrap();
        assert_eq!(img.mime_type(), MIME_JPEG);
        assert_eq!(img.bytes(), b"ABC");
    }

    #[test]
    fn invalid_base64_is_an_image_error() {
        assert!(matches!(
            EncodedImage::from_base64("***", MIME_JPEG),
            Err(AppError::ImageProcessing(_))
        ));
    }

    #[test]
    fn jpeg_encoding_decodes_back_to_same_size() {
        let encoded = ImageProcessor::encode_jpeg(&sample()).unwrap();
        assert_eq!(encoded.mime_type(), MIME_JPEG);
        assert_eq!(&encoded.bytes()[..2], &[0xFF, 0xD8]);

        let decoded = ImageProcessor::decode(&encoded).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn mirror_flips_columns_and_keeps_png() {
        let mut img = RgbImage::from_pixel(4, 2, Rgb([0, 0, 0]));
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        let png = ImageProcessor::encode_png(&DynamicImage::ImageRgb8(img)).unwrap();

        let mirrored = ImageProcessor::mirror(&png).unwrap();
        assert_eq!(mirrored.mime_type(), MIME_PNG);
        let decoded = ImageProcessor::decode(&mirrored).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(3, 0), &Rgb([255, 0, 0]));
        assert_eq!(decoded.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn load_file_keeps_png_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smile.png");
        sample().save(&path).unwrap();

        let loaded = ImageProcessor::load_file(&path).unwrap();
        assert_eq!(loaded.mime_type(), MIME_PNG);
        assert_eq!(loaded.bytes(), std::fs::read(&path).unwrap().as_slice());
    }

    #[test]
    fn load_file_accepts_data_uri_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selfie.txt");
        std::fs::write(&path, "data:image/png;base64,QUJD\n").unwrap();

        let loaded = ImageProcessor::load_file(&path).unwrap();
        assert_eq!(loaded.mime_type(), MIME_PNG);
        assert_eq!(loaded.bytes(), b"ABC");
    }

    #[test]
    fn load_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "not an image").unwrap();
        assert!(ImageProcessor::load_file(&path).is_err());
    }

    #[test]
    fn debug_output_omits_payload() {
        let img = EncodedImage::new(vec![1u8; 4096], MIME_JPEG);
        let dbg = format!("{:?}", img);
        assert!(dbg.contains("4096"));
        assert!(dbg.len() < 100);
    }
}
