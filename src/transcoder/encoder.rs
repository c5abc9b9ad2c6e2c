//! Image encoder abstraction
//!
//! Provides a trait-based encoder system so each output format owns its
//! settings: JPEG and PNG use the `image` crate defaults, WebP is encoded
//! lossy through libwebp with a caller-supplied quality.

use image::DynamicImage;

use super::error::TranscodeError;
use super::params::OutputFormat;
use crate::constants::{DEFAULT_WEBP_QUALITY, WEBP_OPTIMIZED_METHOD};

/// Quality settings for image encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderQuality {
    /// Quality value (0-100, where 100 is best quality)
    pub quality: u8,
    /// Trade encode time for smaller output where the format supports it
    pub optimize: bool,
}

impl Default for EncoderQuality {
    fn default() -> Self {
        Self {
            quality: DEFAULT_WEBP_QUALITY,
            optimize: false,
        }
    }
}

impl EncoderQuality {
    /// Create quality settings with specified quality level
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.min(100),
            optimize: false,
        }
    }

    /// Enable the encoder's size optimization
    pub fn optimized(mut self) -> Self {
        self.optimize = true;
        self
    }
}

/// Trait for image encoders
///
/// Implementations handle encoding a decoded image to one format.
/// The trait is object-safe to allow dynamic dispatch.
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode an in-memory image
    fn encode(
        &self,
        image: &DynamicImage,
        quality: EncoderQuality,
    ) -> Result<Vec<u8>, TranscodeError>;

    /// Check if this encoder supports transparency
    fn supports_transparency(&self) -> bool;
}

/// JPEG encoder using the image crate (default quality, alpha dropped)
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(
        &self,
        image: &DynamicImage,
        _quality: EncoderQuality,
    ) -> Result<Vec<u8>, TranscodeError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;
        use std::io::Cursor;

        // JPEG has no alpha channel
        let rgb = image.to_rgb8();

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new(&mut output);

        encoder
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ColorType::Rgb8,
            )
            .map_err(|e| TranscodeError::encode_failed("jpeg", e.to_string()))?;

        Ok(output.into_inner())
    }

    fn supports_transparency(&self) -> bool {
        false
    }
}

/// PNG encoder using the image crate
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(
        &self,
        image: &DynamicImage,
        _quality: EncoderQuality,
    ) -> Result<Vec<u8>, TranscodeError> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;
        use image::ImageEncoder as _;
        use std::io::Cursor;

        let mut output = Cursor::new(Vec::new());
        let encoder = ImagePngEncoder::new(&mut output);

        // Keep the alpha channel only when the image carries one
        let result = if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            encoder.write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                image::ColorType::Rgba8,
            )
        } else {
            let rgb = image.to_rgb8();
            encoder.write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ColorType::Rgb8,
            )
        };

        result.map_err(|e| TranscodeError::encode_failed("png", e.to_string()))?;

        Ok(output.into_inner())
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Lossy WebP encoder backed by libwebp
///
/// The `image` crate only writes lossless WebP, so quality-controlled output
/// goes through the `webp` crate instead.
pub struct WebPEncoder;

impl ImageEncoder for WebPEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::WebP
    }

    fn encode(
        &self,
        image: &DynamicImage,
        quality: EncoderQuality,
    ) -> Result<Vec<u8>, TranscodeError> {
        let width = image.width();
        let height = image.height();

        let mut config = webp::WebPConfig::new()
            .map_err(|_| TranscodeError::encode_failed("webp", "invalid encoder config"))?;
        config.lossless = 0;
        config.quality = f32::from(quality.quality);
        if quality.optimize {
            config.method = WEBP_OPTIMIZED_METHOD;
        }

        let memory = if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), width, height)
                .encode_advanced(&config)
                .map_err(|e| TranscodeError::encode_failed("webp", format!("{:?}", e)))?
                .to_vec()
        } else {
            let rgb = image.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), width, height)
                .encode_advanced(&config)
                .map_err(|e| TranscodeError::encode_failed("webp", format!("{:?}", e)))?
                .to_vec()
        };

        Ok(memory)
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Factory for creating encoders based on output format
pub struct EncoderFactory;

impl EncoderFactory {
    /// Create an encoder for the specified output format
    pub fn create(format: OutputFormat) -> Box<dyn ImageEncoder> {
        match format {
            OutputFormat::Jpeg => Box::new(JpegEncoder),
            OutputFormat::Png => Box::new(PngEncoder),
            OutputFormat::WebP => Box::new(WebPEncoder),
        }
    }
}
