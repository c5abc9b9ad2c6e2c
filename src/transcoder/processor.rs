//! Image processing implementation
//!
//! Handles the actual image transformation: decode → resize → encode.
//! The codec work sits behind [`ImageBackend`] so another decoder/encoder
//! stack can be swapped in without touching the policy logic in
//! [`Transcoder`].

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::num::NonZeroU32;
use std::sync::Arc;

use super::encoder::{EncoderFactory, EncoderQuality};
use super::error::TranscodeError;
use super::heif::{decode_heif, is_heif};
use super::params::{normalize_format_name, BoundingBox, OutputFormat, TransformOptions};
use crate::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_ALLOWED_OUTPUT_FORMATS, DEFAULT_OUTPUT_FORMAT,
    DEFAULT_WEBP_QUALITY,
};

/// A decoded source image
pub struct DecodedImage {
    pub image: DynamicImage,
    /// Native format detected from the payload
    pub format: Option<ImageFormat>,
    /// Whether the source holds more than one frame
    pub animated: bool,
}

/// Capability set a codec backend must provide
pub trait ImageBackend: Send + Sync {
    /// Decode raw bytes into an in-memory image
    fn decode(&self, data: &[u8]) -> Result<DecodedImage, TranscodeError>;

    /// Resize to exactly `width` x `height`
    fn resize(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, TranscodeError>;

    /// Encode to the target format
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: EncoderQuality,
    ) -> Result<Vec<u8>, TranscodeError>;
}

/// Default backend: `image` for decoding, `fast_image_resize` (Lanczos3)
/// for resampling and the encoders from [`EncoderFactory`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterBackend;

impl ImageBackend for RasterBackend {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage, TranscodeError> {
        // HEIF has no `ImageFormat` variant; it is sniffed and decoded apart
        if is_heif(data) {
            return Ok(DecodedImage {
                image: decode_heif(data)?,
                format: None,
                animated: false,
            });
        }

        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| TranscodeError::decode_failed(e.to_string()))?;
        let format = reader.format();

        // Animated WebP is rejected before the decoder sees it
        if format == Some(ImageFormat::WebP) && is_animated_webp(data) {
            return Err(TranscodeError::AnimatedSource {
                format: "webp".to_string(),
            });
        }

        let image = reader
            .decode()
            .map_err(|e| TranscodeError::decode_failed(e.to_string()))?;

        Ok(DecodedImage {
            image,
            format,
            animated: format == Some(ImageFormat::Gif),
        })
    }

    fn resize(
        &self,
        image: DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, TranscodeError> {
        resize_image(&image, width, height)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: EncoderQuality,
    ) -> Result<Vec<u8>, TranscodeError> {
        EncoderFactory::create(format).encode(image, quality)
    }
}

/// Output-side policy
#[derive(Debug, Clone)]
pub struct OutputPolicy {
    /// Accepted output format names (normalized on construction)
    pub allowed_formats: Vec<String>,
    /// Format used when the request names none
    pub default_format: String,
    /// Quality for WebP when `quality(...)` is absent or unparsable
    pub webp_default_quality: u8,
    /// Media types listed in rejection details
    pub input_media_types: Vec<String>,
}

impl Default for OutputPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_ALLOWED_OUTPUT_FORMATS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_OUTPUT_FORMAT.to_string(),
            DEFAULT_WEBP_QUALITY,
            DEFAULT_ALLOWED_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl OutputPolicy {
    pub fn new(
        allowed_formats: Vec<String>,
        default_format: String,
        webp_default_quality: u8,
        input_media_types: Vec<String>,
    ) -> Self {
        Self {
            allowed_formats: allowed_formats
                .iter()
                .map(|f| normalize_format_name(f))
                .collect(),
            default_format: normalize_format_name(&default_format),
            webp_default_quality: webp_default_quality.min(100),
            input_media_types,
        }
    }

    /// Resolve a normalized format name against the allow-list
    pub fn resolve(&self, name: &str) -> Result<OutputFormat, TranscodeError> {
        let allowed = self.allowed_formats.iter().any(|f| f == name);
        match OutputFormat::from_name(name) {
            Some(format) if allowed => Ok(format),
            _ => Err(TranscodeError::UnsupportedOutputFormat {
                format: name.to_string(),
                allowed: self.input_media_types.join(", "),
            }),
        }
    }
}

/// Result of a successful transcode
#[derive(Debug, Clone)]
pub struct TranscodeResult {
    /// Encoded output bytes
    pub data: Vec<u8>,
    /// Content-Type header value (`image/<format>`)
    pub content_type: String,
    /// Format the output was encoded to
    pub format: OutputFormat,
    /// Native format of the source
    pub source_format: Option<ImageFormat>,
    /// Original dimensions (width, height)
    pub original_size: (u32, u32),
    /// Output dimensions (width, height)
    pub output_size: (u32, u32),
}

/// Decode, shrink-to-fit and re-encode images under an [`OutputPolicy`]
#[derive(Clone)]
pub struct Transcoder {
    policy: OutputPolicy,
    backend: Arc<dyn ImageBackend>,
}

impl Transcoder {
    /// Create a transcoder using the default raster backend
    pub fn new(policy: OutputPolicy) -> Self {
        Self::with_backend(policy, Arc::new(RasterBackend))
    }

    pub fn with_backend(policy: OutputPolicy, backend: Arc<dyn ImageBackend>) -> Self {
        Self { policy, backend }
    }

    pub fn policy(&self) -> &OutputPolicy {
        &self.policy
    }

    /// Transcode raw image bytes according to the request's directives
    pub fn transcode(
        &self,
        raw: &[u8],
        options: &TransformOptions,
    ) -> Result<TranscodeResult, TranscodeError> {
        // 1. Decode the image
        let decoded = self.backend.decode(raw)?;
        let original_size = (decoded.image.width(), decoded.image.height());

        // 2-3. Resolve and validate the output format
        let name = options
            .format()
            .unwrap_or_else(|| self.policy.default_format.clone());
        let format = self.policy.resolve(&name)?;

        // 4. Animation is not supported whatever the target
        if decoded.animated {
            let source = decoded
                .format
                .map(|f| format!("{:?}", f).to_lowercase())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(TranscodeError::AnimatedSource { format: source });
        }

        // 5. Shrink to fit the requested box; malformed sizes are ignored
        let mut image = decoded.image;
        if let Some(bounds) = options.size() {
            if let Some((width, height)) = thumbnail_dimensions(original_size, bounds) {
                image = self.backend.resize(image, width, height)?;
            }
        }

        // 6. Encode
        let quality = match format {
            OutputFormat::WebP => EncoderQuality::with_quality(
                options
                    .quality()
                    .unwrap_or(self.policy.webp_default_quality),
            )
            .optimized(),
            _ => EncoderQuality::default(),
        };
        let output_size = (image.width(), image.height());
        let data = self.backend.encode(&image, format, quality)?;

        Ok(TranscodeResult {
            data,
            content_type: format!("image/{}", format.as_str()),
            format,
            source_format: decoded.format,
            original_size,
            output_size,
        })
    }
}

/// Compute shrink-to-fit dimensions.
///
/// Returns `None` when the image already fits inside the box. Otherwise the
/// constrained side takes the box value and the other side is the floor or
/// ceiling of its aspect-scaled length, whichever stays closer to the source
/// aspect ratio (never below 1).
pub fn thumbnail_dimensions(source: (u32, u32), bounds: BoundingBox) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return None;
    }
    if bounds.width >= src_w && bounds.height >= src_h {
        return None;
    }

    let aspect = f64::from(src_w) / f64::from(src_h);
    let box_w = f64::from(bounds.width);
    let box_h = f64::from(bounds.height);

    if box_w / box_h >= aspect {
        let width = round_aspect(box_h * aspect, |n| (aspect - n / box_h).abs());
        Some((width, bounds.height))
    } else {
        let height = round_aspect(box_w / aspect, |n| {
            if n == 0.0 {
                0.0
            } else {
                (aspect - box_w / n).abs()
            }
        });
        Some((bounds.width, height))
    }
}

fn round_aspect(number: f64, key: impl Fn(f64) -> f64) -> u32 {
    let floor = number.floor();
    let ceil = number.ceil();
    // Ties keep the floor
    let picked = if key(ceil) < key(floor) { ceil } else { floor };
    (picked as u32).max(1)
}

/// Check the VP8X header of a WebP payload for the animation flag
pub fn is_animated_webp(data: &[u8]) -> bool {
    const ANIMATION_FLAG: u8 = 0x02;
    data.len() > 20
        && &data[0..4] == b"RIFF"
        && &data[8..12] == b"WEBP"
        && &data[12..16] == b"VP8X"
        && data[20] & ANIMATION_FLAG != 0
}

/// Resize image using fast-image-resize with Lanczos3 filter
fn resize_image(
    img: &DynamicImage,
    target_w: u32,
    target_h: u32,
) -> Result<DynamicImage, TranscodeError> {
    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| TranscodeError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| TranscodeError::resize_failed("Source height is 0"))?;
    let dst_width = NonZeroU32::new(target_w)
        .ok_or_else(|| TranscodeError::resize_failed("Target width is 0"))?;
    let dst_height = NonZeroU32::new(target_h)
        .ok_or_else(|| TranscodeError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| {
        TranscodeError::resize_failed(format!("Failed to create source image: {:?}", e))
    })?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| TranscodeError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| TranscodeError::resize_failed("Failed to create output image buffer"))?;

    let resized = DynamicImage::ImageRgba8(rgba_image);
    if img.color().has_alpha() {
        Ok(resized)
    } else {
        Ok(DynamicImage::ImageRgb8(resized.to_rgb8()))
    }
}
