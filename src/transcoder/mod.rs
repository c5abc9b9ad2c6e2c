//! Image transcoding module
//!
//! Turns fetched source bytes into the representation a client asked for:
//! - Directive parsing (`format(webp):size(200,200):quality(80)`)
//! - Shrink-to-fit resizing with Lanczos3 resampling
//! - Re-encoding to JPEG, PNG or lossy WebP
//! - HEIF/HEIC input behind the `heif` cargo feature
//!
//! # Directives
//!
//! ```text
//! /format(webp):size(200,200)/https://example.com/photo.jpg
//! ```
//!
//! Without a `format(...)` directive the output is PNG.

pub mod encoder;
pub mod error;
pub mod heif;
pub mod params;
pub mod processor;

pub use encoder::{EncoderFactory, EncoderQuality, ImageEncoder};
pub use error::{DirectiveError, TranscodeError};
pub use params::{normalize_format_name, BoundingBox, OutputFormat, TransformOptions};
pub use processor::{
    thumbnail_dimensions, DecodedImage, ImageBackend, OutputPolicy, RasterBackend,
    TranscodeResult, Transcoder,
};
