//! HEIF/HEIC decoding
//!
//! The `image` crate has no HEIF decoder. With the `heif` cargo feature the
//! payload goes through libheif instead; without it a HEIF payload is a
//! decode failure.

use image::DynamicImage;

use super::error::TranscodeError;

/// ISO-BMFF brands that carry a HEIF still image
const HEIF_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"mif1", b"msf1",
];

/// Sniff the `ftyp` box at the start of the payload
pub fn is_heif(data: &[u8]) -> bool {
    data.len() >= 12
        && &data[4..8] == b"ftyp"
        && HEIF_BRANDS.iter().any(|brand| &data[8..12] == brand.as_slice())
}

#[cfg(feature = "heif")]
pub fn decode_heif(data: &[u8]) -> Result<DynamicImage, TranscodeError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(data)
        .map_err(|e| TranscodeError::decode_failed(e.to_string()))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| TranscodeError::decode_failed(e.to_string()))?;

    let has_alpha = handle.has_alpha_channel();
    let chroma = if has_alpha {
        RgbChroma::Rgba
    } else {
        RgbChroma::Rgb
    };
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(chroma), None)
        .map_err(|e| TranscodeError::decode_failed(e.to_string()))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| TranscodeError::decode_failed("HEIF image has no interleaved plane"))?;

    let channels = if has_alpha { 4 } else { 3 };
    let row_len = plane.width as usize * channels;
    let mut pixels = Vec::with_capacity(row_len * plane.height as usize);
    // Rows may be padded past the visible width
    for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
        let visible = row
            .get(..row_len)
            .ok_or_else(|| TranscodeError::decode_failed("HEIF row shorter than image width"))?;
        pixels.extend_from_slice(visible);
    }

    let image = if has_alpha {
        image::RgbaImage::from_raw(plane.width, plane.height, pixels).map(DynamicImage::ImageRgba8)
    } else {
        image::RgbImage::from_raw(plane.width, plane.height, pixels).map(DynamicImage::ImageRgb8)
    };
    image.ok_or_else(|| TranscodeError::decode_failed("HEIF pixel buffer size mismatch"))
}

#[cfg(not(feature = "heif"))]
pub fn decode_heif(_data: &[u8]) -> Result<DynamicImage, TranscodeError> {
    Err(TranscodeError::decode_failed("HEIF decoding is not enabled"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ftyp(brand: &[u8; 4]) -> Vec<u8> {
        let mut data = vec![0, 0, 0, 0x18];
        data.extend_from_slice(b"ftyp");
        data.extend_from_slice(brand);
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(b"mif1heic");
        data
    }

    #[test]
    fn test_is_heif_brands() {
        assert!(is_heif(&ftyp(b"heic")));
        assert!(is_heif(&ftyp(b"mif1")));
        assert!(!is_heif(&ftyp(b"isom")));
        assert!(!is_heif(b"\x89PNG\r\n\x1a\n"));
        assert!(!is_heif(b"ftyp"));
    }

    #[cfg(not(feature = "heif"))]
    #[test]
    fn test_heif_without_feature_is_decode_failure() {
        let err = decode_heif(&ftyp(b"heic")).unwrap_err();
        assert!(matches!(err, TranscodeError::DecodeFailed { .. }));
        assert_eq!(err.to_http_status(), 422);
    }

    #[cfg(feature = "heif")]
    #[test]
    fn test_decode_heic_fixture() {
        use libheif_rs::{
            Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
            RgbChroma,
        };

        let (width, height) = (32u32, 24u32);
        let lib_heif = LibHeif::new();
        let mut source = Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb)).unwrap();
        source
            .create_plane(Channel::Interleaved, width, height, 8)
            .unwrap();
        {
            let planes = source.planes_mut();
            let mut plane = planes.interleaved.unwrap();
            for (y, row) in plane.data.chunks_mut(plane.stride).enumerate() {
                for x in 0..width as usize {
                    row[x * 3] = (x * 8) as u8;
                    row[x * 3 + 1] = (y * 10) as u8;
                    row[x * 3 + 2] = 128;
                }
            }
        }
        let mut encoder = lib_heif
            .encoder_for_format(CompressionFormat::Hevc)
            .unwrap();
        encoder.set_quality(EncoderQuality::Lossy(90)).unwrap();
        let mut ctx = HeifContext::new().unwrap();
        ctx.encode_image(&source, &mut encoder, None).unwrap();
        let heic = ctx.write_to_bytes().unwrap();

        assert!(is_heif(&heic));
        let image = decode_heif(&heic).unwrap();
        assert_eq!((image.width(), image.height()), (width, height));
        assert!(!image.color().has_alpha());
    }
}
