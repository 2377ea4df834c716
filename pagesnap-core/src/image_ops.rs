//! Pure crop/concat/encode operations on in-memory images.

use crate::error::{CaptureError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{imageops, RgbaImage};

/// Crop a rectangle out of `img`, clamping every coordinate to the source
/// bounds. Out-of-range requests shrink to the valid intersection instead
/// of panicking; a fully out-of-range request yields an empty image.
pub fn crop(img: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> RgbaImage {
    let x = x.min(img.width());
    let y = y.min(img.height());
    let w = width.min(img.width() - x);
    let h = height.min(img.height() - y);
    imageops::crop_imm(img, x, y, w, h).to_image()
}

/// Return a copy of `base` with `tile` drawn at `(x, y)`.
///
/// Tile pixels falling outside `base` are clipped; the dimensions of the
/// result always equal the dimensions of `base`.
pub fn concat(base: &RgbaImage, tile: &RgbaImage, x: u32, y: u32) -> RgbaImage {
    let mut out = base.clone();
    imageops::replace(&mut out, tile, i64::from(x), i64::from(y));
    out
}

/// Encode an image as lossless PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| CaptureError::Image(e.to_string()))?;
    Ok(buf)
}

/// Decode PNG bytes into an RGBA image.
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map(|img| img.to_rgba8())
        .map_err(|e| CaptureError::Image(e.to_string()))
}

/// Encode an image as a base64 PNG string.
pub fn to_base64(img: &RgbaImage) -> Result<String> {
    Ok(BASE64.encode(encode_png(img)?))
}

/// Decode a base64 PNG string back into an image. Round-trips
/// [`to_base64`] exactly.
pub fn from_base64(data: &str) -> Result<RgbaImage> {
    let bytes = BASE64
        .decode(data.trim())
        .map_err(|e| CaptureError::Image(e.to_string()))?;
    decode_png(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn crop_inside_bounds() {
        let img = gradient(10, 10);
        let out = crop(&img, 2, 3, 4, 5);
        assert_eq!((out.width(), out.height()), (4, 5));
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(2, 3));
        assert_eq!(out.get_pixel(3, 4), img.get_pixel(5, 7));
    }

    #[test]
    fn crop_clamps_to_source() {
        let img = gradient(10, 10);
        let out = crop(&img, 6, 6, 100, 100);
        assert_eq!((out.width(), out.height()), (4, 4));

        let empty = crop(&img, 50, 50, 5, 5);
        assert_eq!((empty.width(), empty.height()), (0, 0));
    }

    #[test]
    fn concat_draws_tile_and_keeps_base_dimensions() {
        let base = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let tile = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));

        let out = concat(&base, &tile, 2, 2);
        assert_eq!((out.width(), out.height()), (8, 8));
        assert_eq!(*out.get_pixel(2, 2), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(5, 5), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(1, 1), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(6, 6), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn concat_clips_overflowing_tile() {
        let base = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let tile = RgbaImage::from_pixel(10, 10, Rgba([0, 255, 0, 255]));

        let out = concat(&base, &tile, 2, 2);
        assert_eq!((out.width(), out.height()), (4, 4));
        assert_eq!(*out.get_pixel(3, 3), Rgba([0, 255, 0, 255]));
        assert_eq!(*out.get_pixel(1, 1), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn base64_png_round_trip_is_lossless() {
        let img = gradient(33, 17);
        let encoded = to_base64(&img).unwrap();
        let decoded = from_base64(&encoded).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn from_base64_rejects_garbage() {
        assert!(from_base64("not base64 at all!!").is_err());
        assert!(from_base64("aGVsbG8=").is_err());
    }
}
