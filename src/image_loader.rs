use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use image::{DynamicImage, GenericImageView, ImageFormat};

/// Decoded RGBA pixels, tightly packed (stride = `width * 4`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }
}

/// Opens an image. Animated GIFs yield their first frame.
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
    let format = image::guess_format(&bytes).ok();

    if format == Some(ImageFormat::Gif) {
        let decoder = GifDecoder::new(Cursor::new(bytes))
            .with_context(|| format!("Failed to decode GIF: {:?}", path))?;
        let mut frames = decoder.into_frames();
        if let Some(frame) = frames.next() {
            let frame = frame.context("Failed to decode GIF frame")?;
            return Ok(DynamicImage::ImageRgba8(frame.into_buffer()));
        }
        return Err(anyhow!("GIF has no frames: {:?}", path));
    }

    match format {
        Some(fmt) => image::load_from_memory_with_format(&bytes, fmt)
            .with_context(|| format!("Failed to decode image: {:?}", path)),
        None => image::load_from_memory(&bytes)
            .with_context(|| format!("Failed to decode image: {:?}", path)),
    }
}

/// Decodes an image scaled down so that neither edge exceeds `max_edge`.
/// Smaller images keep their size.
pub fn decode_rgba(path: &Path, max_edge: u32) -> Result<DecodedImage> {
    let img = open_image(path)?;
    let (width, height) = img.dimensions();
    let img = if width > max_edge || height > max_edge {
        img.thumbnail(max_edge, max_edge)
    } else {
        img
    };
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow!("Image has no pixels: {:?}", path));
    }
    Ok(DecodedImage {
        rgba: img.to_rgba8().into_raw(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn test_decode_downscales_to_max_edge() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbaImage::from_pixel(400, 100, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let decoded = decode_rgba(&path, 200).unwrap();
        assert_eq!(decoded.width, 200);
        assert_eq!(decoded.height, 50);
        assert_eq!(decoded.rgba.len(), 200 * 50 * 4);
        assert_eq!(decoded.stride(), 800);
        assert_eq!(&decoded.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_small_images_are_not_upscaled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("small.png");
        RgbaImage::new(16, 8).save(&path).unwrap();

        let decoded = decode_rgba(&path, 360).unwrap();
        assert_eq!((decoded.width, decoded.height), (16, 8));
    }

    #[test]
    fn test_gif_decodes_first_frame() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        RgbaImage::from_pixel(12, 6, Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let img = open_image(&path).unwrap();
        assert_eq!(img.dimensions(), (12, 6));
    }

    #[test]
    fn test_garbage_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(decode_rgba(&path, 100).is_err());
        assert!(decode_rgba(&dir.path().join("missing.png"), 100).is_err());
    }
}
