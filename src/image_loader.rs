use anyhow::{Context as _, Result};
use image::imageops::FilterType;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const BROKEN_IMAGE_SIZE: u32 = 2;
/// Largest edge kept after decoding; bigger images are scaled down to fit.
pub const MAX_DIMENSION: u32 = 2048;

/// RGBA8 pixels ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    /// True when this is the placeholder for a source that failed to load.
    pub broken: bool,
}

pub fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

/// Grey checkerboard standing in for an image that could not be loaded.
pub fn broken_image() -> DecodedImage {
    let size = BROKEN_IMAGE_SIZE;
    let pixels = (0..size * size)
        .flat_map(|i| {
            let shade = if (i / size + i % size) % 2 == 0 { 96 } else { 160 };
            [shade, shade, shade, 255]
        })
        .collect();
    DecodedImage {
        width: size,
        height: size,
        pixels,
        broken: true,
    }
}

/// Loads one image source. Never fails: anything that goes wrong is logged
/// and replaced by [`broken_image`].
pub fn load_image(src: &str) -> DecodedImage {
    match try_load_image(src) {
        Ok(image) => image,
        Err(e) => {
            warn!("Could not load image '{}': {:#}", src, e);
            broken_image()
        }
    }
}

/// Loads every source in parallel, preserving order.
pub fn load_images(sources: &[String]) -> Vec<DecodedImage> {
    info!("Loading {} image(s)", sources.len());
    sources.par_iter().map(|src| load_image(src)).collect()
}

fn try_load_image(src: &str) -> Result<DecodedImage> {
    anyhow::ensure!(!src.is_empty(), "empty image source");

    let decoded = if is_remote(src) {
        let bytes = fetch(src)?;
        image::load_from_memory(&bytes)
            .with_context(|| format!("Failed to decode image fetched from '{}'", src))?
    } else {
        image::open(src).with_context(|| format!("Failed to open image '{}'", src))?
    };

    let decoded = if decoded.width() > MAX_DIMENSION || decoded.height() > MAX_DIMENSION {
        debug!(
            "Scaling '{}' down from {}x{}",
            src,
            decoded.width(),
            decoded.height()
        );
        decoded.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Triangle)
    } else {
        decoded
    };

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!("Decoded '{}' as {}x{}", src, width, height);
    Ok(DecodedImage {
        width,
        height,
        pixels: rgba.into_raw(),
        broken: false,
    })
}

fn fetch(url: &str) -> Result<Vec<u8>> {
    debug!("Fetching {}", url);
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Request to '{}' failed", url))?
        .error_for_status()
        .with_context(|| format!("Server rejected request for '{}'", url))?;
    let bytes = response
        .bytes()
        .with_context(|| format!("Failed to read body of '{}'", url))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_sources_are_detected_by_scheme() {
        assert!(is_remote("https://example.com/a.png"));
        assert!(is_remote("http://example.com/a.png"));
        assert!(!is_remote("/tmp/a.png"));
        assert!(!is_remote("httpsfoo.png"));
    }

    #[test]
    fn missing_file_yields_placeholder() {
        let image = load_image("/definitely/not/here.png");
        assert!(image.broken);
        assert_eq!(image, broken_image());
    }

    #[test]
    fn empty_source_yields_placeholder() {
        assert!(load_image("").broken);
    }

    #[test]
    fn placeholder_is_a_checkerboard() {
        let image = broken_image();
        assert_eq!(image.pixels.len(), (image.width * image.height * 4) as usize);
        assert_ne!(image.pixels[0], image.pixels[4]);
        assert_eq!(image.pixels[0], image.pixels[12]);
    }

    #[test]
    fn local_files_decode_in_order() {
        let dir = std::env::temp_dir().join(format!("image_comparator_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("red.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let sources = vec![path.to_string_lossy().into_owned(), String::new()];
        let images = load_images(&sources);
        assert_eq!(images.len(), 2);
        assert!(!images[0].broken);
        assert_eq!((images[0].width, images[0].height), (3, 2));
        assert_eq!(&images[0].pixels[..4], &[255, 0, 0, 255]);
        assert!(images[1].broken);

        std::fs::remove_dir_all(&dir).ok();
    }
}
