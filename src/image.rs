//! Image resources held by the resource cache

use crate::error::{FetchError, Result};
use crate::resource_cache::{ResourceCache, ResourceDecoder};
use bytes::Bytes;

/// Recognised image container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    /// Identify the format from the leading magic bytes
    pub fn sniff(data: &[u8]) -> Option<Self> {
        const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
        const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

        if data.starts_with(PNG) {
            Some(ImageFormat::Png)
        } else if data.starts_with(JPEG) {
            Some(ImageFormat::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// A validated, encoded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub format: ImageFormat,
    pub data: Bytes,
}

impl Image {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Accepts response bodies that carry a recognised image format
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl ResourceDecoder for ImageDecoder {
    type Resource = Image;

    fn decode(&self, body: Bytes) -> Result<Image> {
        let format = ImageFormat::sniff(&body).ok_or_else(|| {
            FetchError::Decode(format!("Unrecognised image data ({} bytes)", body.len()))
        })?;
        Ok(Image { format, data: body })
    }

    fn cost(&self, image: &Image) -> usize {
        image.len()
    }
}

/// Resource cache specialised for images
pub type ImageCache = ResourceCache<ImageDecoder>;
