//! Render surfaces and outbound frame payloads.
//!
//! A `RgbaSurface` is what a frame source renders into; `capture` turns it
//! into the byte payload that goes out as one binary websocket message,
//! either as raw RGBA bytes or as the bytes of a `data:image/png;base64,...`
//! URI string.

use anyhow::{Context, Result, ensure};
use base64::{Engine as _, engine::general_purpose};
use image::ExtendedColorType;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use serde::Deserialize;

pub const BYTES_PER_PIXEL: usize = 4;
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Off-screen render target: tightly packed RGBA8 pixels, row-major,
/// top-left origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaSurface {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaSurface {
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    /// A surface cleared to a single color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(Self::expected_len(width, height));
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Write one pixel. Out-of-bounds coordinates are ignored so rasterizers
    /// can clip lazily at the edges.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let Some(slot) = self.pixels.get_mut(idx..idx + BYTES_PER_PIXEL) else {
            return;
        };
        slot.copy_from_slice(&rgba);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(self.pixels.get(idx..idx + BYTES_PER_PIXEL)?);
        Some(rgba)
    }
}

/// How a surface is turned into payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    /// Direct pixel read-back: exactly `width * height * 4` bytes.
    Raw,
    /// PNG-encode, then wrap as a `data:image/png;base64,...` URI and send
    /// the URI string's bytes.
    PngDataUri,
}

/// One captured image, sent as a single binary message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Capture a rendered surface as one outbound frame payload.
pub fn capture(mode: CaptureMode, surface: &RgbaSurface) -> Result<FrameBuffer> {
    ensure!(
        surface.pixels.len() == RgbaSurface::expected_len(surface.width, surface.height),
        "surface byte length {} does not match {}x{} RGBA",
        surface.pixels.len(),
        surface.width,
        surface.height
    );

    let bytes = match mode {
        CaptureMode::Raw => surface.pixels.clone(),
        CaptureMode::PngDataUri => {
            let mut png_bytes: Vec<u8> = Vec::new();
            PngEncoder::new(&mut png_bytes)
                .write_image(
                    &surface.pixels,
                    surface.width,
                    surface.height,
                    ExtendedColorType::Rgba8,
                )
                .context("failed to png-encode captured surface")?;
            let b64 = general_purpose::STANDARD.encode(&png_bytes);
            format!("{PNG_DATA_URI_PREFIX}{b64}").into_bytes()
        }
    };

    Ok(FrameBuffer {
        width: surface.width,
        height: surface.height,
        bytes,
    })
}
