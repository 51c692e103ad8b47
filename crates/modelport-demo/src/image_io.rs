//! Image decoding and encoding around the f32 pixel buffers the models use.

use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use modelport_core::PixelGrid;

use crate::cli::ChannelOrder;

/// Decoded image as dense channel-last f32 samples in 0..=255.
pub struct DecodedImage {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

pub fn load(path: &Path, order: ChannelOrder) -> Result<DecodedImage> {
    let img = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?
        .to_rgb8();

    let (width, height) = img.dimensions();
    let mut data = Vec::with_capacity(img.as_raw().len());
    for px in img.pixels() {
        data.extend(reorder(px.0, order).iter().map(|v| f32::from(*v)));
    }

    Ok(DecodedImage {
        height: height as usize,
        width: width as usize,
        channels: 3,
        data,
    })
}

/// Writes a 3-channel grid as an 8-bit image, clamping to 0..=255.
pub fn save(grid: &PixelGrid, order: ChannelOrder, path: &Path) -> Result<()> {
    anyhow::ensure!(
        grid.channels == 3,
        "can only save 3-channel images, got {}",
        grid.channels
    );

    let mut raw = Vec::with_capacity(grid.data.len());
    for px in grid.data.chunks_exact(3) {
        let px = [to_u8(px[0]), to_u8(px[1]), to_u8(px[2])];
        raw.extend_from_slice(&reorder(px, order));
    }

    let img = RgbImage::from_raw(grid.width as u32, grid.height as u32, raw)
        .context("pixel buffer does not match image dimensions")?;
    img.save(path)
        .with_context(|| format!("failed to write image {}", path.display()))
}

// Swapping R and B is its own inverse, so this maps both ways.
fn reorder<T: Copy>(px: [T; 3], order: ChannelOrder) -> [T; 3] {
    match order {
        ChannelOrder::Rgb => px,
        ChannelOrder::Bgr => [px[2], px[1], px[0]],
    }
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
