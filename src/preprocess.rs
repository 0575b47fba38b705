//! Deterministic pixel transform that prepares a scanned image for OCR.
//!
//! Steps, in order:
//! 1. flatten transparency onto white
//! 2. convert to luminance (ITU-R 601-2 weights)
//! 3. gamma curve `x -> round((x/255)^3 * 255)`, which pushes faint strokes darker
//! 4. hard threshold at 128
//! 5. invert
//!
//! The output has the same dimensions as the input. Steps 3–5 act on single luma values,
//! so they are folded into one lookup table.

use image::{DynamicImage, GrayImage, Luma, RgbImage};

/// Binarization cutoff: values strictly above it become white.
pub const THRESHOLD: u8 = 128;

/// Run the full enhancement pipeline.
pub fn enhance(img: &DynamicImage) -> GrayImage {
    let rgb = flatten_alpha(img);
    let mut gray = to_luma(&rgb);

    let lut = tone_table();
    for Luma([v]) in gray.pixels_mut() {
        *v = lut[*v as usize];
    }
    gray
}

/// Composite any alpha channel onto an opaque white background.
///
/// Fully transparent pixels become white, fully opaque pixels keep their color.
pub fn flatten_alpha(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        image::Rgb([
            blend_on_white(r, a),
            blend_on_white(g, a),
            blend_on_white(b, a),
        ])
    })
}

fn blend_on_white(c: u8, a: u8) -> u8 {
    let (c, a) = (c as u32, a as u32);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Convert to single-channel luminance with `L = 0.299 R + 0.587 G + 0.114 B`.
pub fn to_luma(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        // 16.16 fixed point, rounded.
        let l = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
        Luma([l.min(255) as u8])
    })
}

/// `round((x / 255)^3 * 255)`, clamped to `[0, 255]`.
pub fn gamma(x: u8) -> u8 {
    let v = (x as f64 / 255.0).powi(3) * 255.0;
    v.round().clamp(0.0, 255.0) as u8
}

/// Values above [`THRESHOLD`] become 255, everything else 0.
pub fn threshold(x: u8) -> u8 {
    if x > THRESHOLD { 255 } else { 0 }
}

pub fn invert(x: u8) -> u8 {
    255 - x
}

fn tone_table() -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (x, out) in lut.iter_mut().enumerate() {
        *out = invert(threshold(gamma(x as u8)));
    }
    lut
}
