//! Image cleanup ahead of OCR.

use image::{DynamicImage, Rgba, RgbaImage};

const CONTRAST: f32 = 1.2;
const THRESHOLD: f32 = 128.0;

/// Grayscale, boost contrast, then threshold to pure black and white.
///
/// Alpha is left untouched.
pub fn binarize_for_ocr(image: &DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbaImage::new(width, height);
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let gray = f32::from(r) * 0.299 + f32::from(g) * 0.587 + f32::from(b) * 0.114;
        let enhanced = (gray * CONTRAST).clamp(0.0, 255.0);
        let value = if enhanced > THRESHOLD { 255 } else { 0 };
        out.put_pixel(x, y, Rgba([value, value, value, a]));
    }
    DynamicImage::ImageRgba8(out)
}
