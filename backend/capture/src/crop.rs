use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::{debug, info};

use snapsolve_core::{CaptureError, CapturedImage, ImageEncoding, SelectionRect};

use crate::preprocess::binarize_for_ocr;
use crate::source::ScreenSource;

/// How the cropped region is post-processed and encoded.
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    pub encoding: ImageEncoding,
    /// Binarize the crop before encoding (helps weak OCR engines).
    pub preprocess: bool,
    pub timeout: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            encoding: ImageEncoding::Png,
            preprocess: false,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Captures the viewport and crops it to a selection.
pub struct RegionCapture {
    source: Arc<dyn ScreenSource>,
    options: CaptureOptions,
}

impl RegionCapture {
    pub fn new(source: Arc<dyn ScreenSource>, options: CaptureOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    /// Snapshot the whole visible viewport. No retry: the caller aborts on failure.
    pub async fn grab(&self) -> Result<DynamicImage, CaptureError> {
        let frame = tokio::time::timeout(self.options.timeout, self.source.grab_viewport())
            .await
            .map_err(|_| {
                CaptureError::Unavailable(format!(
                    "screen capture timed out after {}ms",
                    self.options.timeout.as_millis()
                ))
            })??;
        let (width, height) = frame.dimensions();
        info!(width, height, "Viewport captured");
        Ok(frame)
    }

    /// Crop `frame` to `rect` (viewport pixels scaled by `device_pixel_ratio`) and encode it.
    pub fn crop(
        &self,
        frame: &DynamicImage,
        rect: SelectionRect,
        device_pixel_ratio: f64,
    ) -> Result<CapturedImage, CaptureError> {
        let region = crop_region(frame, rect.scaled(device_pixel_ratio))?;
        let region = if self.options.preprocess {
            binarize_for_ocr(&region)
        } else {
            region
        };
        encode_image(&region, self.options.encoding)
    }

    pub async fn capture(
        &self,
        rect: SelectionRect,
        device_pixel_ratio: f64,
    ) -> Result<CapturedImage, CaptureError> {
        let frame = self.grab().await?;
        self.crop(&frame, rect, device_pixel_ratio)
    }
}

/// Cut `rect` out of `frame`, keeping its exact size.
///
/// A rectangle that overhangs the frame edge is shifted back inside; one that
/// is larger than the frame or entirely outside it is rejected.
pub fn crop_region(frame: &DynamicImage, rect: SelectionRect) -> Result<DynamicImage, CaptureError> {
    let (frame_w, frame_h) = frame.dimensions();
    if rect.width == 0 || rect.height == 0 {
        return Err(CaptureError::OutOfBounds("selection is empty".to_string()));
    }
    if rect.width > frame_w || rect.height > frame_h {
        return Err(CaptureError::OutOfBounds(format!(
            "selection {}x{} is larger than the captured viewport {}x{}",
            rect.width, rect.height, frame_w, frame_h
        )));
    }
    if rect.x >= frame_w || rect.y >= frame_h {
        return Err(CaptureError::OutOfBounds(format!(
            "selection at ({}, {}) lies outside the captured viewport {}x{}",
            rect.x, rect.y, frame_w, frame_h
        )));
    }

    let x = rect.x.min(frame_w - rect.width);
    let y = rect.y.min(frame_h - rect.height);
    if (x, y) != (rect.x, rect.y) {
        debug!(from_x = rect.x, from_y = rect.y, x, y, "Selection shifted inside viewport");
    }
    Ok(frame.crop_imm(x, y, rect.width, rect.height))
}

/// Encode a frame into a `CapturedImage`.
pub fn encode_image(image: &DynamicImage, encoding: ImageEncoding) -> Result<CapturedImage, CaptureError> {
    let mut buffer = Vec::new();
    let result = match encoding {
        ImageEncoding::Png => image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png),
        // JPEG has no alpha channel.
        ImageEncoding::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg),
    };
    result.map_err(|e| CaptureError::Encoding(format!("failed to encode selection: {e}")))?;

    let (width, height) = image.dimensions();
    Ok(CapturedImage::new(buffer, encoding, width, height))
}
