//! Region capture for snapsolve.
//!
//! Grabs the visible viewport from a [`ScreenSource`], crops it to the user's
//! selection and encodes the result as a single-frame image for OCR.

pub mod crop;
pub mod preprocess;
pub mod source;

pub use crop::{crop_region, encode_image, CaptureOptions, RegionCapture};
pub use preprocess::binarize_for_ocr;
pub use source::{FileScreenSource, MemoryScreenSource, ScreenSource};
