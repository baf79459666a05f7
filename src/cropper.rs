//! Crops a cutout to its subject.
//!
//! The subject is every pixel with non-zero alpha, so antialiased mask edges
//! count as foreground. The crop is widened by a padding margin that never
//! grows past the source image, and can then be centered on a transparent
//! square canvas.

use image::{GenericImageView, Rgba, RgbaImage};
use tracing::{debug, info};

use crate::imageops_ai::{padding, BoundingBox, ContentBounds};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// How a cutout should be framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRequest {
    /// Margin kept around the subject on each side, in pixels.
    pub padding: u32,
    /// Pad the crop to a square canvas.
    pub force_square: bool,
}

impl CropRequest {
    pub const fn new(padding: u32, force_square: bool) -> Self {
        Self {
            padding,
            force_square,
        }
    }
}

impl Default for CropRequest {
    fn default() -> Self {
        Self::new(10, true)
    }
}

/// Result of [`crop_with_outcome`].
#[derive(Debug, Clone, PartialEq)]
pub enum CropOutcome {
    /// The subject was found and framed.
    Cropped(RgbaImage),
    /// The image was fully transparent; this is an untouched copy of it.
    NoSubject(RgbaImage),
}

impl CropOutcome {
    pub const fn subject_found(&self) -> bool {
        matches!(self, Self::Cropped(_))
    }

    pub const fn image(&self) -> &RgbaImage {
        match self {
            Self::Cropped(image) | Self::NoSubject(image) => image,
        }
    }

    pub fn into_image(self) -> RgbaImage {
        match self {
            Self::Cropped(image) | Self::NoSubject(image) => image,
        }
    }
}

/// Tightest box around all pixels with non-zero alpha.
pub fn compute_bounding_box(image: &RgbaImage) -> Option<BoundingBox> {
    image.content_bounds()
}

/// Frames the subject of `image` according to `request`.
///
/// A fully transparent image is returned unchanged.
pub fn crop(image: &RgbaImage, request: CropRequest) -> RgbaImage {
    crop_with_outcome(image, request).into_image()
}

pub fn crop_with_outcome(image: &RgbaImage, request: CropRequest) -> CropOutcome {
    let (width, height) = image.dimensions();

    let Some(bounds) = compute_bounding_box(image) else {
        info!("no subject detected, keeping the original {width}x{height} image");
        return CropOutcome::NoSubject(image.clone());
    };

    let region = bounds.expand(request.padding, width, height);
    debug!(
        ?bounds,
        ?region,
        padding = request.padding,
        "cropping to subject"
    );

    let cropped = image
        .view(region.left, region.top, region.width(), region.height())
        .to_image();

    if !request.force_square || cropped.width() == cropped.height() {
        return CropOutcome::Cropped(cropped);
    }

    // the longer side always fits, so squaring cannot fail here
    let squared = padding::square(&cropped, TRANSPARENT).unwrap_or(cropped);
    CropOutcome::Cropped(squared)
}
