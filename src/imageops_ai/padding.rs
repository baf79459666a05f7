use image::{imageops, GenericImageView, ImageBuffer, Pixel, Primitive};

/// Top-left corner that centres a `width` x `height` image on a
/// `side` x `side` canvas. Floors, so an odd leftover pixel ends up on the
/// bottom/right. `None` if the image does not fit.
const fn center_offset(width: u32, height: u32, side: u32) -> Option<(u32, u32)> {
    if width > side || height > side {
        return None;
    }
    Some(((side - width) / 2, (side - height) / 2))
}

/// Pads `image` to a square whose side is its longer dimension, centred on a
/// canvas filled with `color`.
///
/// Pixels are copied with `imageops::replace`, not blended, so translucent
/// edges keep their exact values.
pub fn square<I, P, S>(image: &I, color: P) -> Option<ImageBuffer<P, Vec<S>>>
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = S>,
    S: Primitive,
{
    let (width, height) = image.dimensions();
    let side = width.max(height);

    center_offset(width, height, side).map(|(x, y)| {
        let mut canvas = ImageBuffer::from_pixel(side, side, color);
        imageops::replace(&mut canvas, image, i64::from(x), i64::from(y));
        canvas
    })
}
