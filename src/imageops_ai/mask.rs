use anyhow::{anyhow, ensure, Result};
use image::{GenericImageView, ImageBuffer, Luma, Pixel, Primitive, Rgb, Rgba};
use num_traits::AsPrimitive;

use crate::imageops_ai::get_max_value;

/// Uses `mask` as the alpha channel of `image`.
///
/// Mask values are rescaled to the image's channel range. With
/// `premultiply` the colour channels are scaled by the mask as well, so
/// fully masked pixels come out black instead of keeping their colour.
pub fn apply<I, M, SI, SM>(
    image: &I,
    mask: &M,
    premultiply: bool,
) -> Result<ImageBuffer<Rgba<SI>, Vec<SI>>>
where
    I: GenericImageView<Pixel = Rgb<SI>>,
    M: GenericImageView<Pixel = Luma<SM>>,
    Rgba<SI>: Pixel<Subpixel = SI>,
    SI: Primitive + 'static + AsPrimitive<f32>,
    SM: Primitive + 'static + AsPrimitive<f32>,
    f32: AsPrimitive<SI>,
    f32: AsPrimitive<SM>,
{
    ensure!(
        image.dimensions() == mask.dimensions(),
        "Image and mask dimensions do not match: image {:?}, mask {:?}",
        image.dimensions(),
        mask.dimensions()
    );

    let sm_max: f32 = get_max_value::<SM>().as_();
    let si_max: f32 = get_max_value::<SI>().as_();

    let pixels = image
        .pixels()
        .zip(mask.pixels())
        .flat_map(|((_, _, image_pixel), (_, _, mask_pixel))| {
            let Rgb([red, green, blue]) = image_pixel;
            let Luma([weight]) = mask_pixel;
            let coverage = weight.as_() / sm_max;
            let alpha: SI = (coverage * si_max).as_();

            if premultiply {
                let scale = |c: SI| -> SI { (c.as_() * coverage).as_() };
                [scale(red), scale(green), scale(blue), alpha]
            } else {
                [red, green, blue, alpha]
            }
        })
        .collect::<Vec<SI>>();

    ImageBuffer::from_raw(image.width(), image.height(), pixels)
        .ok_or_else(|| anyhow!("Failed to create ImageBuffer from masked pixels"))
}
