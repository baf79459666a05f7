use image::{GenericImageView, Primitive, Rgba};

/// Axis-aligned pixel rectangle, `right` and `bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    pub const fn width(&self) -> u32 {
        self.right - self.left
    }

    pub const fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Grows the box by `padding` on every side, clamped to a `width` x `height` image.
    pub fn expand(self, padding: u32, width: u32, height: u32) -> Self {
        Self {
            left: self.left.saturating_sub(padding),
            top: self.top.saturating_sub(padding),
            right: self.right.saturating_add(padding).min(width),
            bottom: self.bottom.saturating_add(padding).min(height),
        }
    }
}

/// Locates the region of an image that carries any opacity.
pub trait ContentBounds {
    /// Tightest box around every pixel whose alpha is non-zero, or `None`
    /// when the image is fully transparent.
    fn content_bounds(&self) -> Option<BoundingBox>;
}

impl<I, S> ContentBounds for I
where
    I: GenericImageView<Pixel = Rgba<S>>,
    S: Primitive + 'static,
{
    fn content_bounds(&self) -> Option<BoundingBox> {
        let (width, height) = self.dimensions();
        let mut bounds = [width, height, 0, 0]; // [x1, y1, x2, y2]
        let mut found = false;

        for (x, y, pixel) in self.pixels() {
            let Rgba([_, _, _, alpha]) = pixel;
            if alpha != S::zero() {
                update_bounds(&mut bounds, x, y);
                found = true;
            }
        }

        found.then(|| BoundingBox {
            left: bounds[0],
            top: bounds[1],
            right: bounds[2] + 1,
            bottom: bounds[3] + 1,
        })
    }
}

fn update_bounds(bounds: &mut [u32; 4], x: u32, y: u32) {
    bounds[0] = bounds[0].min(x);
    bounds[1] = bounds[1].min(y);
    bounds[2] = bounds[2].max(x);
    bounds[3] = bounds[3].max(y);
}
