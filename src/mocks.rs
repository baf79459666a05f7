use crate::errors::{CutoutError, Result};
use crate::model::encode_png;
use crate::traits::BackgroundRemover;
use image::{DynamicImage, Rgb, Rgba};

/// テスト用のモックリムーバー（モデル不要）
///
/// By default the decoded input is re-encoded as PNG with its alpha channel
/// untouched. With a key colour, every pixel of exactly that colour becomes
/// transparent, which is enough to fake a segmentation of synthetic images.
/// `failing_on` makes it reject one exact input with a `Segmentation` error.
#[derive(Debug, Clone, Default)]
pub struct MockRemover {
    key: Option<Rgb<u8>>,
    fail_on: Option<Vec<u8>>,
}

impl MockRemover {
    pub const fn new() -> Self {
        Self {
            key: None,
            fail_on: None,
        }
    }

    pub const fn keyed(key: Rgb<u8>) -> Self {
        Self {
            key: Some(key),
            fail_on: None,
        }
    }

    /// 指定したバイト列が入力された場合に失敗させる
    pub fn failing_on(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.fail_on = Some(contents.into());
        self
    }
}

impl BackgroundRemover for MockRemover {
    fn remove(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        if self.fail_on.as_deref() == Some(bytes) {
            return Err(CutoutError::segmentation_in_memory("configured failure"));
        }

        let mut image = image::load_from_memory(bytes)?.into_rgba8();

        if let Some(Rgb([r, g, b])) = self.key {
            for pixel in image.pixels_mut() {
                let Rgba([pr, pg, pb, _]) = *pixel;
                if (pr, pg, pb) == (r, g, b) {
                    *pixel = Rgba([0, 0, 0, 0]);
                }
            }
        }

        encode_png(&DynamicImage::ImageRgba8(image))
    }
}
