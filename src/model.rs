use std::{io::Cursor, path::Path};

use crate::{
    errors::{CutoutError, Result},
    imageops_ai::mask,
    traits::BackgroundRemover,
};
use image::{
    imageops, imageops::FilterType, DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage,
};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::{debug, info};

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Input side used when the model declares a dynamic spatial dimension.
pub const DEFAULT_IMAGE_SIZE: u32 = 320;

/// Salient-object segmentation model (U²-Net family) run through ONNX Runtime.
pub struct OnnxRemover {
    pub image_size: u32,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl OnnxRemover {
    pub fn new(model_path: &Path, device_id: i32) -> Result<Self> {
        let mut session = SessionBuilder::new()
            .map_err(|e| CutoutError::model("セッションビルダー初期化", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| CutoutError::model("実行プロバイダー設定", e))?
            .with_memory_pattern(true)
            .map_err(|e| CutoutError::model("メモリパターン設定", e))?
            .commit_from_file(model_path)
            .map_err(|e| {
                CutoutError::model(format!("モデルファイル読み込み: {}", model_path.display()), e)
            })?;

        let input = session.inputs.first().ok_or_else(|| {
            CutoutError::model("モデル入力取得", "モデルに入力がありません")
        })?;
        let input_name = input.name.clone();
        let image_size = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.get(2).copied())
            .filter(|&side| side > 0)
            .map_or(DEFAULT_IMAGE_SIZE, |side| side as u32);

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| CutoutError::model("モデル出力取得", "モデルに出力がありません"))?;

        // ウォームアップ
        let data = Array4::<f32>::zeros((1, 3, image_size as usize, image_size as usize));
        session
            .run(ort::inputs![input_name.clone() => TensorRef::from_array_view(&data)?])
            .map_err(|e| CutoutError::model("モデル初期化実行", e))?;

        info!(
            model = %model_path.display(),
            image_size,
            "background removal model loaded"
        );

        Ok(Self {
            image_size,
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }

    pub fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![
            self.input_name.clone() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        Ok(outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }

    /// Foreground mask for `image`, sized like the image.
    pub fn segment(&self, image: &RgbImage) -> Result<GrayImage> {
        let (width, height) = image.dimensions();
        let tensor = preprocess(image, self.image_size);
        let prediction = self.predict(tensor.view())?;
        debug!(shape = ?prediction.shape(), "model prediction");
        postprocess_mask(prediction.view(), width, height)
    }
}

impl BackgroundRemover for OnnxRemover {
    fn remove(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let rgb = image::load_from_memory(bytes)?.into_rgb8();
        let mask = self.segment(&rgb)?;
        encode_png(&DynamicImage::ImageRgba8(cutout(&rgb, &mask)?))
    }
}

/// Composites `image` over a transparent canvas through `mask`.
///
/// Colours are premultiplied by the mask, so semi-transparent edge pixels
/// fade towards black along with their alpha.
pub fn cutout(image: &RgbImage, mask: &GrayImage) -> Result<RgbaImage> {
    mask::apply(image, mask, true).map_err(|e| CutoutError::model("マスク適用", e.to_string()))
}

/// Resizes to the model's square input and normalizes into a `1x3xSxS` tensor.
///
/// Pixels are scaled by the brightest channel value in the resized image
/// before the ImageNet mean/std normalization.
pub fn preprocess(image: &RgbImage, image_size: u32) -> Array4<f32> {
    let image = imageops::resize(image, image_size, image_size, FilterType::Lanczos3);
    let max = image
        .as_raw()
        .iter()
        .copied()
        .max()
        .map_or(1.0, |max| f32::from(max).max(1e-6));

    let mut tensor = image
        .as_ndarray3()
        .mapv(|v| f32::from(v) / max)
        .insert_axis(Axis(0));
    for (channel, mut plane) in tensor.axis_iter_mut(Axis(1)).enumerate() {
        plane.mapv_inplace(|v| (v - MEAN[channel]) / STD[channel]);
    }
    tensor
}

/// Min-max normalizes the first prediction channel into an 8-bit mask and
/// resizes it to `width` x `height`.
///
/// A flat prediction carries no foreground and yields an empty mask.
pub fn postprocess_mask(prediction: ArrayView4<f32>, width: u32, height: u32) -> Result<GrayImage> {
    let plane = prediction.slice(s![0, 0, .., ..]);
    let (rows, cols) = plane.dim();

    let (min, max) = plane
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
    let range = max - min;

    let pixels: Vec<u8> = if range > f32::EPSILON {
        plane
            .iter()
            .map(|&v| ((v - min) / range * 255.0) as u8)
            .collect()
    } else {
        vec![0; rows * cols]
    };

    let mask = GrayImage::from_raw(cols as u32, rows as u32, pixels)
        .ok_or_else(|| CutoutError::model("マスク生成", "予測バッファのサイズが一致しません"))?;
    Ok(imageops::resize(&mask, width, height, FilterType::Lanczos3))
}

pub(crate) fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| CutoutError::Encoding {
            path: "<memory>".into(),
            source: e,
        })?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let image = RgbImage::from_pixel(40, 24, Rgb([255, 255, 255]));
        let tensor = preprocess(&image, 16);

        assert_eq!(tensor.shape(), &[1, 3, 16, 16]);
        for channel in 0..3 {
            let expected = (1.0 - MEAN[channel]) / STD[channel];
            let value = tensor[[0, channel, 8, 8]];
            assert!((value - expected).abs() < 1e-3, "channel {channel}: {value}");
        }
    }

    #[test]
    fn test_preprocess_black_image() {
        let image = RgbImage::new(8, 8);
        let tensor = preprocess(&image, 4);

        let expected = -MEAN[0] / STD[0];
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-5);
        assert!(tensor.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_postprocess_mask_normalizes_and_resizes() {
        let mut prediction = Array4::<f32>::zeros((1, 1, 4, 4));
        prediction[[0, 0, 1, 2]] = 0.5;
        prediction[[0, 0, 3, 3]] = 2.0;

        let mask = postprocess_mask(prediction.view(), 4, 4).unwrap();
        assert_eq!(mask.dimensions(), (4, 4));
        assert_eq!(mask.get_pixel(3, 3)[0], 255);
        assert_eq!(mask.get_pixel(2, 1)[0], 63);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);

        let resized = postprocess_mask(prediction.view(), 9, 7).unwrap();
        assert_eq!(resized.dimensions(), (9, 7));
    }

    #[test]
    fn test_flat_prediction_is_empty_mask() {
        let prediction = Array4::<f32>::from_elem((1, 1, 3, 3), 0.7);
        let mask = postprocess_mask(prediction.view(), 5, 5).unwrap();
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_cutout_premultiplies_edges() {
        let image = RgbImage::from_pixel(3, 1, Rgb([200, 100, 50]));
        let mut mask = GrayImage::new(3, 1);
        mask.put_pixel(1, 0, image::Luma([128]));
        mask.put_pixel(2, 0, image::Luma([255]));

        let cut = cutout(&image, &mask).unwrap();
        assert_eq!(*cut.get_pixel(0, 0), image::Rgba([0, 0, 0, 0]));
        assert_eq!(*cut.get_pixel(2, 0), image::Rgba([200, 100, 50, 255]));

        let edge = cut.get_pixel(1, 0);
        for (got, expected) in edge.0.iter().zip([100u8, 50, 25, 128]) {
            assert!(got.abs_diff(expected) <= 1, "{edge:?}");
        }
    }

    #[test]
    fn test_cutout_rejects_mismatched_mask() {
        let image = RgbImage::new(4, 4);
        let mask = GrayImage::new(4, 3);
        let err = cutout(&image, &mask).unwrap_err();
        assert!(matches!(err, CutoutError::Model { .. }));
        assert_eq!(err.to_string(), "Model error: マスク適用 failed");
    }

    #[test]
    fn test_encode_png_round_trips_alpha() {
        let mut image = image::RgbaImage::new(2, 2);
        image.put_pixel(1, 1, image::Rgba([9, 8, 7, 100]));

        let bytes = encode_png(&DynamicImage::ImageRgba8(image.clone())).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().into_rgba8();
        assert_eq!(decoded, image);
    }
}
