use cutout_crop::{CropRequest, CutoutError, CutoutProcessor, InputKind, MockRemover};
use image::{GenericImageView, Rgb, RgbImage};
use std::fs;
use tempfile::TempDir;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

fn photo_with_block(w: u32, h: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(40, 40, WHITE);
    for y in 10..10 + h {
        for x in 10..10 + w {
            image.put_pixel(x, y, Rgb([0, 0, 200]));
        }
    }
    image
}

#[test]
fn test_batch_continues_past_bad_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&input_dir)?;

    photo_with_block(6, 4).save(input_dir.join("a.png"))?;
    photo_with_block(5, 5).save(input_dir.join("b.png"))?;
    photo_with_block(3, 9).save(input_dir.join("c.bmp"))?;
    fs::write(input_dir.join("readme.txt"), b"ignored")?;

    // b.png は正常な画像だが、リムーバー側で失敗させる
    let remover = MockRemover::keyed(WHITE).failing_on(fs::read(input_dir.join("b.png"))?);
    let processor = CutoutProcessor::new(remover, CropRequest::new(1, false));
    let summary = processor.process_directory(&input_dir, &output_dir)?;

    assert_eq!(summary.total(), 3);
    assert_eq!(summary.succeeded.len(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert!(!summary.is_success());

    let (failed_path, error) = &summary.failed[0];
    assert_eq!(failed_path, &input_dir.join("b.png"));
    match error {
        CutoutError::Segmentation { path, source } => {
            assert_eq!(path, &input_dir.join("b.png"));
            assert_eq!(source.to_string(), "configured failure");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(image::open(output_dir.join("a.png"))?.dimensions(), (8, 6));
    assert_eq!(image::open(output_dir.join("c.png"))?.dimensions(), (5, 11));
    assert!(!output_dir.join("b.png").exists());
    assert!(!output_dir.join("readme.png").exists());
    Ok(())
}

#[test]
fn test_batch_square_outputs() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&input_dir)?;

    photo_with_block(5, 8).save(input_dir.join("Tall.PNG"))?;
    photo_with_block(8, 8).save(input_dir.join("even.tiff"))?;

    let processor = CutoutProcessor::new(MockRemover::keyed(WHITE), CropRequest::new(0, true));
    let summary = processor.process_directory(&input_dir, &output_dir)?;

    assert!(summary.is_success());
    assert_eq!(summary.succeeded.len(), 2);
    for outcome in &summary.succeeded {
        assert_eq!(image::open(&outcome.output)?.dimensions(), (8, 8));
        assert_eq!(outcome.output.extension().unwrap(), "png");
    }
    Ok(())
}

#[test]
fn test_batch_recursive_mirrors_layout() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input_dir = temp_dir.path().join("input");
    let nested = input_dir.join("shoes");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&nested)?;

    photo_with_block(2, 2).save(input_dir.join("top.png"))?;
    photo_with_block(2, 2).save(nested.join("red.jpg"))?;

    let flat = CutoutProcessor::new(MockRemover::keyed(WHITE), CropRequest::new(0, false));
    let summary = flat.process_directory(&input_dir, &output_dir)?;
    assert_eq!(summary.total(), 1);
    assert!(!output_dir.join("shoes").exists());

    let deep = flat.with_recursive(true);
    let summary = deep.process_directory(&input_dir, &output_dir)?;
    assert_eq!(summary.total(), 2);
    assert!(output_dir.join("shoes/red.png").exists());
    Ok(())
}

#[test]
fn test_batch_empty_directory() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let input_dir = temp_dir.path().join("input");
    let output_dir = temp_dir.path().join("output");
    fs::create_dir_all(&input_dir)?;

    let processor = CutoutProcessor::new(MockRemover::new(), CropRequest::default());
    let summary = processor.process_directory(&input_dir, &output_dir)?;

    assert_eq!(summary.total(), 0);
    assert!(summary.is_success());
    assert!(output_dir.is_dir());
    Ok(())
}

#[test]
fn test_batch_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let processor = CutoutProcessor::new(MockRemover::new(), CropRequest::default());

    let err = processor
        .process_directory(&temp_dir.path().join("nope"), &temp_dir.path().join("out"))
        .unwrap_err();

    assert!(matches!(
        err,
        CutoutError::MissingInput {
            kind: InputKind::Directory,
            ..
        }
    ));
    assert!(!temp_dir.path().join("out").exists());
}
