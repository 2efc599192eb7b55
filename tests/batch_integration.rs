use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use timemark::batch::{BatchError, BatchGeneration, BatchItem, BatchRunner, BatchStatus, ItemError};
use timemark::compositor::{AssetPaths, Compositor, RenderOptions};
use timemark::fields::WatermarkFields;
use uuid::Uuid;

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([180, 140, 90]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

fn runner(concurrency: usize) -> BatchRunner {
    BatchRunner::new(Arc::new(Compositor::new(AssetPaths::none())), concurrency)
}

fn fields() -> WatermarkFields {
    WatermarkFields {
        date: "15 Tháng 08, 2024".to_string(),
        time: "17:30".to_string(),
        day: "Thứ Năm".to_string(),
        location: "Đà Nẵng, Việt Nam".to_string(),
    }
}

#[tokio::test]
async fn test_outputs_keep_input_order_with_parallel_renders() {
    // The first image is by far the largest so it finishes last
    let items = vec![
        BatchItem::encoded(Uuid::new_v4(), "a.png", png(1600, 1200)),
        BatchItem::encoded(Uuid::new_v4(), "b.png", png(20, 20)),
        BatchItem::encoded(Uuid::new_v4(), "c.png", png(64, 48)),
    ];
    let ids: Vec<_> = items.iter().map(|item| item.id).collect();

    let generation = BatchGeneration::new();
    let ticket = generation.begin();
    let mut progress = Vec::new();

    let report = runner(3)
        .process_all(items, &fields(), &RenderOptions::default(), &ticket, |p| {
            progress.push((p.current, p.total))
        })
        .await
        .unwrap();

    assert_eq!(report.status(), BatchStatus::Completed);
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);

    let names: Vec<_> = report.outputs.iter().map(|o| o.filename.as_str()).collect();
    assert_eq!(names, vec!["a_watermark.jpg", "b_watermark.jpg", "c_watermark.jpg"]);
    let output_ids: Vec<_> = report.outputs.iter().map(|o| o.id).collect();
    assert_eq!(output_ids, ids);

    let first = image::load_from_memory(&report.outputs[0].bytes).unwrap();
    assert_eq!(first.dimensions(), (1600, 1200));
    assert_eq!(report.summary(), "Đã xử lý 3 ảnh thành công.");
}

#[tokio::test]
async fn test_undecodable_item_fails_alone() {
    let items = vec![
        BatchItem::encoded(Uuid::new_v4(), "one.png", png(40, 30)),
        BatchItem::encoded(Uuid::new_v4(), "broken.jpg", b"not really a jpeg".to_vec()),
        BatchItem::encoded(Uuid::new_v4(), "three.png", png(30, 40)),
    ];

    let generation = BatchGeneration::new();
    let ticket = generation.begin();
    let mut progress = Vec::new();

    let report = runner(1)
        .process_all(items, &fields(), &RenderOptions::default(), &ticket, |p| {
            progress.push(p.current)
        })
        .await
        .unwrap();

    assert_eq!(progress, vec![1, 2, 3]);
    assert_eq!(report.status(), BatchStatus::Partial);
    assert_eq!(report.total, 3);

    let names: Vec<_> = report.outputs.iter().map(|o| o.filename.as_str()).collect();
    assert_eq!(names, vec!["one_watermark.jpg", "three_watermark.jpg"]);
    assert_eq!(report.failed_names(), vec!["broken.jpg"]);
    assert!(matches!(report.failures[0].error, ItemError::DecodeError(_)));
    assert!(report.summary().ends_with("Không thể xử lý ảnh: broken.jpg"));
}

#[tokio::test]
async fn test_all_items_failing_is_reported() {
    let items = vec![
        BatchItem::encoded(Uuid::new_v4(), "x.jpg", Vec::new()),
        BatchItem::encoded(Uuid::new_v4(), "y.jpg", b"garbage".to_vec()),
    ];

    let generation = BatchGeneration::new();
    let ticket = generation.begin();
    let report = runner(2)
        .process_all(items, &fields(), &RenderOptions::default(), &ticket, |_| {})
        .await
        .unwrap();

    assert!(report.outputs.is_empty());
    assert_eq!(report.status(), BatchStatus::AllFailed);
    assert_eq!(report.summary(), "Không thể xử lý ảnh: x.jpg, y.jpg");
}

#[tokio::test]
async fn test_cancelled_batch_stops_early() {
    let items: Vec<_> = (0..4)
        .map(|i| BatchItem::encoded(Uuid::new_v4(), format!("{}.png", i), png(32, 32)))
        .collect();

    let generation = BatchGeneration::new();
    let ticket = generation.begin();
    let mut calls = 0;

    let result = runner(1)
        .process_all(items, &fields(), &RenderOptions::default(), &ticket, |_| {
            calls += 1;
            generation.invalidate();
        })
        .await;

    assert!(matches!(result, Err(BatchError::Cancelled)));
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn test_batch_cancelled_before_start() {
    let generation = BatchGeneration::new();
    let ticket = generation.begin();
    ticket.cancel();

    let items = vec![BatchItem::encoded(Uuid::new_v4(), "a.png", png(8, 8))];
    let result = runner(1)
        .process_all(items, &fields(), &RenderOptions::default(), &ticket, |_| {
            panic!("no progress expected")
        })
        .await;
    assert!(matches!(result, Err(BatchError::Cancelled)));
}

#[tokio::test]
async fn test_superseded_batch_discards_results() {
    let items = vec![
        BatchItem::encoded(Uuid::new_v4(), "a.png", png(16, 16)),
        BatchItem::encoded(Uuid::new_v4(), "b.png", png(16, 16)),
    ];

    let generation = BatchGeneration::new();
    let ticket = generation.begin();

    let result = runner(1)
        .process_all(items, &fields(), &RenderOptions::default(), &ticket, |p| {
            if p.current == p.total {
                // A newer batch starts right as this one finishes
                let _newer = generation.begin();
            }
        })
        .await;

    assert!(matches!(result, Err(BatchError::Superseded)));
    assert!(!ticket.is_current());
}

#[tokio::test]
async fn test_empty_batch() {
    let generation = BatchGeneration::new();
    let ticket = generation.begin();
    let report = runner(1)
        .process_all(Vec::new(), &fields(), &RenderOptions::default(), &ticket, |_| {})
        .await
        .unwrap();
    assert_eq!(report.status(), BatchStatus::Empty);
}
