use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use inference::{PostProcessor, TransformParams};
use ndarray::{Array, IxDyn};

const NUM_ANCHORS: usize = 8400; // 80x80 + 40x40 + 20x20 at 640x640
const NUM_CLASSES: usize = 80;

/// Create mock YOLO head output with N confident anchors.
///
/// Every fourth confident anchor overlaps its predecessor so NMS has work to do.
fn create_mock_yolo_output(num_detections: usize) -> Array<f32, IxDyn> {
    let mut output = Array::<f32, _>::from_elem(IxDyn(&[1, 4 + NUM_CLASSES, NUM_ANCHORS]), 0.001);

    for i in 0..num_detections.min(NUM_ANCHORS) {
        let cx = 20.0 + ((i / 4) % 30) as f32 * 20.0 + (i % 4) as f32;
        let cy = 20.0 + ((i / 4) / 30) as f32 * 20.0;
        output[[0, 0, i]] = cx;
        output[[0, 1, i]] = cy;
        output[[0, 2, i]] = 16.0;
        output[[0, 3, i]] = 16.0;
        output[[0, 4 + (i / 4) % NUM_CLASSES, i]] = 0.5 + (i % 4) as f32 * 0.1;
    }

    output
}

fn benchmark_postprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("postprocessing");
    let post_processor = PostProcessor::new(0.25, 0.7, 300);
    let transform = TransformParams {
        orig_width: 1920,
        orig_height: 1080,
        scale: 1.0 / 3.0,
        offset_x: 0.0,
        offset_y: 140.0,
    };

    let detection_counts = [0, 20, 100, 400];

    for num_detections in detection_counts.iter() {
        let output = create_mock_yolo_output(*num_detections);

        group.bench_with_input(
            BenchmarkId::new("parse_detections", num_detections),
            &output,
            |b, output| {
                b.iter(|| {
                    post_processor
                        .parse_detections(black_box(&output.view()), black_box(&transform))
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_postprocessing);
criterion_main!(benches);
