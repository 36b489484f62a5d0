use docscan_align::{warp_perspective_rgb, Aligner, AlignerConfig};
use docscan_core::Homography;
use image::RgbImage;
use nalgebra::{Matrix3, Point2};

/// Deterministic block-noise document stand-in: dense in corners, no
/// repeated structure.
fn noise_document(w: u32, h: u32, seed: u64) -> RgbImage {
    let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let cell = 16u32;
    let cols = w.div_ceil(cell);
    let rows = h.div_ceil(cell);
    let shades: Vec<[u8; 3]> = (0..cols * rows)
        .map(|_| {
            let v = next();
            [(v % 256) as u8, ((v >> 8) % 256) as u8, ((v >> 16) % 256) as u8]
        })
        .collect();

    let mut img = RgbImage::new(w, h);
    for (x, y, p) in img.enumerate_pixels_mut() {
        let idx = (y / cell) * cols + (x / cell);
        p.0 = shades[idx as usize];
    }
    img
}

#[test]
fn aligning_an_image_to_itself_is_near_identity() {
    let img = noise_document(640, 480, 21);
    let aligner = Aligner::new(AlignerConfig::default());

    let result = aligner.align(&img, &img);
    assert!(result.success, "error: {:?}", result.error);
    assert!(result.quality_score > 0.9, "quality {}", result.quality_score);

    let transform = result.transform.expect("transform");
    for p in [
        Point2::new(0.0f32, 0.0),
        Point2::new(640.0, 0.0),
        Point2::new(0.0, 480.0),
        Point2::new(640.0, 480.0),
        Point2::new(320.0, 240.0),
    ] {
        let q = transform.apply(p);
        let dist = ((q.x - p.x).powi(2) + (q.y - p.y).powi(2)).sqrt();
        assert!(dist < 2.0, "point {p:?} moved by {dist}");
    }

    let aligned = result.aligned_image.expect("aligned image");
    assert_eq!(aligned.width(), 640);
    assert_eq!(aligned.height(), 480);
}

#[test]
fn featureless_images_fail_without_panicking() {
    let flat = RgbImage::from_pixel(240, 240, image::Rgb([128, 128, 128]));
    let aligner = Aligner::new(AlignerConfig::default());

    let result = aligner.align(&flat, &flat);
    assert!(!result.success);
    assert!(result.aligned_image.is_none());
    let msg = result.error.expect("error message");
    assert!(msg.contains("insufficient"), "unexpected message: {msg}");
}

#[test]
fn zero_sized_input_is_reported_not_thrown() {
    let empty = RgbImage::new(0, 0);
    let ok = noise_document(200, 200, 3);
    let aligner = Aligner::new(AlignerConfig::default());

    let result = aligner.align(&ok, &empty);
    assert!(!result.success);
    assert!(result.error.expect("message").contains("invalid input"));
}

#[test]
fn recovers_rotated_scan_at_original_resolution() {
    // Template 800x1000; the "photo" is a 1200x1600 canvas holding the
    // template rotated ~5 degrees and scaled up.
    let template = noise_document(800, 1000, 77);

    let angle = 5.0f64.to_radians();
    let (sin, cos) = angle.sin_cos();
    let s = 1.3f64;
    // template center -> canvas center, rotation + uniform scale
    let (cx, cy) = (400.0, 500.0);
    let (tx, ty) = (600.0, 800.0);
    let m = Matrix3::new(
        s * cos,
        -s * sin,
        tx - s * (cos * cx - sin * cy),
        s * sin,
        s * cos,
        ty - s * (sin * cx + cos * cy),
        0.0,
        0.0,
        1.0,
    );
    let template_to_canvas = Homography::new(m);
    let canvas_to_template = template_to_canvas.inverse().expect("invertible");

    let photo = warp_perspective_rgb(&template, &canvas_to_template, 1200, 1600);

    let aligner = Aligner::new(AlignerConfig {
        target_dimension: 800,
        orb_features: 4000,
    });
    let result = aligner.align(&template, &photo);

    assert!(result.success, "error: {:?}", result.error);
    assert!(result.inliers >= 25, "only {} inliers", result.inliers);
    assert!((0.0..=1.0).contains(&result.quality_score));

    let aligned = result.aligned_image.expect("aligned image");
    assert_eq!(aligned.width(), 800);
    assert_eq!(aligned.height(), 1000);

    // The recovered transform should map photo pixels back onto the
    // template within a few pixels.
    let transform = result.transform.expect("transform");
    let probe = Point2::new(600.0f32, 800.0);
    let expected = canvas_to_template.apply(probe);
    let got = transform.apply(probe);
    let dist = ((got.x - expected.x).powi(2) + (got.y - expected.y).powi(2)).sqrt();
    assert!(dist < 10.0, "probe drifted by {dist} px");
}
