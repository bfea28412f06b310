//! End-to-end behavior of the editing core through its public API.

use retouch::editing::{
    BitDepth, Channels, ColorSample, OperationKind, Operation, Pipeline, PixelBuffer, Samples,
    ValidationReason, execute, validate,
};
use serde_json::{Value, json};

fn op(kind: &str, params: Value) -> Operation {
    Operation::parse(kind, &params).unwrap()
}

fn samples_u8(buf: &PixelBuffer) -> &[u8] {
    match buf.samples() {
        Samples::U8(v) => v,
        Samples::U16(_) => panic!("expected 8-bit samples"),
    }
}

/// 4x4 RGB8 buffer where every pixel is distinct.
fn distinct_4x4() -> PixelBuffer {
    let data = (0..16u8).flat_map(|i| [i * 16, 255 - i * 16, i * 3]).collect();
    PixelBuffer::from_rgb8(4, 4, data).unwrap()
}

#[test]
fn brightness_on_mid_gray() {
    let gray = PixelBuffer::from_rgb8(4, 4, vec![128; 48]).unwrap();
    let pipeline = Pipeline::new(vec![op("brightness", json!({"amount": 20}))]);

    let out = execute(&gray, &pipeline).unwrap();
    assert!(samples_u8(&out).iter().all(|&v| v == 148));
}

#[test]
fn brightness_clamps_instead_of_wrapping() {
    let bright = PixelBuffer::from_rgb8(2, 2, vec![250; 12]).unwrap();
    let pipeline = Pipeline::new(vec![op("brightness", json!({"amount": 20}))]);

    let out = execute(&bright, &pipeline).unwrap();
    assert!(samples_u8(&out).iter().all(|&v| v == 255));
}

#[test]
fn crop_then_nearest_upscale_duplicates_interior_pixels() {
    let src = distinct_4x4();
    let pipeline = Pipeline::new(vec![
        op("crop", json!({"x": 1, "y": 1, "w": 2, "h": 2})),
        op("resize", json!({"w": 4, "h": 4, "filter": "nearest"})),
    ]);

    let out = execute(&src, &pipeline).unwrap();
    assert_eq!(out.dimensions(), (4, 4));
    for y in 0..4 {
        for x in 0..4 {
            let expected = src.pixel(1 + x / 2, 1 + y / 2);
            assert_eq!(out.pixel(x, y), expected, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn crop_inside_bounds_copies_the_rectangle() {
    let src = distinct_4x4();
    let out = op("crop", json!({"x": 2, "y": 1, "w": 2, "h": 3}))
        .apply(&src)
        .unwrap();
    assert_eq!(out.dimensions(), (2, 3));
    for y in 0..3 {
        for x in 0..2 {
            assert_eq!(out.pixel(x, y), src.pixel(x + 2, y + 1));
        }
    }
}

#[test]
fn posterize_two_levels_yields_two_values() {
    let data = [0u8, 64, 128, 192, 255]
        .iter()
        .flat_map(|&v| [v, v, v])
        .collect();
    let src = PixelBuffer::from_rgb8(5, 1, data).unwrap();

    let out = op("posterize", json!({"levels": 2})).apply(&src).unwrap();
    let mut distinct = samples_u8(&out).to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), 2);
}

#[test]
fn zero_width_resize_is_rejected_naming_w() {
    let err = Operation::parse("resize", &json!({"w": 0, "h": 10})).unwrap_err();
    assert_eq!(err.param, "w");
    assert!(matches!(err.reason, ValidationReason::OutOfRange { .. }));
}

#[test]
fn missing_required_parameter_is_reported() {
    let err = Operation::parse("crop", &json!({"w": 4})).unwrap_err();
    assert_eq!(err.param, "h");
    assert_eq!(err.reason, ValidationReason::Missing);
}

#[test]
fn empty_pipeline_is_byte_identical() {
    let rgba16 = PixelBuffer::from_rgba16(2, 2, (0..16).map(|i| i * 4000).collect()).unwrap();
    for buf in [distinct_4x4(), rgba16] {
        assert_eq!(execute(&buf, &Pipeline::default()).unwrap(), buf);
    }
}

#[test]
fn rotate_zero_is_identity() {
    let src = distinct_4x4();
    let out = op("rotate", json!({"angle": 0})).apply(&src).unwrap();
    assert_eq!(out, src);
}

/// 9x9 mid-gray with a distinct center pixel at (4, 4).
fn marked_center_9x9() -> PixelBuffer {
    let mut data = vec![60u8; 9 * 9 * 3];
    let center = (4 * 9 + 4) * 3;
    data[center..center + 3].copy_from_slice(&[10, 200, 30]);
    PixelBuffer::from_rgb8(9, 9, data).unwrap()
}

#[test]
fn rotate_45_expands_fills_corners_and_keeps_center() {
    let src = marked_center_9x9();
    for interpolation in ["bilinear", "nearest"] {
        let out = op(
            "rotate",
            json!({"angle": 45, "expand": "true", "fill": "#ff0000", "interpolation": interpolation}),
        )
        .apply(&src)
        .unwrap();

        let (w, h) = out.dimensions();
        assert!(w > 9 && h > 9, "{interpolation}: {w}x{h}");
        let red = Some(ColorSample::new(1.0, 0.0, 0.0));
        for (x, y) in [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)] {
            assert_eq!(out.pixel(x, y), red, "{interpolation}: corner ({x}, {y})");
        }
        assert_eq!(out.pixel(w / 2, h / 2), src.pixel(4, 4), "{interpolation}");
    }
}

#[test]
fn rotate_45_without_expand_keeps_the_canvas() {
    let out = op("rotate", json!({"angle": 45, "expand": false, "fill": "#ff0000"}))
        .apply(&marked_center_9x9())
        .unwrap();
    assert_eq!(out.dimensions(), (9, 9));
    assert_eq!(out.pixel(0, 0), Some(ColorSample::new(1.0, 0.0, 0.0)));
}

#[test]
fn rotate_interpolation_changes_sampling() {
    // Black and white 1-pixel checkerboard.
    let data = (0..8 * 8)
        .flat_map(|i| {
            let v = if (i % 8 + i / 8) % 2 == 0 { 0 } else { 255 };
            [v, v, v]
        })
        .collect();
    let src = PixelBuffer::from_rgb8(8, 8, data).unwrap();
    let rotate = |interpolation: &str| {
        op("rotate", json!({"angle": 30, "fill": "white", "interpolation": interpolation}))
            .apply(&src)
            .unwrap()
    };

    let nearest = rotate("nearest");
    assert!(samples_u8(&nearest).iter().all(|&v| v == 0 || v == 255));
    let bilinear = rotate("bilinear");
    assert!(samples_u8(&bilinear).iter().any(|&v| v > 0 && v < 255));
}

#[test]
fn negative_twice_restores_original() {
    let src = distinct_4x4();
    let pipeline = Pipeline::new(vec![op("negative", json!({})), op("invert", json!(null))]);
    assert_eq!(execute(&src, &pipeline).unwrap(), src);
}

#[test]
fn validate_is_idempotent_for_every_kind() {
    for &kind in OperationKind::ALL {
        let raw = match kind {
            OperationKind::Crop | OperationKind::Resize => json!({"w": 3, "h": 2}),
            _ => json!({}),
        };
        let Value::Object(raw) = raw else { unreachable!() };
        let once = validate(kind, &raw).unwrap();
        let twice = validate(kind, &once.to_json_map()).unwrap();
        assert_eq!(once, twice, "{kind}");
    }
}

#[test]
fn every_kind_runs_on_rgba16_and_keeps_layout() {
    let src = PixelBuffer::from_rgba16(
        6,
        5,
        (0..6 * 5 * 4).map(|i| (i * 2111 % 65536) as u16).collect(),
    )
    .unwrap();
    for &kind in OperationKind::ALL {
        let raw = match kind {
            OperationKind::Crop | OperationKind::Resize => json!({"w": 3, "h": 2}),
            _ => json!(null),
        };
        let out = Operation::parse(kind.name(), &raw)
            .unwrap()
            .apply(&src)
            .unwrap_or_else(|e| panic!("{kind}: {e}"));
        assert_eq!(out.channels(), Channels::Rgba, "{kind}");
        assert_eq!(out.depth(), BitDepth::Sixteen, "{kind}");
    }
}

#[test]
fn seeded_filters_are_reproducible() {
    let src = distinct_4x4();
    for (kind, params) in [
        ("grain", json!({"amount": 0.3, "seed": 42})),
        ("crystallize", json!({"cell": 2, "seed": 42})),
    ] {
        let a = op(kind, params.clone()).apply(&src).unwrap();
        let b = op(kind, params).apply(&src).unwrap();
        assert_eq!(a, b, "{kind}");
    }
}

#[test]
fn crop_after_shrinking_resize_fails_at_that_stage() {
    let pipeline = Pipeline::new(vec![
        op("resize", json!({"w": 2, "h": 2})),
        op("crop", json!({"x": 1, "y": 1, "w": 2, "h": 2})),
    ]);
    let err = execute(&distinct_4x4(), &pipeline).unwrap_err();
    assert_eq!(err.stage, 1);
    assert_eq!(err.kind, OperationKind::Crop);
    assert!(err.to_string().starts_with("stage 1 (crop): "));
}

#[test]
fn order_is_significant() {
    let src = distinct_4x4();
    let crop_then_rotate = Pipeline::new(vec![
        op("crop", json!({"w": 3, "h": 2})),
        op("rotate", json!({"angle": 90})),
    ]);
    let rotate_then_crop = Pipeline::new(vec![
        op("rotate", json!({"angle": 90})),
        op("crop", json!({"w": 3, "h": 2})),
    ]);
    let a = execute(&src, &crop_then_rotate).unwrap();
    let b = execute(&src, &rotate_then_crop).unwrap();
    assert_ne!(a, b);
}

#[test]
fn input_buffer_is_never_modified() {
    let src = distinct_4x4();
    let copy = src.clone();
    let pipeline = Pipeline::new(vec![op("emboss", json!({})), op("swirl", json!({}))]);
    execute(&src, &pipeline).unwrap();
    assert_eq!(src, copy);
}

#[test]
fn pipeline_json_roundtrip_through_file_format() {
    let text = r#"[
        {"kind": "Color_Temperature", "params": {"kelvin": 3200}},
        {"kind": "vignette", "params": {"color": [10, 20, 30]}}
    ]"#;
    let pipeline = Pipeline::from_json_str(text).unwrap();
    assert_eq!(pipeline.operations()[0].kind(), OperationKind::ColorTemperature);

    let saved = serde_json::to_value(&pipeline).unwrap();
    assert_eq!(saved[1]["params"]["color"], json!("#0a141e"));
    assert_eq!(saved[0]["params"]["strength"], json!(1.0));
}
