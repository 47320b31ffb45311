#![cfg(feature = "cli")]

use assert_cmd::Command;
use image::{GrayImage, Luma};
use predicates::prelude::*;
use std::path::Path;

/// Dark square in the top-left quadrant of a light field.
fn write_test_image(path: &Path) {
    let img = GrayImage::from_fn(40, 20, |x, y| {
        if x < 10 && y < 10 {
            Luma([20])
        } else {
            Luma([230])
        }
    });
    img.save(path).expect("write input png");
}

fn barscan() -> Command {
    Command::cargo_bin("barscan").expect("barscan binary")
}

#[test]
fn prepare_writes_rotated_bitmap() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in.png");
    let output = dir.path().join("bitmap.png");
    let luminance = dir.path().join("luma.png");
    write_test_image(&input);

    barscan()
        .arg("prepare")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--luminance")
        .arg(&luminance)
        .args(["--rotate", "90", "--binarizer", "global"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote 20x40 Normal bitmap (100 dark)"));

    let bitmap = image::open(&output).expect("read bitmap").to_luma8();
    assert_eq!(bitmap.dimensions(), (20, 40));
    // The dark square moves to the top-right corner.
    assert_eq!(bitmap.get_pixel(19, 0), &Luma([0]));
    assert_eq!(bitmap.get_pixel(0, 0), &Luma([255]));
    assert!(luminance.exists());
}

#[test]
fn config_supplies_defaults_and_flags_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in.png");
    let output = dir.path().join("bitmap.png");
    let config_path = dir.path().join("scan.json");
    write_test_image(&input);

    let config = serde_json::json!({
        "options": {
            "lens_facing": "front",
            "decode": { "strategy": "inverted" }
        },
        "log_level": "warn"
    });
    std::fs::write(&config_path, config.to_string()).expect("write config");

    barscan()
        .arg("prepare")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--config")
        .arg(&config_path)
        .args(["--strategy", "mixed", "--binarizer", "global"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mixed bitmap (100 dark)"));

    // Mirrored by the front-lens config: the square is now top-right.
    let bitmap = image::open(&output).expect("read bitmap").to_luma8();
    assert_eq!(bitmap.get_pixel(39, 0), &Luma([0]));
    assert_eq!(bitmap.get_pixel(0, 0), &Luma([255]));
}

#[test]
fn bad_crop_is_rejected_by_the_parser() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in.png");
    write_test_image(&input);

    barscan()
        .arg("prepare")
        .arg(&input)
        .args(["-o", "unused.png", "--crop", "1,2,3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("four values"));
}

#[test]
fn unsupported_rotation_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("in.png");
    write_test_image(&input);

    barscan()
        .arg("prepare")
        .arg(&input)
        .arg("-o")
        .arg(dir.path().join("out.png"))
        .args(["--rotate", "45"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("45"));
}
