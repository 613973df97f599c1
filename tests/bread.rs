mod common;

use common::{blank, paint_crumb, paint_crust, paint_disk, BACKGROUND, CROCKERY};
use food_finder_lib::image_utils::count_nonzero;
use food_finder_lib::{analyze_image, extract_bread, extract_bread_excluding, BreadConfig, Circle, Config};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};

const TRAY: Rgb<u8> = Rgb([120, 120, 120]);

fn region_count(mask: &GrayImage) -> u32 {
    connected_components(mask, Connectivity::Eight, Luma([0u8]))
        .pixels()
        .map(|p| p[0])
        .max()
        .unwrap_or(0)
}

fn crust_tray() -> RgbImage {
    let mut image = blank(420, 320, TRAY);
    paint_crust(&mut image, 60, 60, 220, 180);
    image
}

fn assert_single_bread_region(mask: &GrayImage) {
    assert!(count_nonzero(mask) > 20000, "bread area {}", count_nonzero(mask));
    assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == 13));
    assert_eq!(region_count(mask), 1);
}

#[test]
fn uniform_background_has_no_bread() {
    let image = blank(640, 480, BACKGROUND);
    let mask = extract_bread(&image, &Config::default());
    assert_eq!(mask.dimensions(), (640, 480));
    assert!(mask.pixels().all(|p| p[0] == 0));
}

#[test]
fn textured_crust_is_filled_as_one_region() {
    let mask = extract_bread(&crust_tray(), &Config::default());
    assert_eq!(mask.dimensions(), (420, 320));
    assert_single_bread_region(&mask);
    assert_eq!(mask.get_pixel(170, 150)[0], 13);
    assert_eq!(mask.get_pixel(5, 5)[0], 0);
    assert_eq!(mask.get_pixel(400, 300)[0], 0);
}

#[test]
fn crust_under_a_plate_is_masked_out() {
    let mut image = blank(640, 320, TRAY);
    paint_crust(&mut image, 40, 70, 220, 180);
    paint_crust(&mut image, 380, 70, 220, 180);
    let config = BreadConfig::default();

    // Equal patches: the first in raster order wins
    let unmasked = extract_bread_excluding(&image, &[], &[], &config, None);
    assert_single_bread_region(&unmasked);
    assert_eq!(unmasked.get_pixel(150, 160)[0], 13);
    assert_eq!(unmasked.get_pixel(490, 160)[0], 0);

    let plate = Circle::new(150.0, 160.0, 160.0);
    let masked = extract_bread_excluding(&image, &[plate], &[], &config, None);
    assert_single_bread_region(&masked);
    assert_eq!(masked.get_pixel(150, 160)[0], 0);
    assert_eq!(masked.get_pixel(490, 160)[0], 13);
}

#[test]
fn noisy_crumb_still_yields_at_most_one_region() {
    let mut image = blank(420, 320, TRAY);
    paint_crumb(&mut image, 60, 60, 220, 180);
    let mask = extract_bread(&image, &Config::default());
    assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == 13));
    assert!(region_count(&mask) <= 1);
}

#[test]
fn bread_extraction_is_deterministic() {
    let image = crust_tray();
    let config = Config::default();
    let first = extract_bread(&image, &config);
    assert!(count_nonzero(&first) > 0);
    assert_eq!(first, extract_bread(&image, &config));
}

#[test]
fn pipeline_mask_matches_standalone_extraction() {
    let mut image = crust_tray();
    paint_disk(&mut image, 380.0, 40.0, 30.0, CROCKERY);
    let config = Config::default();

    let regions = analyze_image(&image, &config).unwrap();
    assert!(count_nonzero(&regions.bread_mask) > 20000);
    assert_eq!(regions.bread_mask, extract_bread(&image, &config));
}

#[test]
fn small_bread_area_threshold_still_yields_single_region() {
    let mut config = Config::default();
    config.bread.min_contour_area = 10.0;
    let mask = extract_bread(&crust_tray(), &config);
    assert_single_bread_region(&mask);
}
