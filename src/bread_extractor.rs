// src/bread_extractor.rs - Bread region funnel
//
// Crockery is blacked out, bread-coloured chroma is grown into a blob, the
// blob's textured interior is recovered from Canny edges, and the moderately
// saturated part of it is filled as a single region.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

use crate::bowl_locator::resolve_bowl;
use crate::circle_detector::Circle;
use crate::config::{BreadConfig, Config};
use crate::image_utils::{
    apply_mask_gray, apply_mask_rgb, box_filter, canny_unsmoothed, chroma_u_channel, in_range,
    saturation_channel, subtract_mask, threshold_binary, to_intensity,
};
use crate::morphology::{close_square, dilate_square, erode_square, fill_largest_contour, largest_component};
use crate::plate_locator::locate_plates_with_candidates;

/// Named intermediate masks, recorded in pipeline order
#[derive(Debug, Default, Clone)]
pub struct StageTrace {
    pub stages: Vec<(String, GrayImage)>,
}

impl StageTrace {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, name: &str, image: &GrayImage) {
        self.stages.push((name.to_string(), image.clone()));
    }
}

/// Locate plates and bowl, then extract the bread mask.
///
/// The bowl is located as if a salad were expected, so any bowl-like rim is
/// masked out.
pub fn extract_bread(image: &RgbImage, config: &Config) -> GrayImage {
    let (plates, bowl_candidates) = locate_plates_with_candidates(image, config);
    let bowls = resolve_bowl(image, bowl_candidates, true, &plates, config);
    extract_bread_excluding(image, &plates, &bowls, &config.bread, None)
}

/// Extract the bread mask given already located plates and bowls.
///
/// The output has the input's dimensions and holds `fill_value` inside at most
/// one region, zero elsewhere. Pass a `StageTrace` to capture every
/// intermediate mask.
pub fn extract_bread_excluding(
    image: &RgbImage,
    plates: &[Circle],
    bowls: &[Circle],
    config: &BreadConfig,
    mut trace: Option<&mut StageTrace>,
) -> GrayImage {
    let mut record = |name: &str, mask: &GrayImage| {
        if let Some(trace) = trace.as_deref_mut() {
            trace.record(name, mask);
        }
    };

    // 1. Black out crockery
    let masked = mask_out_circles(image, plates, bowls, config);

    // 2-3. Bread-coloured chroma, fused by closing
    let chroma = chroma_u_channel(&masked);
    let chroma_mask = in_range(&chroma, config.chroma_low, config.chroma_high);
    let chroma_kept = apply_mask_gray(&chroma, &chroma_mask);
    record("chroma", &chroma_kept);
    let fused = close_square(&chroma_kept, config.chroma_closing_kernel, 1);
    record("chroma_closed", &fused);

    // 4. Largest blob
    let component = largest_component(&fused);
    record("largest_component", &component);

    // 5. Smooth the blob outline
    let blob = threshold_binary(
        &box_filter(
            &component,
            config.component_smoothing_kernel,
            config.component_smoothing_divisor,
        ),
        config.component_threshold,
    );
    record("component_smoothed", &blob);

    // 6. Texture edges inside the blob
    let blob_gray = to_intensity(&apply_mask_rgb(image, &blob));
    let edges = canny_unsmoothed(&blob_gray, config.canny_low, config.canny_high);
    record("edges", &edges);
    let dense_edges = threshold_binary(
        &box_filter(&edges, config.edge_smoothing_kernel, config.edge_smoothing_divisor),
        config.edge_threshold,
    );
    record("edges_smoothed", &dense_edges);

    // 7. Bridge gaps between textured patches
    let mut region = dilate_square(&dense_edges, config.edge_dilate_kernel, config.edge_dilate_iterations);
    region = close_square(&region, config.edge_close_kernel, config.edge_close_iterations);
    region = erode_square(&region, config.edge_erode_kernel, config.edge_erode_iterations);
    region = dilate_square(&region, config.edge_dilate_kernel, config.edge_final_dilate_iterations);
    record("edge_region", &region);

    // 8. Moderately saturated pixels only
    let saturation = saturation_channel(&apply_mask_rgb(image, &region));
    let coloured = threshold_binary(&saturation, config.saturation_floor);
    let too_saturated = threshold_binary(&saturation, config.saturation_ceiling);
    let moderate = subtract_mask(&coloured, &too_saturated);
    record("saturation", &moderate);

    // 9. Refine
    let refined = dilate_square(
        &erode_square(&moderate, config.refine_kernel, config.refine_erode_iterations),
        config.refine_kernel,
        config.refine_dilate_iterations,
    );
    record("refined", &refined);

    // 10. Single largest qualifying contour
    let bread = fill_largest_contour(&refined, config.min_contour_area, config.fill_value);
    record("bread", &bread);

    log::debug!(
        "Bread extraction: {} plate(s) and {} bowl(s) masked, {} bread pixels",
        plates.len(),
        bowls.len(),
        crate::image_utils::count_nonzero(&bread)
    );

    bread
}

/// Copy of `image` with plates and bowls painted solid black
fn mask_out_circles(
    image: &RgbImage,
    plates: &[Circle],
    bowls: &[Circle],
    config: &BreadConfig,
) -> RgbImage {
    let mut masked = image.clone();
    let scaled = plates
        .iter()
        .map(|c| (c, config.plate_mask_scale))
        .chain(bowls.iter().map(|c| (c, config.bowl_mask_scale)));

    for (circle, scale) in scaled {
        // Pixel coordinates are integral, matching how the detector reports them
        let center = (circle.x as i32, circle.y as i32);
        let radius = (circle.radius.trunc() * scale) as i32;
        draw_filled_circle_mut(&mut masked, center, radius, Rgb([0, 0, 0]));
    }

    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crockery_is_blacked_out_with_scaled_radii() {
        let image = RgbImage::from_pixel(200, 100, Rgb([200, 160, 90]));
        let plates = [Circle::new(40.0, 50.0, 20.0)];
        let bowls = [Circle::new(140.0, 50.0, 20.0)];
        let masked = mask_out_circles(&image, &plates, &bowls, &BreadConfig::default());

        assert_eq!(*masked.get_pixel(40, 50), Rgb([0, 0, 0]));
        // 25 px from the plate center: outside radius 20
        assert_eq!(*masked.get_pixel(65, 50), Rgb([200, 160, 90]));
        // 25 px from the bowl center: inside radius 20 * 1.4
        assert_eq!(*masked.get_pixel(165, 50), Rgb([0, 0, 0]));
        assert_eq!(*masked.get_pixel(140, 85), Rgb([200, 160, 90]));
    }

    #[test]
    fn uniform_image_yields_empty_mask_and_full_trace() {
        let image = RgbImage::from_pixel(160, 120, Rgb([128, 128, 128]));
        let mut trace = StageTrace::new();
        let bread = extract_bread_excluding(&image, &[], &[], &BreadConfig::default(), Some(&mut trace));

        assert_eq!(bread.dimensions(), (160, 120));
        assert!(bread.pixels().all(|p| p[0] == 0));
        assert_eq!(trace.stages.len(), 10);
        assert_eq!(trace.stages.last().map(|(name, _)| name.as_str()), Some("bread"));
    }

    fn stage<'a>(trace: &'a StageTrace, name: &str) -> &'a GrayImage {
        &trace.stages.iter().find(|(n, _)| n == name).unwrap().1
    }

    #[test]
    fn fine_crust_texture_survives_edge_stages() {
        let tones = [
            Rgb([200, 170, 120]),
            Rgb([240, 210, 160]),
            Rgb([200, 170, 120]),
            Rgb([160, 130, 80]),
        ];
        let mut image = RgbImage::from_pixel(420, 320, Rgb([120, 120, 120]));
        for y in 60..240 {
            for x in 60..280 {
                image.put_pixel(x, y, tones[((x - 60) % 4) as usize]);
            }
        }

        let mut trace = StageTrace::new();
        let bread = extract_bread_excluding(&image, &[], &[], &BreadConfig::default(), Some(&mut trace));

        let count = crate::image_utils::count_nonzero;
        assert!(count(stage(&trace, "edges")) > 15000);
        assert!(count(stage(&trace, "edges_smoothed")) > 15000);
        assert!(count(stage(&trace, "edge_region")) >= 220 * 180);
        assert_eq!(count(stage(&trace, "saturation")), 220 * 180);
        assert!(count(&bread) > 20000);
        assert_eq!(bread.get_pixel(170, 150)[0], 13);
    }

    #[test]
    fn flat_bread_colour_without_texture_is_rejected() {
        // Bread tones pass the chroma gate, but a flat patch has no edge texture
        let image = RgbImage::from_pixel(240, 240, Rgb([200, 160, 90]));
        let bread = extract_bread_excluding(&image, &[], &[], &BreadConfig::default(), None);
        assert!(bread.pixels().all(|p| p[0] == 0));
    }
}
