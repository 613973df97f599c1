use image::RgbImage;

use crate::circle_detector::{detect_circles, Circle};
use crate::config::Config;

/// Locate up to `config.max_plates` plates on the tray.
///
/// Runs the detector with the plate, bowl and refine bands and keeps the
/// plate-band circles that do not coincide with a bowl detection.
pub fn locate_plates(image: &RgbImage, config: &Config) -> Vec<Circle> {
    locate_plates_with_candidates(image, config).0
}

/// Like [`locate_plates`], also returning the raw bowl-band detections so the
/// bowl locator can reuse them instead of rerunning the detector.
pub fn locate_plates_with_candidates(image: &RgbImage, config: &Config) -> (Vec<Circle>, Vec<Circle>) {
    let plates = detect_circles(image, &config.plate_detector);
    let bowls = detect_circles(image, &config.bowl_detector);
    let refine = detect_circles(image, &config.refine_detector);

    log::debug!(
        "Plate candidates: {} plate-band, {} bowl-band, {} refine-band",
        plates.len(),
        bowls.len(),
        refine.len()
    );

    let plates = filter_plate_candidates(plates, &bowls, &refine, config.max_plates);
    (plates, bowls)
}

/// Reject plate candidates that are really the bowl, then cap the count.
///
/// Pass 1 drops every plate whose own radius covers the center of a bowl-band
/// circle. Pass 2 runs only if more than `max_plates` survive, and drops plates
/// whose center lies inside a refine-band circle. The cap truncates in
/// detection order, it does not rank.
pub fn filter_plate_candidates(
    mut plates: Vec<Circle>,
    bowls: &[Circle],
    refine: &[Circle],
    max_plates: usize,
) -> Vec<Circle> {
    plates.retain(|plate| !bowls.iter().any(|bowl| plate.covers_center_of(bowl)));

    if plates.len() > max_plates {
        plates.retain(|plate| !refine.iter().any(|r| r.covers_center_of(plate)));
    }

    plates.truncate(max_plates);
    plates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f32, y: f32, r: f32) -> Circle {
        Circle::new(x, y, r)
    }

    #[test]
    fn plate_coinciding_with_bowl_is_removed() {
        let plates = vec![c(100.0, 100.0, 280.0), c(900.0, 100.0, 280.0)];
        let bowls = vec![c(150.0, 120.0, 190.0)];
        let result = filter_plate_candidates(plates, &bowls, &[], 2);
        assert_eq!(result, vec![c(900.0, 100.0, 280.0)]);
    }

    #[test]
    fn pass_one_uses_plate_radius() {
        // Bowl center is 250 px away: inside the plate radius, outside the bowl radius
        let plates = vec![c(0.0, 0.0, 280.0)];
        let bowls = vec![c(250.0, 0.0, 190.0)];
        assert!(filter_plate_candidates(plates, &bowls, &[], 2).is_empty());
    }

    #[test]
    fn consecutive_matches_are_all_removed() {
        let plates = vec![
            c(0.0, 0.0, 280.0),
            c(10.0, 0.0, 280.0),
            c(1000.0, 0.0, 280.0),
        ];
        let bowls = vec![c(5.0, 0.0, 190.0)];
        let result = filter_plate_candidates(plates, &bowls, &[], 2);
        assert_eq!(result, vec![c(1000.0, 0.0, 280.0)]);
    }

    #[test]
    fn second_pass_only_runs_when_over_cap() {
        let plates = vec![c(0.0, 0.0, 280.0), c(700.0, 0.0, 280.0)];
        let refine = vec![c(10.0, 0.0, 195.0)];
        let result = filter_plate_candidates(plates.clone(), &[], &refine, 2);
        assert_eq!(result, plates);
    }

    #[test]
    fn second_pass_uses_refine_radius() {
        let plates = vec![
            c(0.0, 0.0, 280.0),
            c(700.0, 0.0, 280.0),
            c(1400.0, 0.0, 280.0),
        ];
        // 250 px from the first plate: within the plate radius but not the refine radius
        let refine = vec![c(250.0, 0.0, 195.0), c(1410.0, 0.0, 195.0)];
        let result = filter_plate_candidates(plates, &[], &refine, 2);
        assert_eq!(result, vec![c(0.0, 0.0, 280.0), c(700.0, 0.0, 280.0)]);
    }

    #[test]
    fn result_is_truncated_in_detection_order() {
        let plates = vec![
            c(0.0, 0.0, 280.0),
            c(700.0, 0.0, 290.0),
            c(1400.0, 0.0, 300.0),
        ];
        let result = filter_plate_candidates(plates, &[], &[], 2);
        assert_eq!(result, vec![c(0.0, 0.0, 280.0), c(700.0, 0.0, 290.0)]);
    }

    #[test]
    fn blank_image_has_no_plates_or_candidates() {
        let image = RgbImage::from_pixel(320, 240, image::Rgb([90, 90, 90]));
        let (plates, bowls) = locate_plates_with_candidates(&image, &Config::default());
        assert!(plates.is_empty());
        assert!(bowls.is_empty());
    }

    #[test]
    fn no_candidates_yield_empty_result() {
        assert!(filter_plate_candidates(Vec::new(), &[c(0.0, 0.0, 190.0)], &[], 2).is_empty());
    }
}
