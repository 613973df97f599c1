use image::RgbImage;

use crate::circle_detector::{detect_circles, Circle};
use crate::config::Config;
use crate::plate_locator::locate_plates;

/// Locate the salad bowl.
///
/// A single bowl-band detection is trusted outright, as is any result when no
/// bowl is expected. Otherwise the rim-tuned detector is rerun and circles
/// sitting on a located plate are discarded. An empty result means no bowl.
pub fn locate_bowl(image: &RgbImage, prior_salad_seen: bool, config: &Config) -> Vec<Circle> {
    let candidates = detect_circles(image, &config.bowl_detector);
    if !needs_refinement(&candidates, prior_salad_seen) {
        return candidates;
    }

    let plates = locate_plates(image, config);
    resolve_bowl(image, candidates, prior_salad_seen, &plates, config)
}

/// Finish bowl location from existing bowl-band detections and located plates
pub fn resolve_bowl(
    image: &RgbImage,
    candidates: Vec<Circle>,
    prior_salad_seen: bool,
    plates: &[Circle],
    config: &Config,
) -> Vec<Circle> {
    if !needs_refinement(&candidates, prior_salad_seen) {
        log::debug!("Bowl detection: {} circle(s), no refinement", candidates.len());
        return candidates;
    }

    let refined = detect_circles(image, &config.bowl_refine_detector);
    log::debug!(
        "Bowl detection ambiguous ({} circles), refined to {} against {} plate(s)",
        candidates.len(),
        refined.len(),
        plates.len()
    );

    remove_plate_coincident(refined, plates)
}

fn needs_refinement(candidates: &[Circle], prior_salad_seen: bool) -> bool {
    prior_salad_seen && candidates.len() != 1
}

/// Drop refined bowl circles whose center lies inside a plate's radius.
///
/// Filtering only applies when more than one candidate is left to choose from.
pub fn remove_plate_coincident(mut candidates: Vec<Circle>, plates: &[Circle]) -> Vec<Circle> {
    if candidates.len() > 1 {
        candidates.retain(|bowl| !plates.iter().any(|plate| plate.covers_center_of(bowl)));
    }
    candidates
}
