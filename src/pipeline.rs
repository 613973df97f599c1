// src/pipeline.rs - Runs the three locators on one tray image

use std::path::PathBuf;

use image::{GrayImage, RgbImage};

use crate::bowl_locator::resolve_bowl;
use crate::bread_extractor::{extract_bread_excluding, StageTrace};
use crate::circle_detector::Circle;
use crate::config::Config;
use crate::errors::{FoodFinderError, Result};
use crate::image_io::{save_mask, InputImage};
use crate::image_utils::count_nonzero;
use crate::output::ImageSummary;
use crate::plate_locator::locate_plates_with_candidates;

/// Everything located on one tray image
#[derive(Debug, Clone)]
pub struct FoodRegions {
    pub plates: Vec<Circle>,
    pub bowls: Vec<Circle>,
    pub bread_mask: GrayImage,
}

/// Locate plates, bowl and bread on a tray image
pub fn analyze_image(image: &RgbImage, config: &Config) -> Result<FoodRegions> {
    analyze_image_traced(image, config, None)
}

/// Same as [`analyze_image`], optionally capturing the bread stages
pub fn analyze_image_traced(
    image: &RgbImage,
    config: &Config,
    trace: Option<&mut StageTrace>,
) -> Result<FoodRegions> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(FoodFinderError::EmptyImage { width, height });
    }

    // Each detector band runs once; bowl location reuses the plate pass
    let (plates, bowl_candidates) = locate_plates_with_candidates(image, config);
    let bowls = resolve_bowl(image, bowl_candidates.clone(), config.prior_salad_seen, &plates, config);

    // Bread masking always assumes a bowl may be on the tray
    let exclusion_bowls = if config.prior_salad_seen {
        bowls.clone()
    } else {
        resolve_bowl(image, bowl_candidates, true, &plates, config)
    };

    let bread_mask = extract_bread_excluding(image, &plates, &exclusion_bowls, &config.bread, trace);

    Ok(FoodRegions {
        plates,
        bowls,
        bread_mask,
    })
}

/// Analyze one input image and write its bread mask (and stage masks in debug mode)
pub fn process_image(input_image: InputImage, config: &Config, debug: bool) -> Result<ImageSummary> {
    let InputImage { image, path, filename } = input_image;
    let output_base = PathBuf::from(&config.output_base_dir);

    let mut trace = StageTrace::new();
    let regions = analyze_image_traced(&image, config, debug.then_some(&mut trace))?;

    let mask_path = output_base.join("masks").join(format!("{}_bread.png", filename));
    save_mask(&regions.bread_mask, &mask_path)?;

    if debug {
        let debug_dir = output_base.join("debug").join(&filename);
        for (index, (stage, mask)) in trace.stages.iter().enumerate() {
            save_mask(mask, debug_dir.join(format!("{:02}_{}.png", index + 1, stage)))?;
        }
        log::debug!("Saved {} stage masks to {}", trace.stages.len(), debug_dir.display());
    }

    let summary = ImageSummary {
        filename,
        path,
        plates: regions.plates,
        bowls: regions.bowls,
        bread_area: count_nonzero(&regions.bread_mask),
    };

    log::info!(
        "{}: {} plate(s), {} bowl(s), {} bread pixels",
        summary.filename,
        summary.plates.len(),
        summary.bowls.len(),
        summary.bread_area
    );

    Ok(summary)
}
