// src/lib.rs - Library interface for FoodFinder

pub mod bowl_locator;
pub mod bread_extractor;
pub mod circle_detector;
pub mod config;
pub mod errors;
pub mod image_io;
pub mod image_utils;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod plate_locator;

// Re-export commonly used types and functions
pub use errors::{FoodFinderError, Result};
pub use config::{BreadConfig, Config};
pub use circle_detector::{detect_circles, Circle, CircleDetectorParams};
pub use plate_locator::{locate_plates, locate_plates_with_candidates};
pub use bowl_locator::{locate_bowl, resolve_bowl};
pub use bread_extractor::{extract_bread, extract_bread_excluding, StageTrace};
pub use pipeline::{analyze_image, process_image, FoodRegions};
pub use image_io::{InputImage, load_image, save_mask};
