// src/config.rs - Tuned detector bands and bread-stage thresholds

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::circle_detector::CircleDetectorParams;
use crate::errors::{FoodFinderError, Result};

/// Configuration for FoodFinder
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_input_path")]
    pub input_path: String,

    #[serde(default = "default_output_base_dir")]
    pub output_base_dir: String,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    /// Whether a salad bowl is expected on the tray (enables bowl refinement)
    #[serde(default)]
    pub prior_salad_seen: bool,

    /// Upper bound on reported plates
    #[serde(default = "default_max_plates")]
    pub max_plates: usize,

    // Circle detector bands
    #[serde(default = "default_plate_detector")]
    pub plate_detector: CircleDetectorParams,

    #[serde(default = "default_bowl_detector")]
    pub bowl_detector: CircleDetectorParams,

    /// Narrow band inside the bowl band, used for the second plate pass
    #[serde(default = "default_refine_detector")]
    pub refine_detector: CircleDetectorParams,

    /// Rim-tuned parameters used when the bowl detection is ambiguous
    #[serde(default = "default_bowl_refine_detector")]
    pub bowl_refine_detector: CircleDetectorParams,

    #[serde(default)]
    pub bread: BreadConfig,
}

/// Thresholds of the bread extraction funnel
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BreadConfig {
    /// Plate circles are blacked out at radius * plate_mask_scale
    pub plate_mask_scale: f32,
    /// Bowl circles are blacked out at radius * bowl_mask_scale
    pub bowl_mask_scale: f32,

    /// Inclusive band on the U chroma channel
    pub chroma_low: u8,
    pub chroma_high: u8,
    pub chroma_closing_kernel: u32,

    pub component_smoothing_kernel: u32,
    /// Divisor applied to the smoothing window sum
    pub component_smoothing_divisor: u32,
    pub component_threshold: u8,

    pub canny_low: f32,
    pub canny_high: f32,
    pub edge_smoothing_kernel: u32,
    pub edge_smoothing_divisor: u32,
    pub edge_threshold: u8,

    pub edge_dilate_kernel: u32,
    pub edge_dilate_iterations: u32,
    pub edge_close_kernel: u32,
    pub edge_close_iterations: u32,
    pub edge_erode_kernel: u32,
    pub edge_erode_iterations: u32,
    pub edge_final_dilate_iterations: u32,

    /// Pixels with saturation above this count as "coloured at all"
    pub saturation_floor: u8,
    /// Pixels with saturation above this are rejected as too saturated
    pub saturation_ceiling: u8,
    pub refine_kernel: u32,
    pub refine_erode_iterations: u32,
    pub refine_dilate_iterations: u32,

    pub min_contour_area: f64,
    pub fill_value: u8,
}

fn default_input_path() -> String {
    "./input".to_string()
}

fn default_output_base_dir() -> String {
    "./output".to_string()
}

fn default_parallel() -> bool {
    true
}

/// A tray never holds more plates than this
pub const MAX_PLATES_ON_TRAY: usize = 2;

fn default_max_plates() -> usize {
    MAX_PLATES_ON_TRAY
}

fn default_plate_detector() -> CircleDetectorParams {
    CircleDetectorParams::new(275, 300)
}

fn default_bowl_detector() -> CircleDetectorParams {
    CircleDetectorParams::new(185, 215)
}

fn default_refine_detector() -> CircleDetectorParams {
    CircleDetectorParams::new(190, 210)
}

fn default_bowl_refine_detector() -> CircleDetectorParams {
    CircleDetectorParams {
        canny_high_threshold: 60.0,
        accumulator_threshold: 30,
        ..CircleDetectorParams::new(176, 205)
    }
}

impl Default for BreadConfig {
    fn default() -> Self {
        Self {
            plate_mask_scale: 1.0,
            bowl_mask_scale: 1.4,
            chroma_low: 70,
            chroma_high: 117,
            chroma_closing_kernel: 11,
            component_smoothing_kernel: 51,
            component_smoothing_divisor: 45 * 45,
            component_threshold: 111,
            canny_low: 50.0,
            canny_high: 150.0,
            edge_smoothing_kernel: 7,
            edge_smoothing_divisor: 7 * 7,
            edge_threshold: 115,
            edge_dilate_kernel: 3,
            edge_dilate_iterations: 10,
            edge_close_kernel: 5,
            edge_close_iterations: 4,
            edge_erode_kernel: 3,
            edge_erode_iterations: 6,
            edge_final_dilate_iterations: 20,
            saturation_floor: 1,
            saturation_ceiling: 140,
            refine_kernel: 3,
            refine_erode_iterations: 1,
            refine_dilate_iterations: 12,
            min_contour_area: 20000.0,
            fill_value: 13,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_base_dir: default_output_base_dir(),
            use_parallel: default_parallel(),
            prior_salad_seen: false,
            max_plates: default_max_plates(),
            plate_detector: default_plate_detector(),
            bowl_detector: default_bowl_detector(),
            refine_detector: default_refine_detector(),
            bowl_refine_detector: default_bowl_refine_detector(),
            bread: BreadConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            FoodFinderError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| FoodFinderError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            FoodFinderError::Config(format!("Failed to serialize config: {}", e))
        })?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate detector bands and bread thresholds
    pub fn validate(&self) -> Result<()> {
        for (name, params) in [
            ("plate_detector", &self.plate_detector),
            ("bowl_detector", &self.bowl_detector),
            ("refine_detector", &self.refine_detector),
            ("bowl_refine_detector", &self.bowl_refine_detector),
        ] {
            params
                .validate()
                .map_err(|msg| FoodFinderError::Config(format!("{}: {}", name, msg)))?;
        }

        // The refine band is only a disambiguator if it sits inside the bowl band
        if self.refine_detector.min_radius <= self.bowl_detector.min_radius
            || self.refine_detector.max_radius >= self.bowl_detector.max_radius
        {
            return Err(FoodFinderError::Config(
                "refine_detector band must lie strictly inside bowl_detector band".to_string(),
            ));
        }

        if self.max_plates == 0 || self.max_plates > MAX_PLATES_ON_TRAY {
            return Err(FoodFinderError::Config(format!(
                "max_plates must be between 1 and {}, got {}",
                MAX_PLATES_ON_TRAY, self.max_plates
            )));
        }

        self.bread.validate()
    }
}

impl BreadConfig {
    fn validate(&self) -> Result<()> {
        if self.plate_mask_scale <= 0.0 || self.bowl_mask_scale <= 0.0 {
            return Err(FoodFinderError::Config(
                "bread mask scales must be > 0.0".to_string(),
            ));
        }

        if self.chroma_low > self.chroma_high {
            return Err(FoodFinderError::Config(
                "bread.chroma_low must be <= bread.chroma_high".to_string(),
            ));
        }

        for (name, size) in [
            ("chroma_closing_kernel", self.chroma_closing_kernel),
            ("component_smoothing_kernel", self.component_smoothing_kernel),
            ("edge_smoothing_kernel", self.edge_smoothing_kernel),
            ("edge_dilate_kernel", self.edge_dilate_kernel),
            ("edge_close_kernel", self.edge_close_kernel),
            ("edge_erode_kernel", self.edge_erode_kernel),
            ("refine_kernel", self.refine_kernel),
        ] {
            if size == 0 || size % 2 == 0 {
                return Err(FoodFinderError::Config(format!(
                    "bread.{} must be odd and > 0, got {}",
                    name, size
                )));
            }
        }

        if self.component_smoothing_divisor == 0 || self.edge_smoothing_divisor == 0 {
            return Err(FoodFinderError::Config(
                "bread smoothing divisors must be > 0".to_string(),
            ));
        }

        if self.canny_low > self.canny_high {
            return Err(FoodFinderError::Config(
                "bread.canny_low must be <= bread.canny_high".to_string(),
            ));
        }

        if self.saturation_floor >= self.saturation_ceiling {
            return Err(FoodFinderError::Config(
                "bread.saturation_floor must be < bread.saturation_ceiling".to_string(),
            ));
        }

        if self.fill_value == 0 {
            return Err(FoodFinderError::Config(
                "bread.fill_value must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
