// src/circle_detector.rs - Gradient Hough transform for plate and bowl rims
//
// Every Canny edge pixel votes along its gradient line (both directions) at
// each radius of the configured band. Rims produce accumulator peaks at their
// centers; peaks are then visited strongest first, suppressed by a minimum
// center distance, and given the radius best supported by the edge pixels.

use image::{GrayImage, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use serde::{Deserialize, Serialize};

use crate::image_utils::to_intensity;

/// Smoothing applied before estimating gradient directions
const GRADIENT_SIGMA: f32 = 1.4;

/// A hypothesised circular boundary, in pixel units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Circle {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }

    /// Euclidean distance between the two centers
    pub fn center_distance(&self, other: &Circle) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// True when `other`'s center lies strictly inside this circle's radius.
    ///
    /// This is the "same physical object" test used by the locators. It is
    /// asymmetric: only this circle's radius is considered.
    pub fn covers_center_of(&self, other: &Circle) -> bool {
        self.center_distance(other) < self.radius
    }
}

/// Radius band and sensitivity of one detector invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleDetectorParams {
    pub min_radius: u32,
    pub max_radius: u32,
    /// Minimum distance between centers is image height / min_dist_divisor
    #[serde(default = "default_min_dist_divisor")]
    pub min_dist_divisor: f32,
    /// Upper Canny threshold; the lower one is half of it
    #[serde(default = "default_canny_high_threshold")]
    pub canny_high_threshold: f32,
    /// Votes a center (and its best radius) needs to be reported
    #[serde(default = "default_accumulator_threshold")]
    pub accumulator_threshold: u32,
}

fn default_min_dist_divisor() -> f32 {
    3.0
}

fn default_canny_high_threshold() -> f32 {
    100.0
}

fn default_accumulator_threshold() -> u32 {
    30
}

impl CircleDetectorParams {
    /// Band with the shared default sensitivity
    pub fn new(min_radius: u32, max_radius: u32) -> Self {
        Self {
            min_radius,
            max_radius,
            min_dist_divisor: default_min_dist_divisor(),
            canny_high_threshold: default_canny_high_threshold(),
            accumulator_threshold: default_accumulator_threshold(),
        }
    }

    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.min_radius == 0 {
            return Err("min_radius must be > 0".to_string());
        }
        if self.min_radius > self.max_radius {
            return Err(format!(
                "min_radius ({}) must be <= max_radius ({})",
                self.min_radius, self.max_radius
            ));
        }
        if self.min_dist_divisor <= 0.0 {
            return Err("min_dist_divisor must be > 0.0".to_string());
        }
        if self.canny_high_threshold <= 0.0 {
            return Err("canny_high_threshold must be > 0.0".to_string());
        }
        if self.accumulator_threshold == 0 {
            return Err("accumulator_threshold must be > 0".to_string());
        }
        Ok(())
    }
}

/// Detect circles in a color image.
///
/// Output order follows accumulator strength (strongest first). An empty
/// result is a valid outcome.
pub fn detect_circles(image: &RgbImage, params: &CircleDetectorParams) -> Vec<Circle> {
    detect_circles_gray(&to_intensity(image), params)
}

/// Detect circles in a single-channel intensity image
pub fn detect_circles_gray(gray: &GrayImage, params: &CircleDetectorParams) -> Vec<Circle> {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 || params.min_radius > params.max_radius {
        return Vec::new();
    }

    let edges = canny(
        gray,
        params.canny_high_threshold / 2.0,
        params.canny_high_threshold,
    );
    let smoothed = gaussian_blur_f32(gray, GRADIENT_SIGMA);
    let gx = horizontal_sobel(&smoothed);
    let gy = vertical_sobel(&smoothed);

    let mut edge_points = Vec::new();
    let mut directions = Vec::new();
    for (x, y, edge) in edges.enumerate_pixels() {
        if edge[0] == 0 {
            continue;
        }
        let dx = gx.get_pixel(x, y)[0] as f32;
        let dy = gy.get_pixel(x, y)[0] as f32;
        let magnitude = dx.hypot(dy);
        if magnitude < f32::EPSILON {
            continue;
        }
        edge_points.push((x as i32, y as i32));
        directions.push((dx / magnitude, dy / magnitude));
    }

    if edge_points.is_empty() {
        return Vec::new();
    }

    let accumulator = accumulate_votes(&edge_points, &directions, width, height, params);
    let centers = center_candidates(&accumulator, width, height, params.accumulator_threshold);
    log::debug!(
        "Hough [{}, {}]: {} edge pixels, {} center candidates",
        params.min_radius,
        params.max_radius,
        edge_points.len(),
        centers.len()
    );

    let min_dist = height as f32 / params.min_dist_divisor;
    let min_dist_sq = min_dist * min_dist;
    let mut circles: Vec<Circle> = Vec::new();

    for (cx, cy) in centers {
        let too_close = circles.iter().any(|c| {
            let dx = c.x - cx as f32;
            let dy = c.y - cy as f32;
            dx * dx + dy * dy < min_dist_sq
        });
        if too_close {
            continue;
        }

        if let Some((radius, support)) = best_radius(&edge_points, cx, cy, params) {
            if support > params.accumulator_threshold {
                circles.push(Circle::new(cx as f32, cy as f32, radius as f32));
            }
        }
    }

    circles
}

/// Cast one vote per edge pixel, radius and gradient direction
fn accumulate_votes(
    edge_points: &[(i32, i32)],
    directions: &[(f32, f32)],
    width: u32,
    height: u32,
    params: &CircleDetectorParams,
) -> Vec<u32> {
    let (w, h) = (width as i32, height as i32);
    let mut accumulator = vec![0u32; (width * height) as usize];

    for (&(x, y), &(ux, uy)) in edge_points.iter().zip(directions) {
        for sign in [1.0f32, -1.0] {
            for r in params.min_radius..=params.max_radius {
                let step = sign * r as f32;
                let vx = (x as f32 + ux * step).round() as i32;
                let vy = (y as f32 + uy * step).round() as i32;
                // Further radii along this ray only move further out
                if vx < 0 || vy < 0 || vx >= w || vy >= h {
                    break;
                }
                accumulator[(vy * w + vx) as usize] += 1;
            }
        }
    }

    accumulator
}

/// Local accumulator maxima above `threshold`, strongest first.
///
/// Plateaus resolve to their top-left cell; equal scores keep raster order.
fn center_candidates(accumulator: &[u32], width: u32, height: u32, threshold: u32) -> Vec<(u32, u32)> {
    let stride = width as usize;
    let mut candidates = Vec::new();

    for y in 1..height.saturating_sub(1) as usize {
        for x in 1..width.saturating_sub(1) as usize {
            let idx = y * stride + x;
            let votes = accumulator[idx];
            if votes > threshold
                && votes > accumulator[idx - 1]
                && votes >= accumulator[idx + 1]
                && votes > accumulator[idx - stride]
                && votes >= accumulator[idx + stride]
            {
                candidates.push((votes, x as u32, y as u32));
            }
        }
    }

    // Stable sort keeps raster order among equal scores
    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    candidates.into_iter().map(|(_, x, y)| (x, y)).collect()
}

/// Radius in the band with the most edge pixels at that distance (±1 px).
///
/// Returns `(radius, support)`, or `None` if no edge pixel falls in the band.
fn best_radius(
    edge_points: &[(i32, i32)],
    cx: u32,
    cy: u32,
    params: &CircleDetectorParams,
) -> Option<(u32, u32)> {
    let min_r = params.min_radius as i64;
    let max_r = params.max_radius as i64;
    let mut histogram = vec![0u32; (max_r - min_r + 1) as usize];

    let lower_sq = (min_r - 1).max(0).pow(2);
    let upper_sq = (max_r + 1).pow(2);
    for &(x, y) in edge_points {
        let dx = (x - cx as i32) as i64;
        let dy = (y - cy as i32) as i64;
        let dist_sq = dx * dx + dy * dy;
        if dist_sq < lower_sq || dist_sq > upper_sq {
            continue;
        }
        let dist = (dist_sq as f64).sqrt().round() as i64;
        if dist >= min_r && dist <= max_r {
            histogram[(dist - min_r) as usize] += 1;
        }
    }

    let mut best: Option<(u32, u32)> = None;
    for i in 0..histogram.len() {
        let lo = i.saturating_sub(1);
        let hi = (i + 1).min(histogram.len() - 1);
        let support: u32 = histogram[lo..=hi].iter().sum();
        if support > 0 && best.map_or(true, |(_, s)| support > s) {
            best = Some((params.min_radius + i as u32, support));
        }
    }

    best
}
