use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::image_utils::MASK_ON;

/// Chebyshev radius reached by `iterations` passes of a square kernel
fn square_reach(kernel_size: u32, iterations: u32) -> u8 {
    ((kernel_size / 2) * iterations).min(u8::MAX as u32) as u8
}

/// Dilate with a `kernel_size` square structuring element, repeated `iterations` times
pub fn dilate_square(mask: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
    let reach = square_reach(kernel_size, iterations);
    // Distances saturate at width + height, so an empty mask must stay empty explicitly
    if reach == 0 || mask.pixels().all(|p| p[0] == 0) {
        return mask.clone();
    }
    imageproc::morphology::dilate(mask, Norm::LInf, reach)
}

/// Erode with a `kernel_size` square structuring element, repeated `iterations` times.
/// Pixels beyond the image border never erode the mask.
pub fn erode_square(mask: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
    let reach = square_reach(kernel_size, iterations);
    if reach == 0 {
        return mask.clone();
    }
    imageproc::morphology::erode(mask, Norm::LInf, reach)
}

/// Close: all dilation passes first, then all erosion passes
pub fn close_square(mask: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
    let dilated = dilate_square(mask, kernel_size, iterations);
    erode_square(&dilated, kernel_size, iterations)
}

/// Keep only the largest 8-connected nonzero component.
///
/// Ties go to the component encountered first in raster order. A mask
/// without foreground yields an all-zero mask.
pub fn largest_component(mask: &GrayImage) -> GrayImage {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut areas: Vec<u32> = Vec::new();
    for label in labels.pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if areas.len() <= label {
            areas.resize(label + 1, 0);
        }
        areas[label] += 1;
    }

    let mut largest_label = 0;
    let mut largest_area = 0;
    for (label, &area) in areas.iter().enumerate().skip(1) {
        if area > largest_area {
            largest_area = area;
            largest_label = label as u32;
        }
    }

    let (width, height) = mask.dimensions();
    if largest_label == 0 {
        return GrayImage::new(width, height);
    }

    GrayImage::from_fn(width, height, |x, y| {
        if labels.get_pixel(x, y)[0] == largest_label {
            Luma([MASK_ON])
        } else {
            Luma([0])
        }
    })
}

/// Outer borders of the top-level regions (holes and nested islands are skipped)
pub fn external_contours(mask: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect()
}

/// Polygon area enclosed by a closed contour (shoelace formula)
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    twice_area.abs() as f64 / 2.0
}

/// Fill the largest external contour whose area exceeds `min_area` with `fill_value`.
///
/// Returns an all-zero mask when no contour qualifies.
pub fn fill_largest_contour(mask: &GrayImage, min_area: f64, fill_value: u8) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut out = GrayImage::new(width, height);

    let mut best: Option<(f64, Vec<Point<i32>>)> = None;
    for contour in external_contours(mask) {
        let area = contour_area(&contour);
        if area > min_area && best.as_ref().map_or(true, |(a, _)| area > *a) {
            best = Some((area, contour));
        }
    }

    if let Some((area, mut polygon)) = best {
        log::debug!("Largest contour: {} points, area {:.0}", polygon.len(), area);
        // The polygon filler rejects explicitly closed rings
        while polygon.len() > 1 && polygon.first() == polygon.last() {
            polygon.pop();
        }
        draw_polygon_mut(&mut out, &polygon, Luma([fill_value]));
    }

    out
}
