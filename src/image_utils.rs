use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::region_labelling::{connected_components, Connectivity};

/// Value written for selected pixels in intermediate binary masks
pub const MASK_ON: u8 = 255;

/// Round and clamp a float to the 8-bit range
#[inline]
fn saturate_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// BT.601 luma of an RGB pixel
#[inline]
pub fn luma(pixel: &Rgb<u8>) -> f32 {
    0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32
}

/// Convert to single-channel intensity using BT.601 weights
pub fn to_intensity(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        Luma([saturate_u8(luma(image.get_pixel(x, y)))])
    })
}

/// Extract the U (blue-difference) chroma channel of the 8-bit YUV transform
pub fn chroma_u_channel(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let pixel = image.get_pixel(x, y);
        let u = (pixel[2] as f32 - luma(pixel)) * 0.492 + 128.0;
        Luma([saturate_u8(u)])
    })
}

/// Extract the saturation channel of the 8-bit HSV transform
pub fn saturation_channel(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *image.get_pixel(x, y);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let s = if max == 0 {
            0
        } else {
            saturate_u8(255.0 * (max - min) as f32 / max as f32)
        };
        Luma([s])
    })
}

/// Binary mask of pixels whose value lies in [low, high]
pub fn in_range(channel: &GrayImage, low: u8, high: u8) -> GrayImage {
    map_gray(channel, |v| if v >= low && v <= high { MASK_ON } else { 0 })
}

/// Binary threshold: MASK_ON where value > threshold
pub fn threshold_binary(channel: &GrayImage, threshold: u8) -> GrayImage {
    map_gray(channel, |v| if v > threshold { MASK_ON } else { 0 })
}

/// Keep pixels set in `mask` and not set in `exclude`
pub fn subtract_mask(mask: &GrayImage, exclude: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let keep = mask.get_pixel(x, y)[0] > 0 && exclude.get_pixel(x, y)[0] == 0;
        Luma([if keep { MASK_ON } else { 0 }])
    })
}

/// Zero every channel value outside the mask
pub fn apply_mask_gray(channel: &GrayImage, mask: &GrayImage) -> GrayImage {
    let (width, height) = channel.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y)[0] > 0 {
            *channel.get_pixel(x, y)
        } else {
            Luma([0])
        }
    })
}

/// Zero every color pixel outside the mask
pub fn apply_mask_rgb(image: &RgbImage, mask: &GrayImage) -> RgbImage {
    let (width, height) = image.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y)[0] > 0 {
            *image.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Count nonzero pixels
pub fn count_nonzero(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] > 0).count()
}

fn map_gray<F: Fn(u8) -> u8>(channel: &GrayImage, f: F) -> GrayImage {
    let (width, height) = channel.dimensions();
    GrayImage::from_fn(width, height, |x, y| Luma([f(channel.get_pixel(x, y)[0])]))
}

/// Mirror an out-of-range index back into [0, len) without repeating the edge sample
#[inline]
fn reflect_101(mut index: i64, len: i64) -> usize {
    if len == 1 {
        return 0;
    }
    loop {
        if index < 0 {
            index = -index;
        } else if index >= len {
            index = 2 * len - 2 - index;
        } else {
            return index as usize;
        }
    }
}

/// Sum over a square `kernel_size` window divided by `divisor`, rounded to 8 bits.
///
/// Borders are mirrored (reflect-101). With `divisor == kernel_size^2` this is a
/// plain mean filter; a smaller divisor scales the window up and saturates.
pub fn box_filter(channel: &GrayImage, kernel_size: u32, divisor: u32) -> GrayImage {
    let (width, height) = channel.dimensions();
    if width == 0 || height == 0 {
        return channel.clone();
    }
    let radius = (kernel_size / 2) as i64;
    let (w, h) = (width as i64, height as i64);

    // Horizontal sliding sums
    let mut row_sums = vec![0u32; (width * height) as usize];
    for y in 0..height {
        let row = |x: i64| channel.get_pixel(reflect_101(x, w) as u32, y)[0] as u32;
        let mut sum: u32 = (-radius..=radius).map(row).sum();
        for x in 0..w {
            row_sums[(y as i64 * w + x) as usize] = sum;
            sum = sum + row(x + radius + 1) - row(x - radius);
        }
    }

    // Vertical sliding sums over the row sums
    let mut output = GrayImage::new(width, height);
    for x in 0..w {
        let column = |y: i64| row_sums[(reflect_101(y, h) as i64 * w + x) as usize];
        let mut sum: u32 = (-radius..=radius).map(column).sum();
        for y in 0..h {
            let value = sum as f32 / divisor as f32;
            output.put_pixel(x as u32, y as u32, Luma([saturate_u8(value)]));
            sum = sum + column(y + radius + 1) - column(y - radius);
        }
    }

    output
}

const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_6;

/// Canny edge map computed on the raw intensities, with no Gaussian pre-smoothing.
///
/// Gradients come from a 3x3 Sobel with replicated borders and the magnitude is
/// `|gx| + |gy|`. A pixel above `low` survives non-maximum suppression along its
/// quantised gradient direction; survivors are kept when 8-connected to one
/// above `high`.
pub fn canny_unsmoothed(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);
    let (w, h) = (width as i64, height as i64);
    let magnitude: Vec<i32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(dx, dy)| (dx[0] as i32).abs() + (dy[0] as i32).abs())
        .collect();
    // Outside the image the magnitude is zero
    let mag_at = |x: i64, y: i64| -> i32 {
        if x < 0 || y < 0 || x >= w || y >= h {
            0
        } else {
            magnitude[(y * w + x) as usize]
        }
    };

    let mut candidates = GrayImage::new(width, height);
    let mut strong = vec![false; magnitude.len()];
    for y in 0..h {
        for x in 0..w {
            let m = mag_at(x, y);
            if m as f32 <= low {
                continue;
            }

            let dx = gx.get_pixel(x as u32, y as u32)[0] as f32;
            let dy = gy.get_pixel(x as u32, y as u32)[0] as f32;
            let (ax, ay) = (dx.abs(), dy.abs());
            let is_maximum = if ay < ax * TAN_22_5 {
                m > mag_at(x - 1, y) && m >= mag_at(x + 1, y)
            } else if ay > ax * TAN_67_5 {
                m > mag_at(x, y - 1) && m >= mag_at(x, y + 1)
            } else {
                let s = if (dx < 0.0) != (dy < 0.0) { -1 } else { 1 };
                m > mag_at(x - s, y - 1) && m > mag_at(x + s, y + 1)
            };

            if is_maximum {
                candidates.put_pixel(x as u32, y as u32, Luma([MASK_ON]));
                strong[(y * w + x) as usize] = m as f32 > high;
            }
        }
    }

    // Hysteresis: keep every candidate chain that holds a strong pixel
    let labels = connected_components(&candidates, Connectivity::Eight, Luma([0u8]));
    let mut label_is_strong: Vec<bool> = Vec::new();
    for (index, label) in labels.pixels().enumerate() {
        let label = label[0] as usize;
        if label == 0 || !strong[index] {
            continue;
        }
        if label_is_strong.len() <= label {
            label_is_strong.resize(label + 1, false);
        }
        label_is_strong[label] = true;
    }

    GrayImage::from_fn(width, height, |x, y| {
        let label = labels.get_pixel(x, y)[0] as usize;
        if label != 0 && label_is_strong.get(label).copied().unwrap_or(false) {
            Luma([MASK_ON])
        } else {
            Luma([0])
        }
    })
}
