#![allow(dead_code)]

use image::{Rgb, RgbImage};

pub const BACKGROUND: Rgb<u8> = Rgb([60, 60, 60]);
pub const CROCKERY: Rgb<u8> = Rgb([190, 190, 190]);

/// Uniform image of the given colour
pub fn blank(width: u32, height: u32, colour: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(width, height, colour)
}

/// Blend an anti-aliased filled disk into the image
pub fn paint_disk(image: &mut RgbImage, cx: f32, cy: f32, radius: f32, colour: Rgb<u8>) {
    let (width, height) = image.dimensions();
    for y in 0..height {
        for x in 0..width {
            let d = (x as f32 - cx).hypot(y as f32 - cy);
            let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
            if coverage == 0.0 {
                continue;
            }
            let pixel = image.get_pixel_mut(x, y);
            for c in 0..3 {
                let blended = pixel[c] as f32 * (1.0 - coverage) + colour[c] as f32 * coverage;
                pixel[c] = blended.round() as u8;
            }
        }
    }
}

/// Fill a rectangle with bread-toned pixel noise (deterministic)
pub fn paint_crumb(image: &mut RgbImage, x0: u32, y0: u32, width: u32, height: u32) {
    let mut state: u32 = 0x1234_5678;
    for y in y0..y0 + height {
        for x in x0..x0 + width {
            // xorshift32
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let jitter = (state % 81) as i32 - 40;
            let tone = |base: i32| (base + jitter).clamp(0, 255) as u8;
            image.put_pixel(x, y, Rgb([tone(200), tone(160), tone(90)]));
        }
    }
}

/// Crust tones cycling mid, light, mid, dark across columns.
///
/// All three share the same chroma and a moderate saturation; the intensity
/// steps give a dense unsmoothed edge map, while the Gaussian-smoothed rim
/// detector sees only the patch outline.
pub const CRUST_TONES: [Rgb<u8>; 4] = [
    Rgb([200, 170, 120]),
    Rgb([240, 210, 160]),
    Rgb([200, 170, 120]),
    Rgb([160, 130, 80]),
];

/// Fill a rectangle with the crust texture
pub fn paint_crust(image: &mut RgbImage, x0: u32, y0: u32, width: u32, height: u32) {
    for y in y0..y0 + height {
        for x in x0..x0 + width {
            image.put_pixel(x, y, CRUST_TONES[((x - x0) % 4) as usize]);
        }
    }
}
