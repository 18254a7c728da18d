use image::{GrayImage, Luma, Rgb, RgbImage};

/// Mask value for droplet-candidate pixels
pub const FOREGROUND: u8 = 255;

/// Mask value for card background
pub const BACKGROUND: u8 = 0;

/// Binary mask, same size as the image it was derived from.
/// Pixels are either `FOREGROUND` or `BACKGROUND`.
pub type Mask = GrayImage;

/// Check if a mask pixel is a droplet candidate
#[inline]
pub fn is_foreground(pixel: &Luma<u8>) -> bool {
    pixel[0] != BACKGROUND
}

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i64, y: i64, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && x < width as i64 && y < height as i64
}

/// Convert to single-channel intensity with Rec.601 luma weights
pub fn to_intensity(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let value = 0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64;
        gray.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
    }

    gray
}

/// Number of foreground pixels in a mask
pub fn count_foreground(mask: &Mask) -> u64 {
    mask.pixels().filter(|p| is_foreground(p)).count() as u64
}

/// Paint a square dot of `size` pixels centered on (x, y), clipped to the image
pub fn paint_dot(image: &mut RgbImage, x: i64, y: i64, size: u32, color: [u8; 3]) {
    let (width, height) = image.dimensions();
    let radius = (size / 2) as i64;

    for dy in 0..size as i64 {
        for dx in 0..size as i64 {
            let px = x - radius + dx;
            let py = y - radius + dy;

            if in_bounds(px, py, width, height) {
                image.put_pixel(px as u32, py as u32, Rgb(color));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_of_extremes() {
        let mut image = RgbImage::from_pixel(2, 1, Rgb([255, 255, 255]));
        image.put_pixel(1, 0, Rgb([0, 0, 0]));

        let gray = to_intensity(&image);
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
        assert_eq!(gray.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn counts_foreground() {
        let mut mask = Mask::new(4, 4);
        mask.put_pixel(0, 0, Luma([FOREGROUND]));
        mask.put_pixel(3, 2, Luma([FOREGROUND]));
        assert_eq!(count_foreground(&mask), 2);
    }

    #[test]
    fn dot_is_clipped_at_edges() {
        let mut image = RgbImage::new(3, 3);
        paint_dot(&mut image, 0, 0, 3, [9, 9, 9]);
        assert_eq!(image.get_pixel(0, 0), &Rgb([9, 9, 9]));
        assert_eq!(image.get_pixel(1, 1), &Rgb([9, 9, 9]));
        assert_eq!(image.get_pixel(2, 2), &Rgb([0, 0, 0]));
    }
}
