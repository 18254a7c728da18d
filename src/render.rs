// src/render.rs - Visual feedback: droplet outlines, sequence numbers and a summary line

use bresenham::Bresenham;
use image::{Rgb, RgbImage};

use crate::config::Config;
use crate::detection::Region;
use crate::font::{glyph, glyph_pixel, text_width, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::image_utils::{in_bounds, paint_dot};
use crate::metrics::DropletMetrics;

const LABEL_SCALE: u32 = 2;
const SUMMARY_SCALE: u32 = 3;
const SUMMARY_ORIGIN: (i64, i64) = (20, 20);

/// Draw outlines and numbers for the accepted regions plus a summary line on a
/// copy of the original image
pub fn annotate(
    original: &RgbImage,
    regions: &[Region],
    metrics: &DropletMetrics,
    config: &Config,
) -> RgbImage {
    let mut output = original.clone();

    for region in regions {
        draw_outline(&mut output, &region.boundary, config.outline_color_rgb, config.outline_thickness);
    }

    for (index, region) in regions.iter().enumerate() {
        let label = (index + 1).to_string();
        let (cx, cy) = region.bounding_box.center();
        let x = cx as i64 - (text_width(&label) * LABEL_SCALE / 2) as i64;
        let y = cy as i64 - (GLYPH_HEIGHT * LABEL_SCALE / 2) as i64;
        draw_text(&mut output, &label, x, y, LABEL_SCALE, config.label_color_rgb);
    }

    draw_text(
        &mut output,
        &summary_line(metrics, config),
        SUMMARY_ORIGIN.0,
        SUMMARY_ORIGIN.1,
        SUMMARY_SCALE,
        config.summary_color_rgb,
    );

    output
}

/// Text of the summary overlay
pub fn summary_line(metrics: &DropletMetrics, config: &Config) -> String {
    match metrics.mean_diameter {
        Some(diameter) => format!(
            "Droplets: {}  Mean diameter: {:.1} {}",
            metrics.count,
            diameter,
            config.diameter_unit.replace('µ', "u")
        ),
        None => format!("Droplets detected: {}", metrics.count),
    }
}

/// Closed polyline through the boundary points
pub fn draw_outline(image: &mut RgbImage, boundary: &[(u32, u32)], color: [u8; 3], thickness: u32) {
    if boundary.is_empty() {
        return;
    }

    let n = boundary.len();
    for i in 0..n {
        let (x1, y1) = boundary[i];
        let (x2, y2) = boundary[(i + 1) % n];

        paint_dot(image, x1 as i64, y1 as i64, thickness, color);
        for (x, y) in Bresenham::new((x1 as isize, y1 as isize), (x2 as isize, y2 as isize)) {
            paint_dot(image, x as i64, y as i64, thickness, color);
        }
    }
}

/// Draw text using the bitmap font, each glyph pixel scaled to a `scale`x`scale` block
pub fn draw_text(image: &mut RgbImage, text: &str, x: i64, y: i64, scale: u32, color: [u8; 3]) {
    let (width, height) = image.dimensions();
    let scale = scale.max(1) as i64;
    let mut cursor_x = x;

    for c in text.chars() {
        let bitmap = glyph(c);

        for row in 0..GLYPH_HEIGHT {
            for col in 0..GLYPH_WIDTH {
                if !glyph_pixel(&bitmap, row, col) {
                    continue;
                }

                for sy in 0..scale {
                    for sx in 0..scale {
                        let px = cursor_x + col as i64 * scale + sx;
                        let py = y + row as i64 * scale + sy;
                        if in_bounds(px, py, width, height) {
                            image.put_pixel(px as u32, py as u32, Rgb(color));
                        }
                    }
                }
            }
        }

        cursor_x += GLYPH_ADVANCE as i64 * scale;
        if cursor_x >= width as i64 {
            break;
        }
    }
}
