// src/preprocess.rs - Luminance-only contrast-limited adaptive histogram equalization

use image::{GrayImage, Luma, Rgb, RgbImage};
use log::debug;
use palette::{FromColor, Lab, Srgb};
use rayon::prelude::*;

use crate::config::Config;

const BINS: usize = 256;

/// Contrast-normalize the image on its Lab lightness channel.
/// Chroma (a, b) is carried through unchanged; the input is not modified.
pub fn enhance_contrast(image: &RgbImage, config: &Config) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let labs: Vec<Lab> = image
        .pixels()
        .map(|p| {
            Lab::from_color(Srgb::new(
                p[0] as f32 / 255.0,
                p[1] as f32 / 255.0,
                p[2] as f32 / 255.0,
            ))
        })
        .collect();

    let lightness = GrayImage::from_fn(width, height, |x, y| {
        let l = labs[(y * width + x) as usize].l;
        Luma([(l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8])
    });

    let equalized = clahe(&lightness, config.clahe_clip_limit, config.clahe_tile_grid);

    let mut enhanced = RgbImage::new(width, height);
    for (x, y, pixel) in enhanced.enumerate_pixels_mut() {
        let mut lab = labs[(y * width + x) as usize];
        lab.l = equalized.get_pixel(x, y)[0] as f32 * 100.0 / 255.0;

        let srgb: Srgb = Srgb::from_color(lab);
        *pixel = Rgb([
            to_channel(srgb.red),
            to_channel(srgb.green),
            to_channel(srgb.blue),
        ]);
    }

    enhanced
}

#[inline]
fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Tile layout derived from the requested grid, shrunk so no tile is empty
#[derive(Debug, Clone, Copy)]
struct TileGrid {
    tiles_x: u32,
    tiles_y: u32,
    tile_w: u32,
    tile_h: u32,
}

impl TileGrid {
    fn new(width: u32, height: u32, grid: [u32; 2]) -> Self {
        let requested_x = grid[0].clamp(1, width);
        let requested_y = grid[1].clamp(1, height);
        let tile_w = (width + requested_x - 1) / requested_x;
        let tile_h = (height + requested_y - 1) / requested_y;

        Self {
            tiles_x: (width + tile_w - 1) / tile_w,
            tiles_y: (height + tile_h - 1) / tile_h,
            tile_w,
            tile_h,
        }
    }
}

/// Contrast-limited adaptive histogram equalization of a single channel.
///
/// Each tile gets its own clipped-histogram lookup table; every output pixel
/// is a bilinear blend of the tables of the four nearest tile centers.
pub fn clahe(channel: &GrayImage, clip_limit: f64, grid: [u32; 2]) -> GrayImage {
    let (width, height) = channel.dimensions();
    if width == 0 || height == 0 {
        return channel.clone();
    }

    let tiles = TileGrid::new(width, height, grid);
    debug!(
        "CLAHE: {}x{} tiles of {}x{} px, clip limit {:.1}",
        tiles.tiles_x, tiles.tiles_y, tiles.tile_w, tiles.tile_h, clip_limit
    );

    let luts: Vec<[u8; BINS]> = (0..tiles.tiles_x * tiles.tiles_y)
        .into_par_iter()
        .map(|index| {
            let tx = index % tiles.tiles_x;
            let ty = index / tiles.tiles_x;
            tile_lut(channel, &tiles, tx, ty, clip_limit)
        })
        .collect();

    let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles.tiles_x + tx) as usize];
    let inv_tw = 1.0 / tiles.tile_w as f64;
    let inv_th = 1.0 / tiles.tile_h as f64;

    let mut output = GrayImage::new(width, height);
    output
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let tyf = y as f64 * inv_th - 0.5;
            let ty_floor = tyf.floor();
            let fy = tyf - ty_floor;
            let ty1 = (ty_floor.max(0.0) as u32).min(tiles.tiles_y - 1);
            let ty2 = ((ty_floor + 1.0).max(0.0) as u32).min(tiles.tiles_y - 1);

            for (x, out) in row.iter_mut().enumerate() {
                let txf = x as f64 * inv_tw - 0.5;
                let tx_floor = txf.floor();
                let fx = txf - tx_floor;
                let tx1 = (tx_floor.max(0.0) as u32).min(tiles.tiles_x - 1);
                let tx2 = ((tx_floor + 1.0).max(0.0) as u32).min(tiles.tiles_x - 1);

                let value = channel.get_pixel(x as u32, y as u32)[0] as usize;
                let top = (1.0 - fx) * lut_at(tx1, ty1)[value] as f64
                    + fx * lut_at(tx2, ty1)[value] as f64;
                let bottom = (1.0 - fx) * lut_at(tx1, ty2)[value] as f64
                    + fx * lut_at(tx2, ty2)[value] as f64;

                *out = ((1.0 - fy) * top + fy * bottom).round().clamp(0.0, 255.0) as u8;
            }
        });

    output
}

/// Clipped, redistributed cumulative histogram of one tile, scaled to 0..=255
fn tile_lut(channel: &GrayImage, tiles: &TileGrid, tx: u32, ty: u32, clip_limit: f64) -> [u8; BINS] {
    let (width, height) = channel.dimensions();
    let x0 = tx * tiles.tile_w;
    let y0 = ty * tiles.tile_h;
    let x1 = (x0 + tiles.tile_w).min(width);
    let y1 = (y0 + tiles.tile_h).min(height);

    let mut hist = [0u32; BINS];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[channel.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    let area = ((x1 - x0) * (y1 - y0)) as u64;
    let clip = ((clip_limit * area as f64 / BINS as f64) as u32).max(1);

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    // Spread the clipped mass uniformly, then hand out the remainder at a fixed stride
    let per_bin = excess / BINS as u32;
    let residual = (excess % BINS as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        for index in (0..BINS).step_by(step).take(residual) {
            hist[index] += 1;
        }
    }

    let scale = 255.0 / area as f64;
    let mut lut = [0u8; BINS];
    let mut cumulative = 0u64;
    for (value, count) in hist.iter().enumerate() {
        cumulative += *count as u64;
        lut[value] = (cumulative as f64 * scale).round().clamp(0.0, 255.0) as u8;
    }

    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_dimensions() {
        let image = RgbImage::from_pixel(37, 23, Rgb([120, 130, 140]));
        let enhanced = enhance_contrast(&image, &Config::default());
        assert_eq!(enhanced.dimensions(), (37, 23));
    }

    #[test]
    fn white_card_stays_white() {
        let image = RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]));
        let enhanced = enhance_contrast(&image, &Config::default());
        for pixel in enhanced.pixels() {
            assert!(pixel[0] >= 250 && pixel[1] >= 250 && pixel[2] >= 250);
        }
    }

    #[test]
    fn dark_stays_darker_than_light() {
        let mut channel = GrayImage::from_pixel(64, 64, Luma([200]));
        for y in 20..40 {
            for x in 20..40 {
                channel.put_pixel(x, y, Luma([60]));
            }
        }

        let equalized = clahe(&channel, 4.0, [8, 8]);
        assert!(equalized.get_pixel(30, 30)[0] < equalized.get_pixel(5, 5)[0]);
    }

    #[test]
    fn deterministic() {
        let channel = GrayImage::from_fn(50, 40, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        assert_eq!(clahe(&channel, 3.0, [8, 8]), clahe(&channel, 3.0, [8, 8]));
    }

    #[test]
    fn tiny_image_gets_fewer_tiles() {
        let tiles = TileGrid::new(5, 3, [8, 8]);
        assert_eq!(tiles.tiles_x, 5);
        assert_eq!(tiles.tiles_y, 3);
        assert_eq!((tiles.tile_w, tiles.tile_h), (1, 1));
    }
}
