// src/segmentation.rs - Local adaptive thresholding and mask cleanup

use image::{GrayImage, Luma, RgbImage};
use log::debug;
use rayon::prelude::*;

use crate::config::Config;
use crate::errors::{SprayCardError, Result};
use crate::image_utils::{count_foreground, to_intensity, Mask, BACKGROUND, FOREGROUND};
use crate::morphology::{apply_closing, apply_opening, fill_small_holes};

/// Produce the droplet-candidate mask for a contrast-enhanced image
pub fn segment(enhanced: &RgbImage, config: &Config) -> Result<Mask> {
    let (width, height) = enhanced.dimensions();
    if width == 0 || height == 0 {
        return Err(SprayCardError::DegenerateImage { width, height });
    }

    let gray = to_intensity(enhanced);
    let thresholded = adaptive_threshold_gaussian(
        &gray,
        config.threshold_block_size,
        config.threshold_offset,
    );
    debug!(
        "Adaptive threshold (block {}, offset {:.1}): {} candidate pixels",
        config.threshold_block_size,
        config.threshold_offset,
        count_foreground(&thresholded)
    );

    let opened = apply_opening(&thresholded, config.opening_iterations);
    let closed = apply_closing(&opened, config.closing_iterations);
    let mask = fill_small_holes(&closed, config.max_hole_area);

    debug!("Mask after cleanup: {} foreground pixels", count_foreground(&mask));

    Ok(mask)
}

/// Normalized 1-D Gaussian for a window of `size` taps.
/// Sigma follows the usual rule for adaptive thresholding windows.
pub fn gaussian_kernel(size: u32) -> Vec<f64> {
    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f64;
    let scale = -0.5 / (sigma * sigma);

    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (scale * d * d).exp()
        })
        .collect();

    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Gaussian-weighted local mean, edges replicated
pub fn local_mean(gray: &GrayImage, block_size: u32) -> Vec<f64> {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    let kernel = gaussian_kernel(block_size);
    let radius = (block_size / 2) as i64;

    let raw = gray.as_raw();
    let clamp = |v: i64, len: usize| v.clamp(0, len as i64 - 1) as usize;

    let mut horizontal = vec![0.0f64; w * h];
    horizontal
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| {
            let src = &raw[y * w..(y + 1) * w];
            for (x, out) in row.iter_mut().enumerate() {
                *out = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, weight)| weight * src[clamp(x as i64 + k as i64 - radius, w)] as f64)
                    .sum();
            }
        });

    let mut mean = vec![0.0f64; w * h];
    mean.par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                *out = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, weight)| {
                        weight * horizontal[clamp(y as i64 + k as i64 - radius, h) * w + x]
                    })
                    .sum();
            }
        });

    mean
}

/// Inverted adaptive threshold: a pixel is foreground when it is at least
/// `offset` darker than its Gaussian-weighted neighbourhood
pub fn adaptive_threshold_gaussian(gray: &GrayImage, block_size: u32, offset: f64) -> Mask {
    let (width, height) = gray.dimensions();
    let mean = local_mean(gray, block_size);

    GrayImage::from_fn(width, height, |x, y| {
        let value = gray.get_pixel(x, y)[0] as f64;
        let threshold = mean[(y * width + x) as usize] - offset;
        if value <= threshold {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}
