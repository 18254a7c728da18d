// src/metrics.rs - Count, coverage, density and mean diameter

use serde::Serialize;

use crate::calibration::Calibration;
use crate::config::Config;
use crate::detection::Region;

/// Numeric part of an analysis result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropletMetrics {
    pub count: usize,
    /// Mean enclosing-circle diameter in physical units; only reported by the size-aware detector
    pub mean_diameter: Option<f64>,
    pub real_card_area: f64,
    pub real_droplet_area: f64,
    pub percent_coverage: f64,
    pub density_per_unit_area: f64,
}

/// Arithmetic mean of region diameters in pixels, 0 for no regions
pub fn mean_diameter_pixels(regions: &[Region]) -> f64 {
    if regions.is_empty() {
        return 0.0;
    }

    regions.iter().map(Region::diameter).sum::<f64>() / regions.len() as f64
}

/// Non-finite values are reported as 0 so results never carry NaN
#[inline]
fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

pub fn compute_metrics(
    regions: &[Region],
    foreground_pixels: u64,
    calibration: &Calibration,
    config: &Config,
) -> DropletMetrics {
    let count = regions.len();
    let real_card_area = calibration.real_card_area();
    let real_droplet_area = calibration.pixels_to_area(foreground_pixels);

    let (percent_coverage, density_per_unit_area) = if real_card_area > 0.0 {
        (
            finite_or_zero(real_droplet_area / real_card_area * 100.0),
            finite_or_zero(count as f64 / real_card_area * config.density_scale),
        )
    } else {
        (0.0, 0.0)
    };

    let mean_diameter = config.is_size_aware().then(|| {
        let pixels = mean_diameter_pixels(regions);
        finite_or_zero(calibration.pixels_to_length(pixels) * config.diameter_unit_factor)
    });

    DropletMetrics {
        count,
        mean_diameter,
        real_card_area,
        real_droplet_area,
        percent_coverage,
        density_per_unit_area,
    }
}
