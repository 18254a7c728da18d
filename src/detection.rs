// src/detection.rs - Connected regions of the mask, filtered by area and shape

use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::image_utils::{count_foreground, Mask};
use crate::morphology::{label_components, outer_boundaries};
use crate::shape_analysis::{
    calculate_circularity, calculate_perimeter, minimal_enclosing_circle, polygon_area,
    BoundingBox, EnclosingCircle,
};

/// A candidate droplet stain: one 8-connected set of mask pixels
#[derive(Debug, Clone, Serialize)]
pub struct Region {
    /// Pixel count
    pub area: u32,
    /// Length of the traced outer boundary in pixels
    pub perimeter: f64,
    /// Area inside the outer boundary, enclosed holes included
    pub enclosed_area: f64,
    pub circularity: f64,
    pub centroid: (f64, f64),
    pub bounding_box: BoundingBox,
    pub enclosing_circle: EnclosingCircle,
    /// Outer boundary, in tracing order
    #[serde(skip)]
    pub boundary: Vec<(u32, u32)>,
}

impl Region {
    /// Size estimate in pixels: the minimal enclosing circle's diameter
    pub fn diameter(&self) -> f64 {
        self.enclosing_circle.diameter()
    }
}

/// Output of the detector
#[derive(Debug, Clone)]
pub struct Detection {
    /// Accepted droplets, in extraction order
    pub regions: Vec<Region>,
    /// Every connected component found in the mask, before filtering
    pub raw_component_count: usize,
    /// Foreground pixels of the whole mask, used for coverage
    pub foreground_pixels: u64,
}

/// Why a component was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooSmall,
    DegeneratePerimeter,
    NotRound,
}

/// Per-component accumulator filled in one raster pass over the label image
struct ComponentStats {
    first_pixel: (u32, u32),
    area: u32,
    sum_x: u64,
    sum_y: u64,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl ComponentStats {
    fn new(x: u32, y: u32) -> Self {
        Self {
            first_pixel: (x, y),
            area: 0,
            sum_x: 0,
            sum_y: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.sum_x += x as u64;
        self.sum_y += y as u64;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// Check the filters a region must pass. Area always applies; perimeter and
/// circularity only when the size-aware detector is configured.
pub fn check_region(region: &Region, config: &Config) -> Result<(), Rejection> {
    if region.area <= config.min_region_area {
        return Err(Rejection::TooSmall);
    }

    if config.is_size_aware() {
        if region.perimeter <= 0.0 {
            return Err(Rejection::DegeneratePerimeter);
        }
        if region.circularity < config.min_circularity {
            return Err(Rejection::NotRound);
        }
    }

    Ok(())
}

/// Extract connected regions from the mask and keep those that look like droplets
pub fn detect_droplets(mask: &Mask, config: &Config) -> Detection {
    let labels = label_components(mask);
    let mut boundaries = outer_boundaries(mask, &labels);

    // BTreeMap keeps components in label order, which follows raster order of first appearance
    let mut components: BTreeMap<u32, ComponentStats> = BTreeMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        components
            .entry(label)
            .or_insert_with(|| ComponentStats::new(x, y))
            .add(x, y);
    }

    let raw_component_count = components.len();
    let mut too_small = 0usize;
    let mut degenerate = 0usize;
    let mut not_round = 0usize;
    let mut regions = Vec::new();

    for (label, stats) in &components {
        // Cheap area check first so speckle is never traced
        if stats.area <= config.min_region_area {
            too_small += 1;
            continue;
        }

        let boundary = boundaries
            .remove(label)
            .unwrap_or_else(|| vec![stats.first_pixel]);
        let region = measure_component(stats, boundary);
        match check_region(&region, config) {
            Ok(()) => regions.push(region),
            Err(Rejection::TooSmall) => too_small += 1,
            Err(Rejection::DegeneratePerimeter) => degenerate += 1,
            Err(Rejection::NotRound) => not_round += 1,
        }
    }

    debug!(
        "Rejected components: {} too small, {} degenerate perimeter, {} not round",
        too_small, degenerate, not_round
    );
    info!(
        "Detected {} droplets from {} connected components",
        regions.len(),
        raw_component_count
    );

    Detection {
        regions,
        raw_component_count,
        foreground_pixels: count_foreground(mask),
    }
}

fn measure_component(stats: &ComponentStats, boundary: Vec<(u32, u32)>) -> Region {
    let perimeter = calculate_perimeter(&boundary);
    let enclosed_area = polygon_area(&boundary);

    Region {
        area: stats.area,
        perimeter,
        enclosed_area,
        circularity: calculate_circularity(enclosed_area, perimeter),
        centroid: (
            stats.sum_x as f64 / stats.area as f64,
            stats.sum_y as f64 / stats.area as f64,
        ),
        bounding_box: BoundingBox {
            x: stats.min_x,
            y: stats.min_y,
            width: stats.max_x - stats.min_x + 1,
            height: stats.max_y - stats.min_y + 1,
        },
        enclosing_circle: minimal_enclosing_circle(&boundary),
        boundary,
    }
}
