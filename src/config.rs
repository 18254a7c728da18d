// src/config.rs - Analysis parameters passed explicitly into the pipeline

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::classification::ClassificationPolicy;
use crate::errors::{SprayCardError, Result};

/// Configuration for spray card analysis
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_detection_mode")]
    pub detection_mode: DetectionMode,

    // Contrast equalization
    #[serde(default = "default_clahe_clip_limit")]
    pub clahe_clip_limit: f64,

    #[serde(default = "default_clahe_tile_grid")]
    pub clahe_tile_grid: [u32; 2],

    // Adaptive threshold
    #[serde(default = "default_threshold_block_size")]
    pub threshold_block_size: u32,

    #[serde(default = "default_threshold_offset")]
    pub threshold_offset: f64,

    // Mask cleanup
    #[serde(default = "default_opening_iterations")]
    pub opening_iterations: u32,

    #[serde(default = "default_closing_iterations")]
    pub closing_iterations: u32,

    /// Enclosed background holes up to this many pixels are filled. 0 disables.
    #[serde(default = "default_max_hole_area")]
    pub max_hole_area: u32,

    // Region filtering
    #[serde(default = "default_min_region_area")]
    pub min_region_area: u32,

    #[serde(default = "default_min_circularity")]
    pub min_circularity: f64,

    // Reporting
    #[serde(default = "default_density_scale")]
    pub density_scale: f64,

    /// Diameter units per card length unit (µm per cm)
    #[serde(default = "default_diameter_unit_factor")]
    pub diameter_unit_factor: f64,

    #[serde(default = "default_length_unit")]
    pub length_unit: String,

    #[serde(default = "default_diameter_unit")]
    pub diameter_unit: String,

    // Annotation
    #[serde(default = "default_outline_color_rgb")]
    pub outline_color_rgb: [u8; 3],

    #[serde(default = "default_label_color_rgb")]
    pub label_color_rgb: [u8; 3],

    #[serde(default = "default_summary_color_rgb")]
    pub summary_color_rgb: [u8; 3],

    #[serde(default = "default_outline_thickness")]
    pub outline_thickness: u32,

    // TOML tables must follow plain values
    #[serde(default)]
    pub classification_policy: ClassificationPolicy,
}

/// Which variant of the detector runs
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Area filter only, no diameter reported
    Simple,
    /// Area and circularity filters, mean diameter reported
    SizeAware,
}

fn default_detection_mode() -> DetectionMode {
    DetectionMode::Simple
}

fn default_clahe_clip_limit() -> f64 {
    4.0
}

fn default_clahe_tile_grid() -> [u32; 2] {
    [8, 8]
}

fn default_threshold_block_size() -> u32 {
    21
}

fn default_threshold_offset() -> f64 {
    5.0
}

fn default_opening_iterations() -> u32 {
    1
}

fn default_closing_iterations() -> u32 {
    2
}

fn default_max_hole_area() -> u32 {
    2000
}

fn default_min_region_area() -> u32 {
    10
}

fn default_min_circularity() -> f64 {
    0.5
}

fn default_density_scale() -> f64 {
    10.0
}

fn default_diameter_unit_factor() -> f64 {
    10_000.0
}

fn default_length_unit() -> String {
    "cm".to_string()
}

fn default_diameter_unit() -> String {
    "µm".to_string()
}

fn default_outline_color_rgb() -> [u8; 3] {
    [255, 0, 0]
}

fn default_label_color_rgb() -> [u8; 3] {
    [0, 0, 255]
}

fn default_summary_color_rgb() -> [u8; 3] {
    [255, 100, 0]
}

fn default_outline_thickness() -> u32 {
    2
}

impl Default for Config {
    /// Count-only variant
    fn default() -> Self {
        Self {
            detection_mode: default_detection_mode(),
            clahe_clip_limit: default_clahe_clip_limit(),
            clahe_tile_grid: default_clahe_tile_grid(),
            threshold_block_size: default_threshold_block_size(),
            threshold_offset: default_threshold_offset(),
            opening_iterations: default_opening_iterations(),
            closing_iterations: default_closing_iterations(),
            max_hole_area: default_max_hole_area(),
            min_region_area: default_min_region_area(),
            min_circularity: default_min_circularity(),
            density_scale: default_density_scale(),
            diameter_unit_factor: default_diameter_unit_factor(),
            length_unit: default_length_unit(),
            diameter_unit: default_diameter_unit(),
            outline_color_rgb: default_outline_color_rgb(),
            label_color_rgb: default_label_color_rgb(),
            summary_color_rgb: default_summary_color_rgb(),
            outline_thickness: default_outline_thickness(),
            classification_policy: ClassificationPolicy::count_only(),
        }
    }
}

impl Config {
    /// Size-aware variant: shape filtering, mean diameter and the count+diameter policy
    pub fn size_aware() -> Self {
        Self {
            detection_mode: DetectionMode::SizeAware,
            clahe_clip_limit: 3.0,
            threshold_block_size: 31,
            threshold_offset: 10.0,
            opening_iterations: 2,
            closing_iterations: 1,
            min_region_area: 30,
            density_scale: 1.0,
            classification_policy: ClassificationPolicy::count_and_diameter(),
            ..Self::default()
        }
    }

    pub fn is_size_aware(&self) -> bool {
        self.detection_mode == DetectionMode::SizeAware
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SprayCardError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| SprayCardError::ConfigLoad {
            source: e,
            path: path.to_path_buf(),
        })?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.clahe_clip_limit <= 0.0 || !self.clahe_clip_limit.is_finite() {
            return Err(SprayCardError::Config(
                "clahe_clip_limit must be > 0.0".to_string(),
            ));
        }

        if self.clahe_tile_grid[0] == 0 || self.clahe_tile_grid[1] == 0 {
            return Err(SprayCardError::Config(
                "clahe_tile_grid entries must be > 0".to_string(),
            ));
        }

        if self.threshold_block_size < 3 || self.threshold_block_size % 2 == 0 {
            return Err(SprayCardError::Config(
                "threshold_block_size must be odd and >= 3".to_string(),
            ));
        }

        if !self.threshold_offset.is_finite() {
            return Err(SprayCardError::Config(
                "threshold_offset must be finite".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.min_circularity) {
            return Err(SprayCardError::Config(
                "min_circularity must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.density_scale < 0.0 || !self.density_scale.is_finite() {
            return Err(SprayCardError::Config(
                "density_scale must be a finite value >= 0.0".to_string(),
            ));
        }

        if self.diameter_unit_factor <= 0.0 || !self.diameter_unit_factor.is_finite() {
            return Err(SprayCardError::Config(
                "diameter_unit_factor must be > 0.0".to_string(),
            ));
        }

        if self.outline_thickness == 0 {
            return Err(SprayCardError::Config(
                "outline_thickness must be > 0".to_string(),
            ));
        }

        for rule in &self.classification_policy.rules {
            if let Some([low, high]) = rule.diameter_range {
                if low > high {
                    return Err(SprayCardError::Config(format!(
                        "diameter_range [{}, {}] for {:?} is inverted",
                        low, high, rule.tier
                    )));
                }
            }
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            SprayCardError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
