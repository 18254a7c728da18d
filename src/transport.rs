// src/transport.rs - Boundary helpers: formatted fields, JPEG bytes, response envelopes

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};
use serde::Serialize;

use crate::config::Config;
use crate::errors::{SprayCardError, Result};
use crate::pipeline::AnalysisResult;

/// Compression quality for images handed back to the caller
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Result fields as display strings with fixed precision and unit suffixes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedResults {
    pub droplet_count: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_diameter: Option<String>,
    pub real_card_area: String,
    pub real_droplet_area: String,
    pub percent_coverage: String,
    pub density_per_unit_area: String,
    pub efficacy: String,
}

impl FormattedResults {
    pub fn from_result(result: &AnalysisResult, config: &Config) -> Self {
        let metrics = &result.metrics;
        let area_unit = format!("{}²", config.length_unit);

        Self {
            droplet_count: metrics.count.to_string(),
            mean_diameter: metrics
                .mean_diameter
                .map(|d| format!("{:.2} {}", d, config.diameter_unit)),
            real_card_area: format!("{:.2} {}", metrics.real_card_area, area_unit),
            real_droplet_area: format!("{:.2} {}", metrics.real_droplet_area, area_unit),
            percent_coverage: format!("{:.2}%", metrics.percent_coverage),
            density_per_unit_area: format!("{:.2} droplets/{}", metrics.density_per_unit_area, area_unit),
            efficacy: result.verdict.clone(),
        }
    }

    /// Ordered (label, value) pairs for printing
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![("Droplet count", self.droplet_count.as_str())];
        if let Some(diameter) = &self.mean_diameter {
            pairs.push(("Mean diameter", diameter.as_str()));
        }
        pairs.extend([
            ("Card area", self.real_card_area.as_str()),
            ("Droplet area", self.real_droplet_area.as_str()),
            ("Coverage", self.percent_coverage.as_str()),
            ("Density", self.density_per_unit_area.as_str()),
            ("Efficacy", self.efficacy.as_str()),
        ]);
        pairs
    }
}

/// Compress an image to a JPEG byte stream
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    encoder.encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)?;
    Ok(bytes)
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub results: FormattedResults,
    /// JPEG bytes of the uploaded image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_image: Option<Vec<u8>>,
    /// JPEG bytes of the annotated image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_image: Option<Vec<u8>>,
}

impl SuccessResponse {
    /// Result fields only
    pub fn new(result: &AnalysisResult, config: &Config) -> Self {
        Self {
            success: true,
            results: FormattedResults::from_result(result, config),
            original_image: None,
            output_image: None,
        }
    }

    /// Result fields plus both images as JPEG byte streams
    pub fn with_images(
        result: &AnalysisResult,
        config: &Config,
        original: &RgbImage,
        annotated: &RgbImage,
    ) -> Result<Self> {
        Ok(Self {
            original_image: Some(encode_jpeg(original, DEFAULT_JPEG_QUALITY)?),
            output_image: Some(encode_jpeg(annotated, DEFAULT_JPEG_QUALITY)?),
            ..Self::new(result, config)
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl ErrorResponse {
    pub fn from_error(err: &SprayCardError) -> Self {
        Self {
            error: err.to_string(),
            status: err.status_code(),
        }
    }
}
