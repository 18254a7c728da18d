// src/pipeline.rs - One image plus the declared card size in, one analysis result out

use image::RgbImage;
use log::{debug, info};
use serde::Serialize;

use crate::calibration::Calibration;
use crate::classification::{ClassificationInput, EfficacyTier};
use crate::config::Config;
use crate::detection::{detect_droplets, Detection};
use crate::errors::{SprayCardError, Result};
use crate::image_utils::Mask;
use crate::metrics::{compute_metrics, DropletMetrics};
use crate::preprocess::enhance_contrast;
use crate::render::annotate;
use crate::segmentation::segment;

/// Final output bundle of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub metrics: DropletMetrics,
    pub efficacy: EfficacyTier,
    pub verdict: String,
}

/// Everything one run produces, including the intermediate images
pub struct PipelineOutput {
    pub result: AnalysisResult,
    pub calibration: Calibration,
    pub detection: Detection,
    pub enhanced: RgbImage,
    pub mask: Mask,
    pub annotated: RgbImage,
}

/// Run every stage on `image`. The configuration is validated first; the input
/// is only read and all images in the output are fresh copies.
pub fn run_pipeline(
    image: &RgbImage,
    card_width: f64,
    card_height: f64,
    config: &Config,
) -> Result<PipelineOutput> {
    config.validate()?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(SprayCardError::DegenerateImage { width, height });
    }

    debug!("Analyzing {}x{} image ({:?} mode)", width, height, config.detection_mode);

    // Step 1: Contrast equalization
    let enhanced = enhance_contrast(image, config);

    // Step 2: Binary mask of droplet candidates
    let mask = segment(&enhanced, config)?;

    // Step 3: Regions and shape filtering
    let detection = detect_droplets(&mask, config);

    // Step 4: Physical units
    let calibration = Calibration::new(card_width, card_height, width, height)?;
    let metrics = compute_metrics(&detection.regions, detection.foreground_pixels, &calibration, config);

    // Step 5: Verdict
    let efficacy = config.classification_policy.classify(&ClassificationInput {
        count: metrics.count,
        density: metrics.density_per_unit_area,
        mean_diameter: metrics.mean_diameter,
    });

    info!(
        "{} droplets, {:.2}% coverage, {:.2} droplets/{}² -> {:?}",
        metrics.count,
        metrics.percent_coverage,
        metrics.density_per_unit_area,
        config.length_unit,
        efficacy
    );

    // Step 6: Visual feedback
    let annotated = annotate(image, &detection.regions, &metrics, config);

    let result = AnalysisResult {
        metrics,
        efficacy,
        verdict: efficacy.verdict().to_string(),
    };

    Ok(PipelineOutput {
        result,
        calibration,
        detection,
        enhanced,
        mask,
        annotated,
    })
}

/// Analyze a spray card photograph of declared real size `card_width` x `card_height`
pub fn analyze(image: &RgbImage, card_width: f64, card_height: f64, config: &Config) -> Result<AnalysisResult> {
    run_pipeline(image, card_width, card_height, config).map(|output| output.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn zero_sized_image_is_degenerate() {
        let image = RgbImage::new(0, 10);
        let err = analyze(&image, 5.0, 5.0, &Config::default()).unwrap_err();
        assert!(matches!(err, SprayCardError::DegenerateImage { width: 0, height: 10 }));
    }

    #[test]
    fn invalid_config_is_rejected_before_analysis() {
        let image = RgbImage::from_pixel(20, 20, Rgb([250, 250, 250]));

        let even_block = Config { threshold_block_size: 20, ..Config::default() };
        assert!(matches!(
            run_pipeline(&image, 5.0, 5.0, &even_block),
            Err(SprayCardError::Config(_))
        ));

        let nan_circularity = Config { min_circularity: f64::NAN, ..Config::size_aware() };
        assert!(matches!(
            analyze(&image, 5.0, 5.0, &nan_circularity),
            Err(SprayCardError::Config(_))
        ));
    }

    #[test]
    fn outputs_match_input_size() {
        let image = RgbImage::from_pixel(40, 30, Rgb([250, 250, 250]));
        let output = run_pipeline(&image, 4.0, 3.0, &Config::default()).unwrap();
        assert_eq!(output.enhanced.dimensions(), (40, 30));
        assert_eq!(output.mask.dimensions(), (40, 30));
        assert_eq!(output.annotated.dimensions(), (40, 30));
        assert_eq!(output.result.metrics.count, 0);
        assert_eq!(output.result.efficacy, EfficacyTier::NeedsImprovement);
    }
}
