use std::fs;
use std::path::Path;
use csv::Writer;

use crate::calibration::Calibration;
use crate::config::Config;
use crate::detection::Region;
use crate::errors::{SprayCardError, Result};
use crate::pipeline::AnalysisResult;

/// Create the parent directory of an output file if it doesn't exist
fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write one row per accepted droplet, numbered as in the annotated image
pub fn write_droplets_csv<P: AsRef<Path>>(
    regions: &[Region],
    calibration: &Calibration,
    config: &Config,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let mut writer = Writer::from_path(path)?;

    let diameter_header = format!("Diameter_{}", config.diameter_unit);
    writer.write_record([
        "Droplet_Index",
        "Centroid_X",
        "Centroid_Y",
        "BBox_X",
        "BBox_Y",
        "BBox_Width",
        "BBox_Height",
        "Area_Px",
        "Enclosed_Area_Px",
        "Perimeter_Px",
        "Circularity",
        "Diameter_Px",
        diameter_header.as_str(),
    ])?;

    for (index, region) in regions.iter().enumerate() {
        let diameter_real = calibration.pixels_to_length(region.diameter()) * config.diameter_unit_factor;

        writer.write_record(&[
            (index + 1).to_string(),
            format!("{:.3}", region.centroid.0),
            format!("{:.3}", region.centroid.1),
            region.bounding_box.x.to_string(),
            region.bounding_box.y.to_string(),
            region.bounding_box.width.to_string(),
            region.bounding_box.height.to_string(),
            region.area.to_string(),
            format!("{:.6}", region.enclosed_area),
            format!("{:.6}", region.perimeter),
            format!("{:.6}", region.circularity),
            format!("{:.6}", region.diameter()),
            format!("{:.6}", diameter_real),
        ])?;
    }

    writer.flush().map_err(|e| SprayCardError::CsvOutput(csv::Error::from(e)))?;

    Ok(())
}

/// Write the analysis result as pretty-printed JSON
pub fn write_summary_json<P: AsRef<Path>>(result: &AnalysisResult, path: P) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let json = serde_json::to_string_pretty(result)?;
    fs::write(path, json)?;

    Ok(())
}
