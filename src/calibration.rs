// src/calibration.rs - Pixel to physical unit conversion from the declared card size

use log::warn;
use serde::Serialize;

use crate::errors::{SprayCardError, Result};

/// Conversion factors for one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    /// Declared card width after clamping
    pub card_width: f64,
    /// Declared card height after clamping
    pub card_height: f64,
    /// Real area per pixel
    pub area_ratio: f64,
    /// Real length per pixel
    pub linear_ratio: f64,
}

/// Declared dimensions that are not strictly positive are replaced by 1
fn clamp_dimension(name: &str, value: f64) -> f64 {
    if value > 0.0 && value.is_finite() {
        value
    } else {
        warn!("Card {} {} is not positive, using 1", name, value);
        1.0
    }
}

impl Calibration {
    /// Derive the conversion from the card's declared real size and its size in pixels
    pub fn new(card_width: f64, card_height: f64, pixel_width: u32, pixel_height: u32) -> Result<Self> {
        let pixel_area = pixel_width as u64 * pixel_height as u64;
        if pixel_area == 0 {
            return Err(SprayCardError::DegenerateImage {
                width: pixel_width,
                height: pixel_height,
            });
        }

        let card_width = clamp_dimension("width", card_width);
        let card_height = clamp_dimension("height", card_height);
        let area_ratio = card_width * card_height / pixel_area as f64;

        Ok(Self {
            card_width,
            card_height,
            area_ratio,
            linear_ratio: area_ratio.sqrt(),
        })
    }

    /// Real card area in squared length units
    pub fn real_card_area(&self) -> f64 {
        self.card_width * self.card_height
    }

    pub fn pixels_to_area(&self, pixels: u64) -> f64 {
        pixels as f64 * self.area_ratio
    }

    pub fn pixels_to_length(&self, pixels: f64) -> f64 {
        pixels * self.linear_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn ratios() {
        let calibration = Calibration::new(10.0, 5.0, 200, 100).unwrap();
        assert_approx_eq!(calibration.area_ratio, 50.0 / 20_000.0, 1e-15);
        assert_approx_eq!(calibration.linear_ratio, 0.05, 1e-12);
        assert_approx_eq!(calibration.real_card_area(), 50.0, 1e-12);
        assert_approx_eq!(calibration.pixels_to_length(20.0), 1.0, 1e-12);
    }

    #[test]
    fn non_positive_dimensions_clamp_to_one() {
        let calibration = Calibration::new(0.0, -3.0, 10, 10).unwrap();
        assert_eq!(calibration.card_width, 1.0);
        assert_eq!(calibration.card_height, 1.0);
        assert_eq!(calibration.real_card_area(), 1.0);
        assert!(calibration.area_ratio > 0.0);

        let calibration = Calibration::new(f64::NAN, 4.0, 10, 10).unwrap();
        assert_eq!(calibration.real_card_area(), 4.0);
    }

    #[test]
    fn zero_pixel_area_is_an_error() {
        assert!(matches!(
            Calibration::new(10.0, 10.0, 0, 50),
            Err(SprayCardError::DegenerateImage { width: 0, height: 50 })
        ));
    }

    #[test]
    fn area_round_trip() {
        // k of N pixels covered maps to k/N of the declared area
        let calibration = Calibration::new(7.5, 4.0, 300, 160).unwrap();
        let covered = calibration.pixels_to_area(12_000);
        assert_approx_eq!(covered, 12_000.0 / 48_000.0 * 30.0, 1e-12);
    }
}
