use std::path::{Path, PathBuf};
use image::{ImageFormat, RgbImage};

use crate::errors::{SprayCardError, Result};

/// Accepted upload extensions, compared case-insensitively
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: RgbImage,
    pub path: PathBuf,
    pub filename: String,
}

/// Check a file name against the extension allow-list
pub fn is_allowed_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode an uploaded file into a 3-channel image.
/// Rejects an empty name, a disallowed extension and undecodable bytes.
pub fn decode_upload(bytes: &[u8], filename: &str) -> Result<RgbImage> {
    if filename.trim().is_empty() {
        return Err(SprayCardError::InvalidInput("No file selected".to_string()));
    }

    if !is_allowed_extension(filename) {
        return Err(SprayCardError::InvalidInput(format!(
            "File type not allowed: {} (expected one of {})",
            filename,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| SprayCardError::InvalidInput(format!("Could not decode {}: {}", filename, e)))?;

    Ok(decoded.to_rgb8())
}

/// Parse a declared card dimension. Missing or unparseable values are rejected;
/// non-positive values are left for calibration to clamp.
pub fn parse_dimension(name: &str, value: Option<&str>) -> Result<f64> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SprayCardError::InvalidInput(format!("Missing card {}", name)))?;

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(SprayCardError::InvalidInput(format!("Card {} '{}' is not a number", name, raw))),
    }
}

/// Load an image from disk, converted to RGB
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(SprayCardError::InvalidPath(path.to_path_buf()));
    }

    let filename = path.file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SprayCardError::InvalidPath(path.to_path_buf()))?;

    let bytes = std::fs::read(path)?;
    let image = decode_upload(&bytes, filename)?;

    let stem = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SprayCardError::InvalidPath(path.to_path_buf()))?
        .to_string();

    Ok(InputImage {
        image,
        path: path.to_path_buf(),
        filename: stem,
    })
}

/// Save an RGB image; the format follows the file extension (PNG when unknown)
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    image.save_with_format(path, format)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::io::Cursor;

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn extension_allow_list() {
        assert!(is_allowed_extension("card.png"));
        assert!(is_allowed_extension("CARD.JPG"));
        assert!(is_allowed_extension("scan.jpeg"));
        assert!(!is_allowed_extension("card.gif"));
        assert!(!is_allowed_extension("card"));
    }

    #[test]
    fn decode_valid_upload() {
        let image = RgbImage::from_pixel(6, 4, Rgb([10, 20, 30]));
        let decoded = decode_upload(&png_bytes(&image), "card.png").unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn decode_rejects_bad_uploads() {
        let bytes = png_bytes(&RgbImage::new(2, 2));
        assert!(matches!(decode_upload(&bytes, ""), Err(SprayCardError::InvalidInput(_))));
        assert!(matches!(decode_upload(&bytes, "card.bmp"), Err(SprayCardError::InvalidInput(_))));
        assert!(matches!(
            decode_upload(b"not an image", "card.png"),
            Err(SprayCardError::InvalidInput(_))
        ));
    }

    #[test]
    fn dimensions() {
        assert_eq!(parse_dimension("width", Some(" 7.5 ")).unwrap(), 7.5);
        assert_eq!(parse_dimension("width", Some("-2")).unwrap(), -2.0);
        assert!(parse_dimension("width", None).is_err());
        assert!(parse_dimension("height", Some("")).is_err());
        assert!(parse_dimension("height", Some("abc")).is_err());
        assert!(parse_dimension("height", Some("inf")).is_err());
    }

    #[test]
    fn save_and_load() {
        let dir = std::env::temp_dir().join(format!("spray_card_io_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("dots.png");

        let image = RgbImage::from_fn(5, 5, |x, y| Rgb([(x * 40) as u8, (y * 40) as u8, 0]));
        save_image(&image, &path).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.filename, "dots");
        assert_eq!(loaded.image, image);

        assert!(matches!(load_image(dir.join("missing.png")), Err(SprayCardError::InvalidPath(_))));
        std::fs::remove_dir_all(&dir).ok();
    }
}
