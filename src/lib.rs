// src/lib.rs - Library interface for spray card droplet analysis

pub mod calibration;
pub mod classification;
pub mod config;
pub mod detection;
pub mod errors;
pub mod font;
pub mod image_io;
pub mod image_utils;
pub mod metrics;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod render;
pub mod segmentation;
pub mod shape_analysis;
pub mod transport;

// Re-export commonly used types and functions
pub use errors::{SprayCardError, Result};
pub use config::{Config, DetectionMode};
pub use pipeline::{analyze, run_pipeline, AnalysisResult, PipelineOutput};
pub use image_io::{InputImage, decode_upload, load_image, save_image};

// Re-export stage entry points
pub use preprocess::{clahe, enhance_contrast};
pub use segmentation::{adaptive_threshold_gaussian, segment};
pub use morphology::{apply_closing, apply_opening, fill_small_holes, label_components};
pub use detection::{check_region, detect_droplets, Detection, Region};
pub use calibration::Calibration;
pub use metrics::{compute_metrics, DropletMetrics};
pub use classification::{ClassificationInput, ClassificationPolicy, EfficacyTier, PolicyRule};
pub use render::annotate;

// Re-export boundary helpers
pub use transport::{encode_jpeg, ErrorResponse, FormattedResults, SuccessResponse};
pub use output::{write_droplets_csv, write_summary_json};
