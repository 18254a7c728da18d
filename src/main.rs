use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::{debug, info, LevelFilter};

use spray_card_rust_lib::config::{Config, DetectionMode};
use spray_card_rust_lib::errors::SprayCardError;
use spray_card_rust_lib::image_io::{load_image, parse_dimension, save_image, InputImage};
use spray_card_rust_lib::output::{write_droplets_csv, write_summary_json};
use spray_card_rust_lib::pipeline::{run_pipeline, PipelineOutput};
use spray_card_rust_lib::transport::{
    encode_jpeg, ErrorResponse, FormattedResults, SuccessResponse, DEFAULT_JPEG_QUALITY,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "SprayCard - Droplet coverage analysis of water-sensitive spray cards")]
struct Args {
    /// Path to the spray card photograph (png, jpg, jpeg)
    #[clap(short, long)]
    input: PathBuf,

    /// Real card width
    #[clap(short = 'W', long, allow_hyphen_values = true)]
    width: Option<String>,

    /// Real card height
    #[clap(short = 'H', long, allow_hyphen_values = true)]
    height: Option<String>,

    /// Path to configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Path to output directory
    #[clap(short, long, default_value = "output")]
    output: PathBuf,

    /// Use the size-aware detector (circularity filter, mean diameter, count+diameter verdicts)
    #[clap(long)]
    size_aware: bool,

    /// Enable debug mode (save intermediate images and log more info)
    #[clap(short, long)]
    debug: bool,

    /// Print the result as a JSON envelope instead of text
    #[clap(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.debug { LevelFilter::Debug } else { LevelFilter::Info })
        .parse_default_env()
        .init();

    let config = load_config(&args)?;

    match process(&args, &config) {
        Ok(output) => {
            if args.json {
                let response = SuccessResponse::new(&output.result, &config);
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                for (label, value) in FormattedResults::from_result(&output.result, &config).pairs() {
                    println!("{:<14} {}", format!("{}:", label), value);
                }
            }
            Ok(())
        }
        Err(err) if args.json => {
            println!("{}", serde_json::to_string_pretty(&ErrorResponse::from_error(&err))?);
            std::process::exit(1);
        }
        Err(err) => Err(anyhow::Error::new(err).context(format!("Failed to analyze {}", args.input.display()))),
    }
}

/// Build the configuration: file (or preset), then command-line overrides
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None if args.size_aware => Config::size_aware(),
        None => Config::default(),
    };

    if args.size_aware {
        config.detection_mode = DetectionMode::SizeAware;
    }

    config.validate().context("Invalid configuration")?;
    debug!("Using configuration: {:?}", config);

    Ok(config)
}

fn process(args: &Args, config: &Config) -> Result<PipelineOutput, SprayCardError> {
    let start_time = Instant::now();

    // Reject bad requests before any analysis work
    let card_width = parse_dimension("width", args.width.as_deref())?;
    let card_height = parse_dimension("height", args.height.as_deref())?;
    let InputImage { image, path, filename } = load_image(&args.input)?;

    info!("Processing {} ({}x{})", path.display(), image.width(), image.height());
    let output = run_pipeline(&image, card_width, card_height, config)?;

    fs::create_dir_all(&args.output)?;
    let annotated = encode_jpeg(&output.annotated, DEFAULT_JPEG_QUALITY)?;
    fs::write(args.output.join(format!("{}_annotated.jpg", filename)), annotated)?;
    write_droplets_csv(
        &output.detection.regions,
        &output.calibration,
        config,
        args.output.join(format!("{}_droplets.csv", filename)),
    )?;
    write_summary_json(&output.result, args.output.join(format!("{}_summary.json", filename)))?;

    // Save debug images if requested
    if args.debug {
        let debug_dir = args.output.join("debug");
        fs::create_dir_all(&debug_dir)?;

        save_image(&output.enhanced, debug_dir.join(format!("{}_enhanced.png", filename)))?;
        output.mask.save(debug_dir.join(format!("{}_mask.png", filename)))?;
        debug!(
            "{} raw components, {} foreground pixels",
            output.detection.raw_component_count, output.detection.foreground_pixels
        );
    }

    info!(
        "Results written to {} in {:.2} seconds",
        args.output.display(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(output)
}
