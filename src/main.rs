use std::path::{Path, PathBuf};
use std::time::Instant;
use clap::Parser;
use log::{error, warn};
use rayon::prelude::*;

use food_finder_lib::image_io::get_image_files_in_dir;
use food_finder_lib::output::{format_circles, write_summary_csv, ImageSummary};
use food_finder_lib::{load_image, process_image, Config, FoodFinderError, Result};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "FoodFinder - Plate, bowl and bread localisation on meal trays")]
struct Args {
    /// Path to input image or directory of images
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Expect a salad bowl on the tray (enables bowl refinement)
    #[clap(long)]
    expect_salad: bool,

    /// Enable debug mode (save intermediate bread masks and log more)
    #[clap(short, long)]
    debug: bool,
}

fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::from_file(path)
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Ok(Config::default())
    }
}

fn print_summary(summary: &ImageSummary) {
    println!("{}", summary.path.display());
    println!("  Plates ({}): {}", summary.plates.len(), format_circles(&summary.plates));
    println!("  Bowls  ({}): {}", summary.bowls.len(), format_circles(&summary.bowls));
    println!("  Bread area: {} pixels", summary.bread_area);
}

fn process_path(path: &Path, config: &Config, debug: bool) -> Result<ImageSummary> {
    let input_image = load_image(path)?;
    process_image(input_image, config, debug)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = load_config(&args.config)?;

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }

    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }

    if args.expect_salad {
        config.prior_salad_seen = true;
    }

    config.validate()?;

    let start_time = Instant::now();
    let input_path = PathBuf::from(&config.input_path);

    let summaries = if input_path.is_file() {
        println!("Processing single file: {}", input_path.display());
        vec![process_path(&input_path, &config, args.debug)?]
    } else if input_path.is_dir() {
        println!("Processing directory: {}", input_path.display());
        let image_files = get_image_files_in_dir(&input_path)?;
        println!("Found {} images", image_files.len());

        let results: Vec<(PathBuf, Result<ImageSummary>)> = if config.use_parallel {
            image_files
                .par_iter()
                .map(|path| (path.clone(), process_path(path, &config, args.debug)))
                .collect()
        } else {
            image_files
                .iter()
                .map(|path| (path.clone(), process_path(path, &config, args.debug)))
                .collect()
        };

        results
            .into_iter()
            .filter_map(|(path, result)| match result {
                Ok(summary) => Some(summary),
                Err(e) => {
                    error!("Error processing {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    } else {
        return Err(FoodFinderError::InvalidPath(input_path));
    };

    for summary in &summaries {
        print_summary(summary);
    }

    let csv_path = write_summary_csv(&summaries, &config.output_base_dir)?;
    println!("Summary written to {}", csv_path.display());

    let elapsed = start_time.elapsed();
    println!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
