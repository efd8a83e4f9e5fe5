use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use osmharvest::api::{GraphHopperClient, OverpassClient};
use osmharvest::config::FileConfig;
use osmharvest::domain::{AreaOfInterest, BBox, FeatureKind};
use osmharvest::input::{read_areas, read_stops};
use osmharvest::output::Checkpoint;
use osmharvest::pipeline::{
    FeatureJob, IsochroneJob, dissolve_directory, run_feature_job, run_isochrone_job,
};

/// Download OpenStreetMap buildings, water bodies and transit isochrones as GeoJSON
///
/// Examples:
///   # Water bodies for every area in a GeoJSON file
///   osmharvest water --areas districts.geojson -o out/
///
///   # Buildings around a point
///   osmharvest buildings --lat 52.4064 --lon 16.9252 -r 2000 --name Centre
///
///   # Walking isochrones for rail stops, resumable
///   osmharvest isochrones --stops stops.geojson --key $GH_KEY
///
///   # Merge buildings of the same type
///   osmharvest dissolve out/ dissolved/
#[derive(Parser, Debug)]
#[command(name = "osmharvest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (optional, auto-searches osmharvest.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Water bodies (natural=water)
    Water(FeatureArgs),
    /// Building footprints
    Buildings(FeatureArgs),
    /// Building footprints with level counts and heights
    BuildingLevels(FeatureArgs),
    /// Walking isochrones around rail stops
    Isochrones(IsochroneArgs),
    /// Union polygons sharing a property value, file by file
    Dissolve(DissolveArgs),
}

#[derive(Args, Debug)]
struct FeatureArgs {
    /// GeoJSON file of named area polygons
    #[arg(short = 'a', long, conflicts_with = "lat")]
    areas: Option<PathBuf>,

    /// Latitude of a single area center (use with --lon)
    #[arg(long, requires = "lon")]
    lat: Option<f64>,

    /// Longitude of a single area center (use with --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Radius around --lat/--lon in meters
    #[arg(short = 'r', long, default_value = "1000")]
    radius: u32,

    /// Name of the single area
    #[arg(long, default_value = "area")]
    name: String,

    /// Output directory
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Area property holding the area name
    #[arg(long)]
    name_field: Option<String>,

    /// Output file name, {name} is replaced by the area name
    #[arg(long)]
    template: Option<String>,

    /// Query each area as four quadrants
    #[arg(long)]
    split_quadrants: bool,

    /// Seconds to wait between areas
    #[arg(long)]
    delay: Option<u64>,
}

#[derive(Args, Debug)]
struct IsochroneArgs {
    /// GeoJSON file of stop points with id and railway properties
    #[arg(short = 's', long)]
    stops: PathBuf,

    /// Output GeoJSON file, extended in place across runs
    #[arg(short = 'o', long, default_value = "isochrones.geojson")]
    output: PathBuf,

    /// File holding the id of the last processed stop
    #[arg(long, default_value = "last_processed_index.txt")]
    checkpoint: PathBuf,

    /// GraphHopper API key (repeat to rotate between several)
    #[arg(short = 'k', long = "key")]
    keys: Vec<String>,

    /// Seconds to wait between stops
    #[arg(long)]
    delay: Option<u64>,
}

#[derive(Args, Debug)]
struct DissolveArgs {
    /// Directory of GeoJSON files to dissolve
    input_dir: PathBuf,

    /// Directory for the dissolved files
    output_dir: PathBuf,

    /// Property to group by
    #[arg(long, default_value = "building")]
    field: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let total_start = Instant::now();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let file_config = FileConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Water(args) => harvest(FeatureKind::Water, args, &file_config)?,
        Command::Buildings(args) => harvest(FeatureKind::Buildings, args, &file_config)?,
        Command::BuildingLevels(args) => {
            harvest(FeatureKind::BuildingLevels, args, &file_config)?
        }
        Command::Isochrones(args) => isochrones(args, file_config)?,
        Command::Dissolve(args) => dissolve(args)?,
    }

    println!();
    println!(
        "Done! Total time: {:.1}s",
        total_start.elapsed().as_secs_f32()
    );

    Ok(())
}

fn harvest(kind: FeatureKind, args: FeatureArgs, file_config: &FileConfig) -> Result<()> {
    let run = &file_config.run;
    let name_field = args.name_field.as_deref().unwrap_or(&run.name_field);

    let areas = match (&args.areas, args.lat, args.lon) {
        (Some(path), _, _) => read_areas(path, name_field)
            .with_context(|| format!("Failed to load areas from {}", path.display()))?,
        (None, Some(lat), Some(lon)) => {
            vec![AreaOfInterest::new(
                args.name.clone(),
                BBox::around((lat, lon), args.radius),
            )]
        }
        _ => bail!("Must provide either --areas or --lat and --lon"),
    };
    if areas.is_empty() {
        bail!("No areas to process");
    }

    let mut job = FeatureJob::new(kind, args.output_dir.unwrap_or_else(|| run.output_dir.clone()));
    if let Some(template) = args.template {
        job.template = template;
    }
    job.split_quadrants = args.split_quadrants || run.split_quadrants;
    job.area_delay = Duration::from_secs(args.delay.unwrap_or(run.area_delay_secs));

    log::debug!(
        "{} areas, {} mirrors, output {}",
        areas.len(),
        file_config.overpass.urls.len(),
        job.output_dir.display()
    );

    let client = OverpassClient::new(&file_config.overpass)?;
    let progress = create_progress_bar(areas.len() as u64)?;
    let summary = run_feature_job(&client, &areas, &job, &progress)?;
    progress.finish_with_message(format!("Fetched {}", kind.label()));

    println!();
    println!("Wrote {} files:", summary.written.len());
    for path in &summary.written {
        println!("  {}", path.display());
    }
    if !summary.empty.is_empty() {
        println!("No {} in: {}", kind.label(), summary.empty.join(", "));
    }
    if !summary.failed.is_empty() {
        println!("Failed: {}", summary.failed.join(", "));
    }

    Ok(())
}

fn isochrones(args: IsochroneArgs, mut file_config: FileConfig) -> Result<()> {
    if !args.keys.is_empty() {
        file_config.graphhopper.keys = args.keys;
    }
    if file_config.graphhopper.keys.is_empty() {
        bail!("No GraphHopper API key, pass --key or set [graphhopper] keys in the config file");
    }

    let spinner = create_spinner("Loading stops...")?;
    let stops = read_stops(&args.stops)
        .with_context(|| format!("Failed to load stops from {}", args.stops.display()))?;
    spinner.finish_with_message(format!("Loaded {} stops", stops.len()));

    let job = IsochroneJob {
        output: args.output,
        checkpoint: Checkpoint::new(args.checkpoint),
        stop_delay: Duration::from_secs(args.delay.unwrap_or(file_config.run.stop_delay_secs)),
    };

    let client = GraphHopperClient::new(&file_config.graphhopper)?;
    let progress = create_progress_bar(0)?;
    let summary = run_isochrone_job(&client, stops, &job, &progress)?;
    progress.finish_with_message("Fetched isochrones");

    println!();
    println!(
        "Processed {} stops, {} polygons -> {}",
        summary.processed,
        summary.polygons,
        job.output.display()
    );
    println!("Resume marker: {}", job.checkpoint.path().display());
    if !summary.skipped.is_empty() {
        let ids: Vec<String> = summary.skipped.iter().map(|id| id.to_string()).collect();
        println!("Skipped stops: {}", ids.join(", "));
    }

    Ok(())
}

fn dissolve(args: DissolveArgs) -> Result<()> {
    let spinner = create_spinner("Dissolving...")?;
    let start = Instant::now();
    let written = dissolve_directory(&args.input_dir, &args.output_dir, &args.field)?;
    spinner.finish_with_message(format!(
        "Dissolved {} files by {} [{:.1}s]",
        written.len(),
        args.field,
        start.elapsed().as_secs_f32()
    ));
    Ok(())
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn create_spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .context("Invalid progress template")?
            .tick_strings(TICKS),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn create_progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{pos}/{len}] {msg} ({elapsed})")
            .context("Invalid progress template")?
            .tick_strings(TICKS),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}
