use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;
use walkdir::WalkDir;

use timemark::{
    Config,
    batch::BatchStatus,
    decode::is_supported_image_path,
    fields::{WatermarkFields, parse_date_input, parse_time},
    geocode::GeocodeResolver,
    session::Session,
    startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watermark images with the date, time, weekday and location
    Render {
        /// Image files or directories containing images
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Date as YYYY-MM-DD or "DD Tháng MM, YYYY" (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Time as HH:MM (default: now)
        #[arg(long)]
        time: Option<String>,

        /// Weekday label, overriding the one derived from the date
        #[arg(long)]
        day: Option<String>,

        /// Location text; skips geocoding
        #[arg(long)]
        location: Option<String>,

        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,

        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,

        /// Never contact the geocoding service
        #[arg(long)]
        offline: bool,

        /// JPEG quality between 0.0 and 1.0
        #[arg(long)]
        quality: Option<f32>,

        /// Output directory (default from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a single zip archive instead of individual files
        #[arg(long)]
        zip: bool,
    },

    /// Look up the place name for a coordinate
    Geocode {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },

    /// Check fonts, logo and output directory
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Render {
            paths,
            date,
            time,
            day,
            location,
            lat,
            lon,
            offline,
            quality,
            output,
            zip,
        } => {
            let config = config.with_render_overrides(quality, output);
            let fields = build_fields(
                &config,
                date.as_deref(),
                time.as_deref(),
                day,
                location,
                lat.zip(lon),
                offline,
            )
            .await?;
            render(config, paths, fields, zip).await
        }
        Commands::Geocode { lat, lon } => {
            let resolver = GeocodeResolver::from_config(&config.geocode, false);
            println!("{}", resolver.resolve(lat, lon).await);
            Ok(())
        }
        Commands::Check => run_checks(&config).await,
    }
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let config = if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        Config::from_toml(&config_content)?
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Config::default()
    };
    info!("Starting {}", config.app.name);
    Ok(config)
}

async fn build_fields(
    config: &Config,
    date: Option<&str>,
    time: Option<&str>,
    day: Option<String>,
    location: Option<String>,
    position: Option<(f64, f64)>,
    offline: bool,
) -> Result<WatermarkFields, Box<dyn std::error::Error>> {
    let mut fields = WatermarkFields::now();
    if let Some(date) = date {
        fields = fields.with_date(parse_date_input(date)?);
    }
    if let Some(time) = time {
        fields = fields.with_time(parse_time(time)?);
    }
    if let Some(day) = day {
        fields.day = day;
    }

    fields.location = match location {
        Some(location) => location,
        None => {
            GeocodeResolver::from_config(&config.geocode, offline)
                .resolve_or_default(position)
                .await
        }
    };

    Ok(fields)
}

/// Image files under `paths`, directories walked recursively in name order.
fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && is_supported_image_path(entry.path()) {
                    images.push(entry.into_path());
                }
            }
        } else if is_supported_image_path(path) {
            images.push(path.clone());
        } else {
            warn!("Skipping {:?}, not an image file", path);
        }
    }
    images
}

async fn render(
    config: Config,
    paths: Vec<PathBuf>,
    fields: WatermarkFields,
    zip: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = config.export.output_directory.clone();
    if let Err(errors) = startup_checks::perform_startup_checks(&config).await
        && errors.iter().any(|e| e.is_critical())
    {
        tracing::error!("Critical startup check failed, exiting");
        return Err("Critical startup check failed".into());
    }

    let mut files = Vec::new();
    for path in collect_images(&paths) {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        match tokio::fs::read(&path).await {
            Ok(bytes) => files.push((name, bytes)),
            Err(e) => warn!("Failed to read {:?}: {}", path, e),
        }
    }

    let session = Session::from_config(&config);
    let selection = session.select_files(files).await;
    for name in &selection.skipped {
        println!("Không thể tải ảnh: {}", name);
    }
    if selection.dropped > 0 {
        println!(
            "Chỉ xử lý {} ảnh đầu tiên, bỏ qua {} ảnh.",
            config.selection.max_files, selection.dropped
        );
    }

    info!(
        "Watermark: {} {} {} | {}",
        fields.time, fields.day, fields.date, fields.location
    );
    session.set_fields(fields).await;

    let report = session
        .process(|progress| {
            info!(
                "Đang xử lý {}/{} ({:.0}%)",
                progress.current,
                progress.total,
                progress.percent()
            );
        })
        .await?;

    println!("{}", report.summary());
    match report.status() {
        BatchStatus::Empty | BatchStatus::AllFailed => {
            return Err(report.summary().into());
        }
        BatchStatus::Completed | BatchStatus::Partial => {}
    }

    if zip {
        let path = session.export_all(&output).await?;
        println!("{}", path.display());
    } else {
        for rendered in session.outputs().await {
            let path = session.export_one(rendered.id, &output).await?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

async fn run_checks(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match startup_checks::perform_startup_checks(config).await {
        Ok(()) => {
            println!("All startup checks passed");
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                println!("{}", error);
            }
            if errors.iter().any(|e| e.is_critical()) {
                Err("Critical startup check failed".into())
            } else {
                Ok(())
            }
        }
    }
}
