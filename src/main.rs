use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use pass_o_mat::config::Config;
use pass_o_mat::predict::{
    historical_flight, live_snapshot, look_angles, Observer, PassWindow, PredictError,
    Sgp4Propagator, TwoLineElementSet,
};

#[derive(Parser)]
#[command(name = "pass-o-mat")]
#[command(about = "Satellite pass prediction and ground track replay")]
struct Cli {
    /// Configuration file (defaults to ./pass-o-mat.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the next pass over the observer
    NextPass {
        #[arg(long, allow_negative_numbers = true)]
        latitude: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        longitude: Option<f64>,
        /// Minimum culmination elevation in degrees
        #[arg(long)]
        min_elevation: Option<f64>,
        /// Search start (RFC3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Print the current position, footprint and ground track as JSON
    Live {
        #[arg(long, allow_negative_numbers = true)]
        latitude: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        longitude: Option<f64>,
    },
    /// Replay the configured mission as JSON
    Flight {
        /// 1-based point of interest to highlight
        #[arg(long)]
        highlight: Option<usize>,
    },
    /// Run the HTTP API
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::NextPass {
            latitude,
            longitude,
            min_elevation,
            at,
        } => next_pass(&config, latitude, longitude, min_elevation, at).await,
        Commands::Live {
            latitude,
            longitude,
        } => live(&config, latitude, longitude).await,
        Commands::Flight { highlight } => flight(&config, highlight),
        Commands::Serve => {
            return match pass_o_mat::web::run_server(config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Server error: {}", e);
                    ExitCode::FAILURE
                }
            };
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_expected() => {
            println!("{}", e);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn resolve_observer(
    config: &Config,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Observer, PredictError> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Observer::with_altitude(lat, lon, config.observer.altitude_m),
        (None, None) => config
            .observer()
            .map_err(|e| PredictError::InvalidInput(e.to_string())),
        _ => Err(PredictError::InvalidInput(
            "--latitude and --longitude must be given together".into(),
        )),
    }
}

async fn next_pass(
    config: &Config,
    latitude: Option<f64>,
    longitude: Option<f64>,
    min_elevation: Option<f64>,
    at: Option<DateTime<Utc>>,
) -> Result<(), PredictError> {
    let observer = resolve_observer(config, latitude, longitude)?;
    let min_elevation_deg = min_elevation.unwrap_or(config.observer.min_elevation_deg);
    let tle = config.tle_loader().current().await?;

    let finder = config.prediction.pass_finder(&tle)?;
    let pass = finder.next_pass(&observer, min_elevation_deg, at.unwrap_or_else(Utc::now))?;
    print_pass(&tle, &observer, min_elevation_deg, &pass);
    Ok(())
}

fn print_pass(tle: &TwoLineElementSet, observer: &Observer, min_elevation_deg: f64, pass: &PassWindow) {
    let c = &pass.culmination;
    println!(
        "Next pass of {} over {:.4}, {:.4} (min elevation {}°)",
        tle.display_name(),
        observer.latitude_deg,
        observer.longitude_deg,
        min_elevation_deg
    );
    println!("  Rise:        {}", pass.rise.format("%Y-%m-%d %H:%M:%S UTC"));
    println!(
        "  Culmination: {}  azimuth {:.2}°  elevation {:.2}°  distance {} km",
        c.time.format("%Y-%m-%d %H:%M:%S UTC"),
        c.azimuth_deg,
        c.elevation_deg,
        c.range_km
    );
    println!("  Set:         {}", pass.set.format("%Y-%m-%d %H:%M:%S UTC"));
    println!(
        "  Duration:    {} min {} s",
        pass.duration_seconds / 60,
        pass.duration_seconds % 60
    );
}

async fn live(
    config: &Config,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<(), PredictError> {
    let observer = resolve_observer(config, latitude, longitude)?;
    let tle = config.tle_loader().current().await?;
    let propagator = Sgp4Propagator::new(&tle)?;

    let snapshot = live_snapshot(
        &propagator,
        Utc::now(),
        propagator.orbital_period(),
        config.prediction.track_step(),
        config.prediction.footprint_points,
    )?;
    let output = serde_json::json!({
        "satellite": tle.display_name(),
        "observer": observer,
        "look_angles": look_angles(&observer, &snapshot.state),
        "snapshot": snapshot
    });
    print_json(&output)
}

fn flight(config: &Config, highlight: Option<usize>) -> Result<(), PredictError> {
    let plan = config
        .mission_plan()
        .map_err(|e| PredictError::InvalidInput(e.to_string()))?
        .ok_or_else(|| PredictError::InvalidInput("no mission configured".into()))?;
    let propagator = Sgp4Propagator::new(&plan.tle)?;
    let trajectory = historical_flight(
        &propagator,
        &plan,
        config.prediction.track_step(),
        config.prediction.footprint_points,
    )?;

    match highlight {
        Some(index) => {
            let point = trajectory.highlighted(index).ok_or_else(|| {
                PredictError::InvalidInput(format!("no point of interest {}", index))
            })?;
            print_json(point)
        }
        None => print_json(&trajectory),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), PredictError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| PredictError::InvalidInput(format!("serializing output: {}", e)))?;
    println!("{}", text);
    Ok(())
}
