use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use balloon_predictor::atmosphere::{
    altitude_from_pressure, density_from_altitude, fast_pressure_from_altitude,
    pressure_from_altitude,
};
use balloon_predictor::constants::KPA_TO_HPA;
use balloon_predictor::geodesy::meters_per_degree;
use balloon_predictor::dataset::ELEMENT_SIZE;
use balloon_predictor::{
    write_kml, GridFile, KmlWriter, ModelVariant, PredictionConfig, State, Trajectory,
    TrajectoryIntegrator,
};
use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::Vector2;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "balloon")]
#[command(version)]
#[command(about = "High-altitude balloon descent predictor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict a descent trajectory from a run configuration
    Predict {
        /// Run configuration (TOML)
        #[arg(short = 'c', long)]
        config: PathBuf,

        /// Override the configured time step (seconds)
        #[arg(long)]
        timestep: Option<f64>,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        output: OutputFormat,

        /// Also write the trajectory as KML to this file
        #[arg(long)]
        kml_path: Option<PathBuf>,

        /// Full output (show all trajectory points)
        #[arg(long)]
        full: bool,
    },

    /// Evaluate the standard atmosphere at an altitude
    Atmosphere {
        /// Altitude (meters)
        #[arg(short = 'a', long)]
        altitude: f64,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        output: AtmosphereFormat,
    },

    /// Show a preset weather grid and optionally check a dataset against it
    Grid {
        /// Weather model (arpege or arome)
        #[arg(short = 'm', long)]
        model: ModelVariant,

        /// Dataset file to check against the preset
        #[arg(long)]
        path: Option<PathBuf>,

        /// Output format
        #[arg(short = 'o', long, default_value = "table")]
        output: AtmosphereFormat,
    },

    /// Display predictor information
    Info,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
    Kml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AtmosphereFormat {
    Table,
    Json,
}

#[derive(Debug, Serialize)]
struct FlightSummary {
    steps: usize,
    termination: String,
    flight_time_min: f64,
    drift_km: f64,
    landing: Option<State>,
}

#[derive(Debug, Serialize)]
struct AtmosphereReport {
    altitude_m: f64,
    pressure_kpa: f64,
    pressure_hpa: f64,
    fast_pressure_kpa: f64,
    density_kg_m3: f64,
    descent_rate_mps: f64,
    altitude_from_pressure_m: f64,
}

#[derive(Debug, Serialize)]
struct GridReport {
    model: String,
    west: f64,
    south: f64,
    points: [usize; 5],
    levels_hpa: (f64, f64),
    forecast_hours: f64,
    expected_bytes: u64,
    file: Option<PathBuf>,
    file_bytes: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict {
            config,
            timestep,
            output,
            kml_path,
            full,
        } => {
            let settings = PredictionConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let predictor = settings.predictor().context("opening weather datasets")?;
            let timestep = timestep.unwrap_or(settings.run.timestep_s);

            let trajectory = predictor
                .run(settings.launch, timestep)
                .context("trajectory prediction failed")?;

            if let Some(path) = &kml_path {
                let points = write_kml(path, "Balloon trajectory", &trajectory.states)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), points, "wrote KML");
            }
            display_trajectory(&trajectory, output, full)?;
        }

        Commands::Atmosphere { altitude, output } => {
            let report = atmosphere_report(altitude)?;
            match output {
                AtmosphereFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                AtmosphereFormat::Table => {
                    println!("╔════════════════════════════════════════╗");
                    println!("║         STANDARD ATMOSPHERE            ║");
                    println!("╠════════════════════════════════════════╣");
                    println!("║ Altitude:          {:>10.1} m        ║", report.altitude_m);
                    println!("║ Pressure:          {:>10.4} kPa      ║", report.pressure_kpa);
                    println!("║ Pressure:          {:>10.3} hPa      ║", report.pressure_hpa);
                    println!("║ Pressure (fast):   {:>10.4} kPa      ║", report.fast_pressure_kpa);
                    println!("║ Density:           {:>10.5} kg/m³    ║", report.density_kg_m3);
                    println!("║ Descent Rate:      {:>10.2} m/s      ║", report.descent_rate_mps);
                    println!("║ Inverse Altitude:  {:>10.1} m        ║", report.altitude_from_pressure_m);
                    println!("╚════════════════════════════════════════╝");
                }
            }
        }

        Commands::Grid {
            model,
            path,
            output,
        } => {
            let report = grid_report(model, path.as_deref())?;
            match output {
                AtmosphereFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                AtmosphereFormat::Table => {
                    let [lng, lat, alt, time, var] = report.points;
                    println!("╔════════════════════════════════════════╗");
                    println!("║         WEATHER GRID {:<18}║", report.model);
                    println!("╠════════════════════════════════════════╣");
                    println!("║ Origin:      {:>8.3} °E {:>8.3} °N   ║", report.west, report.south);
                    println!("║ Points:      {:>4} x {:>4} (lon x lat)    ║", lng, lat);
                    println!("║ Levels:      {:>4} ({:>6.1}-{:<6.1} hPa) ║", alt, report.levels_hpa.0, report.levels_hpa.1);
                    println!("║ Forecasts:   {:>4} ({:>5.1} h span)      ║", time, report.forecast_hours);
                    println!("║ Variables:   {:>4}                      ║", var);
                    println!("║ Size:        {:>14} bytes        ║", report.expected_bytes);
                    if let (Some(file), Some(bytes)) = (&report.file, report.file_bytes) {
                        println!("╠════════════════════════════════════════╣");
                        println!("║ Dataset:     {:<26}║", file.display());
                        println!("║ File size:   {:>14} bytes        ║", bytes);
                    }
                    println!("╚════════════════════════════════════════╝");
                }
            }
        }

        Commands::Info => {
            println!("╔════════════════════════════════════════╗");
            println!("║      BALLOON PREDICTOR v{:<15}║", env!("CARGO_PKG_VERSION"));
            println!("╠════════════════════════════════════════╣");
            println!("║ Descent trajectory prediction for      ║");
            println!("║ high-altitude balloon payloads.        ║");
            println!("╠════════════════════════════════════════╣");
            println!("║ Features:                              ║");
            println!("║ • ARPEGE / AROME wind grids            ║");
            println!("║ • 4-D interpolation of winds           ║");
            println!("║ • Piecewise standard atmosphere        ║");
            println!("║ • Table, JSON, CSV and KML output      ║");
            println!("╚════════════════════════════════════════╝");
        }
    }

    Ok(())
}

fn atmosphere_report(altitude: f64) -> Result<AtmosphereReport> {
    let pressure_kpa = pressure_from_altitude(altitude)?;
    Ok(AtmosphereReport {
        altitude_m: altitude,
        pressure_kpa,
        pressure_hpa: pressure_kpa * KPA_TO_HPA,
        fast_pressure_kpa: fast_pressure_from_altitude(altitude),
        density_kg_m3: density_from_altitude(altitude)?,
        descent_rate_mps: TrajectoryIntegrator::default().descent_rate(altitude)?,
        altitude_from_pressure_m: altitude_from_pressure(pressure_kpa)?,
    })
}

fn grid_report(model: ModelVariant, path: Option<&std::path::Path>) -> Result<GridReport> {
    let grid = model.preset();
    let levels_hpa = grid.pressure_range()?;
    let (file, file_bytes) = match path {
        Some(path) => {
            let file = GridFile::open(path, &grid)
                .with_context(|| format!("checking {} against the {model} grid", path.display()))?;
            (Some(file.path().to_path_buf()), Some(file.size_bytes()))
        }
        None => (None, None),
    };
    Ok(GridReport {
        model: model.to_string(),
        west: grid.west,
        south: grid.south,
        points: [
            grid.lng_points,
            grid.lat_points,
            grid.alt_points,
            grid.time_points,
            grid.var_points,
        ],
        levels_hpa,
        forecast_hours: grid.fcst_interval * grid.time_points.saturating_sub(1) as f64,
        expected_bytes: grid.element_count() * ELEMENT_SIZE,
        file,
        file_bytes,
    })
}

fn summarize(trajectory: &Trajectory) -> FlightSummary {
    let drift_km = match (trajectory.states.first(), trajectory.last()) {
        (Some(first), Some(last)) => {
            let scale = meters_per_degree(0.5 * (first.latitude + last.latitude), 0.0);
            let east = (last.longitude - first.longitude) * scale.longitude;
            let north = (last.latitude - first.latitude) * scale.latitude;
            Vector2::new(east, north).norm() / 1000.0
        }
        _ => 0.0,
    };
    FlightSummary {
        steps: trajectory.steps(),
        termination: trajectory.termination.to_string(),
        flight_time_min: trajectory.duration_hours() * 60.0,
        drift_km,
        landing: trajectory.last().copied(),
    }
}

fn display_trajectory(trajectory: &Trajectory, format: OutputFormat, full: bool) -> Result<()> {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Output<'a> {
                summary: FlightSummary,
                trajectory: &'a Trajectory,
            }
            let output = Output {
                summary: summarize(trajectory),
                trajectory,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(io::stdout());
            for state in &trajectory.states {
                writer.serialize(state)?;
            }
            writer.flush()?;
        }

        OutputFormat::Kml => {
            let mut kml = KmlWriter::new(io::stdout().lock(), "Balloon trajectory")?;
            for state in &trajectory.states {
                kml.push(state)?;
            }
            kml.finish()?;
        }

        OutputFormat::Table => {
            let summary = summarize(trajectory);
            println!("╔════════════════════════════════════════╗");
            println!("║         PREDICTION RESULTS             ║");
            println!("╠════════════════════════════════════════╣");
            println!("║ Steps:             {:>10}          ║", summary.steps);
            println!("║ Termination:       {:>16}    ║", summary.termination);
            println!("║ Flight Time:       {:>10.1} min      ║", summary.flight_time_min);
            println!("║ Drift:             {:>10.2} km       ║", summary.drift_km);
            if let Some(landing) = summary.landing {
                println!("║ Final Longitude:   {:>10.5} °        ║", landing.longitude);
                println!("║ Final Latitude:    {:>10.5} °        ║", landing.latitude);
                println!("║ Final Altitude:    {:>10.1} m        ║", landing.altitude);
            }
            println!("╚════════════════════════════════════════╝");

            let states = &trajectory.states;
            let stride = if full { 1 } else { (states.len() / 10).max(1) };
            println!("\nTrajectory Points{}:", if full { "" } else { " (sampled)" });
            println!("┌──────────┬────────────┬────────────┬──────────┐");
            println!("│ Time (h) │  Lon (°)   │  Lat (°)   │ Alt (m)  │");
            println!("├──────────┼────────────┼────────────┼──────────┤");
            for (i, s) in states.iter().enumerate() {
                if i % stride == 0 || i == states.len() - 1 {
                    println!(
                        "│ {:>8.4} │ {:>10.5} │ {:>10.5} │ {:>8.1} │",
                        s.time, s.longitude, s.latitude, s.altitude
                    );
                }
            }
            println!("└──────────┴────────────┴────────────┴──────────┘");
        }
    }

    Ok(())
}
