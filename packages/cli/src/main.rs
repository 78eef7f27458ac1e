#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line host for the StrikeNet sighting map and report flow.
//!
//! ```text
//! strikenet map [--mock] [--json]
//! strikenet report --photo <path> --lat <lat> --lng <lng>
//! ```
//!
//! There is no drawing engine here: `map` mounts the shell over an
//! in-memory surface and prints what would be drawn. Configuration comes
//! from `MAPBOX_TOKEN`, `STRIKENET_API_BASE`, `STRIKENET_IMAGE_BASE` and
//! `STRIKENET_MOCK_REPORTS`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use strikenet_map::{MapEvent, MemorySurface};
use strikenet_report::{
    CaptureRequest, CapturedFile, ChannelCapture, FixedGeolocator, ReportFlow, ToastQueue,
    UnsupportedGeolocator,
};
use strikenet_report_models::{Coordinates, Toast, ToastKind};
use strikenet_shell::{Shell, ShellConfig};

#[derive(Parser)]
#[command(name = "strikenet", about = "StrikeNet sighting map and report tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load reports and show the markers the map would draw
    Map {
        /// Use the built-in sample dataset instead of the API
        #[arg(long)]
        mock: bool,
        /// Print the page status as JSON
        #[arg(long)]
        json: bool,
    },
    /// Submit one geo-tagged photo report
    Report {
        /// Photo to upload
        #[arg(long)]
        photo: PathBuf,
        /// Latitude the photo was taken at
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude the photo was taken at
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let mut config = ShellConfig::from_env();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Map { mock, json } => {
            config.mock_reports |= mock;
            run_map(&config, &client, json).await?;
        }
        Commands::Report { photo, lat, lng } => {
            let ok = run_report(&config, &client, &photo, Coordinates::new(lat, lng)).await?;
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_map(
    config: &ShellConfig,
    client: &reqwest::Client,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (capture, _requests) = ChannelCapture::new();
    let flow = ReportFlow::new(
        Arc::new(UnsupportedGeolocator),
        Arc::new(capture),
        config.report_submitter(client)?,
        ToastQueue::default(),
    );

    let surface = MemorySurface::new();
    let view = surface.clone();
    let mut shell = Shell::mount(
        &config.map,
        config.image_resolver()?,
        config.report_source(client)?,
        Arc::new(flow),
        move |settings, _token| {
            log::info!(
                "Opening {} at {}, {} zoom {}",
                settings.style,
                settings.center.latitude,
                settings.center.longitude,
                settings.zoom
            );
            surface
        },
    );

    shell.handle_map_event(MapEvent::Ready).await;
    shell.load_reports().await;

    let status = shell.status();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        if let Some(message) = &status.map_error {
            println!("Map unavailable: {message}");
        }
        if let Some(message) = &status.data_error {
            println!("Reports unavailable: {message}");
        }

        let state = view.snapshot();
        println!(
            "{:<10} {:<20} {:<10} {:<24} IMAGE",
            "MARKER", "SPECIES", "INVASIVE", "POSITION"
        );
        println!("{}", "-".repeat(90));
        for (id, spec) in &state.markers {
            let details = &spec.popup.details;
            println!(
                "{:<10} {:<20} {:<10} {:<24} {}",
                id.0,
                details.species,
                details.invasive,
                details.position.as_deref().unwrap_or("-"),
                spec.popup.image_url.as_deref().unwrap_or("-"),
            );
        }
        println!("\n{} marker(s)", state.markers.len());

        if let Some(bounds) = shell.map().last_bounds() {
            println!("Fitted to {bounds}");
        }
    }

    shell.unmount();
    Ok(())
}

/// Runs one report cycle. Returns whether the report was accepted.
async fn run_report(
    config: &ShellConfig,
    client: &reqwest::Client,
    photo: &Path,
    position: Coordinates,
) -> Result<bool, Box<dyn std::error::Error>> {
    let (capture, mut requests) = ChannelCapture::new();
    let flow = ReportFlow::new(
        Arc::new(FixedGeolocator::new(position)),
        Arc::new(capture),
        config.report_submitter(client)?,
        ToastQueue::default(),
    );

    let mut accepted = false;
    if flow.trigger().await.is_ok() && requests.try_recv() == Ok(CaptureRequest::Open) {
        let file = match CapturedFile::from_path(photo).await {
            Ok(file) => Some(file),
            Err(e) => {
                log::error!("Failed to read {}: {e}", photo.display());
                None
            }
        };
        accepted = flow.on_capture_selected(file).await.is_ok();
    }

    for toast in flow.toasts().toasts() {
        print_toast(&toast);
    }
    Ok(accepted)
}

fn print_toast(toast: &Toast) {
    match toast.kind {
        ToastKind::Success => println!("{}", toast.message),
        ToastKind::Error => eprintln!("error: {}", toast.message),
    }
}
