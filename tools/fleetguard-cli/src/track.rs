use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use fleetguard_core::routing;
use fleetguard_core::tracking::{SystemClock, TrackingRequest, TrackingSession};

use crate::App;
use crate::output::status_line;

#[derive(Args, Debug)]
pub struct TrackArgs {
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
    #[arg(long)]
    date: NaiveDate,
    /// Scheduled departure (HH:MM)
    #[arg(long)]
    departure: String,
    /// Scheduled arrival (HH:MM); earlier than departure means the next day
    #[arg(long)]
    arrival: String,
    /// Write the final map state as GeoJSON to this file
    #[arg(long)]
    geojson: Option<PathBuf>,
}

impl From<&TrackArgs> for TrackingRequest {
    fn from(args: &TrackArgs) -> Self {
        Self {
            origin: args.from.clone(),
            destination: args.to.clone(),
            date: Some(args.date.format("%Y-%m-%d").to_string()),
            departure_clock: Some(args.departure.clone()),
            arrival_clock: Some(args.arrival.clone()),
        }
    }
}

/// Print a status line per update until the bus arrives or Ctrl-C.
pub async fn run(app: &App, args: TrackArgs) -> Result<()> {
    let http = app.config.http_client().context("Failed to build HTTP client")?;
    let (geocoder, router) =
        routing::from_config(http, &app.config).context("Invalid routing configuration")?;

    let mut session = TrackingSession::start(
        &TrackingRequest::from(&args),
        &geocoder,
        &router,
        Arc::new(SystemClock),
        &app.config.tracking,
    )
    .await
    .context("Could not start tracking")?;

    let estimator = session.estimator();
    println!(
        "{} -> {}: {:.1} km, {:.0} km/h, estimated arrival {}",
        session.schedule().origin,
        session.schedule().destination,
        estimator.route().total_km(),
        estimator.velocity_kmh(),
        estimator.estimated_arrival().format("%Y-%m-%d %H:%M")
    );
    if estimator.estimated_arrival() > estimator.scheduled_arrival() {
        println!(
            "Speed limit applies; scheduled arrival {} will be missed",
            estimator.scheduled_arrival().format("%H:%M")
        );
    }

    let mut updates = session.subscribe();
    println!("{}", status_line(session.schedule(), &updates.borrow_and_update()));

    // `changed` fails once the periodic task has dropped its sender.
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                println!("{}", status_line(session.schedule(), &snapshot));
                if snapshot.arrived {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped");
                break;
            }
        }
    }
    session.stop();

    if let Some(path) = &args.geojson {
        let collection = session.to_geojson();
        let json = serde_json::to_string_pretty(&collection).context("Failed to encode GeoJSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let focus = session.recenter();
        tracing::info!(
            lat = focus.center.y(),
            lng = focus.center.x(),
            zoom = focus.zoom,
            "map written to {}",
            path.display()
        );
    }
    Ok(())
}
