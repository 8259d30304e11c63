//! sa-live — drive one situational-awareness session from the command line.
//!
//! Batch mode steps the session as fast as routes resolve; `--live <secs>`
//! runs the real-time loop instead.  Either way the surviving incidents are
//! listed at the end, and `--json` dumps the final snapshot.
//!
//! Routing uses Mapbox when `MAPBOX_TOKEN` is set, straight lines otherwise.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::sync::mpsc;

use sa_core::{Coordinate, Tick, TravelProfile};
use sa_incident::SafetyAssessment;
use sa_sim::{SessionBuilder, SessionCommand, SessionConfig, SessionObserver};

// ── CLI ───────────────────────────────────────────────────────────────────────

/// Simulate a moving observer among evolving incidents.
#[derive(Parser)]
#[command(name = "sa-live")]
struct Cli {
    /// Session configuration (TOML).  Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Movement ticks to run in batch mode.
    #[arg(long, default_value_t = 120)]
    ticks: u64,

    /// Run the real-time loop for this many seconds instead.
    #[arg(long)]
    live: Option<u64>,

    #[arg(long)]
    seed: Option<u64>,

    /// `walking` or `driving`.
    #[arg(long)]
    profile: Option<TravelProfile>,

    /// Target as `lng,lat`.
    #[arg(long, value_parser = parse_lng_lat)]
    target: Option<[f64; 2]>,

    /// Print the final snapshot as JSON.
    #[arg(long)]
    json: bool,
}

fn parse_lng_lat(s: &str) -> Result<[f64; 2], String> {
    let (lng, lat) = s.split_once(',').ok_or("expected lng,lat")?;
    let lng = lng.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let lat = lat.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok([lng, lat])
}

// ── Observer ──────────────────────────────────────────────────────────────────

const PRINT_EVERY_TICKS: u64 = 10;

#[derive(Default)]
struct ConsoleObserver {
    incident_changes: usize,
}

impl SessionObserver for ConsoleObserver {
    fn on_move(&mut self, tick: Tick, position: Coordinate) {
        if tick.0.is_multiple_of(PRINT_EVERY_TICKS) {
            println!("{tick:>8}  at {position}");
        }
    }

    fn on_incidents(&mut self, tick: Tick, changed: &[sa_core::IncidentId]) {
        self.incident_changes += changed.len();
        for id in changed {
            println!("{tick:>8}  incident {id} updated");
        }
    }

    fn on_safety_change(&mut self, tick: Tick, assessment: &SafetyAssessment) {
        println!("{tick:>8}  {}: {}", assessment.message, assessment.detail);
    }

    fn on_session_end(&mut self, final_tick: Tick) {
        println!("session ended at {final_tick} ({} incident updates)", self.incident_changes);
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(profile) = cli.profile {
        config.profile = profile;
    }
    if cli.target.is_some() {
        config.target = cli.target;
    }
    if let Ok(token) = std::env::var("MAPBOX_TOKEN") {
        config.mapbox_token = Some(token);
    }
    config.validate()?;

    let provider = config.route_provider();
    let mut session = SessionBuilder::new(config, provider).build()?;
    let mut observer = ConsoleObserver::default();

    let t0 = Instant::now();
    match cli.live {
        Some(0) => bail!("--live needs a positive number of seconds"),
        Some(secs) => {
            let (tx, rx) = mpsc::channel(4);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                let _ = tx.send(SessionCommand::Shutdown).await;
            });
            session.run(rx, &mut observer).await;
        }
        None => session.run_ticks(cli.ticks, &mut observer).await,
    }
    log::info!("finished in {:.2?}", t0.elapsed());

    let snapshot = session.snapshot();
    let summary = &snapshot.summary;
    println!(
        "{} incidents ({} active, {} critical); safety: {}",
        summary.total, summary.active, summary.critical, snapshot.safety.message
    );
    for incident in session.engine().by_distance() {
        println!(
            "  {:<20} {:<9} {:<8} {:<13} {:>7.0} m",
            incident.id.as_str(),
            incident.category.as_str(),
            incident.severity().as_str(),
            incident.status().as_str(),
            incident.distance_to_observer.unwrap_or(f64::NAN),
        );
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}
