//! SmartTransit CLI
//!
//! Terminal front end for the SmartTransit client core:
//! - Watch the live bus map
//! - Track a single bus until its trip ends
//! - Draw a journey route between two places
//! - Get a smart ETA to a destination
//! - Show crowd levels

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smarttransit::config::generate_default_config;
use smarttransit::map::MapView;
use smarttransit::presentation::{format_distance_km, format_eta_minutes};
use smarttransit::{Config, Notice, NoticeLevel, PageArgs, PageId, Position, TransitApp};

/// How often the terminal checks the map for changes
const REFRESH: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "smarttransit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live bus tracking for the SmartTransit network")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL (overrides config)
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch every active bus on the live map
    Live,

    /// Follow one bus until its trip ends
    Track {
        /// Bus registration number
        bus: String,
    },

    /// Draw the route between two places
    Journey {
        /// Start place name
        #[arg(long)]
        from: String,
        /// Destination place name
        #[arg(long)]
        to: String,
    },

    /// Pickup stop, route and ETA from a location to a destination
    Eta {
        /// Your latitude
        #[arg(long)]
        lat: f64,
        /// Your longitude
        #[arg(long)]
        lng: f64,
        /// Destination name
        #[arg(long)]
        to: String,
    },

    /// Passenger load of every live bus
    Crowd,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let template = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, template)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Wrote default config to {}", path.display());
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.backend_url {
        config.backend.url = url.clone();
    }

    init_logging(&config);
    tracing::info!("SmartTransit v{} (backend {})", env!("CARGO_PKG_VERSION"), config.backend.url);

    let mut app = TransitApp::connect(config).await?;
    let notices = app
        .take_notices()
        .context("notice receiver already taken")?;

    let result = match cli.command {
        Commands::Live => run_live(&mut app, notices, &cli.format).await,
        Commands::Track { bus } => run_track(&mut app, notices, &bus).await,
        Commands::Journey { from, to } => run_journey(&mut app, notices, from, to).await,
        Commands::Eta { lat, lng, to } => {
            run_eta(&mut app, notices, Position::new(lat, lng), to).await
        }
        Commands::Crowd => run_crowd(&mut app, &cli.format).await,
        Commands::Config { .. } => Ok(()),
    };

    app.shutdown().await;
    result
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("smarttransit={}", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run_live(
    app: &mut TransitApp,
    mut notices: UnboundedReceiver<Notice>,
    format: &str,
) -> anyhow::Result<()> {
    app.navigate(PageId::LiveMap, PageArgs::None).await?;
    let map = app.maps().live.clone();
    let mut ticker = tokio::time::interval(REFRESH);
    let mut last_stats = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(notice) = notices.recv() => eprintln!("{}", notice),
            _ = ticker.tick() => {
                let map = map.read().await;
                let stats = map.stats();
                if last_stats != Some(stats) {
                    last_stats = Some(stats);
                    print_markers(&map, format)?;
                }
            }
        }
    }
    Ok(())
}

async fn run_track(
    app: &mut TransitApp,
    mut notices: UnboundedReceiver<Notice>,
    bus: &str,
) -> anyhow::Result<()> {
    app.navigate(PageId::Track, PageArgs::Track { bus_reg: bus.to_string() })
        .await?;
    let map = app.maps().tracking.clone();
    let mut ticker = tokio::time::interval(REFRESH);
    let mut last_revision = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(notice) = notices.recv() => {
                eprintln!("{}", notice);
                // Trip ended
                if notice.level == NoticeLevel::Error {
                    break;
                }
            }
            _ = ticker.tick() => {
                let map = map.read().await;
                if let Some(marker) = map.markers().into_iter().next() {
                    let revision = (marker.created_seq(), marker.revision());
                    if last_revision != Some(revision) {
                        last_revision = Some(revision);
                        println!("{}", marker.position);
                        println!("{}", marker.content.popup);
                        println!();
                    }
                }
            }
        }
    }
    Ok(())
}

async fn run_journey(
    app: &mut TransitApp,
    notices: UnboundedReceiver<Notice>,
    from: String,
    to: String,
) -> anyhow::Result<()> {
    app.navigate(PageId::Journey, PageArgs::Journey { from, to }).await?;
    if !wait_for_outcome(notices).await {
        return Ok(());
    }

    let map = app.maps().journey.read().await;
    for marker in map.markers() {
        println!("{:<12} {}  {}", marker.content.label, marker.position, marker.content.popup);
    }
    if let Some(route) = map.route() {
        println!(
            "Route: {} waypoints, {}, about {}",
            route.waypoints.len(),
            format_distance_km(route.distance_m / 1000.0),
            format_eta_minutes(route.duration_s / 60.0)
        );
    }
    Ok(())
}

async fn run_eta(
    app: &mut TransitApp,
    notices: UnboundedReceiver<Notice>,
    origin: Position,
    destination: String,
) -> anyhow::Result<()> {
    app.navigate(PageId::Eta, PageArgs::Eta { origin, destination })
        .await?;
    if !wait_for_outcome(notices).await {
        return Ok(());
    }

    let board = app.eta_board();
    let board = board.read().await;
    if let Some(eta) = board.as_ref() {
        println!(
            "Route {} ({} → {}), fare {}",
            eta.bus_route.name, eta.bus_route.from, eta.bus_route.to, eta.bus_route.fare_range
        );
        println!(
            "  walk {}  wait {}  ride {}  total {}",
            format_eta_minutes(eta.eta.walk_time_min),
            format_eta_minutes(eta.eta.wait_time_min),
            format_eta_minutes(eta.eta.bus_travel_min),
            format_eta_minutes(eta.eta.total_min)
        );
        if let Some(transfer) = &eta.transfer {
            println!("  change at {} to {}", transfer.stop.name, transfer.route.name);
        }
    }
    Ok(())
}

async fn run_crowd(app: &mut TransitApp, format: &str) -> anyhow::Result<()> {
    app.navigate(PageId::Crowd, PageArgs::None).await?;
    let board = app.crowd_board();
    let rows = board.read().await;

    if format == "json" {
        let data: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                serde_json::json!({
                    "bus_reg": row.bus_reg,
                    "route": row.route,
                    "passenger_count": row.passenger_count,
                    "crowd_level": row.crowd.label,
                    "status": row.status.label,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{:<14} {:>6}  {:<8} {:<10} ROUTE", "BUS", "PAX", "CROWD", "STATUS");
    println!("{}", "-".repeat(60));
    for row in rows.iter() {
        println!(
            "{:<14} {:>6}  {:<8} {} {:<8} {}",
            row.bus_reg, row.passenger_count, row.crowd.label, row.status.icon, row.status.label, row.route
        );
    }
    Ok(())
}

/// Print notices until a success or error arrives; true on success
async fn wait_for_outcome(mut notices: UnboundedReceiver<Notice>) -> bool {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return false,
            notice = notices.recv() => match notice {
                Some(notice) => {
                    eprintln!("{}", notice);
                    match notice.level {
                        NoticeLevel::Success => return true,
                        NoticeLevel::Error => return false,
                        NoticeLevel::Info => {}
                    }
                }
                None => return false,
            },
        }
    }
}

fn print_markers(map: &MapView, format: &str) -> anyhow::Result<()> {
    let markers = map.markers();

    if format == "json" {
        let data: Vec<serde_json::Value> = markers
            .iter()
            .map(|m| {
                serde_json::json!({
                    "id": m.id,
                    "lat": m.position.lat,
                    "lng": m.position.lng,
                    "popup": m.content.popup,
                })
            })
            .collect();
        println!("{}", serde_json::to_string(&data)?);
        return Ok(());
    }

    println!("{} buses", markers.len());
    println!("{:<14} {:>10} {:>10}  INFO", "BUS", "LAT", "LNG");
    println!("{}", "-".repeat(60));
    for marker in markers {
        let summary = marker.content.popup.lines().next().unwrap_or_default();
        println!(
            "{:<14} {:>10.5} {:>10.5}  {}",
            marker.id, marker.position.lat, marker.position.lng, summary
        );
    }
    println!();
    Ok(())
}
