use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use jiff::civil::Time;
use tracing::info;

use courier_route::config::PlannerConfig;
use courier_route::directions::DirectionsClient;
use courier_route::nominatim::NominatimClient;
use courier_route::osrm::OsrmClient;
use courier_route::planner::{DeliveryAddress, PlanRequest, PlannedRoute, RoutePlanner};
use courier_route::solver::SolveOptions;
use courier_route::traffic::TrafficMonitor;
use courier_route::{Coordinate, RouteResult};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Geocode addresses, optimize the visiting order and print the route as JSON
    Plan {
        /// Delivery address (repeatable)
        #[arg(short, long = "address")]
        addresses: Vec<String>,

        /// JSON plan request; addresses given with --address are appended
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Live position as "lon,lat"; becomes the pinned origin
        #[arg(long, value_parser = parse_coordinate)]
        from: Option<Coordinate>,

        /// Departure time, e.g. "08:30"
        #[arg(long, value_parser = parse_time)]
        departure: Option<Time>,

        #[arg(long)]
        no_traffic: bool,

        /// Write the planned route here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Re-evaluate a saved route without reordering it
    Reload {
        route: PathBuf,

        #[arg(long)]
        no_traffic: bool,
    },
    /// Check a saved route for traffic changes and update the file in place
    Recheck {
        route: PathBuf,

        /// Check even if the route is still fresh
        #[arg(short, long)]
        force: bool,
    },
}

fn parse_coordinate(value: &str) -> Result<Coordinate, String> {
    let (lon, lat) = value
        .split_once(',')
        .ok_or_else(|| format!("expected \"lon,lat\", got {value:?}"))?;
    let parse = |part: &str| part.trim().parse::<f64>().map_err(|err| err.to_string());
    let coordinate = Coordinate::new(parse(lon)?, parse(lat)?);
    if coordinate.is_valid() {
        Ok(coordinate)
    } else {
        Err(format!("coordinate out of range: {value}"))
    }
}

fn parse_time(value: &str) -> Result<Time, String> {
    Time::strptime("%H:%M", value).map_err(|err| err.to_string())
}

fn read_route(path: &PathBuf) -> anyhow::Result<PlannedRoute> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: serde::Serialize>(value: &T, output: Option<&PathBuf>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => fs::write(path, json).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Logs the route's traffic summary and every segment slower than free flow.
fn log_traffic(route: &RouteResult) {
    let Some(traffic) = route.traffic.as_ref() else {
        return;
    };
    info!(delay = %traffic.delay_text, "traffic");
    for condition in traffic
        .conditions
        .iter()
        .filter(|condition| condition.level.severity() > 0)
    {
        info!(
            segment = condition.segment,
            level = ?condition.level,
            color = condition.level.color(),
            delay_s = condition.delay_s.round(),
            "slow segment"
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let config = PlannerConfig::from_env();
    let osrm = OsrmClient::new(config.osrm.clone())?;

    match cli.command {
        Commands::Plan {
            addresses,
            input,
            from,
            departure,
            no_traffic,
            output,
        } => {
            let mut request = match input {
                Some(path) => {
                    let raw = fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    serde_json::from_str(&raw)
                        .with_context(|| format!("parsing {}", path.display()))?
                }
                None => PlanRequest {
                    current_location: None,
                    addresses: Vec::new(),
                    include_traffic: true,
                    departure: None,
                },
            };
            request
                .addresses
                .extend(addresses.into_iter().map(DeliveryAddress::new));
            request.current_location = from.or(request.current_location);
            request.departure = departure.or(request.departure);
            request.include_traffic &= !no_traffic;

            let geocoder = NominatimClient::new(config.nominatim.clone())?;
            let planner = RoutePlanner::new(geocoder, &osrm, &osrm, SolveOptions::default());

            let planned = planner.plan(request).map_err(|err| {
                anyhow::anyhow!("{} ({err})", err.user_message())
            })?;
            info!(
                duration = %planned.route.total_duration_text,
                distance_km = planned.route.total_distance_km(),
                "route ready"
            );
            log_traffic(&planned.route);
            write_json(&planned, output.as_ref())?;
        }
        Commands::Reload { route, no_traffic } => {
            let saved = read_route(&route)?;
            let geocoder = NominatimClient::new(config.nominatim.clone())?;
            let planner = RoutePlanner::new(geocoder, &osrm, &osrm, SolveOptions::default());
            let reloaded = planner.reload(saved.stops, !no_traffic)?;
            log_traffic(&reloaded.route);
            write_json(&reloaded, None)?;
        }
        Commands::Recheck { route, force } => {
            let mut saved = read_route(&route)?;
            let monitor = TrafficMonitor::new(DirectionsClient::new(&osrm), config.traffic.clone());
            let assessment = monitor.check_now(&mut saved.route, force)?;
            info!(needs_update = assessment.needs_update, reason = %assessment.reason, "traffic check");
            if assessment.needs_update {
                log_traffic(&saved.route);
            }
            write_json(&saved, Some(&route))?;
            write_json(&assessment, None)?;
        }
    }

    Ok(())
}
