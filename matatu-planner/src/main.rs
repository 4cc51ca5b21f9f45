use std::error::Error;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use matatu_planner::domain::Point;
use matatu_planner::planner::{PlanOutcome, PlanRequest, Planner, PlannerConfig};
use matatu_planner::repository::InMemoryRepository;
use matatu_planner::walking::{
    CachedRouter, NoRouter, OsrmClient, OsrmConfig, PedestrianRouter, RouteCacheConfig,
};

const USAGE: &str = "usage: matatu-planner <snapshot.json> <lat,lng> <lat,lng> [YYYY-MM-DDTHH:MM]";

fn parse_point(s: &str) -> Result<Point, Box<dyn Error>> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lng but got {s:?}"))?;
    Ok(Point::new(lat.trim().parse()?, lng.trim().parse()?)?)
}

fn load_config() -> Result<PlannerConfig, Box<dyn Error>> {
    match std::env::var_os("PLANNER_CONFIG") {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            info!(path = %PathBuf::from(path).display(), "loaded planner config");
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(PlannerConfig::default()),
    }
}

async fn run<P: PedestrianRouter>(
    repository: &InMemoryRepository,
    router: &P,
    config: &PlannerConfig,
    request: &PlanRequest,
) -> Result<PlanOutcome, Box<dyn Error>> {
    let outcome = Planner::new(repository, router, config).plan(request).await?;
    Ok(outcome)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [snapshot, origin, destination, rest @ ..] = args.as_slice() else {
        return Err(USAGE.into());
    };

    let repository = InMemoryRepository::from_path(snapshot)?;
    let config = load_config()?;

    let mut request = PlanRequest::new(parse_point(origin)?, parse_point(destination)?);
    if let Some(departure) = rest.first() {
        request = request.departing_at(NaiveDateTime::parse_from_str(departure, "%Y-%m-%dT%H:%M")?);
    }
    if let Ok(operators) = std::env::var("PREFERRED_OPERATORS") {
        request = request.preferring(operators.split(',').map(str::trim).filter(|s| !s.is_empty()));
    }

    // Use the pedestrian router if one is configured
    let outcome = match std::env::var("OSRM_URL") {
        Ok(url) => {
            let client = OsrmClient::new(OsrmConfig::new(url))?;
            let router = CachedRouter::new(client, &RouteCacheConfig::default());
            run(&repository, &router, &config, &request).await?
        }
        Err(_) => {
            warn!("OSRM_URL not set, walks use straight-line estimates");
            run(&repository, &NoRouter, &config, &request).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
