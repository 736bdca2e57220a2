mod display;
mod shell;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use zuriflat_core::{
    DashboardConfig, FilterPatch, ListingId, ListingsQuery, SessionId, SortOrder,
};
use zuriflat_host::{Dashboard, Panel, ViewEvent};
use zuriflat_sync::{HttpApi, ListingApi, MemoryApi};

#[derive(Parser)]
#[command(name = "zuriflat", version, about = "Explore and rate Zurich short-term rentals")]
struct Cli {
    /// Base URL of the listing service
    #[arg(long, env = "ZURIFLAT_BACKEND_URL", default_value = "http://localhost:8000")]
    backend_url: String,

    /// Serve from a local JSON listing file instead of the listing service
    #[arg(long, env = "ZURIFLAT_FIXTURES")]
    fixtures: Option<PathBuf>,

    /// Reuse an existing rating session
    #[arg(long, env = "ZURIFLAT_SESSION")]
    session: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse filtered listings
    Listings {
        #[arg(long)]
        price_min: Option<f64>,
        #[arg(long)]
        price_max: Option<f64>,
        #[arg(long)]
        distance_max: Option<f64>,
        /// Repeatable; e.g. --room-type "Private room"
        #[arg(long = "room-type")]
        room_types: Vec<String>,
        /// Repeatable
        #[arg(long = "neighbourhood")]
        neighbourhoods: Vec<String>,
        #[arg(long)]
        min_reviews: Option<u32>,
        #[arg(long)]
        availability_min: Option<u32>,
        /// Numeric attribute to sort by
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(long)]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show the ranked recommendations for the session
    Recommend,
    /// Rate a listing from 1 to 5
    Rate { id: String, rating: u8 },
    /// Explain predicted scores (defaults to the top recommendations)
    Explain { ids: Vec<String> },
    /// Show one listing in full
    Detail { id: String },
    /// Show the calibration sample to rate first
    Sample,
    /// Interactive session
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("zuriflat v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = DashboardConfig {
        request_timeout: Duration::from_secs(cli.timeout),
        ..DashboardConfig::default()
    }
    .with_backend_url(&cli.backend_url);
    let session = cli
        .session
        .as_deref()
        .map(SessionId::from)
        .unwrap_or_else(SessionId::generate);

    match &cli.fixtures {
        Some(path) => {
            let api = load_fixtures(path)?;
            run(Dashboard::with_session(config, api, session), cli.command).await
        }
        None => {
            let api = Arc::new(HttpApi::new(&config)?);
            run(Dashboard::with_session(config, api, session), cli.command).await
        }
    }
}

fn load_fixtures(path: &Path) -> Result<Arc<MemoryApi>> {
    let api = MemoryApi::from_json_file(path)?;
    anyhow::ensure!(!api.is_empty(), "fixtures {} contain no listings", path.display());
    Ok(Arc::new(api))
}

/// Turn a panel into its value, or an error naming the view.
fn ready<T>(panel: Panel<T>, view: &str) -> Result<Option<T>> {
    match panel {
        Panel::Ready(v) => Ok(Some(v)),
        Panel::Disabled => Ok(None),
        Panel::Failed(err) => Err(err).with_context(|| format!("failed to load {view}")),
    }
}

fn filter_patch(
    price_min: Option<f64>,
    price_max: Option<f64>,
    distance_max: Option<f64>,
    room_types: Vec<String>,
    neighbourhoods: Vec<String>,
    min_reviews: Option<u32>,
    availability_min: Option<u32>,
) -> FilterPatch {
    FilterPatch {
        price_min: Some(price_min),
        price_max: Some(price_max),
        distance_max: Some(distance_max),
        room_types: Some(room_types.into_iter().collect()),
        neighbourhoods: Some(neighbourhoods.into_iter().collect()),
        min_reviews: Some(min_reviews),
        availability_min: Some(availability_min),
    }
}

async fn run<A: ListingApi + 'static>(mut dashboard: Dashboard<A>, command: Commands) -> Result<()> {
    match command {
        Commands::Listings {
            price_min,
            price_max,
            distance_max,
            room_types,
            neighbourhoods,
            min_reviews,
            availability_min,
            sort_by,
            desc,
            page,
            limit,
        } => {
            dashboard.dispatch(ViewEvent::UpdateFilter(filter_patch(
                price_min,
                price_max,
                distance_max,
                room_types,
                neighbourhoods,
                min_reviews,
                availability_min,
            )));
            let mut query: ListingsQuery = dashboard.state().listings_query();
            query.page = page.max(1);
            if let Some(limit) = limit {
                query.limit = limit;
            }
            if let Some(field) = sort_by {
                query.sort_by = Some(field);
                query.sort_order = Some(if desc { SortOrder::Desc } else { SortOrder::Asc });
            }
            let listings = dashboard
                .queries()
                .listings(&query)
                .await
                .context("failed to load listings")?;
            print!("{}", display::render_listings(&listings));
        }
        Commands::Recommend => {
            if let Some(list) = ready(dashboard.ranked_list().await, "recommendations")? {
                print!("{}", display::render_ranked(&list));
            }
        }
        Commands::Rate { id, rating } => {
            let ack = dashboard.rate(&ListingId::from(id.as_str()), rating).await?;
            println!("{}", display::render_ack(&ack));
            println!("session {}", dashboard.session());
        }
        Commands::Explain { ids } => {
            if ids.is_empty() {
                // Explanations default to the top recommendations.
                ready(dashboard.ranked_list().await, "recommendations")?;
            } else {
                dashboard.dispatch(ViewEvent::SetSelection(
                    ids.iter().map(|id| ListingId::from(id.as_str())).collect(),
                ));
            }
            match ready(dashboard.contributions().await, "explanations")? {
                Some(view) => print!("{}", display::render_contributions(&view)),
                None => println!("nothing to explain"),
            }
        }
        Commands::Detail { id } => {
            dashboard.dispatch(ViewEvent::OpenDetail(ListingId::from(id.as_str())));
            match ready(dashboard.detail().await, "listing")? {
                Some(view) => print!("{}", display::render_detail(&view)),
                None => anyhow::bail!("no listing id given"),
            }
        }
        Commands::Sample => {
            if let Some(view) = ready(dashboard.calibration().await, "calibration sample")? {
                print!("{}", display::render_calibration(&view));
            }
        }
        Commands::Shell => shell::run(&mut dashboard).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn cli_parses_listing_filters() {
        let cli = Cli::try_parse_from([
            "zuriflat",
            "--fixtures",
            "listings.json",
            "listings",
            "--price-max",
            "150",
            "--room-type",
            "Private room",
            "--room-type",
            "Entire home/apt",
            "--sort-by",
            "price",
            "--desc",
        ])
        .unwrap();
        assert_eq!(cli.fixtures, Some(PathBuf::from("listings.json")));
        let Commands::Listings {
            price_max,
            room_types,
            sort_by,
            desc,
            page,
            ..
        } = cli.command
        else {
            panic!("expected listings");
        };
        assert_eq!(price_max, Some(150.0));
        assert_eq!(room_types.len(), 2);
        assert_eq!(sort_by.as_deref(), Some("price"));
        assert!(desc);
        assert_eq!(page, 1);
    }

    #[test]
    fn rate_takes_id_and_value() {
        let cli = Cli::try_parse_from(["zuriflat", "rate", "42", "4"]).unwrap();
        assert!(matches!(cli.command, Commands::Rate { ref id, rating: 4 } if id == "42"));
        assert!(Cli::try_parse_from(["zuriflat", "rate", "42", "high"]).is_err());
    }

    #[test]
    fn unset_flags_clear_every_filter_field() {
        let patch = filter_patch(None, Some(100.0), None, vec![], vec!["Seefeld".into()], None, None);
        assert_eq!(patch.price_min, Some(None));
        assert_eq!(patch.price_max, Some(Some(100.0)));
        assert_eq!(patch.room_types, Some(Default::default()));
        assert_eq!(patch.neighbourhoods.map(|n| n.len()), Some(1));
    }

    #[test]
    fn fixtures_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"apartments": [{{"id": "7", "name": "Loft", "price": 120.0}}]}}"#
        )
        .unwrap();
        let api = load_fixtures(file.path()).unwrap();
        assert_eq!(api.len(), 1);

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        write!(empty, "[]").unwrap();
        assert!(load_fixtures(empty.path()).is_err());
    }

    #[tokio::test]
    async fn rate_command_runs_against_fixtures() {
        let api = Arc::new(MemoryApi::new(zuriflat_sync::memory::sample_listings()));
        let dashboard =
            Dashboard::with_session(DashboardConfig::default(), Arc::clone(&api), "s1".into());
        run(
            dashboard,
            Commands::Rate {
                id: "3".into(),
                rating: 5,
            },
        )
        .await
        .unwrap();

        let dashboard =
            Dashboard::with_session(DashboardConfig::default(), Arc::clone(&api), "s1".into());
        let err = run(
            dashboard,
            Commands::Rate {
                id: "3".into(),
                rating: 9,
            },
        )
        .await;
        assert!(err.is_err());
    }
}
