mod db;
mod search;
mod seed;

use clap::{Parser, Subcommand, ValueEnum};
use spaces_core::ResultOrder;
use tracing_subscriber::EnvFilter;

use crate::db::DbCommands;

#[derive(Debug, Parser)]
#[command(name = "spaces-cli")]
#[command(about = "Location-based message store command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Overrides for the configured search band and stopping thresholds.
#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct BandArgs {
    /// Fewest acceptable results
    #[arg(long)]
    too_few: Option<u64>,
    /// Most acceptable results
    #[arg(long)]
    too_many: Option<u64>,
    /// Stop when the √distance interval is narrower than this
    #[arg(long)]
    absolute_width: Option<f64>,
    /// Stop when the interval width is below this percentage of its midpoint
    #[arg(long)]
    relative_width_percent: Option<f64>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Find the radius around a point that yields an acceptable result count
    Radius {
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,
        #[command(flatten)]
        band: BandArgs,
    },
    /// List messages near a point
    Query {
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,
        /// Search distance in metres; omit to pick one automatically
        #[arg(long)]
        distance: Option<f64>,
        /// Maximum number of messages to print
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        limit: Option<u32>,
        #[arg(long, value_enum, default_value_t = OrderArg::Nearest)]
        order: OrderArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OrderArg {
    /// Closest to the point first
    Nearest,
    /// Newest first
    Recent,
}

impl From<OrderArg> for ResultOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Nearest => Self::Nearest,
            OrderArg::Recent => Self::Recent,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("spaces-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = spaces_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = spaces_db::PoolConfig::from_app_config(&config);
    let pool = spaces_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => db::run(&pool, command).await?,
        Commands::Radius {
            latitude,
            longitude,
            band,
        } => search::run_radius(pool, &config, latitude, longitude, &band).await?,
        Commands::Query {
            latitude,
            longitude,
            distance,
            limit,
            order,
        } => {
            let options = search::QueryOptions {
                distance,
                limit,
                order: order.into(),
            };
            search::run_query(pool, &config, latitude, longitude, options).await?;
        }
    }

    Ok(())
}
