//! `db` subcommands: schema, health and test data.

use clap::Subcommand;
use spaces_db::{
    count_messages, delete_all_messages, health_check, insert_messages, run_migrations,
};

use crate::seed::{random_messages, DEFAULT_SEED_COUNT};

#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Delete every message
    Reset,
    /// Insert randomly placed messages
    Seed {
        /// Number of messages to create
        #[arg(long, default_value_t = DEFAULT_SEED_COUNT)]
        count: usize,
        /// Delete existing messages first
        #[arg(long)]
        reset: bool,
        /// Fixed RNG seed for reproducible placement
        #[arg(long)]
        rng_seed: Option<u64>,
    },
}

/// # Errors
///
/// Returns an error if any database operation fails.
pub(crate) async fn run(pool: &sqlx::PgPool, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            health_check(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Reset => {
            let deleted = delete_all_messages(pool).await?;
            println!("deleted {deleted} message(s)");
        }
        DbCommands::Seed {
            count,
            reset,
            rng_seed,
        } => {
            if reset {
                let deleted = delete_all_messages(pool).await?;
                tracing::info!(deleted, "existing messages removed");
            }
            let messages = random_messages(count, rng_seed);
            let ids = insert_messages(pool, &messages).await?;
            let total = count_messages(pool).await?;
            println!("inserted {} message(s); {total} stored", ids.len());
        }
    }
    Ok(())
}
