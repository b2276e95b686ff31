//! Comment Sentry
//!
//! Continuous-lifecycle backend for the gambling-comment classifier:
//! feedback collection, retraining, versioned deploys with rollback, and
//! hot-swapped serving.

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use database::{create_pool, run_migrations};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;

/// Comment moderation model lifecycle
#[derive(Parser)]
#[command(name = "comment-sentry")]
#[command(about = "Model lifecycle backend for gambling-comment moderation")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,

    /// Trigger a retraining run
    Retrain {
        /// Consult the unused-feedback threshold before running, as the
        /// periodic scheduler does
        #[arg(long)]
        auto: bool,
    },

    /// Roll back to a previously deployed model version
    Rollback {
        /// ID of the model version to reactivate
        version_id: Uuid,
    },

    /// Classify one or more comments with the active model
    Predict {
        /// Comment text(s) to classify
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// List recent model versions
    Versions {
        /// Maximum number of versions to show
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Show the metrics history and improvement summary
    Trend {
        /// Number of versions in the window
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },

    /// Preview the data the next retraining run would use
    Preview,

    /// Show feedback statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let pool = create_pool(&config.database_url).await?;

    match cli.command {
        Commands::Migrate => {
            run_migrations(&pool).await?;
            info!("Migrations completed successfully");
        }
        Commands::Retrain { auto } => {
            commands::retrain::run(&config, &pool, auto).await?;
        }
        Commands::Rollback { version_id } => {
            commands::rollback::run(&config, &pool, version_id).await?;
        }
        Commands::Predict { text } => {
            commands::predict::run(&config, &text).await?;
        }
        Commands::Versions { limit } => {
            commands::versions::run(&config, &pool, limit).await?;
        }
        Commands::Trend { limit } => {
            commands::trend::run(&config, &pool, limit).await?;
        }
        Commands::Preview => {
            commands::preview::run(&config, &pool).await?;
        }
        Commands::Stats => {
            commands::stats::run(&config, &pool).await?;
        }
    }

    Ok(())
}
