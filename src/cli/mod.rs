pub mod app;
pub mod commands;
pub mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;
use std::time::Duration;
use taxwatch::{ApiConfig, Priority, TaxWatch, WeekId};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Client for the tax-regulation monitoring service.
///
/// Without a subcommand, opens the terminal dashboard.
#[derive(Debug, Parser)]
#[command(name = "taxwatch", version, about)]
pub struct Cli {
    /// Base URL of the API (overrides TAXWATCH_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Request timeout in seconds (overrides TAXWATCH_TIMEOUT_SECS)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Items per page (overrides TAXWATCH_PAGE_SIZE)
    #[arg(long, global = true)]
    pub page_size: Option<NonZeroUsize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the terminal dashboard
    Dashboard {
        /// ISO week to show, e.g. 2024-W05 (default: current week)
        #[arg(long)]
        week: Option<WeekId>,
    },
    /// List one page of news
    News {
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// HIGH, MEDIUM or LOW
        #[arg(long)]
        priority: Option<Priority>,
    },
    /// Show one news article
    Article { id: String },
    /// List one page of weekly document analyses
    Analyses {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        week: Option<WeekId>,
    },
    /// Show one analysis with its provision changes
    Analysis { id: String },
    /// Weekly statistics
    Stats {
        #[arg(long)]
        week: Option<WeekId>,
    },
    /// News posting statistics
    NewsStats,
    /// Recent crawler runs
    History,
    /// Run the document crawler
    Crawl,
    /// Crawl news sources
    CrawlNews,
    /// Post the next batch of news
    PostNews,
}

impl Cli {
    pub fn config(&self) -> Result<ApiConfig> {
        let mut config = ApiConfig::from_env().context("invalid TAXWATCH_* environment")?;
        if let Some(url) = &self.api_url {
            config = config.base_url(url);
        }
        if let Some(secs) = self.timeout {
            config = config.request_timeout(Duration::from_secs(secs));
        }
        if let Some(size) = self.page_size {
            config = config.page_size(size);
        }
        config.validate().context("invalid command line options")?;
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config()?;
        let watch = TaxWatch::connect_with_config(config)
            .context("failed to set up the API client")?;

        match self.command {
            None => app::App::new(watch, None).run().await,
            Some(Command::Dashboard { week }) => app::App::new(watch, week).run().await,
            Some(command) => {
                // The dashboard owns the terminal; only one-shot commands log.
                init_tracing();
                commands::run(&watch, command).await
            }
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taxwatch=warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
