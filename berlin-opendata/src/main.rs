use std::process::ExitCode;

use clap::{Parser, Subcommand};

use berlin_opendata::params::{AnalyzeParams, CategoryParams, DatasetParams, SearchParams, TagParams};
use berlin_opendata::{ColorHelper, ColorMode, Explorer, OpenDataConfig};

/// Explore the Berlin open data catalog (daten.berlin.de) from the terminal
#[derive(Debug, Parser)]
#[command(name = "berlin-opendata", version, about)]
struct Cli {
    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,

    /// CKAN action API root (defaults to BERLIN_CKAN_BASE_URL or the Berlin registry)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search datasets (Solr syntax supported)
    Search {
        /// Search terms
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Restrict to a category id
        #[arg(short, long)]
        category: Option<String>,
        /// Restrict to a tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Restrict to a resource format, e.g. CSV
        #[arg(short, long)]
        format: Option<String>,
        /// Sort expression, e.g. "metadata_modified desc"
        #[arg(long)]
        sort: Option<String>,
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Show full metadata and download links of a dataset
    #[command(alias = "describe")]
    Show {
        /// Dataset id or name
        dataset_id: String,
    },
    /// List the categories, or show one category's datasets
    Categories {
        /// Category id
        category: Option<String>,
    },
    /// List tags
    Tags {
        /// Only tags starting with this prefix
        prefix: Option<String>,
        #[arg(short, long, default_value_t = 30)]
        limit: u32,
    },
    /// Rank datasets by relevance and report freshness and formats
    Analyze {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Number of candidates to analyze
        #[arg(short, long, default_value_t = 5)]
        max: u32,
        /// Omit the per-resource listing
        #[arg(long)]
        no_structure: bool,
        /// Omit freshness information
        #[arg(long)]
        no_freshness: bool,
    },
    /// Catalog-wide statistics
    Stats,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let colors = ColorHelper::new(cli.color);

    match run(cli).await {
        Ok(output) => {
            println!("{}", colors.markdown(&output));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{} {:#}", colors.error("Error:"), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let mut config = OpenDataConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout(timeout);
    }
    let explorer = Explorer::with_config(config);

    let output = match cli.command {
        Command::Search {
            query,
            category,
            tag,
            format,
            sort,
            limit,
            offset,
        } => {
            let params = SearchParams {
                query: query.join(" "),
                category,
                tag,
                format,
                sort,
                limit,
                offset,
            };
            explorer.search_datasets(&params).await?
        }
        Command::Show { dataset_id } => {
            explorer
                .get_dataset_details(&DatasetParams { dataset_id })
                .await?
        }
        Command::Categories { category } => {
            explorer
                .list_categories(&CategoryParams { category })
                .await?
        }
        Command::Tags { prefix, limit } => explorer.list_tags(&TagParams { prefix, limit }).await?,
        Command::Analyze {
            query,
            max,
            no_structure,
            no_freshness,
        } => {
            let params = AnalyzeParams {
                query: query.join(" "),
                max_datasets: max,
                include_structure: !no_structure,
                include_freshness: !no_freshness,
            };
            explorer.analyze_datasets(&params).await?
        }
        Command::Stats => explorer.catalog_stats().await?,
    };

    Ok(output)
}
