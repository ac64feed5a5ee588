use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use clusterboard::backend::error;
use clusterboard::cli::{self, OutputFormat};
use clusterboard::dashboard::TableQuery;
use clusterboard::{config, web};

#[derive(Debug, Parser)]
#[command(name = "clusterboard")]
#[command(about = "Operator dashboard for FAQ message clusters")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the filtered, sorted, paged cluster table
    Clusters(ClustersArgs),
    /// Show coverage, sentiment and resolution summaries
    Stats {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show topics without FAQ coverage and the backend's process gaps
    Gaps {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show daily message sentiment
    Timeline {
        /// Split each day per message author
        #[arg(long)]
        by_author: bool,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show suggested FAQ entries
    Suggestions {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show this week's trending keywords
    Leaderboard {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show weekly FAQ deflection
    Deflection {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show the authenticated backend user
    Whoami,
    /// Rerun the clustering pipeline (admin only)
    Trigger,
    /// Serve the web dashboard
    Web {
        /// Listen address (default: web.addr from config)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Check config, backend reachability and recent fetch health
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Cluster filters shared by the table and the summaries.
#[derive(Debug, Args)]
struct FilterArgs {
    /// Only this sentiment: positive, neutral, negative
    #[arg(long)]
    sentiment: Option<String>,
    /// Only this coverage: fully, partially, not
    #[arg(long)]
    coverage: Option<String>,
    /// Keyword that must appear in the cluster's keyword list
    #[arg(long)]
    keyword: Option<String>,
    /// Minimum resolution score (0-5)
    #[arg(long)]
    min_score: Option<u8>,
    /// Earliest creation date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,
    /// Latest creation date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,
    /// Case-insensitive search in the top message
    #[arg(long)]
    search: Option<String>,
}

impl FilterArgs {
    fn query(&self) -> TableQuery {
        TableQuery {
            sentiment: self.sentiment.clone(),
            coverage: self.coverage.clone(),
            keyword: self.keyword.clone(),
            min_score: self.min_score,
            date_from: self.from.clone(),
            date_to: self.to.clone(),
            search: self.search.clone(),
            ..TableQuery::default()
        }
    }
}

#[derive(Debug, Args)]
struct ClustersArgs {
    #[command(flatten)]
    filters: FilterArgs,
    /// Sort column, e.g. message-count, resolution-score, created-at
    #[arg(long)]
    sort: Option<String>,
    /// Sort order: asc or desc
    #[arg(long)]
    order: Option<String>,
    /// Page to show (1-based)
    #[arg(long)]
    page: Option<usize>,
    /// Cluster id to select; jumps to the page that shows it
    #[arg(long)]
    select: Option<String>,
    /// Output format: table (default), json, csv
    #[arg(long, default_value = "table")]
    format: String,
}

impl ClustersArgs {
    fn query(&self) -> TableQuery {
        TableQuery {
            sort: self.sort.clone(),
            order: self.order.clone(),
            page: self.page,
            select: self.select.clone(),
            ..self.filters.query()
        }
    }
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config to ~/.clusterboard/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Set a value, e.g. `backend.base_url http://localhost:8000`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() {
    let app = App::parse();

    if let Err(err) = run(app) {
        report(&err);
        std::process::exit(1);
    }
}

fn run(app: App) -> Result<()> {
    let fmt = |format: &str| OutputFormat::from_str_opt(Some(format));

    match app.command {
        Commands::Clusters(args) => cli::run_clusters(&args.query(), fmt(&args.format)),
        Commands::Stats { filters, format } => cli::run_stats(&filters.query(), fmt(&format)),
        Commands::Gaps { format } => cli::run_gaps(fmt(&format)),
        Commands::Timeline { by_author, format } => cli::run_timeline(by_author, fmt(&format)),
        Commands::Suggestions { format } => cli::run_suggestions(fmt(&format)),
        Commands::Leaderboard { format } => cli::run_leaderboard(fmt(&format)),
        Commands::Deflection { format } => cli::run_deflection(fmt(&format)),
        Commands::Whoami => cli::run_whoami(),
        Commands::Trigger => cli::run_trigger(),
        Commands::Web { addr } => {
            let cfg = config::load();
            web::serve(&cfg, addr.as_deref())
        }
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}

fn report(err: &anyhow::Error) {
    if let Some(url) = error::login_url(err) {
        eprintln!("{} not logged in to the backend", "error:".red().bold());
        eprintln!("  Log in at {} and set backend.api_token", url.cyan());
    } else if error::is_forbidden(err) {
        eprintln!("{} {err}", "error:".red().bold());
        eprintln!("  {}", "Ask an administrator to run this for you.".dimmed());
    } else {
        eprintln!("{} {err:#}", "error:".red().bold());
    }
}
