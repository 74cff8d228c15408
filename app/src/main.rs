#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod command;

use clap::{Parser, Subcommand};
use command::{
    AddInput, AddStrategy, AskInput, AskStrategy, CommandStrategy, DecayStrategy, DeleteStrategy,
    InfoStrategy, InitStrategy, ListInput, MatchInput, MatchStrategy, PatternsStrategy,
    PatternsView, ReinforceInput, ReinforceStrategy, SearchInput, ShowStrategy, StatsStrategy,
    VersionStrategy,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "reflexrs")]
#[command(about = "Reflex memory: stored trigger/response patterns with AI fallback", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,
    /// Show version
    Version,
    /// Show configuration and store status
    Info,
    /// Teach a new pattern
    Add {
        trigger: String,
        response: String,
        #[arg(long)]
        project: Option<String>,
        /// Tag to attach; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        space: Option<String>,
        /// Starting strength (0-100)
        #[arg(long)]
        strength: Option<f64>,
        /// Strength needed to auto-fire (0-100)
        #[arg(long)]
        threshold: Option<f64>,
        /// Fraction of strength lost per day (0-1)
        #[arg(long)]
        decay_rate: Option<f64>,
    },
    /// Show one pattern
    Show { id: String },
    /// List patterns, most recently touched first
    List {
        #[arg(long)]
        space: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        min_strength: Option<f64>,
        #[arg(short, long, default_value_t = 20)]
        limit: u64,
        #[arg(long)]
        offset: Option<u64>,
    },
    /// Substring search over triggers and responses
    Search {
        query: String,
        #[arg(long)]
        space: Option<String>,
        #[arg(short, long)]
        limit: Option<u64>,
    },
    /// Soft-delete one or more patterns
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Reinforce a pattern
    Reinforce {
        id: String,
        /// Defaults to the configured reinforce amount
        #[arg(short, long)]
        amount: Option<f64>,
    },
    /// Apply time-based decay to every decay-enabled pattern
    Decay {
        #[arg(long, default_value_t = 24.0)]
        hours: f64,
    },
    /// Strongest patterns
    Top {
        #[arg(short, long, default_value_t = 10)]
        limit: u64,
    },
    /// Most recently fired patterns
    Recent {
        #[arg(short, long, default_value_t = 10)]
        limit: u64,
    },
    /// Rank stored patterns against text without changing anything
    Match {
        text: String,
        #[arg(short, long)]
        threshold: Option<f64>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Answer from reflexes, falling back to the AI provider
    Ask {
        /// Single message to send
        #[arg(short = 'm', long)]
        message: Option<String>,

        /// Model to use
        #[arg(short = 'M', long)]
        model: Option<String>,
    },
    /// Pattern totals and store counters
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Add {
            trigger,
            response,
            project,
            tags,
            space,
            strength,
            threshold,
            decay_rate,
        } => {
            AddStrategy
                .execute(AddInput {
                    trigger,
                    response,
                    project,
                    tags,
                    space,
                    strength,
                    threshold,
                    decay_rate,
                })
                .await
        }
        Commands::Show { id } => ShowStrategy.execute(id).await,
        Commands::List {
            space,
            project,
            min_strength,
            limit,
            offset,
        } => {
            PatternsStrategy
                .execute(PatternsView::List(ListInput {
                    space,
                    project,
                    min_strength,
                    limit,
                    offset,
                }))
                .await
        }
        Commands::Search {
            query,
            space,
            limit,
        } => {
            PatternsStrategy
                .execute(PatternsView::Search(SearchInput {
                    query,
                    space,
                    limit,
                }))
                .await
        }
        Commands::Delete { ids } => DeleteStrategy.execute(ids).await,
        Commands::Reinforce { id, amount } => {
            ReinforceStrategy
                .execute(ReinforceInput { id, amount })
                .await
        }
        Commands::Decay { hours } => DecayStrategy.execute(hours).await,
        Commands::Top { limit } => PatternsStrategy.execute(PatternsView::Top(limit)).await,
        Commands::Recent { limit } => {
            PatternsStrategy
                .execute(PatternsView::Recent(limit))
                .await
        }
        Commands::Match {
            text,
            threshold,
            limit,
        } => {
            MatchStrategy
                .execute(MatchInput {
                    text,
                    threshold,
                    limit,
                })
                .await
        }
        Commands::Ask { message, model } => AskStrategy.execute(AskInput { message, model }).await,
        Commands::Stats => StatsStrategy.execute(()).await,
    }
}
