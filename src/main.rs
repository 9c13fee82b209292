//! # Convo Inspector CLI (`convo`)
//!
//! The `convo` binary initializes the database, imports snapshots, lists
//! and inspects conversations, and starts the dashboard HTTP server.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `convo init` | Create the SQLite database and run schema migrations |
//! | `convo import <file>` | Load a JSON snapshot into the database |
//! | `convo stats` | Show row counts |
//! | `convo conversations` | Search conversations by engagement or participant |
//! | `convo show <uuid>` | Show a conversation's engagement linkage and roster |
//! | `convo messages <uuid>` | Show messages and mentor response time |
//! | `convo serve` | Start the dashboard HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! convo init --config ./config/convo.toml
//! convo import ./snapshot.json
//! convo conversations --engagement robotics
//! convo conversations --participant alice@example.org --json
//! convo messages 3f0c6e8a-5b1e-4c1f-9d55-0a7b8f0f2c11
//! convo serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use convo_inspector::{config, conversations, import, inspect, migrate, server, stats};

/// Convo Inspector: a read-only dashboard for mentor, student, and
/// guardian chat conversations.
#[derive(Parser)]
#[command(
    name = "convo",
    about = "Convo Inspector: a read-only dashboard for mentor, student, and guardian chat conversations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/convo.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Import a JSON snapshot of users, engagements, conversations, and messages.
    Import {
        /// Path to the snapshot file.
        file: PathBuf,
    },

    /// Show database row counts.
    Stats,

    /// Search conversations.
    ///
    /// Every conversation is annotated with its engagement before filtering,
    /// so `--engagement` matches direct chats as well as group chats.
    Conversations {
        /// Engagement UUID (or prefix) or title substring.
        #[arg(long)]
        engagement: Option<String>,

        /// Participant UUID (or prefix), name, or email substring.
        #[arg(long)]
        participant: Option<String>,

        /// Maximum number of conversations to list.
        #[arg(long)]
        limit: Option<usize>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show a conversation's engagement linkage and roster.
    Show {
        /// Conversation UUID.
        uuid: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show a conversation's messages and mentor response time.
    Messages {
        /// Conversation UUID.
        uuid: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Start the dashboard HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("convo_inspector=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { file } => {
            import::run_import(&cfg, &file).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Conversations {
            engagement,
            participant,
            limit,
            json,
        } => {
            conversations::run_conversations(&cfg, engagement, participant, limit, json).await?;
        }
        Commands::Show { uuid, json } => {
            inspect::run_show(&cfg, &uuid, json).await?;
        }
        Commands::Messages { uuid, json } => {
            inspect::run_messages(&cfg, &uuid, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
