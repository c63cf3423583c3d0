use anyhow::Result;
use clap::{Parser, Subcommand};
use filemeta_cli::commands::{self, UpdateArgs};
use filemeta_core::config;
use filemeta_core::MetadataStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    let pool = storage::connect(&cfg.database.path).await?;
    storage::migrate(&pool).await?;
    let store =
        MetadataStore::new(pool).with_default_created_by(cfg.identity.default_created_by.clone());
    let default_owner = cfg.identity.default_owner.clone();

    let out = match cli.command {
        Commands::Init => format!("Database ready at {}", cfg.database.path),
        Commands::Add {
            filepath,
            tags,
            owner,
            created_by,
        } => {
            commands::add(
                &store,
                &filepath,
                &tags,
                owner.or(default_owner),
                created_by,
            )
            .await?
        }
        Commands::Get { id, json } => commands::get(&store, id, json).await?,
        Commands::List { owner, json } => commands::list(&store, owner.as_deref(), json).await?,
        Commands::Search {
            keywords,
            owner,
            full,
            json,
        } => commands::search(&store, &keywords, owner.as_deref(), full, json).await?,
        Commands::Update {
            id,
            tags,
            remove,
            path,
            overwrite,
        } => {
            commands::update(
                &store,
                id,
                UpdateArgs {
                    tags,
                    remove,
                    path,
                    overwrite,
                },
            )
            .await?
        }
        Commands::Delete { id } => commands::delete(&store, id).await?,
        Commands::Export { output } => commands::export(&store, &output).await?,
    };
    println!("{}", out);
    Ok(())
}

#[derive(Parser)]
#[command(name = "filemeta")]
#[command(about = "Attach typed metadata tags to files and search them", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and schema if they do not exist
    Init,
    /// Register a file with optional tags
    Add {
        /// Path of the file to register
        filepath: String,
        /// Custom tag as KEY=VALUE (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Owner recorded for the file; defaults to the OS owner
        #[arg(long)]
        owner: Option<String>,
        /// Who created the record
        #[arg(long)]
        created_by: Option<String>,
    },
    /// Show every field of one file record
    Get {
        id: i64,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List all file records
    List {
        /// Only files with this owner
        #[arg(long)]
        owner: Option<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Search names, paths, owners, inferred metadata and tags
    Search {
        /// Keyword to match, case-insensitive (repeatable, OR-combined)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,
        /// Only files with this owner
        #[arg(long)]
        owner: Option<String>,
        /// Print every field of each match
        #[arg(long)]
        full: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Change tags or the recorded path of a file
    Update {
        id: i64,
        /// Tag to add or modify as KEY=VALUE (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Tag key to remove (repeatable)
        #[arg(short, long = "remove-tag")]
        remove: Vec<String>,
        /// New path for the file
        #[arg(short, long)]
        path: Option<String>,
        /// Replace all existing tags with the given ones
        #[arg(long)]
        overwrite: bool,
    },
    /// Delete a file record and its tags
    Delete { id: i64 },
    /// Write all file records to a JSON file
    Export {
        /// Destination path
        output: String,
    },
}
