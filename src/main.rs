use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use instapaper_bridge::{
    load_config, with_cancellation, BookmarkAction, BridgeConfig, InstapaperClient,
    InstapaperError, ListBookmarks, NewBookmark,
};

#[derive(Parser)]
#[command(name = "instapaper-bridge")]
#[command(about = "Signed command-line access to an Instapaper account", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the authenticated account
    Whoami,
    /// List bookmarks, optionally filtered by title
    List {
        /// Case-insensitive title substring
        #[arg(short, long)]
        query: Option<String>,
        /// unread, starred, archive or a folder id
        #[arg(short, long)]
        folder: Option<String>,
        /// Maximum number of bookmarks (default 100)
        #[arg(short, long)]
        limit: Option<i64>,
    },
    /// Save a URL, or a private note when only content is given
    Add {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        folder_id: Option<i64>,
        /// HTML content
        #[arg(long)]
        content: Option<String>,
        /// Keep the URL as given instead of following redirects
        #[arg(long)]
        no_resolve: bool,
        /// Archive immediately
        #[arg(long)]
        archive: bool,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Print article text for bookmarks
    Text {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    Archive {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    Unarchive {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    Star {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    Unstar {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Move bookmarks into a folder
    Move {
        #[arg(long)]
        folder_id: i64,
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// List folders
    Folders,
    /// Find a folder by exact title (case-insensitive)
    FindFolder { title: String },
    /// Create a folder, reusing an existing one with the same title
    CreateFolder { title: String },
    DeleteFolder { folder_id: i64 },
    /// Set folder order, e.g. `100:1 200:2`
    ReorderFolders {
        #[arg(required = true, value_parser = parse_position)]
        order: Vec<(i64, i64)>,
    },
}

fn parse_position(raw: &str) -> Result<(i64, i64), String> {
    let (id, position) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected FOLDER_ID:POSITION, got {}", raw))?;
    let id = id.trim().parse().map_err(|_| format!("invalid folder id in {}", raw))?;
    let position = position
        .trim()
        .parse()
        .map_err(|_| format!("invalid position in {}", raw))?;
    Ok((id, position))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "instapaper_bridge=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match std::env::var("INSTAPAPER_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => BridgeConfig::default(),
    }
    .apply_env();
    debug!(config = ?config, "Configuration loaded");

    let client = InstapaperClient::from_config(&config).context("Invalid Instapaper configuration")?;
    info!(base_url = client.base_url(), "Instapaper client ready");

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let output = with_cancellation(&cancel, run(&client, cli.command)).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(client: &InstapaperClient, command: Commands) -> Result<Value> {
    let output = match command {
        Commands::Whoami => to_json(client.verify_credentials().await?)?,
        Commands::List { query, folder, limit } => to_json(
            client
                .list_bookmarks(&ListBookmarks { query, folder, limit })
                .await?,
        )?,
        Commands::Add {
            url,
            title,
            description,
            folder_id,
            content,
            no_resolve,
            archive,
            tags,
        } => to_json(
            client
                .add_bookmark(&NewBookmark {
                    url,
                    title,
                    description,
                    folder_id,
                    content,
                    resolve_final_url: !no_resolve,
                    archive_on_add: archive,
                    tags,
                })
                .await?,
        )?,
        Commands::Text { ids } => batch(client.bookmark_texts(&ids).await)?,
        Commands::Archive { ids } => manage(client, &ids, BookmarkAction::Archive).await?,
        Commands::Unarchive { ids } => manage(client, &ids, BookmarkAction::Unarchive).await?,
        Commands::Star { ids } => manage(client, &ids, BookmarkAction::Star).await?,
        Commands::Unstar { ids } => manage(client, &ids, BookmarkAction::Unstar).await?,
        Commands::Delete { ids } => manage(client, &ids, BookmarkAction::Delete).await?,
        Commands::Move { folder_id, ids } => batch(client.move_bookmarks(&ids, folder_id).await)?,
        Commands::Folders => to_json(client.list_folders().await?)?,
        Commands::FindFolder { title } => to_json(client.find_folder(&title).await?)?,
        Commands::CreateFolder { title } => to_json(client.ensure_folder(&title).await?)?,
        Commands::DeleteFolder { folder_id } => {
            json!({ "folder_id": folder_id, "deleted": client.delete_folder(folder_id).await? })
        }
        Commands::ReorderFolders { order } => to_json(client.reorder_folders(&order).await?)?,
    };
    Ok(output)
}

async fn manage(client: &InstapaperClient, ids: &[i64], action: BookmarkAction) -> Result<Value> {
    batch(client.manage_bookmarks(ids, action).await)
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to encode command output")
}

/// Per-item results as `{"bookmark_id", "result" | "error"}` objects.
fn batch<T: Serialize>(results: Vec<(i64, Result<T, InstapaperError>)>) -> Result<Value> {
    let entries = results
        .into_iter()
        .map(|(id, result)| {
            Ok(match result {
                Ok(value) => json!({ "bookmark_id": id, "result": to_json(value)? }),
                Err(err) => json!({ "bookmark_id": id, "error": err.to_string() }),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(entries))
}
