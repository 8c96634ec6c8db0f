use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smart_notes::ai::{AiAction, Assistant, GenerativeClient};
use smart_notes::api::{self, SecurityConfig};
use smart_notes::auth::{GoogleIdentityProvider, TerminalSurface};
use smart_notes::config::{self, AppConfig};
use smart_notes::db::Database;
use smart_notes::models::{Note, UserIdentity};
use smart_notes::repository::NoteRepository;
use smart_notes::session::{SessionFile, SessionManager};
use smart_notes::store::{DocumentStore, LocalStore, RemoteStore};

#[derive(Parser)]
#[command(name = "snotes")]
#[command(about = "Personal notes with Google sign-in and AI assists")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the document store service
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// SQLite database file (defaults to the platform data directory)
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Sign in with Google
    Login,
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List your notes, most recently modified first
    List {
        /// Only show notes whose title or content contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Print a note
    Show { id: String },
    /// Create a note
    Add {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        content: String,
    },
    /// Change a note's title or content
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,
    },
    /// Delete a note
    Delete { id: String },
    /// Run an AI assist on text or on a note
    Ai {
        /// summarize, improve or ideas
        action: AiAction,

        /// Text to process
        text: Option<String>,

        /// Use this note's content instead of TEXT
        #[arg(short, long, conflicts_with = "text")]
        note: Option<String>,
    },
}

/// Initialize tracing with output to stderr (CLI commands) or stdout (server)
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "smart_notes=info,notes_core=info,tower_http=info".into()),
    );

    if use_stderr {
        // Command output goes to stdout, keep it clean
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, Commands::Serve { .. });
    init_tracing(use_stderr);

    let config = AppConfig::load()?;

    match cli.command {
        Commands::Serve { port, database } => {
            tracing::info!("Starting document store service on port {}", port);

            let db = open_database(database.or_else(|| config.store.database_path.clone()))?;

            let mut security = match &config.server.api_key {
                Some(key) => SecurityConfig::with_api_key(key.clone()),
                None => {
                    tracing::warn!("No server API key configured, documents are unauthenticated");
                    SecurityConfig::disabled()
                }
            };
            if let Some(origins) = &config.server.cors_origins {
                security = security.with_cors_origins(origins.clone());
            }

            let app = api::create_router_with_config(db, security);

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("Document store listening on http://127.0.0.1:{}/api/v1", port);

            axum::serve(listener, app).await?;
        }
        Commands::Login => {
            let session = session_manager(&config)?;
            session.load();
            match session.sign_in().await {
                Ok(user) => println!("Signed in as {}", user.label()),
                Err(e) => bail!(session.error_message().unwrap_or_else(|| e.to_string())),
            }
        }
        Commands::Logout => {
            let session = session_manager(&config)?;
            session.load();
            if let Err(e) = session.sign_out().await {
                bail!(session.error_message().unwrap_or_else(|| e.to_string()));
            }
            println!("Signed out");
        }
        Commands::Whoami => {
            let session = session_manager(&config)?;
            match session.load() {
                Some(user) => {
                    println!("{}", user.label());
                    if let Some(email) = &user.email {
                        println!("email: {}", email);
                    }
                    println!("uid:   {}", user.uid);
                }
                None => println!("Not signed in"),
            }
        }
        Commands::List { filter } => {
            let user = require_user(&config)?;
            let repo = NoteRepository::new(open_store(&config)?);
            repo.load(user.owner_id()).await?;

            if let Some(filter) = filter {
                repo.set_search_text(filter);
            }
            let notes = repo.filtered();
            if notes.is_empty() {
                println!("No notes");
            }
            for note in &notes {
                println!(
                    "{}  {}  {}",
                    note.id().unwrap_or("-"),
                    local_time(note.modified_at()),
                    note.title
                );
            }
            if repo.skipped() > 0 {
                eprintln!("{} stored notes could not be read and were skipped", repo.skipped());
            }
        }
        Commands::Show { id } => {
            let user = require_user(&config)?;
            let repo = NoteRepository::new(open_store(&config)?);
            let note = load_note(&repo, &user, &id).await?;

            println!("{}", note.title);
            println!(
                "created {}  modified {}",
                local_time(note.created_at()),
                local_time(note.modified_at())
            );
            println!();
            println!("{}", note.content);
        }
        Commands::Add { title, content } => {
            let user = require_user(&config)?;
            let repo = NoteRepository::new(open_store(&config)?);
            let note = repo.add(&title, &content, user.owner_id()).await?;
            println!("{}", note.id().unwrap_or_default());
        }
        Commands::Edit { id, title, content } => {
            if title.is_none() && content.is_none() {
                bail!("Nothing to change: pass --title and/or --content");
            }

            let user = require_user(&config)?;
            let repo = NoteRepository::new(open_store(&config)?);
            let mut note = load_note(&repo, &user, &id).await?;
            if let Some(title) = title {
                note.title = title;
            }
            if let Some(content) = content {
                note.content = content;
            }

            let note = repo.update(note).await?;
            println!("Updated {}", note.id().unwrap_or_default());
        }
        Commands::Delete { id } => {
            let user = require_user(&config)?;
            let repo = NoteRepository::new(open_store(&config)?);
            let note = load_note(&repo, &user, &id).await?;
            repo.delete(&note).await?;
            println!("Deleted {}", id);
        }
        Commands::Ai { action, text, note } => {
            let text = match (text, note) {
                (_, Some(id)) => {
                    let user = require_user(&config)?;
                    let repo = NoteRepository::new(open_store(&config)?);
                    load_note(&repo, &user, &id).await?.content
                }
                (Some(text), None) => text,
                (None, None) => bail!("Pass the text to process or --note ID"),
            };

            let client = GenerativeClient::new(config.ai.endpoint.clone(), config.ai.api_key.clone());
            let assistant = Assistant::new(client);
            if !assistant.perform(action, &text).await {
                let state = assistant.state();
                bail!(state.error_message.unwrap_or_else(|| "AI request failed".to_string()));
            }
            println!("{}", assistant.state().result);
        }
    }

    Ok(())
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match &config.store.url {
        Some(url) => {
            tracing::debug!("Using remote store at {}", url);
            Ok(Arc::new(RemoteStore::new(
                url.clone(),
                config.store.api_key.clone(),
            )))
        }
        None => {
            let db = open_database(config.store.database_path.clone())?;
            Ok(Arc::new(LocalStore::new(db)))
        }
    }
}

fn session_manager(config: &AppConfig) -> anyhow::Result<SessionManager> {
    let mut provider = GoogleIdentityProvider::new(
        config.auth.google_client_id.clone(),
        config.auth.identity_api_key.clone(),
    )
    .with_endpoint(config.auth.identity_endpoint.clone());
    if let Some(surface) = TerminalSurface::detect() {
        provider = provider.with_surface(Arc::new(surface));
    }

    let file = SessionFile::new(config::session_path()?);
    Ok(SessionManager::new(Arc::new(provider)).with_file(file))
}

fn require_user(config: &AppConfig) -> anyhow::Result<UserIdentity> {
    session_manager(config)?
        .load()
        .ok_or_else(|| anyhow!("Not signed in, run `snotes login` first"))
}

async fn load_note(repo: &NoteRepository, user: &UserIdentity, id: &str) -> anyhow::Result<Note> {
    repo.load(user.owner_id()).await?;
    repo.find(id)
        .with_context(|| format!("No note with id {}", id))
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
