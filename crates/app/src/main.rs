mod opener;
mod render;
mod shell;

use chrono::Utc;
use clap::{Parser, Subcommand};
use forum_view_core::{
    ClientConfig, ForumSession, HttpDocumentService, SearchOrdering, UploadFile, DEFAULT_BASE_URL,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::opener::BrowserOpener;
use crate::render::render_view;

#[derive(Parser)]
#[command(name = "forum-view", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Forum backend base URL
    #[arg(long, env = "FORUM_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request timeout in seconds. Unset waits for the transport.
    #[arg(long, env = "FORUM_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    /// How late search responses are reconciled: last-write-wins or latest-issued.
    #[arg(long, env = "FORUM_SEARCH_ORDERING", default_value = "last-write-wins")]
    ordering: SearchOrdering,

    /// Program used to open document links instead of the platform default.
    #[arg(long, env = "FORUM_OPENER")]
    opener: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print every document the forum knows about.
    List,
    /// Upload a .pdf or .docx file.
    Upload {
        /// File to upload.
        #[arg(long)]
        file: PathBuf,
    },
    /// Search documents and print the AI response with the matches.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
    },
    /// Open a document from the list (or from search results) in the browser.
    Open {
        /// Position of the document as printed by `list` or `search`.
        #[arg(long)]
        index: usize,
        /// Pick from the results of this search instead of the full list.
        #[arg(long)]
        query: Option<String>,
    },
    /// Interactive session: notes, uploads, searches, and opening documents.
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = ClientConfig {
        base_url: cli.base_url.clone(),
        request_timeout: cli.request_timeout_secs.map(Duration::from_secs),
    };
    let service = HttpDocumentService::new(&config)
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
    let mut session = ForumSession::new(service, cli.ordering);
    let opener = BrowserOpener::new(cli.opener.clone());

    info!(
        version = app_version,
        base_url = %config.base_url,
        started_at = %Utc::now().to_rfc3339(),
        "forum-view boot"
    );

    match cli.command {
        Command::List => {
            session.refresh_documents().await;
        }
        Command::Upload { file } => {
            let file = UploadFile::from_path(&file)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            session.refresh_documents().await;
            session.upload(Some(file)).await;
        }
        Command::Search { query } => {
            session.search(query).await;
        }
        Command::Open { index, query } => {
            session.refresh_documents().await;
            if let Some(query) = query {
                session.search(query).await;
            }
            if let Some(notice) = session.store().notice() {
                anyhow::bail!("{} failed: {}", notice.operation, notice.message);
            }
            session
                .open_document(index, &opener)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            return Ok(());
        }
        Command::Shell => {
            return shell::run(session, opener).await;
        }
    }

    print!("{}", render_view(&session.view(), None));
    if let Some(notice) = session.store().notice() {
        anyhow::bail!("{} failed: {}", notice.operation, notice.message);
    }

    Ok(())
}
