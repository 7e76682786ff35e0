//! gitingest - Git repository to text digest
//!
//! # Usage
//! ```bash
//! gitingest serve --port 8000                        # Start the HTTP service
//! gitingest ingest https://github.com/user/repo       # Write digest.txt
//! gitingest ingest . -i '*.rs' -o -                  # Local dir to stdout
//! ```

use std::collections::BTreeSet;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gitingest::config::DEFAULT_MAX_FILE_SIZE;
use gitingest::query::{parse_patterns, IngestOptions};
use gitingest::{create_router, AppState, QueryProcessor, Settings};

/// gitingest - Turn Git repositories into prompt-friendly text digests
#[derive(Parser)]
#[command(name = "gitingest")]
#[command(about = "Turn a Git repository into a text digest for LLMs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to run the server on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ingest a repository URL or local directory once
    Ingest {
        /// Repository URL, user/repo slug, or local directory
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Output file, `-` for stdout
        #[arg(short, long, default_value = "digest.txt")]
        output: String,

        /// Maximum file size to include, in bytes
        #[arg(short = 's', long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
        max_size: u64,

        /// Patterns to exclude (repeatable)
        #[arg(short = 'e', long = "exclude-pattern")]
        exclude: Vec<String>,

        /// Patterns to include (repeatable)
        #[arg(short = 'i', long = "include-pattern")]
        include: Vec<String>,

        /// Branch to clone and ingest
        #[arg(short, long)]
        branch: Option<String>,

        /// Personal access token for private repositories
        #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

fn init_logging(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn collect_patterns(raw: &[String]) -> anyhow::Result<BTreeSet<String>> {
    let mut patterns = BTreeSet::new();
    for item in raw {
        patterns.extend(parse_patterns(item)?);
    }
    Ok(patterns)
}

async fn serve(
    mut settings: Settings,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    settings.validate()?;

    std::fs::create_dir_all(&settings.ingest.tmp_dir)
        .with_context(|| format!("creating {}", settings.ingest.tmp_dir.display()))?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!("Allowed hosts: {}", settings.server.allowed_hosts.join(", "));
    tracing::info!("Scratch directory: {}", settings.ingest.tmp_dir.display());

    let app = create_router(AppState::new(settings));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
        tracing::info!("Shutting down");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn ingest(
    mut settings: Settings,
    source: String,
    output: String,
    max_size: u64,
    exclude: Vec<String>,
    include: Vec<String>,
    branch: Option<String>,
    token: Option<String>,
) -> anyhow::Result<()> {
    settings.ingest.allow_local_sources = true;
    settings.validate()?;

    let processor = QueryProcessor::new(Arc::new(settings));
    let outcome = processor
        .process(IngestOptions {
            source,
            max_file_size: max_size,
            include_patterns: collect_patterns(&include)?,
            exclude_patterns: collect_patterns(&exclude)?,
            branch,
            token: token.filter(|t| !t.trim().is_empty()),
        })
        .await?;

    let text = outcome.digest.full_text();
    if output == "-" {
        std::io::stdout().write_all(text.as_bytes())?;
        eprintln!("{}", outcome.digest.summary);
    } else {
        std::fs::write(&output, text).with_context(|| format!("writing {}", output))?;
        println!("Analysis complete! Output written to: {}", output);
        println!();
        println!("Summary:");
        println!("{}", outcome.digest.summary);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Serve { host, port } => {
            init_logging("info,gitingest=debug,tower_http=info");
            serve(settings, host, port).await
        }
        Commands::Ingest {
            source,
            output,
            max_size,
            exclude,
            include,
            branch,
            token,
        } => {
            init_logging("warn");
            ingest(settings, source, output, max_size, exclude, include, branch, token).await
        }
    }
}
