use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use snipbin::app::{App, routes};
use snipbin::session::MemoryBackend;
use snipbin::store::{MemorySnippetStore, MemoryUserStore};
use snipbin::templates::{TemplateCache, TemplateHelpers};

/// A web application for pasting and sharing snippets of text
#[derive(Debug, Parser)]
#[command(name = "snipbin", version)]
struct Args {
    /// HTTP network address to listen on
    #[arg(long, default_value = "127.0.0.1:4000")]
    addr: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Template breakage is a startup failure, never a request-time 500.
    let templates = match TemplateCache::new(TemplateHelpers::default()) {
        Ok(templates) => templates,
        Err(err) => {
            tracing::error!(error = %err, "failed to build template cache");
            return ExitCode::FAILURE;
        }
    };

    let app = Arc::new(App::new(
        Arc::new(MemorySnippetStore::new()),
        Arc::new(MemoryUserStore::new()),
        Arc::new(MemoryBackend::new()),
        templates,
    ));

    let handler = match routes(app) {
        Ok(handler) => handler,
        Err(err) => {
            tracing::error!(error = %err, "failed to build route table");
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(&args.addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, addr = %args.addr, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(addr = %args.addr, "starting server");

    let service = snipbin::serve::router(handler)
        .into_make_service_with_connect_info::<SocketAddr>();

    if let Err(err) = axum::serve(listener, service).await {
        tracing::error!(error = %err, "server stopped");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
