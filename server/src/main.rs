use anyhow::Result;
use axum::Router;
use clap::Parser;
use server::{build_app, AppConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Corpus directory to index at startup
    #[arg(long, default_value = "./corpus")]
    corpus: PathBuf,
    /// File of `name=score` PageRank lines
    #[arg(long)]
    pagerank: Option<PathBuf>,
    /// K-gram length for wildcard lookups
    #[arg(long, default_value_t = 2)]
    k: i64,
    /// Stem terms and drop stopwords
    #[arg(long, default_value_t = false)]
    stem: bool,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let app: Router = build_app(AppConfig { corpus: args.corpus, pagerank: args.pagerank, kgram_k: args.k, stem: args.stem })?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
