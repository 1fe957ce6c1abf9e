use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use jsdist_devserver::{serve, AppState};
use tracing_subscriber::EnvFilter;

/// Serve the demo page and echo posted form fields.
#[derive(Parser)]
#[clap(name = "jsdist-devserver", version)]
struct Args {
    /// Demo page served at `/`
    #[clap(long, default_value = "demo.html")]
    demo: PathBuf,
    /// Script served under its file name
    #[clap(long, default_value = "DOMBuilder.js")]
    script: PathBuf,
    #[clap(long, default_value = "127.0.0.1")]
    host: IpAddr,
    #[clap(long, default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if !args.demo.is_file() {
        bail!("demo page {} does not exist", args.demo.display());
    }
    let state = AppState {
        demo: args.demo,
        script: args.script,
    };
    serve(state, SocketAddr::new(args.host, args.port)).await
}
