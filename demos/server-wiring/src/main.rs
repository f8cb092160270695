use std::path::PathBuf;

use acyclic_loader::Overwrites;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::components::{Server, TemplateSource};

mod components;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "server-wiring")]
#[command(about = "Wires a server from interdependent components", long_about = None)]
struct Cli {
    /// Overwrites the 'Port' component
    #[arg(long)]
    port: Option<u16>,

    /// Reads the template from a file instead of the built-in one
    #[arg(long)]
    template: Option<PathBuf>,

    /// Age of the user to greet
    #[arg(long, default_value_t = 29)]
    age: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Configuration is injected by overwriting components
    let mut overwrites = Overwrites::new();
    if let Some(port) = cli.port {
        overwrites = overwrites.set("Port", port);
    }
    if cli.template.is_some() {
        overwrites = overwrites.set("TemplateSource", TemplateSource(cli.template));
    }

    let loader = components::components().with_overwrites(overwrites)?;
    let server = loader.load_as::<Server>("Server").await?;

    tracing::info!("Server wired on '{}'", server.addr);
    println!("{}", server.handler.handle(cli.age));

    Ok(())
}
