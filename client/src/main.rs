use clap::Parser;
use client::identity;
use client::input::NullInput;
use client::render::LogRenderer;
use client::transport::UdpTransport;
use client::{PresenceClient, PresenceError};
use log::info;
use shared::SpaceId;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Presence server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Path of the persisted identity file
    #[arg(short = 'i', long, default_value = "presence-identity.json")]
    identity: PathBuf,

    /// Display name override (persisted for future sessions)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Starting space (general, lgbtq, disability, cultural, workshop,
    /// meditation, gaming, art)
    #[arg(long)]
    space: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut record = identity::load_or_create(&args.identity)?;
    let mut dirty = false;
    if let Some(name) = args.name {
        record.display_name = name;
        dirty = true;
    }
    if let Some(space) = args.space {
        record.space =
            SpaceId::from_name(&space).ok_or_else(|| PresenceError::UnknownSpace(space.clone()))?;
        dirty = true;
    }
    if dirty {
        identity::save(&args.identity, &record)?;
    }

    info!("Starting presence client...");
    info!("Connecting to: {}", args.server);
    info!(
        "Joining {} as {} ({})",
        record.space.display_name(),
        record.display_name,
        record.id
    );

    let transport = UdpTransport::new(&args.server)?;
    let mut presence = PresenceClient::new(record, transport, NullInput, LogRenderer::default());

    presence.run().await?;

    Ok(())
}
