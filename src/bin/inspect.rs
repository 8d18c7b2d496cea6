//! inspect CLI: operator tooling for links, identities and logins.

use clap::{Parser, Subcommand};
use inspect_rs::config::{Config, LoginRegistry};
use inspect_rs::config::secrets::Auth;
use inspect_rs::identity;
use inspect_rs::model::{parse_link, to_link};
use inspect_rs::telemetry::{TelemetryConfig, init_telemetry};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "inspect", about = "Inspect dispatch pool tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse an inspect link and print its canonical form
    Link {
        /// Inspect link (steam://rungame/... or bare S/M...A...D...)
        link: String,
    },
    /// Decode a 32-digit item identity
    ItemId {
        id: String,
    },
    /// Decode a 64-digit sticker identity
    StickerId {
        id: String,
    },
    /// List configured logins (secrets are never printed)
    Logins {
        /// Logins file; defaults to LOGINS_FILE
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "inspect".to_string(),
        default_filter: config.log_level.clone(),
    })?;

    match cli.command {
        Command::Link { link } => cmd_link(&link),
        Command::ItemId { id } => cmd_item_id(&id),
        Command::StickerId { id } => cmd_sticker_id(&id),
        Command::Logins { file } => cmd_logins(file.unwrap_or(config.logins_file)),
    }
}

fn cmd_link(link: &str) -> anyhow::Result<()> {
    let key = parse_link(link)?;

    println!("Owner:      {}", if key.owner.is_market() { "market" } else { "inventory" });
    println!("Owner Key:  {}", key.owner.token());
    println!("Asset:      {}", key.asset_id);
    println!("Signature:  {}", key.signature);
    println!("Canonical:  {}", to_link(&key));
    Ok(())
}

fn cmd_item_id(id: &str) -> anyhow::Result<()> {
    let fields = identity::decode_item(id)?;
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

fn cmd_sticker_id(id: &str) -> anyhow::Result<()> {
    let sticker = identity::decode_sticker(id)?;
    println!("{}", serde_json::to_string_pretty(&sticker)?);
    Ok(())
}

fn cmd_logins(path: PathBuf) -> anyhow::Result<()> {
    let logins = LoginRegistry::load(&path)?;

    if logins.is_empty() {
        println!("No logins in {}.", path.display());
        return Ok(());
    }

    println!("{:<4}  {:<24}  AUTH", "IDX", "USER");
    println!("{}", "-".repeat(48));
    for (index, login) in logins.iter().enumerate() {
        let auth = match login.auth() {
            Some(Auth::EmailCode(_)) => "email code",
            Some(Auth::SharedSecret(_)) => "shared secret",
            None => "-",
        };
        println!("{:<4}  {:<24}  {}", index, login.user, auth);
    }

    println!("\n{} login(s)", logins.len());
    Ok(())
}
