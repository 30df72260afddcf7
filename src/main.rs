//! `vlan-mobile` command line.
//!
//! Exposes the library's host-facing operations for provisioning and
//! debugging: rendering mobile JSON into engine settings, inspecting
//! certificates, generating keys, and running the settings sync loop.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use vlan_mobile::config::schema::LoggingConfig;
use vlan_mobile::config::{
    get_config_setting, render_config_with, ConfigStore, DetachedReloader, InputVariant,
};
use vlan_mobile::lifecycle::{signals, Shutdown};
use vlan_mobile::observability::init_logging;
use vlan_mobile::pki::{certificates_to_json, generate_key_pair, parse_certificates, Curve};
use vlan_mobile::sync::{HttpFetcher, SyncAgent, SyncTask};
use vlan_mobile::{parse_cidr, verify_cert_and_key};

#[derive(Parser)]
#[command(name = "vlan-mobile")]
#[command(about = "Settings, certificate and sync tooling for VLAN mobile clients", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a mobile JSON document into engine settings
    Render {
        input: PathBuf,
        /// File holding the private key PEM
        #[arg(short, long)]
        key: Option<PathBuf>,
        #[arg(long, default_value = "vlan")]
        variant: InputVariant,
    },
    /// Decode and check concatenated certificates
    Certs { input: PathBuf },
    /// Generate a key pair
    Keygen {
        #[arg(long, default_value = "x25519")]
        curve: Curve,
        #[arg(long, default_value = "vlan")]
        variant: InputVariant,
    },
    /// Describe an IPv4 CIDR
    Cidr { cidr: String },
    /// Check that a private key belongs to a certificate
    Verify {
        #[arg(long)]
        cert: PathBuf,
        #[arg(long)]
        key: PathBuf,
    },
    /// Read one dotted setting from a settings file
    Setting { input: PathBuf, setting: String },
    /// Pull remote settings into a settings file
    Sync {
        config: PathBuf,
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
        /// HTTP timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        ..LoggingConfig::default()
    });

    match cli.command {
        Commands::Render {
            input,
            key,
            variant,
        } => {
            let json = read(&input)?;
            let key = match key {
                Some(path) => read(&path)?,
                None => String::new(),
            };
            print!("{}", render_config_with(&json, &key, variant)?);
        }
        Commands::Certs { input } => {
            let records = parse_certificates(&read(&input)?)?;
            println!("{}", certificates_to_json(&records)?);
        }
        Commands::Keygen { curve, variant } => {
            let pair = generate_key_pair(curve, variant.product());
            println!("{}", serde_json::to_string_pretty(&pair)?);
        }
        Commands::Cidr { cidr } => {
            let info = parse_cidr(&cidr)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Verify { cert, key } => {
            let ok = verify_cert_and_key(&read(&cert)?, &read(&key)?)?;
            println!("{ok}");
        }
        Commands::Setting { input, setting } => match get_config_setting(&read(&input)?, &setting) {
            Some(value) => println!("{value}"),
            None => {
                eprintln!("Setting {setting} not found");
                std::process::exit(1);
            }
        },
        Commands::Sync {
            config,
            once,
            timeout,
        } => run_sync(&config, once, Duration::from_secs(timeout)).await?,
    }

    Ok(())
}

async fn run_sync(
    path: &Path,
    once: bool,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(ConfigStore::open(path, Arc::new(DetachedReloader))?);
    let fetcher = Arc::new(HttpFetcher::new(timeout, timeout)?);
    let agent = Arc::new(SyncAgent::new(store, fetcher));

    if once {
        let report = agent.run_cycle().await;
        println!(
            "primary: {}, addition: {}",
            report.primary.outcome.label(),
            report.addition.outcome.label()
        );
        return Ok(());
    }

    let shutdown = Arc::new(Shutdown::new());
    let task = SyncTask::new(agent).spawn(&shutdown);
    signals::shutdown_on_ctrl_c(shutdown.clone()).await;
    task.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn read(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}
