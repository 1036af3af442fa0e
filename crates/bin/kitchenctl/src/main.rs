//! # kitchenctl: kitchenconnect command-line remote
//!
//! Composition root that wires the virtual backend into the appliance stores
//! and drives them from the command line.
//!
//! ## Responsibilities
//! - Parse configuration (CLI args, env vars, config file)
//! - Initialize logging (stderr, so stdout only carries command output)
//! - Construct the backend adapter and inject it into the stores
//! - Run one command, print the resulting appliance state, shut the stores down
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kitchenconnect_adapter_virtual::VirtualKitchen;
use kitchenconnect_app::stores::{ApplianceCollectionStore, ApplianceDetail, ApplianceDetailStore};
use kitchenconnect_domain::action::ApplianceAction;
use kitchenconnect_domain::appliance::Program;
use kitchenconnect_domain::id::ApplianceId;

use crate::config::Config;

/// Remote control for kitchen appliances.
#[derive(Parser, Debug)]
#[command(name = "kitchenctl", version, about)]
struct Cli {
    /// Configuration file (optional; defaults apply when missing)
    #[arg(short, long, env = "KITCHENCONNECT_CONFIG", default_value = "kitchenctl.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every tracked appliance and print one line each
    List,
    /// Print the full state of one appliance
    Show { id: ApplianceId },
    /// Start the current program
    On { id: ApplianceId },
    /// Stop and return to ready-to-start
    Off { id: ApplianceId },
    /// Turn on when off, off when on
    Toggle { id: ApplianceId },
    /// Select a cooking program (e.g. `bake`, `keep_warm`)
    Program { id: ApplianceId, program: Program },
    /// Set the target temperature
    Temperature {
        id: ApplianceId,
        #[arg(allow_negative_numbers = true)]
        value: i32,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    init_tracing(&config.logging.filter);

    let remote = Arc::new(build_remote(&config)?);
    run(cli.command, remote, &config).await
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_remote(config: &Config) -> anyhow::Result<VirtualKitchen> {
    let mut remote = match &config.remote.bundle_dir {
        Some(dir) => {
            tracing::info!(bundle_dir = %dir.display(), "serving appliances from bundle");
            VirtualKitchen::from_dir(dir)
        }
        None => {
            tracing::info!("serving embedded demo oven");
            VirtualKitchen::with_default_oven().context("embedded oven is invalid")?
        }
    };
    if let Some(limits) = config.temperature_limits() {
        tracing::debug!(%limits, "temperature limits enabled");
        remote = remote.with_limits(limits);
    }
    Ok(remote.with_latency(config.latency()))
}

async fn run(
    command: Command,
    remote: Arc<VirtualKitchen>,
    config: &Config,
) -> anyhow::Result<()> {
    let (id, action) = match command {
        Command::List => return list(remote, config).await,
        Command::Show { id } => return show(remote, id).await,
        Command::On { id } => (id, Some(ApplianceAction::TurnOn)),
        Command::Off { id } => (id, Some(ApplianceAction::TurnOff)),
        Command::Toggle { id } => (id, None),
        Command::Program { id, program } => (id, Some(ApplianceAction::ChangeProgram { program })),
        Command::Temperature { id, value } => (
            id,
            Some(ApplianceAction::ChangeTemperature { temperature: value }),
        ),
    };

    tracing::debug!(appliance_id = %id, ?action, "controlling appliance");
    let store = ApplianceDetailStore::new(remote);
    let result = async {
        store.load(&id).await?;
        match action {
            Some(action) => store.dispatch(action).await,
            None => store.toggle_power().await,
        }
    }
    .await;
    let detail = store.detail();
    store.shutdown().await;

    result.with_context(|| format!("failed to control appliance {id}"))?;
    if let Some(detail) = detail {
        print_detail(&detail);
    }
    Ok(())
}

async fn list(remote: Arc<VirtualKitchen>, config: &Config) -> anyhow::Result<()> {
    let store = ApplianceCollectionStore::new(remote, config.appliance_ids());
    let report = store.load_all().await;
    let appliances = store.appliances();
    store.shutdown().await;

    let report = report.context("appliance refresh was interrupted")?;
    for appliance in appliances.values() {
        println!("{appliance}");
    }
    for failure in &report.failures {
        eprintln!("error: {failure}");
    }
    if !report.is_complete() {
        anyhow::bail!("{} appliance(s) failed to load", report.failures.len());
    }
    Ok(())
}

async fn show(remote: Arc<VirtualKitchen>, id: ApplianceId) -> anyhow::Result<()> {
    let store = ApplianceDetailStore::new(remote);
    let result = store.load(&id).await;
    store.shutdown().await;

    let appliance = result.with_context(|| format!("failed to load appliance {id}"))?;
    print_detail(&ApplianceDetail::from(appliance));
    Ok(())
}

fn print_detail(detail: &ApplianceDetail) {
    let appliance = &detail.appliance;
    println!("{} ({})", appliance.name(), appliance.id());
    println!("  state:       {} ({})", detail.state, appliance.appliance_state());
    println!("  program:     {}", detail.selected_program);
    println!("  target:      {}", detail.target_temperature);
    println!("  temperature: {}", detail.display_temperature);
    println!("  door:        {}", appliance.door_state());
}
