mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use modgate_core::config::{AuthorizationConfig, ModulesConfig, TelemetryConfig};
use modgate_core::module::{activate, ActivationOptions, HostSnapshot};
use modgate_core::{modules, server, telemetry, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command_or_serve() {
        Commands::Serve => serve().await,
        Commands::Modules { json } => print_modules(json),
        Commands::Catalog { role } => print_catalog(role.as_deref()),
        Commands::Check => check(),
    }
}

async fn serve() -> Result<()> {
    let config = Config::from_env()?;
    let prometheus = telemetry::init(&config.telemetry)?;

    info!(
        environment = %config.environment,
        "Starting Modgate Core on {}",
        config.http_addr()
    );
    server::run(config, prometheus).await
}

/// Activate modules without the HTTP server or credentials.
fn activate_offline() -> Result<HostSnapshot> {
    let registry = modules::builtin_registry(&ModulesConfig::from_env());
    let ordered = registry.discover()?;
    let options = ActivationOptions::from(&AuthorizationConfig::from_env());
    Ok(activate(&ordered, &options)?.snapshot)
}

fn print_modules(json: bool) -> Result<()> {
    let snapshot = activate_offline()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.modules)?);
        return Ok(());
    }
    for (position, module) in snapshot.modules.iter().enumerate() {
        println!(
            "{:>2}. {:<12} {:<8} deps=[{}] permissions={} navigation={}",
            position + 1,
            module.id,
            module.version,
            module.dependencies.join(","),
            module.permissions,
            module.navigation_items
        );
    }
    Ok(())
}

fn print_catalog(role: Option<&str>) -> Result<()> {
    let snapshot = activate_offline()?;
    let output = match role {
        Some(role) => serde_json::to_string_pretty(&snapshot.catalog.default_grants(role))?,
        None => {
            let entries: Vec<_> = snapshot.catalog.iter().collect();
            serde_json::to_string_pretty(&entries)?
        }
    };
    println!("{}", output);
    Ok(())
}

fn check() -> Result<()> {
    telemetry::init(&TelemetryConfig::from_env())?;
    let snapshot = activate_offline()?;
    println!(
        "ok: {} modules, {} permissions, {} navigation items, {} policies",
        snapshot.modules.len(),
        snapshot.catalog.len(),
        snapshot.navigation.len(),
        snapshot.engine.policies().len()
    );
    Ok(())
}
