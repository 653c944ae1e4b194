//! `shieldr` - CLI for the SHIELD-R backend
//!
//! Runs the HTTP API and offers one-shot zone lookups and configuration
//! checks from the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use shieldr::cli::{Cli, Command, ConfigCommand, ServeCommand, ZonesCommand};
use shieldr::server::{self, AppState};
use shieldr::zones::catalog::FALLBACK_CATALOG;
use shieldr::zones::{ResolverSettings, Resolution, Zone, ZoneProximityResolver};
use shieldr::{init_logging, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Validation is deferred for `config validate`, which reports it itself
    let config = match &cli.command {
        Command::Config(ConfigCommand::Validate { .. }) => Config::default(),
        _ => Config::load_from(cli.config.clone()).context("failed to load configuration")?,
    };

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, serve_cmd).await,
        Command::Zones(zones_cmd) => handle_zones(&config, zones_cmd).await,
        Command::Config(config_cmd) => handle_config(&config, cli.config, config_cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate()?;

    let state = AppState::from_config(&config)?;
    server::serve(&config, state).await?;
    Ok(())
}

async fn handle_zones(config: &Config, cmd: ZonesCommand) -> anyhow::Result<()> {
    match cmd {
        ZonesCommand::Nearby {
            lat,
            lng,
            radius,
            offline,
            json,
        } => {
            let resolver = if offline {
                ZoneProximityResolver::offline(ResolverSettings::from(&config.zones))
            } else {
                ZoneProximityResolver::from_config(&config.zones)?
            };

            let resolution = resolver.resolve(lat, lng, radius).await?;
            if json {
                let output = serde_json::json!({
                    "source": resolution.source_label(),
                    "reason": resolution.fallback_reason(),
                    "zones": resolution.zones(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_resolution(&resolution);
            }
        }
        ZonesCommand::Catalog { json } => {
            let zones = FALLBACK_CATALOG.zones();
            if json {
                println!("{}", serde_json::to_string_pretty(&zones)?);
            } else {
                println!("Fallback catalog ({} zones)", zones.len());
                println!();
                print_zones(&zones);
            }
        }
    }
    Ok(())
}

fn print_resolution(resolution: &Resolution) {
    match resolution.fallback_reason() {
        None => println!("Source:  live"),
        Some(reason) => println!("Source:  fallback ({reason})"),
    }
    println!("Zones:   {}", resolution.zones().len());
    println!();
    print_zones(resolution.zones());
}

fn print_zones(zones: &[Zone]) {
    for zone in zones {
        let distance = zone
            .distance_m
            .map(|d| format!("{d:>9.0} m"))
            .unwrap_or_default();
        println!(
            "{:>8}  {:<6}  {:<14}  {:>9.4}, {:>9.4}  {}  {}",
            zone.id, zone.zone_type, zone.category, zone.lat, zone.lng, distance, zone.name
        );
    }
}

fn handle_config(
    config: &Config,
    config_path: Option<std::path::PathBuf>,
    cmd: ConfigCommand,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Listen address:     {}", config.bind_addr());
                println!();
                println!("[Zones]");
                println!("  Live lookups:       {}", config.zones.live_enabled);
                println!("  Overpass URL:       {}", config.zones.overpass_url);
                println!("  Timeout (secs):     {}", config.zones.timeout_secs);
                println!("  Default radius (m): {}", config.zones.default_radius_m);
                println!("  Fallback limit:     {}", config.zones.fallback_limit);
                println!("  Live result limit:  {}", config.zones.live_result_limit);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
