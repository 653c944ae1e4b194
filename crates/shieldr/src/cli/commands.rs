//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Serve command arguments.
#[derive(Debug, Default, Args)]
pub struct ServeCommand {
    /// Interface to listen on (overrides config)
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Zone lookup commands.
#[derive(Debug, Subcommand)]
pub enum ZonesCommand {
    /// Resolve zones near a point
    Nearby {
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,

        /// Search radius in metres
        #[arg(short, long)]
        radius: Option<f64>,

        /// Skip the live source and use the bundled catalog
        #[arg(long)]
        offline: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the bundled fallback catalog
    Catalog {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
