//! `shieldr` - Personal-safety backend
//!
//! This library provides the SHIELD-R HTTP API: SOS alert state, last known
//! location, emergency contacts, and nearby safety zones resolved from a live
//! geodata source with a static fallback catalog.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod records;
pub mod server;
pub mod storage;
pub mod zones;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use records::{Contact, LocationFix, SosState};
pub use storage::{SafetyStore, SqliteStore};
pub use zones::{FallbackReason, GeoQuery, Resolution, Zone, ZoneProximityResolver, ZoneType};
