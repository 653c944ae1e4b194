//! Database migration system for shieldr.
//!
//! Creates the schema and seeds the initial rows: an inactive SOS state, an
//! empty location and the curated zone list.

use rusqlite::{params, Connection};

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Curated zones served by `GET /zones`: (id, type, name, category, lat, lng).
pub const CURATED_ZONES: &[(i64, &str, &str, &str, f64, f64)] = &[
    (1, "safe", "Nagarkurnool District Hospital", "Hospital", 16.4833, 78.3167),
    (2, "safe", "Nagarkurnool Police Station", "Police", 16.4841, 78.3189),
    (3, "safe", "Wanaparthy Police Station", "Police", 16.3667, 78.0667),
    (4, "safe", "Kalwakurthy Hospital", "Hospital", 16.6850, 78.0180),
    (5, "safe", "Mahbubnagar District Hospital", "Hospital", 16.7488, 77.9816),
    (6, "safe", "Gadwal Police Station", "Police", 16.2333, 77.8000),
    (7, "safe", "Nalgonda District Hospital", "Hospital", 17.0484, 79.2674),
    (8, "safe", "Gandhi Hospital Hyderabad", "Hospital", 17.4416, 78.4983),
    (9, "safe", "Warangal Police Station", "Police", 17.9689, 79.5941),
    (10, "avoid", "Nagarkurnool Highway Construction", "Construction", 16.4700, 78.3000),
    (11, "safe", "Achampet Police Station", "Police", 16.4167, 78.0667),
    (12, "safe", "Karimnagar Police Station", "Police", 18.4386, 79.1288),
];

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist, then runs any
/// pending migrations to bring the schema up to the current version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        run_migration(conn, current)?;
    }

    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Migration to version 1: seed singleton rows and curated zones.
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute("INSERT OR IGNORE INTO sos_state (id, active) VALUES (1, 0)", [])?;
    conn.execute("INSERT OR IGNORE INTO location (id) VALUES (1)", [])?;

    let mut stmt = conn.prepare(
        r"
        INSERT OR IGNORE INTO zones (id, zone_type, name, category, lat, lng)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
    )?;
    for (id, zone_type, name, category, lat, lng) in CURATED_ZONES {
        stmt.execute(params![id, zone_type, name, category, lat, lng])?;
    }

    set_schema_version(conn, 1)?;
    Ok(())
}
