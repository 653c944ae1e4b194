//! `SQLite` schema definitions for shieldr.
//!
//! SOS state and location are single-row tables pinned to `id = 1`.

/// SQL statement to create the contacts table.
pub const CREATE_CONTACTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    priority REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index used for priority ordering.
pub const CREATE_PRIORITY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_contacts_priority ON contacts(priority)
";

/// SQL statement to create the single-row SOS table.
pub const CREATE_SOS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sos_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    active INTEGER NOT NULL DEFAULT 0,
    time TEXT,
    lat REAL,
    lng REAL
)
";

/// SQL statement to create the single-row location table.
pub const CREATE_LOCATION_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS location (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    lat REAL,
    lng REAL,
    updated_at TEXT
)
";

/// SQL statement to create the curated zones table.
pub const CREATE_ZONES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS zones (
    id INTEGER PRIMARY KEY,
    zone_type TEXT NOT NULL,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    lat REAL NOT NULL,
    lng REAL NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_CONTACTS_TABLE,
    CREATE_PRIORITY_INDEX,
    CREATE_SOS_TABLE,
    CREATE_LOCATION_TABLE,
    CREATE_ZONES_TABLE,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_singleton_tables_are_pinned() {
        assert!(CREATE_SOS_TABLE.contains("CHECK (id = 1)"));
        assert!(CREATE_LOCATION_TABLE.contains("CHECK (id = 1)"));
    }

    #[test]
    fn test_create_contacts_table_contains_required_columns() {
        assert!(CREATE_CONTACTS_TABLE.contains("id INTEGER PRIMARY KEY"));
        assert!(CREATE_CONTACTS_TABLE.contains("name TEXT NOT NULL"));
        assert!(CREATE_CONTACTS_TABLE.contains("phone TEXT NOT NULL"));
        assert!(CREATE_CONTACTS_TABLE.contains("priority REAL"));
    }
}
