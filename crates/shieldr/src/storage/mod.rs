//! Storage layer for shieldr.
//!
//! Handlers reach state only through the [`SafetyStore`] trait, so tests
//! and future persistent backends can swap the implementation. The shipped
//! [`SqliteStore`] keeps everything in an in-memory `SQLite` database that
//! lives exactly as long as the process.

pub mod migrations;
pub mod schema;

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::records::{Contact, ContactInput, LocationFix, NewContact, SosState, UNRANKED_PRIORITY};
use crate::zones::{Zone, ZoneType};

/// Repository for SOS state, location, contacts and curated zones.
pub trait SafetyStore: Send + Sync + std::fmt::Debug {
    /// Current SOS state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn sos(&self) -> Result<SosState>;

    /// Replace the SOS state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn set_sos(&self, state: &SosState) -> Result<()>;

    /// Last reported location.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn location(&self) -> Result<LocationFix>;

    /// Replace the last reported location.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn set_location(&self, fix: &LocationFix) -> Result<()>;

    /// All contacts, lowest priority value first, unranked last.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn contacts(&self) -> Result<Vec<Contact>>;

    /// Add a contact and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn insert_contact(&self, contact: &NewContact) -> Result<Contact>;

    /// Merge `patch` into an existing contact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContactNotFound`] if no such contact exists.
    fn update_contact(&self, id: i64, patch: ContactInput) -> Result<Contact>;

    /// Remove a contact and return it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContactNotFound`] if no such contact exists.
    fn delete_contact(&self, id: i64) -> Result<Contact>;

    /// The curated zone list.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn zones(&self) -> Result<Vec<Zone>>;
}

/// In-memory `SQLite` implementation of [`SafetyStore`].
#[derive(Debug)]
pub struct SqliteStore {
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a fresh in-memory store with seeded state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        info!("In-memory store initialized");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::StorageLock)
    }

    fn row_to_contact(row: &rusqlite::Row) -> rusqlite::Result<Contact> {
        Ok(Contact {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            priority: row.get(3)?,
        })
    }

    fn row_to_zone(row: &rusqlite::Row) -> rusqlite::Result<Zone> {
        let zone_type_str: String = row.get(1)?;
        let zone_type = match zone_type_str.as_str() {
            "safe" => ZoneType::Safe,
            "danger" => ZoneType::Danger,
            "avoid" => ZoneType::Avoid,
            _ => {
                warn!("Unknown zone type: {}, defaulting to safe", zone_type_str);
                ZoneType::Safe
            }
        };

        Ok(Zone {
            id: row.get(0)?,
            zone_type,
            name: row.get(2)?,
            category: row.get(3)?,
            lat: row.get(4)?,
            lng: row.get(5)?,
            distance_m: None,
        })
    }

    fn select_contact(conn: &Connection, id: i64) -> Result<Option<Contact>> {
        let contact = conn
            .query_row(
                "SELECT id, name, phone, priority FROM contacts WHERE id = ?1",
                [id],
                Self::row_to_contact,
            )
            .optional()?;
        Ok(contact)
    }
}

fn parse_time(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl SafetyStore for SqliteStore {
    fn sos(&self) -> Result<SosState> {
        let conn = self.conn()?;
        let state = conn.query_row(
            "SELECT active, time, lat, lng FROM sos_state WHERE id = 1",
            [],
            |row| {
                Ok(SosState {
                    active: row.get(0)?,
                    time: parse_time(row.get(1)?),
                    lat: row.get(2)?,
                    lng: row.get(3)?,
                })
            },
        )?;
        Ok(state)
    }

    fn set_sos(&self, state: &SosState) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r"
            INSERT OR REPLACE INTO sos_state (id, active, time, lat, lng)
            VALUES (1, ?1, ?2, ?3, ?4)
            ",
            params![
                state.active,
                state.time.map(|t| t.to_rfc3339()),
                state.lat,
                state.lng,
            ],
        )?;
        debug!("SOS state set (active: {})", state.active);
        Ok(())
    }

    fn location(&self) -> Result<LocationFix> {
        let conn = self.conn()?;
        let fix = conn.query_row(
            "SELECT lat, lng, updated_at FROM location WHERE id = 1",
            [],
            |row| {
                Ok(LocationFix {
                    lat: row.get(0)?,
                    lng: row.get(1)?,
                    updated_at: parse_time(row.get(2)?),
                })
            },
        )?;
        Ok(fix)
    }

    fn set_location(&self, fix: &LocationFix) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r"
            INSERT OR REPLACE INTO location (id, lat, lng, updated_at)
            VALUES (1, ?1, ?2, ?3)
            ",
            params![fix.lat, fix.lng, fix.updated_at.map(|t| t.to_rfc3339())],
        )?;
        Ok(())
    }

    fn contacts(&self) -> Result<Vec<Contact>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, name, phone, priority FROM contacts
            ORDER BY COALESCE(priority, ?1) ASC, id ASC
            ",
        )?;

        let contacts = stmt
            .query_map([UNRANKED_PRIORITY], Self::row_to_contact)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(contacts)
    }

    fn insert_contact(&self, contact: &NewContact) -> Result<Contact> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO contacts (name, phone, priority) VALUES (?1, ?2, ?3)",
            params![contact.name, contact.phone, contact.priority],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Inserted contact with id {}", id);
        Ok(Contact {
            id,
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            priority: contact.priority,
        })
    }

    fn update_contact(&self, id: i64, patch: ContactInput) -> Result<Contact> {
        let conn = self.conn()?;
        let existing = Self::select_contact(&conn, id)?.ok_or(Error::ContactNotFound { id })?;
        let updated = patch.merge_into(existing);

        conn.execute(
            "UPDATE contacts SET name = ?1, phone = ?2, priority = ?3 WHERE id = ?4",
            params![updated.name, updated.phone, updated.priority, id],
        )?;
        Ok(updated)
    }

    fn delete_contact(&self, id: i64) -> Result<Contact> {
        let conn = self.conn()?;
        let existing = Self::select_contact(&conn, id)?.ok_or(Error::ContactNotFound { id })?;

        conn.execute("DELETE FROM contacts WHERE id = ?1", [id])?;
        debug!("Deleted contact with id {}", id);
        Ok(existing)
    }

    fn zones(&self) -> Result<Vec<Zone>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, zone_type, name, category, lat, lng FROM zones ORDER BY id ASC",
        )?;

        let zones = stmt
            .query_map([], Self::row_to_zone)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(zones)
    }
}
