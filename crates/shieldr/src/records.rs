//! Safety records held by the store.
//!
//! These are the JSON shapes exchanged with the frontend. Incoming
//! coordinates and priorities are lenient: anything that is not a finite
//! JSON number is treated as absent rather than rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Priority assigned to contacts without one when ordering.
pub const UNRANKED_PRIORITY: f64 = 99.0;

/// Emergency alert state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SosState {
    /// Whether an alert is currently raised.
    pub active: bool,
    /// When the state last changed.
    pub time: Option<DateTime<Utc>>,
    /// Latitude reported with the alert.
    pub lat: Option<f64>,
    /// Longitude reported with the alert.
    pub lng: Option<f64>,
}

impl SosState {
    /// A raised alert at `time`.
    #[must_use]
    pub fn triggered(time: DateTime<Utc>, coords: Coordinates) -> Self {
        Self {
            active: true,
            time: Some(time),
            lat: coords.lat,
            lng: coords.lng,
        }
    }

    /// A cleared alert at `time`.
    #[must_use]
    pub fn resolved(time: DateTime<Utc>) -> Self {
        Self {
            active: false,
            time: Some(time),
            lat: None,
            lng: None,
        }
    }
}

/// Last reported device location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
    /// When the location was reported.
    pub updated_at: Option<DateTime<Utc>>,
}

impl LocationFix {
    /// A location reported at `time`.
    #[must_use]
    pub fn reported(time: DateTime<Utc>, coords: Coordinates) -> Self {
        Self {
            lat: coords.lat,
            lng: coords.lng,
            updated_at: Some(time),
        }
    }
}

/// Request body carrying optional coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Coordinates {
    /// Latitude, if a number was given.
    #[serde(default, deserialize_with = "number_or_none")]
    pub lat: Option<f64>,
    /// Longitude, if a number was given.
    #[serde(default, deserialize_with = "number_or_none")]
    pub lng: Option<f64>,
}

/// An emergency contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Store-assigned id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Phone number, stored as given.
    pub phone: String,
    /// Lower values are called first. Whole numbers serialize as integers.
    #[serde(serialize_with = "whole_or_fraction")]
    pub priority: Option<f64>,
}

impl Contact {
    /// Priority used for ordering.
    #[must_use]
    pub fn rank(&self) -> f64 {
        self.priority.unwrap_or(UNRANKED_PRIORITY)
    }
}

/// Fields accepted when creating or updating a contact.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContactInput {
    /// Display name.
    #[serde(default, deserialize_with = "string_or_none")]
    pub name: Option<String>,
    /// Phone number.
    #[serde(default, deserialize_with = "string_or_none")]
    pub phone: Option<String>,
    /// Priority, if a number was given.
    #[serde(default, deserialize_with = "number_or_none")]
    pub priority: Option<f64>,
}

/// A validated contact ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: String,
    /// Priority.
    pub priority: Option<f64>,
}

impl ContactInput {
    /// Validate for creation: name and phone must be non-empty.
    ///
    /// # Errors
    ///
    /// Returns a validation error when name or phone is missing.
    pub fn into_new(self) -> crate::Result<NewContact> {
        match (non_empty(self.name), non_empty(self.phone)) {
            (Some(name), Some(phone)) => Ok(NewContact {
                name,
                phone,
                priority: self.priority,
            }),
            _ => Err(crate::Error::validation("Name and phone are required")),
        }
    }

    /// Apply the provided fields over `contact`.
    #[must_use]
    pub fn merge_into(self, contact: Contact) -> Contact {
        Contact {
            id: contact.id,
            name: self.name.unwrap_or(contact.name),
            phone: self.phone.unwrap_or(contact.phone),
            priority: self.priority.or(contact.priority),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn number_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|v| v.is_finite()))
}

// Largest magnitude at which every integer is exactly representable in f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

#[allow(clippy::cast_possible_truncation)]
fn whole_or_fraction<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match *value {
        Some(v) if v.fract() == 0.0 && v.abs() <= MAX_EXACT_INTEGER => {
            serializer.serialize_some(&(v as i64))
        }
        Some(v) => serializer.serialize_some(&v),
        None => serializer.serialize_none(),
    }
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}
