//! Bundled fallback zones.
//!
//! When the live geodata source cannot answer, nearby zones are ranked from
//! this fixed table of hospitals, police stations and hazard sites across
//! Telangana.

use super::geo::haversine_m;
use super::{GeoQuery, Zone, ZoneType};

/// Offset added to a catalog index to form a fallback zone id.
pub const FALLBACK_ID_OFFSET: i64 = 1000;

/// One row of the static catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    /// Safety classification.
    pub zone_type: ZoneType,
    /// Display name.
    pub name: &'static str,
    /// Human-readable category label.
    pub category: &'static str,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// An immutable sequence of candidate zones.
#[derive(Debug, Clone, Copy)]
pub struct StaticZoneCatalog {
    entries: &'static [CatalogEntry],
}

/// The process-wide fallback catalog.
pub static FALLBACK_CATALOG: StaticZoneCatalog = StaticZoneCatalog::new(ENTRIES);

impl StaticZoneCatalog {
    /// Wrap a static table.
    #[must_use]
    pub const fn new(entries: &'static [CatalogEntry]) -> Self {
        Self { entries }
    }

    /// All entries in catalog order.
    #[must_use]
    pub fn entries(&self) -> &'static [CatalogEntry] {
        self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries within `query.radius_m` of the query point, nearest first.
    ///
    /// Equal distances keep catalog order. At most `limit` zones are
    /// returned, each carrying its distance and an id of
    /// [`FALLBACK_ID_OFFSET`] plus its catalog index.
    #[must_use]
    pub fn nearby(&self, query: &GeoQuery, limit: usize) -> Vec<Zone> {
        let mut ranked: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                (
                    index,
                    haversine_m(query.lat, query.lng, entry.lat, entry.lng),
                )
            })
            .filter(|(_, distance)| *distance <= query.radius_m)
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked.truncate(limit);

        ranked
            .into_iter()
            .map(|(index, distance)| {
                self.entries[index].to_zone(fallback_id(index), Some(distance))
            })
            .collect()
    }

    /// Every entry as a zone without a distance, in catalog order.
    #[must_use]
    pub fn zones(&self) -> Vec<Zone> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| entry.to_zone(fallback_id(index), None))
            .collect()
    }
}

fn fallback_id(index: usize) -> i64 {
    FALLBACK_ID_OFFSET.saturating_add(i64::try_from(index).unwrap_or(i64::MAX))
}

impl CatalogEntry {
    /// Convert into a response zone.
    #[must_use]
    pub fn to_zone(&self, id: i64, distance_m: Option<f64>) -> Zone {
        Zone {
            id,
            zone_type: self.zone_type,
            name: self.name.to_string(),
            category: self.category.to_string(),
            lat: self.lat,
            lng: self.lng,
            distance_m,
        }
    }
}

const fn safe(name: &'static str, category: &'static str, lat: f64, lng: f64) -> CatalogEntry {
    CatalogEntry {
        zone_type: ZoneType::Safe,
        name,
        category,
        lat,
        lng,
    }
}

const fn danger(name: &'static str, lat: f64, lng: f64) -> CatalogEntry {
    CatalogEntry {
        zone_type: ZoneType::Danger,
        name,
        category: "Industrial",
        lat,
        lng,
    }
}

const fn avoid(name: &'static str, lat: f64, lng: f64) -> CatalogEntry {
    CatalogEntry {
        zone_type: ZoneType::Avoid,
        name,
        category: "Construction",
        lat,
        lng,
    }
}

const ENTRIES: &[CatalogEntry] = &[
    // Nagarkurnool
    safe("Nagarkurnool District Hospital", "Hospital", 16.4833, 78.3167),
    safe("Nagarkurnool Police Station", "Police", 16.4841, 78.3189),
    safe("Nagarkurnool Town Police", "Police", 16.4850, 78.3200),
    safe("Achampet Police Station", "Police", 16.4167, 78.0667),
    safe("Kalwakurthy Police Station", "Police", 16.6833, 78.0167),
    safe("Kalwakurthy Hospital", "Hospital", 16.6850, 78.0180),
    safe("Wanaparthy Police Station", "Police", 16.3667, 78.0667),
    safe("Wanaparthy District Hospital", "Hospital", 16.3680, 78.0690),
    avoid("Nagarkurnool Highway Construction", 16.4700, 78.3000),
    // Hyderabad
    safe("Banjara Hills Police Station", "Police", 17.4239, 78.4738),
    safe("Gandhi Hospital", "Hospital", 17.4416, 78.4983),
    safe("NIMS Hospital", "Hospital", 17.4313, 78.4099),
    safe("Cyberabad Police Station", "Police", 17.4435, 78.3772),
    danger("Balanagar Industrial Area", 17.4887, 78.4412),
    safe("Osmania Hospital", "Hospital", 17.3753, 78.4815),
    avoid("Metro Construction - Ameerpet", 17.4374, 78.4482),
    safe("Punjagutta Police Station", "Police", 17.4239, 78.4482),
    danger("Jeedimetla Industrial Estate", 17.5074, 78.4447),
    safe("Care Hospital - Banjara Hills", "Hospital", 17.4126, 78.4501),
    safe("Secunderabad Railway Police", "Police", 17.4400, 78.5018),
    safe("Apollo Hospital - Jubilee Hills", "Hospital", 17.4326, 78.4071),
    avoid("ORR Construction Zone", 17.3850, 78.4867),
    // Nalgonda
    safe("Nalgonda District Hospital", "Hospital", 17.0484, 79.2674),
    safe("Nalgonda Police Station", "Police", 17.0491, 79.2644),
    safe("Nalgonda Town Police", "Police", 17.0522, 79.2701),
    safe("Miryalaguda Police Station", "Police", 16.8767, 79.5662),
    safe("Suryapet Government Hospital", "Hospital", 17.1489, 79.6237),
    safe("Suryapet Police Station", "Police", 17.1482, 79.6198),
    avoid("Nalgonda Highway Construction", 17.0300, 79.2500),
    // Warangal
    safe("Warangal Police Station", "Police", 17.9689, 79.5941),
    safe("MGM Hospital Warangal", "Hospital", 17.9784, 79.6008),
    safe("Hanamkonda Police Station", "Police", 18.0011, 79.5746),
    safe("Kakatiya Medical College", "Hospital", 18.0034, 79.5827),
    // Khammam
    safe("Khammam District Hospital", "Hospital", 17.2473, 80.1514),
    safe("Khammam Police Station", "Police", 17.2474, 80.1438),
    safe("Kothagudem Police Station", "Police", 17.5503, 80.6176),
    // Nizamabad
    safe("Nizamabad District Hospital", "Hospital", 18.6725, 78.0941),
    safe("Nizamabad Police Station", "Police", 18.6739, 78.0943),
    // Karimnagar
    safe("Karimnagar Police Station", "Police", 18.4386, 79.1288),
    safe("Karimnagar District Hospital", "Hospital", 18.4391, 79.1250),
    // Adilabad
    safe("Adilabad District Hospital", "Hospital", 19.6637, 78.5311),
    safe("Adilabad Police Station", "Police", 19.6648, 78.5322),
    // Medak
    safe("Sangareddy Police Station", "Police", 17.6243, 78.0835),
    safe("Sangareddy Hospital", "Hospital", 17.6229, 78.0801),
    // Mahbubnagar
    safe("Mahbubnagar District Hospital", "Hospital", 16.7488, 77.9816),
    safe("Mahbubnagar Police Station", "Police", 16.7514, 77.9846),
    safe("Gadwal Police Station", "Police", 16.2333, 77.8000),
    safe("Gadwal Hospital", "Hospital", 16.2350, 77.8020),
    // Rangareddy
    safe("LB Nagar Police Station", "Police", 17.3523, 78.5528),
    safe("Shamshabad Police Station", "Police", 17.2403, 78.4294),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn query(lat: f64, lng: f64, radius_m: f64) -> GeoQuery {
        GeoQuery { lat, lng, radius_m }
    }

    #[test]
    fn test_catalog_size() {
        assert_eq!(FALLBACK_CATALOG.len(), 50);
        assert!(!FALLBACK_CATALOG.is_empty());
    }

    #[test]
    fn test_entries_have_finite_coordinates() {
        for entry in FALLBACK_CATALOG.entries() {
            assert!(entry.lat.is_finite() && entry.lng.is_finite(), "{entry:?}");
            assert!(!entry.name.is_empty());
        }
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        for entry in FALLBACK_CATALOG.entries() {
            assert!(haversine_m(entry.lat, entry.lng, entry.lat, entry.lng).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_nagarkurnool_hospital_within_one_km() {
        let zones = FALLBACK_CATALOG.nearby(&query(16.4833, 78.3167, 1000.0), 20);

        let first = &zones[0];
        assert_eq!(first.name, "Nagarkurnool District Hospital");
        assert!(first.distance_m.unwrap().abs() < 1e-6);
        assert_eq!(first.id, FALLBACK_ID_OFFSET);

        for zone in &zones {
            assert!(zone.distance_m.unwrap() <= 1000.0);
        }
        // Highway construction is ~2 km away
        assert!(zones
            .iter()
            .all(|z| z.name != "Nagarkurnool Highway Construction"));
    }

    #[test]
    fn test_sorted_by_distance_and_capped() {
        // Large radius around Hyderabad reaches most of the catalog
        let zones = FALLBACK_CATALOG.nearby(&query(17.4, 78.5, 1_000_000.0), 20);

        assert_eq!(zones.len(), 20);
        for pair in zones.windows(2) {
            assert!(pair[0].distance_m.unwrap() <= pair[1].distance_m.unwrap());
        }
    }

    #[test]
    fn test_ids_unique_and_offset() {
        let zones = FALLBACK_CATALOG.nearby(&query(17.4, 78.5, 1_000_000.0), 50);
        let mut ids: Vec<i64> = zones.iter().map(|z| z.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), zones.len());
        assert!(ids.iter().all(|id| *id >= FALLBACK_ID_OFFSET));
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        static TIED: &[CatalogEntry] = &[
            safe("North", "Police", 1.0, 0.0),
            safe("South", "Police", -1.0, 0.0),
        ];
        let catalog = StaticZoneCatalog::new(TIED);
        let zones = catalog.nearby(&query(0.0, 0.0, 500_000.0), 20);

        assert_eq!(zones[0].name, "North");
        assert_eq!(zones[1].name, "South");
    }

    #[test]
    fn test_nothing_in_range() {
        // Middle of the Atlantic
        let zones = FALLBACK_CATALOG.nearby(&query(0.0, -30.0, 10_000.0), 20);
        assert!(zones.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let q = query(17.0484, 79.2674, 50_000.0);
        assert_eq!(
            FALLBACK_CATALOG.nearby(&q, 20),
            FALLBACK_CATALOG.nearby(&q, 20)
        );
    }

    #[test]
    fn test_zones_lists_whole_catalog() {
        let zones = FALLBACK_CATALOG.zones();
        assert_eq!(zones.len(), FALLBACK_CATALOG.len());
        assert_eq!(zones[0].id, FALLBACK_ID_OFFSET);
        assert!(zones.iter().all(|z| z.distance_m.is_none()));
    }
}
