use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// One row of the restaurants table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Restaurant {
    pub name: String,
    pub price_range: Option<String>,
    pub min_charge: Option<String>,
    pub address: Option<String>,
    pub open_hours: Option<String>,
    pub tags: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
}

impl Restaurant {
    #[cfg(test)]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// Single-table SQLite store of restaurant suggestions.
///
/// Every call runs in autocommit mode, so writes are durable on return.
pub struct RestaurantStore {
    conn: Connection,
}

impl RestaurantStore {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::run_migrations(&conn)?;
        info!("Restaurant store opened at: {}", path.display());
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS restaurants (
                name TEXT PRIMARY KEY NOT NULL,
                price_range TEXT,
                min_charge TEXT,
                address TEXT,
                open_hours TEXT,
                tags TEXT,
                latitude REAL,
                longitude REAL,
                notes TEXT
            );
            ",
        )
        .context("Failed to create restaurants table")?;
        Ok(())
    }

    /// Insert a new entry. Returns false on any failure, duplicate names included.
    pub fn add_entry(&self, entry: &Restaurant) -> bool {
        let result = self.conn.execute(
            "INSERT INTO restaurants
                (name, price_range, min_charge, address, open_hours, tags, latitude, longitude, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.name,
                entry.price_range,
                entry.min_charge,
                entry.address,
                entry.open_hours,
                entry.tags,
                entry.latitude,
                entry.longitude,
                entry.notes,
            ],
        );

        match result {
            Ok(_) => {
                debug!("Added restaurant '{}'", entry.name);
                true
            }
            Err(e) => {
                warn!("Failed to add restaurant '{}': {}", entry.name, e);
                false
            }
        }
    }

    /// Delete by exact name. Deleting a name that is not stored is not an error.
    pub fn remove_entry(&self, name: &str) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM restaurants WHERE name = ?1", params![name])
            .with_context(|| format!("Failed to remove restaurant '{}'", name))?;
        debug!("Removed {} row(s) named '{}'", rows, name);
        Ok(rows)
    }

    /// A uniformly random entry, or `None` when the table is empty or unreadable.
    pub fn pick_random(&self) -> Option<Restaurant> {
        let result = self
            .conn
            .query_row(
                "SELECT name, price_range, min_charge, address, open_hours, tags,
                        latitude, longitude, notes
                 FROM restaurants
                 ORDER BY RANDOM()
                 LIMIT 1",
                [],
                parse_restaurant_row,
            )
            .optional();

        match result {
            Ok(choice) => choice,
            Err(e) => {
                error!("Failed to pick a restaurant: {}", e);
                None
            }
        }
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM restaurants", [], |row| row.get(0))
            .context("Failed to count restaurants")?;
        Ok(count as usize)
    }
}

fn parse_restaurant_row(row: &rusqlite::Row) -> rusqlite::Result<Restaurant> {
    Ok(Restaurant {
        name: row.get(0)?,
        price_range: row.get(1)?,
        min_charge: row.get(2)?,
        address: row.get(3)?,
        open_hours: row.get(4)?,
        tags: row.get(5)?,
        latitude: row.get(6)?,
        longitude: row.get(7)?,
        notes: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_entry(name: &str) -> Restaurant {
        Restaurant {
            name: name.to_string(),
            price_range: Some("100-200".to_string()),
            min_charge: Some("80".to_string()),
            address: Some("No. 1, Roosevelt Rd".to_string()),
            open_hours: Some("11:00-21:00".to_string()),
            tags: Some("noodles".to_string()),
            latitude: Some(25.0174),
            longitude: Some(121.5397),
            notes: None,
        }
    }

    #[test]
    fn test_pick_random_on_empty_table() {
        let store = RestaurantStore::open_in_memory().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.pick_random().is_none());
    }

    #[test]
    fn test_single_row_always_picked() {
        let store = RestaurantStore::open_in_memory().unwrap();
        let entry = full_entry("Snake Alley Noodles");
        assert!(store.add_entry(&entry));

        for _ in 0..20 {
            assert_eq!(store.pick_random(), Some(entry.clone()));
        }
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let store = RestaurantStore::open_in_memory().unwrap();
        assert!(store.add_entry(&full_entry("Dup")));
        assert_eq!(store.count().unwrap(), 1);

        let mut other = full_entry("Dup");
        other.address = Some("elsewhere".to_string());
        assert!(!store.add_entry(&other));
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(
            store.pick_random().unwrap().address.as_deref(),
            Some("No. 1, Roosevelt Rd")
        );
    }

    #[test]
    fn test_optional_fields_stay_null() {
        let store = RestaurantStore::open_in_memory().unwrap();
        assert!(store.add_entry(&Restaurant::named("Bare")));
        let picked = store.pick_random().unwrap();
        assert_eq!(picked, Restaurant::named("Bare"));
    }

    #[test]
    fn test_remove_entry() {
        let store = RestaurantStore::open_in_memory().unwrap();
        store.add_entry(&full_entry("A"));
        store.add_entry(&full_entry("B"));

        assert_eq!(store.remove_entry("A").unwrap(), 1);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.pick_random().unwrap().name, "B");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let store = RestaurantStore::open_in_memory().unwrap();
        store.add_entry(&full_entry("A"));
        assert_eq!(store.remove_entry("not there").unwrap(), 0);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_reopen_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restaurants.db");
        {
            let store = RestaurantStore::open(&path).unwrap();
            assert!(store.add_entry(&full_entry("Persisted")));
        }
        let store = RestaurantStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.pick_random().unwrap().name, "Persisted");
    }
}
