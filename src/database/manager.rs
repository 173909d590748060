use duckdb::{params, Connection, Result as DuckResult};
use log::{error, info};
use std::fs;

use crate::config::DatabaseConfig;
use crate::types::DailyTotal;

use super::schema::DatabaseSchema;

/// Owns the DuckDB connection holding one step total per calendar day.
pub struct DatabaseManager {
    conn: Connection,
}

impl DatabaseManager {
    pub fn new(config: &DatabaseConfig) -> DuckResult<Self> {
        if config.auto_create_dir {
            if let Some(dir) = std::path::Path::new(&config.path).parent() {
                if !dir.as_os_str().is_empty() {
                    if let Err(e) = fs::create_dir_all(dir) {
                        error!("Failed to create data directory {}: {}", dir.display(), e);
                    }
                }
            }
        }

        let conn = Connection::open(&config.path)?;
        info!("Database connection established at: {}", config.path);
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> DuckResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> DuckResult<Self> {
        DatabaseSchema::create_tables(&conn)?;
        Ok(Self { conn })
    }

    pub fn load_count(&self, date_key: &str) -> DuckResult<Option<u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT step_count FROM step_counts WHERE date_key = ?")?;
        let mut rows = stmt.query(params![date_key])?;

        match rows.next()? {
            Some(row) => {
                let count: i64 = row.get(0)?;
                Ok(Some(count.max(0) as u64))
            }
            None => Ok(None),
        }
    }

    pub fn save_count(&self, date_key: &str, count: u64) -> DuckResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO step_counts (date_key, step_count, updated_at)
             VALUES (?, ?, current_timestamp)",
            params![date_key, count as i64],
        )?;
        Ok(())
    }

    /// Most recent days first.
    pub fn get_history(&self, limit: usize) -> DuckResult<Vec<DailyTotal>> {
        let mut stmt = self.conn.prepare(
            "SELECT date_key, step_count FROM step_counts ORDER BY date_key DESC LIMIT ?",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let date_key: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok(DailyTotal::new(date_key, count.max(0) as u64))
        })?;

        rows.collect()
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn get_stats(&self) -> DuckResult<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM step_counts", [], |row| {
                Ok(row.get::<_, i64>(0)? as usize)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_day_loads_none() {
        let db = DatabaseManager::open_in_memory().unwrap();
        assert_eq!(db.load_count("2024-01-01").unwrap(), None);
    }

    #[test]
    fn test_save_overwrites_same_day() {
        let db = DatabaseManager::open_in_memory().unwrap();
        db.save_count("2024-01-01", 5).unwrap();
        db.save_count("2024-01-01", 10).unwrap();

        assert_eq!(db.load_count("2024-01-01").unwrap(), Some(10));
        assert_eq!(db.get_stats().unwrap(), 1);
    }

    #[test]
    fn test_history_is_newest_first() {
        let db = DatabaseManager::open_in_memory().unwrap();
        db.save_count("2024-01-01", 4_000).unwrap();
        db.save_count("2024-01-03", 6_500).unwrap();
        db.save_count("2024-01-02", 9_100).unwrap();

        let history = db.get_history(2).unwrap();
        assert_eq!(
            history,
            vec![
                DailyTotal::new("2024-01-03", 6_500),
                DailyTotal::new("2024-01-02", 9_100),
            ]
        );
    }

    #[test]
    fn test_file_database_persists() {
        let dir = std::env::temp_dir().join(format!("stephub_db_{}", std::process::id()));
        let config = DatabaseConfig {
            path: dir.join("steps.db").to_string_lossy().into_owned(),
            auto_create_dir: true,
            load_timeout_ms: 1000,
        };

        {
            let db = DatabaseManager::new(&config).unwrap();
            db.save_count("2024-02-02", 321).unwrap();
        }
        let db = DatabaseManager::new(&config).unwrap();
        assert_eq!(db.load_count("2024-02-02").unwrap(), Some(321));

        drop(db);
        let _ = fs::remove_dir_all(&dir);
    }
}
