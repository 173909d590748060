use duckdb::{Connection, Result as DuckResult};
use log::info;

pub struct DatabaseSchema;

impl DatabaseSchema {
    pub fn create_tables(conn: &Connection) -> DuckResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS step_counts (
                date_key VARCHAR PRIMARY KEY,
                step_count BIGINT NOT NULL,
                updated_at TIMESTAMP
            )",
            [],
        )?;

        info!("Step count table ready");
        Ok(())
    }
}
