//! Raw message audit log
//!
//! Every inbound MQTT payload is stored verbatim in SQLite, independent of
//! whether the pipeline later accepts it. Rows older than the retention
//! window are pruned periodically by the ingestion loop.

use rusqlite::{params, Connection};
use std::path::Path;

#[derive(Debug)]
pub enum AuditError {
    Io(std::io::Error),
    Database(rusqlite::Error),
}

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        AuditError::Io(err)
    }
}

impl From<rusqlite::Error> for AuditError {
    fn from(err: rusqlite::Error) -> Self {
        AuditError::Database(err)
    }
}

impl std::fmt::Display for AuditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditError::Io(e) => write!(f, "IO error: {}", e),
            AuditError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for AuditError {}

pub struct AuditLog {
    conn: Connection,
    retention_secs: i64,
}

impl AuditLog {
    pub fn new(db_path: impl AsRef<Path>, retention_secs: i64) -> Result<Self, AuditError> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS raw_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                topic TEXT NOT NULL,
                payload TEXT NOT NULL,
                received_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_received_at ON raw_messages(received_at)",
            [],
        )?;

        log::info!("✅ Audit log initialized (retention: {}s)", retention_secs);

        Ok(Self {
            conn,
            retention_secs,
        })
    }

    pub fn record(&self, topic: &str, payload: &[u8], received_at: i64) -> Result<(), AuditError> {
        let payload = String::from_utf8_lossy(payload).into_owned();
        self.conn.execute(
            "INSERT INTO raw_messages (topic, payload, received_at) VALUES (?1, ?2, ?3)",
            params![topic, payload, received_at],
        )?;
        Ok(())
    }

    /// Delete rows older than the retention window, returning how many went
    pub fn prune(&self, now: i64) -> Result<usize, AuditError> {
        let cutoff = now - self.retention_secs;
        let deleted = self.conn.execute(
            "DELETE FROM raw_messages WHERE received_at <= ?1",
            params![cutoff],
        )?;

        if deleted > 0 {
            log::debug!("Pruned {} audit rows older than {}", deleted, cutoff);
        }
        Ok(deleted)
    }

    pub fn count(&self) -> Result<i64, AuditError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM raw_messages", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_and_prune() {
        let dir = tempdir().unwrap();
        let audit = AuditLog::new(dir.path().join("audit/raw.db"), 3600).unwrap();

        audit.record("ais", br#"{"mmsi":111}"#, 1000).unwrap();
        audit.record("ais", b"not json", 2000).unwrap();
        audit.record("ais", br#"{"mmsi":222}"#, 5000).unwrap();
        assert_eq!(audit.count().unwrap(), 3);

        // cutoff = 2000: rows at or before it are dropped
        assert_eq!(audit.prune(5600).unwrap(), 2);
        assert_eq!(audit.count().unwrap(), 1);
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.db");

        {
            let audit = AuditLog::new(&path, 60).unwrap();
            audit.record("ais", b"{}", 1000).unwrap();
        }

        let audit = AuditLog::new(&path, 60).unwrap();
        assert_eq!(audit.count().unwrap(), 1);
    }
}
