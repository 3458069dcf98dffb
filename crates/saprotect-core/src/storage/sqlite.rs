use crate::error::Error;
use rusqlite::Connection;
use std::path::Path;
use tracing::debug;

/// Owned handle on the integrity store. The connection is closed when the
/// handle is dropped, on every exit path.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let connect = || -> rusqlite::Result<Self> {
            let conn = Connection::open(path)?;
            let db = Database { conn };
            db.configure_pragmas()?;
            db.migrate_schema()?;
            Ok(db)
        };
        let db = connect().map_err(|source| Error::StoreConnection {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Opened integrity store at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let connect = || -> rusqlite::Result<Self> {
            let conn = Connection::open_in_memory()?;
            let db = Database { conn };
            db.configure_pragmas()?;
            db.migrate_schema()?;
            Ok(db)
        };
        connect().map_err(|source| Error::StoreConnection {
            path: ":memory:".to_string(),
            source,
        })
    }

    fn configure_pragmas(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode)");
        Ok(())
    }

    /// Tables are created if missing; stores written by older versions of the
    /// tool already have the same two tables and only gain indexes.
    fn migrate_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema initialized (version 1)");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close explicitly, surfacing any error the implicit drop would swallow.
    pub fn close(self) -> Result<(), Error> {
        self.conn.close().map_err(|(_, e)| Error::Database(e))?;
        debug!("Integrity store closed");
        Ok(())
    }
}
