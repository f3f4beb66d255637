//! LanceDB connection and housekeeping helpers.
//!
//! The store root is one LanceDB database; every namespace is a table in it and
//! therefore its own `<root>/<namespace>.lance` directory.

use lancedb::{connect, Connection, Table};
use std::path::Path;
use std::time::Duration;

use finrag_core::{Error, Result};

pub async fn open_db(root: &Path) -> Result<Connection> {
    std::fs::create_dir_all(root)
        .map_err(|e| Error::InvalidConfig(format!("cannot create store root {}: {e}", root.display())))?;
    // Zero interval: every read checks for newer versions committed by other handles.
    connect(root.to_string_lossy().as_ref())
        .read_consistency_interval(Duration::ZERO)
        .execute()
        .await
        .map_err(|e| Error::InvalidConfig(format!("cannot open vector store at {}: {e}", root.display())))
}

/// `Ok(None)` when the namespace has never been written.
pub async fn open_table_if_exists(conn: &Connection, namespace: &str) -> Result<Option<Table>> {
    match conn.open_table(namespace).execute().await {
        Ok(table) => Ok(Some(table)),
        Err(lancedb::Error::TableNotFound { .. }) => Ok(None),
        Err(e) => Err(Error::load(namespace, e)),
    }
}

pub async fn table_names(conn: &Connection) -> Result<Vec<String>> {
    conn.table_names().execute().await.map_err(|e| Error::load("*", e))
}
