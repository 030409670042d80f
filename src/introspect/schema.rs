use crate::config::{DbmsType, PersistenceConfig};
use crate::core::{LazyInit, PersistenceError, Result};
use crate::storage::{DataSource, MetadataConnection};
use log::{debug, trace, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// Finds soft-delete tables by looking for the delete timestamp column in live
/// database metadata. The set is computed once and kept for the lifetime of
/// the introspector.
pub struct SchemaIntrospector {
    data_source: Arc<dyn DataSource>,
    dbms_type: DbmsType,
    delete_ts_column: String,
    tables: LazyInit<HashSet<String>>,
}

impl SchemaIntrospector {
    pub fn new(data_source: Arc<dyn DataSource>, config: &PersistenceConfig) -> Self {
        Self {
            data_source,
            dbms_type: config.dbms_type,
            delete_ts_column: config.effective_delete_ts_column().to_string(),
            tables: LazyInit::new(),
        }
    }

    /// Lower-cased names of soft-delete tables, computed on first call.
    pub async fn soft_delete_tables(&self) -> Result<Arc<HashSet<String>>> {
        self.tables
            .get_or_try_init(|| self.compute_soft_delete_tables())
            .await
    }

    /// Full metadata scan over one connection. The connection is closed
    /// whether the scan succeeds, fails, or is cancelled.
    pub async fn compute_soft_delete_tables(&self) -> Result<HashSet<String>> {
        debug!("Searching for soft delete tables");

        let mut conn = ConnectionGuard::new(
            self.data_source
                .connection()
                .await
                .map_err(PersistenceError::initialization)?,
        );

        let result = match conn.as_mut() {
            Some(c) => self.scan(c).await,
            None => Err(PersistenceError::Connection("connection already released".into())),
        };
        conn.close().await;

        result.map_err(PersistenceError::initialization)
    }

    /// How many times the scan has been published.
    pub fn compute_count(&self) -> u64 {
        self.tables.init_count()
    }

    async fn scan(&self, conn: &mut dyn MetadataConnection) -> Result<HashSet<String>> {
        let user_name = conn.user_name()?;
        let schema = self.dbms_type.metadata_schema(&user_name);
        trace!("[soft delete tables] schema={:?}", schema);

        let mut set = HashSet::new();
        for table in conn.list_tables(schema.as_deref()).await? {
            if table.is_empty() {
                continue;
            }
            trace!("[soft delete tables] found table {}", table);

            if conn
                .has_column(schema.as_deref(), &table, &self.delete_ts_column)
                .await?
            {
                trace!(
                    "[soft delete tables] table {} has column {}",
                    table, self.delete_ts_column
                );
                set.insert(table.to_lowercase());
            }
        }
        Ok(set)
    }
}

/// Owns an open metadata connection. If dropped before `close` (the caller's
/// future was cancelled mid-scan), the close is handed to the runtime.
struct ConnectionGuard {
    conn: Option<Box<dyn MetadataConnection>>,
}

impl ConnectionGuard {
    fn new(conn: Box<dyn MetadataConnection>) -> Self {
        Self { conn: Some(conn) }
    }

    fn as_mut(&mut self) -> Option<&mut (dyn MetadataConnection + 'static)> {
        self.conn.as_deref_mut()
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            release(conn).await;
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Metadata scan cancelled, closing connection in background");
                handle.spawn(release(conn));
            }
            Err(_) => warn!("Metadata connection dropped outside a runtime without close"),
        }
    }
}

async fn release(conn: Box<dyn MetadataConnection>) {
    if let Err(e) = conn.close().await {
        warn!("Failed to close metadata connection: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryDatabase, TableSchema};

    #[tokio::test]
    async fn test_names_are_lower_cased() {
        let db = InMemoryDatabase::new();
        db.create_table(TableSchema::new("SEC_USER", &["ID", "DELETE_TS"])).unwrap();
        db.create_table(TableSchema::new("SYS_CONFIG", &["ID"])).unwrap();

        let config = PersistenceConfig::new().dbms_type(DbmsType::Hsql);
        let introspector = SchemaIntrospector::new(Arc::new(db.clone()), &config);

        let tables = introspector.soft_delete_tables().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert!(tables.contains("sec_user"));
        assert_eq!(db.stats().connections_closed, 1);
    }

    #[tokio::test]
    async fn test_oracle_scopes_to_user_schema() {
        let db = InMemoryDatabase::with_user("APP");
        db.create_table(TableSchema::new("DOC", &["DELETE_TS"]).in_schema("APP")).unwrap();
        db.create_table(TableSchema::new("FOREIGN_DOC", &["DELETE_TS"]).in_schema("OTHER"))
            .unwrap();

        let config = PersistenceConfig::new().dbms_type(DbmsType::Oracle);
        let introspector = SchemaIntrospector::new(Arc::new(db), &config);

        let tables = introspector.soft_delete_tables().await.unwrap();
        assert!(tables.contains("doc"));
        assert!(!tables.contains("foreign_doc"));
    }

    #[tokio::test]
    async fn test_empty_schema_publishes_empty_set() {
        let db = InMemoryDatabase::new();
        let introspector = SchemaIntrospector::new(Arc::new(db.clone()), &PersistenceConfig::new());

        assert!(introspector.soft_delete_tables().await.unwrap().is_empty());
        introspector.soft_delete_tables().await.unwrap();

        assert_eq!(introspector.compute_count(), 1);
        assert_eq!(db.stats().connections_opened, 1);
        assert_eq!(db.stats().connections_closed, 1);
    }
}
