//! PostgreSQL storage engine with a scoped unit of work

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Connection, PgConnection, Postgres, Row};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::schema;
use super::session::{PendingChange, ScopedSession};
use crate::domain::entity::{BaseModel, EntityClass, Record};
use crate::domain::storage::{RecordMap, StorageEngine};
use crate::domain::DomainError;

/// PostgreSQL storage configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
    /// Drop every table before recreating it on reload
    pub drop_on_reload: bool,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "hbnb_dev".to_string(),
            password: String::new(),
            database: "hbnb_dev_db".to_string(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            drop_on_reload: false,
        }
    }
}

impl PostgresConfig {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    pub fn with_drop_on_reload(mut self, drop: bool) -> Self {
        self.drop_on_reload = drop;
        self
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

/// Storage engine over one table per registered class.
///
/// All mutations go through a single [`ScopedSession`]: `new` and `delete`
/// only stage changes, `save` applies them in one transaction, and `all`
/// reads committed rows. Each operation borrows its own pooled connection.
pub struct PostgresStorage {
    pool: PgPool,
    drop_on_reload: bool,
    session: Mutex<Option<ScopedSession>>,
}

impl Debug for PostgresStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStorage")
            .field("drop_on_reload", &self.drop_on_reload)
            .finish()
    }
}

impl PostgresStorage {
    /// Creates an engine over an existing pool. No session exists until `reload`.
    pub fn new(pool: PgPool, drop_on_reload: bool) -> Self {
        Self {
            pool,
            drop_on_reload,
            session: Mutex::new(None),
        }
    }

    /// Builds the connection pool and the engine on top of it.
    ///
    /// Every connection is pinged before it is handed out so that connections
    /// the server dropped while idle are replaced instead of failing mid-call.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .test_before_acquire(true)
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        info!(
            host = %config.host,
            database = %config.database,
            max_connections = config.max_connections,
            "Connected to PostgreSQL"
        );

        Ok(Self::new(pool, config.drop_on_reload))
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Id of the current session, `None` before the first reload
    pub async fn session_id(&self) -> Option<Uuid> {
        self.session.lock().await.as_ref().map(ScopedSession::id)
    }

    /// Snapshot of the changes staged in the current session
    pub async fn pending_changes(&self) -> Result<Vec<PendingChange>, DomainError> {
        let slot = self.session.lock().await;
        let session = slot.as_ref().ok_or(DomainError::SessionNotInitialized)?;

        Ok(session.unit().changes().cloned().collect())
    }

    /// Closes the pool itself; the engine is unusable afterwards
    pub async fn shutdown(&self) {
        self.session.lock().await.take();
        self.pool.close().await;
        info!("PostgreSQL pool closed");
    }

    /// Borrows a connection for one operation; the pool pings it first
    async fn acquire(&self) -> Result<PoolConnection<Postgres>, DomainError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to acquire connection: {}", e)))
    }

    /// Drops (when configured) and creates every table in one transaction
    async fn ensure_schema(&self) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin schema transaction: {}", e)))?;

        if self.drop_on_reload {
            for class in EntityClass::ALL.iter().rev() {
                sqlx::query(&schema::drop_table(*class))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        DomainError::storage(format!(
                            "Failed to drop table {}: {}",
                            class.table_name(),
                            e
                        ))
                    })?;
            }
            warn!("Dropped all storage tables");
        }

        for class in EntityClass::ALL {
            sqlx::query(&schema::create_table(class))
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    DomainError::storage(format!(
                        "Failed to create table {}: {}",
                        class.table_name(),
                        e
                    ))
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit schema: {}", e)))?;

        debug!(tables = EntityClass::ALL.len(), "Schema ensured");
        Ok(())
    }
}

fn row_to_record(class: EntityClass, row: &PgRow) -> Result<Record, DomainError> {
    let decode = |e: sqlx::Error| {
        DomainError::storage(format!("Failed to decode {} row: {}", class, e))
    };

    let id: String = row.try_get("id").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode)?;
    let data: Value = row.try_get("data").map_err(decode)?;

    let Value::Object(fields) = data else {
        return Err(DomainError::storage(format!(
            "{} row {} holds non-object data",
            class, id
        )));
    };

    Record::from_parts(class, &BaseModel::from_parts(id, created_at, updated_at), fields)
}

/// Parents are written before children and children removed before parents
fn commit_order(changes: &mut [PendingChange]) {
    changes.sort_by_key(|change| match change {
        PendingChange::Upsert(record) => (0, record.class() as i8),
        PendingChange::Delete { class, .. } => (1, -(*class as i8)),
    });
}

async fn apply_changes(
    conn: &mut PgConnection,
    changes: &[PendingChange],
) -> Result<(), DomainError> {
    let mut tx = conn
        .begin()
        .await
        .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

    // An early return drops `tx`, which rolls the transaction back
    for change in changes {
        match change {
            PendingChange::Upsert(record) => {
                let sql = schema::upsert(record.class());
                let base = record.base();

                let mut query = sqlx::query(&sql)
                    .bind(record.id())
                    .bind(base.created_at())
                    .bind(base.updated_at())
                    .bind(Value::Object(record.fields()?));

                for (_, parent_id) in record.parent_ids() {
                    query = query.bind(parent_id);
                }

                query.execute(&mut *tx).await.map_err(|e| {
                    DomainError::storage(format!("Failed to save {}: {}", record.storage_key(), e))
                })?;
            }
            PendingChange::Delete { class, id } => {
                sqlx::query(&schema::delete(*class))
                    .bind(id.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        DomainError::storage(format!(
                            "Failed to delete {}: {}",
                            class.storage_key(id),
                            e
                        ))
                    })?;
            }
        }
    }

    tx.commit()
        .await
        .map_err(|e| DomainError::storage(format!("Failed to commit: {}", e)))
}

#[async_trait]
impl StorageEngine for PostgresStorage {
    async fn all(&self, class: Option<EntityClass>) -> Result<RecordMap, DomainError> {
        let slot = self.session.lock().await;
        if slot.is_none() {
            return Err(DomainError::SessionNotInitialized);
        }
        let mut conn = self.acquire().await?;

        let classes: Vec<EntityClass> = match class {
            Some(class) => vec![class],
            None => EntityClass::ALL.to_vec(),
        };

        let mut records = RecordMap::new();

        for class in classes {
            let rows = sqlx::query(&schema::select_all(class))
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to query {}: {}", class, e)))?;

            for row in &rows {
                let record = row_to_record(class, row)?;
                records.insert(record.storage_key(), record);
            }
        }

        Ok(records)
    }

    async fn new(&self, record: Record) -> Result<(), DomainError> {
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(DomainError::SessionNotInitialized)?;

        debug!(key = %record.storage_key(), "Staging entity");
        session.unit_mut().stage_upsert(record);
        Ok(())
    }

    async fn save(&self) -> Result<(), DomainError> {
        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(DomainError::SessionNotInitialized)?;

        if session.unit().is_empty() {
            return Ok(());
        }

        let mut changes: Vec<PendingChange> = session.unit().changes().cloned().collect();
        commit_order(&mut changes);

        // Pending changes survive a failed commit so the caller can retry
        let applied = match self.acquire().await {
            Ok(mut conn) => apply_changes(&mut conn, &changes).await,
            Err(e) => Err(e),
        };

        if let Err(e) = applied {
            warn!(pending = changes.len(), error = %e, "Commit failed, changes kept");
            return Err(e);
        }

        session.unit_mut().clear();
        info!(changes = changes.len(), "Committed unit of work");
        Ok(())
    }

    async fn delete(&self, record: Option<&Record>) -> Result<(), DomainError> {
        let Some(record) = record else {
            return Ok(());
        };

        let mut slot = self.session.lock().await;
        let session = slot.as_mut().ok_or(DomainError::SessionNotInitialized)?;

        debug!(key = %record.storage_key(), "Staging delete");
        session.unit_mut().stage_delete(record);
        Ok(())
    }

    async fn reload(&self) -> Result<(), DomainError> {
        self.ensure_schema().await?;

        let mut slot = self.session.lock().await;
        let fresh = ScopedSession::new();
        let id = fresh.id();

        if let Some(previous) = slot.replace(fresh) {
            if !previous.unit().is_empty() {
                warn!(
                    session = %previous.id(),
                    discarded = previous.unit().len(),
                    "Discarding uncommitted changes"
                );
            }
        }

        info!(session = %id, "Storage session started");
        Ok(())
    }

    async fn close(&self) -> Result<(), DomainError> {
        let mut slot = self.session.lock().await;

        if let Some(session) = slot.as_mut() {
            if !session.unit().is_empty() {
                debug!(
                    session = %session.id(),
                    discarded = session.unit().len(),
                    "Discarding uncommitted changes"
                );
            }
            session.release();
        }
        Ok(())
    }
}
