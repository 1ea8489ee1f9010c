//! `PostgreSQL` implementation of the `EventStore` trait.

use accounts_core::error::DomainError;
use accounts_core::event::{StreamId, StreamVersion};
use accounts_core::repository::{EventStore, EventStoreSession, StoredEvent, check_positions};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

const PRIMARY_KEY_CONSTRAINT: &str = "eventstore_pkey";

const SELECT_STREAM: &str = r"
SELECT event_id, event_name, payload, occurred_at, stream_version
FROM eventstore
WHERE stream_id = $1 AND stream_version BETWEEN $2 AND $3
ORDER BY stream_version ASC
";

const SELECT_CURRENT_VERSION: &str = r"
SELECT COALESCE(MAX(stream_version), 0) AS current_version
FROM eventstore
WHERE stream_id = $1
";

const INSERT_EVENT: &str = r"
INSERT INTO eventstore (stream_id, stream_version, event_id, event_name, payload, occurred_at)
VALUES ($1, $2, $3, $4, $5, $6)
";

const DELETE_STREAM: &str = r"
DELETE FROM eventstore WHERE stream_id = $1
";

fn technical(err: &sqlx::Error) -> DomainError {
    DomainError::Technical(err.to_string())
}

fn to_db_version(version: StreamVersion) -> Result<i64, DomainError> {
    i64::try_from(version).map_err(|_| {
        DomainError::Technical(format!("stream version {version} exceeds the store's range"))
    })
}

fn from_db_version(version: i64) -> Result<StreamVersion, DomainError> {
    StreamVersion::try_from(version)
        .map_err(|_| DomainError::Technical(format!("negative stream version {version} in store")))
}

fn row_to_stored_event(row: &PgRow) -> Result<StoredEvent, DomainError> {
    let event_id: Uuid = row.try_get("event_id").map_err(|e| technical(&e))?;
    let event_name: String = row.try_get("event_name").map_err(|e| technical(&e))?;
    let payload: Vec<u8> = row.try_get("payload").map_err(|e| technical(&e))?;
    let occurred_at: DateTime<Utc> = row.try_get("occurred_at").map_err(|e| technical(&e))?;
    let stream_version: i64 = row.try_get("stream_version").map_err(|e| technical(&e))?;

    Ok(StoredEvent {
        event_id,
        event_name,
        payload,
        occurred_at,
        stream_version: from_db_version(stream_version)?,
    })
}

async fn select_stream(
    conn: &mut PgConnection,
    stream_id: &StreamId,
    from_version: StreamVersion,
    to_version: StreamVersion,
) -> Result<Vec<StoredEvent>, DomainError> {
    let rows = sqlx::query(SELECT_STREAM)
        .bind(stream_id.as_str())
        .bind(to_db_version(from_version)?)
        .bind(to_db_version(to_version)?)
        .fetch_all(conn)
        .await
        .map_err(|e| technical(&e))?;

    rows.iter().map(row_to_stored_event).collect()
}

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn begin(&self) -> Result<Box<dyn EventStoreSession>, DomainError> {
        let tx = self.pool.begin().await.map_err(|e| technical(&e))?;
        Ok(Box::new(PgEventStoreSession { tx }))
    }

    async fn retrieve_event_stream(
        &self,
        stream_id: &StreamId,
        from_version: StreamVersion,
        to_version: StreamVersion,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(|e| technical(&e))?;
        select_stream(&mut *conn, stream_id, from_version, to_version).await
    }

    async fn purge_event_stream(&self, stream_id: &StreamId) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| technical(&e))?;

        let deleted = sqlx::query(DELETE_STREAM)
            .bind(stream_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| technical(&e))?
            .rows_affected();

        tx.commit().await.map_err(|e| technical(&e))?;

        tracing::info!(stream_id = %stream_id, deleted, "purged event stream");
        Ok(())
    }
}

/// One PostgreSQL transaction. Dropping it without commit rolls back.
pub struct PgEventStoreSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl EventStoreSession for PgEventStoreSession {
    async fn retrieve_event_stream(
        &mut self,
        stream_id: &StreamId,
        from_version: StreamVersion,
        to_version: StreamVersion,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        select_stream(&mut *self.tx, stream_id, from_version, to_version).await
    }

    async fn append_to_event_stream(
        &mut self,
        stream_id: &StreamId,
        expected_version: StreamVersion,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        check_positions(stream_id, expected_version, events)?;

        let conflict = || DomainError::ConcurrencyConflict {
            stream_id: stream_id.to_string(),
            expected_version,
        };

        let current_version: i64 = sqlx::query(SELECT_CURRENT_VERSION)
            .bind(stream_id.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .and_then(|row| row.try_get("current_version"))
            .map_err(|e| technical(&e))?;
        if from_db_version(current_version)? != expected_version {
            return Err(conflict());
        }

        for event in events {
            sqlx::query(INSERT_EVENT)
                .bind(stream_id.as_str())
                .bind(to_db_version(event.stream_version)?)
                .bind(event.event_id)
                .bind(&event.event_name)
                .bind(&event.payload)
                .bind(event.occurred_at)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| match &e {
                    sqlx::Error::Database(db)
                        if db.is_unique_violation()
                            && db.constraint() == Some(PRIMARY_KEY_CONSTRAINT) =>
                    {
                        conflict()
                    }
                    _ => technical(&e),
                })?;
        }

        tracing::debug!(
            stream_id = %stream_id,
            expected_version,
            appended = events.len(),
            "appended events"
        );
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.commit().await.map_err(|e| technical(&e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx.rollback().await.map_err(|e| technical(&e))
    }
}
