//! SQLite-backed survey queue.
//!
//! Each call opens its own connection on the blocking pool and commits before
//! returning, with `synchronous = FULL` so an acknowledged write survives a
//! crash or power loss.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;
use tracing::{debug, info};

use super::{EnumeratorSession, QueueCounts, RecordStore, StoreResult, SurveyRecord};
use crate::error::StoreError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS surveys (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        payload TEXT NOT NULL,
        verification TEXT NOT NULL,
        receipt TEXT NOT NULL,
        synced INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        synced_at TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_surveys_synced ON surveys(synced, seq);
    CREATE TABLE IF NOT EXISTS enumerator_session (
        slot INTEGER PRIMARY KEY CHECK (slot = 0),
        id TEXT NOT NULL,
        name TEXT NOT NULL,
        assigned_area TEXT NOT NULL,
        assigned_ward TEXT NOT NULL
    );
"#;

const SELECT_RECORD: &str =
    "SELECT id, payload, verification, receipt, synced, created_at, synced_at FROM surveys";

type RawRecord = (String, String, String, String, bool, String, Option<String>);

fn connect(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA synchronous = FULL;")?;
    Ok(conn)
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn into_record(raw: RawRecord) -> StoreResult<SurveyRecord> {
    let (id, payload, verification, receipt, synced, created_at, synced_at) = raw;
    Ok(SurveyRecord {
        id,
        payload: serde_json::from_str(&payload)?,
        verification: serde_json::from_str(&verification)?,
        receipt: serde_json::from_str(&receipt)?,
        synced,
        created_at: parse_timestamp(&created_at)?,
        synced_at: synced_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn list_by_flag(path: &Path, synced: bool) -> StoreResult<Vec<SurveyRecord>> {
    let conn = connect(path)?;
    let mut stmt = conn.prepare(&format!("{SELECT_RECORD} WHERE synced = ?1 ORDER BY seq ASC"))?;
    let rows = stmt
        .query_map(params![synced], read_raw)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(into_record).collect()
}

/// Survey queue persisted in a single SQLite file.
#[derive(Clone)]
pub struct SqliteRecordStore {
    db_path: PathBuf,
}

impl SqliteRecordStore {
    /// Open (or create) the store at `db_path`. Existing records are kept.
    pub async fn open(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let path_clone = path.clone();

        task::spawn_blocking(move || {
            if let Some(parent) = path_clone.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let conn = connect(&path_clone)?;
            conn.execute_batch(SCHEMA)?;
            Ok::<_, StoreError>(())
        })
        .await??;

        info!("Survey store ready at {}", path.display());
        Ok(Self { db_path: path })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn append(&self, record: SurveyRecord) -> StoreResult<()> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let payload = serde_json::to_string(&record.payload)?;
            let verification = serde_json::to_string(&record.verification)?;
            let receipt = serde_json::to_string(&record.receipt)?;

            let mut conn = connect(&path)?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM surveys WHERE id = ?1)",
                params![&record.id],
                |row| row.get(0),
            )?;
            if exists {
                return Err(StoreError::DuplicateId(record.id));
            }

            tx.execute(
                "INSERT INTO surveys (id, payload, verification, receipt, synced, created_at, synced_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, NULL)",
                params![
                    &record.id,
                    &payload,
                    &verification,
                    &receipt,
                    record.created_at.to_rfc3339()
                ],
            )?;
            tx.commit()?;

            debug!(survey_id = %record.id, "Survey appended to queue");
            Ok(())
        })
        .await?
    }

    async fn mark_synced(&self, id: &str) -> StoreResult<()> {
        let path = self.db_path.clone();
        let id = id.to_string();

        task::spawn_blocking(move || {
            let mut conn = connect(&path)?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let synced: Option<bool> = tx
                .query_row(
                    "SELECT synced FROM surveys WHERE id = ?1",
                    params![&id],
                    |row| row.get(0),
                )
                .optional()?;

            match synced {
                None => return Err(StoreError::NotFound(id)),
                Some(true) => debug!(survey_id = %id, "Survey already marked synced"),
                Some(false) => {
                    tx.execute(
                        "UPDATE surveys SET synced = 1, synced_at = ?1 WHERE id = ?2",
                        params![Utc::now().to_rfc3339(), &id],
                    )?;
                    debug!(survey_id = %id, "Survey marked synced");
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await?
    }

    async fn list_pending(&self) -> StoreResult<Vec<SurveyRecord>> {
        let path = self.db_path.clone();
        task::spawn_blocking(move || list_by_flag(&path, false)).await?
    }

    async fn list_synced(&self) -> StoreResult<Vec<SurveyRecord>> {
        let path = self.db_path.clone();
        task::spawn_blocking(move || list_by_flag(&path, true)).await?
    }

    async fn get(&self, id: &str) -> StoreResult<Option<SurveyRecord>> {
        let path = self.db_path.clone();
        let id = id.to_string();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            let raw = conn
                .query_row(
                    &format!("{SELECT_RECORD} WHERE id = ?1"),
                    params![&id],
                    read_raw,
                )
                .optional()?;
            raw.map(into_record).transpose()
        })
        .await?
    }

    async fn counts(&self) -> StoreResult<QueueCounts> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            let (pending, synced): (i64, i64) = conn.query_row(
                "SELECT COALESCE(SUM(synced = 0), 0), COALESCE(SUM(synced = 1), 0) FROM surveys",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok::<_, StoreError>(QueueCounts {
                pending: pending as usize,
                synced: synced as usize,
            })
        })
        .await?
    }

    async fn set_session(&self, session: EnumeratorSession) -> StoreResult<()> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            conn.execute(
                "INSERT OR REPLACE INTO enumerator_session (slot, id, name, assigned_area, assigned_ward)
                 VALUES (0, ?1, ?2, ?3, ?4)",
                params![
                    &session.id,
                    &session.name,
                    &session.assigned_area,
                    &session.assigned_ward
                ],
            )?;
            Ok::<_, StoreError>(())
        })
        .await?
    }

    async fn session(&self) -> StoreResult<Option<EnumeratorSession>> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = connect(&path)?;
            let session = conn
                .query_row(
                    "SELECT id, name, assigned_area, assigned_ward FROM enumerator_session WHERE slot = 0",
                    [],
                    |row| {
                        Ok(EnumeratorSession {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            assigned_area: row.get(2)?,
                            assigned_ward: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok::<_, StoreError>(session)
        })
        .await?
    }

    async fn clear(&self) -> StoreResult<()> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || {
            let mut conn = connect(&path)?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let removed = tx.execute("DELETE FROM surveys", [])?;
            tx.execute("DELETE FROM enumerator_session", [])?;
            tx.commit()?;

            info!("Survey store cleared ({} records removed)", removed);
            Ok::<_, StoreError>(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn survey(name: &str) -> SurveyRecord {
        SurveyRecord::capture(
            json!({ "name": name, "age": "40", "income": "12000" }),
            json!({ "confidence": 92, "conflictDetected": false }),
            json!({ "transactionHash": "0xabc", "status": "Anchored" }),
        )
    }

    fn ids(records: &[SurveyRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_append_and_partition() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = SqliteRecordStore::open(dir.path().join("queue.db")).await?;

        let a = survey("Amit");
        let b = survey("Meera");
        store.append(a.clone()).await?;
        store.append(b.clone()).await?;

        let pending = store.list_pending().await?;
        assert_eq!(pending, vec![a.clone(), b.clone()]);
        assert!(store.list_synced().await?.is_empty());

        store.mark_synced(&a.id).await?;

        assert_eq!(ids(&store.list_pending().await?), vec![b.id.clone()]);
        let synced = store.list_synced().await?;
        assert_eq!(ids(&synced), vec![a.id.clone()]);
        assert!(synced[0].synced);
        assert!(synced[0].synced_at.is_some());
        assert_eq!(synced[0].payload, a.payload);

        assert_eq!(store.counts().await?, QueueCounts { pending: 1, synced: 1 });
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = SqliteRecordStore::open(dir.path().join("queue.db")).await?;

        let a = survey("Ravi");
        store.append(a.clone()).await?;

        let err = store.append(a.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(ref id) if *id == a.id));
        assert_eq!(store.list_pending().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_synced_is_idempotent_and_checks_existence() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = SqliteRecordStore::open(dir.path().join("queue.db")).await?;

        let a = survey("Sunita");
        store.append(a.clone()).await?;
        store.mark_synced(&a.id).await?;
        let first = store.get(&a.id).await?.unwrap().synced_at;

        store.mark_synced(&a.id).await?;
        let second = store.get(&a.id).await?.unwrap();
        assert!(second.synced);
        assert_eq!(second.synced_at, first);
        assert_eq!(store.counts().await?, QueueCounts { pending: 0, synced: 1 });

        let err = store.mark_synced("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref id) if id == "missing"));
        Ok(())
    }

    #[tokio::test]
    async fn test_append_always_starts_pending() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = SqliteRecordStore::open(dir.path().join("queue.db")).await?;

        let mut a = survey("Vikram");
        a.synced = true;
        store.append(a.clone()).await?;

        let stored = store.get(&a.id).await?.unwrap();
        assert!(!stored.synced);
        assert!(stored.synced_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_pending_list_is_a_snapshot() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = SqliteRecordStore::open(dir.path().join("queue.db")).await?;

        let a = survey("Anjali");
        store.append(a.clone()).await?;
        let snapshot = store.list_pending().await?;

        store.mark_synced(&a.id).await?;
        store.append(survey("Rajesh")).await?;

        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot[0].synced);
        Ok(())
    }

    #[tokio::test]
    async fn test_reopen_keeps_order_and_session() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("queue.db");

        let records = vec![survey("A"), survey("B"), survey("C")];
        {
            let store = SqliteRecordStore::open(&path).await?;
            for record in &records {
                store.append(record.clone()).await?;
            }
            store
                .set_session(EnumeratorSession {
                    id: "ENUM-7".to_string(),
                    name: "Field Officer".to_string(),
                    assigned_area: "North".to_string(),
                    assigned_ward: "Ward 12".to_string(),
                })
                .await?;
        }

        let reopened = SqliteRecordStore::open(&path).await?;
        assert_eq!(reopened.list_pending().await?, records);
        assert_eq!(reopened.session().await?.unwrap().id, "ENUM-7");
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_drops_records_and_session() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = SqliteRecordStore::open(dir.path().join("queue.db")).await?;

        store
            .set_session(EnumeratorSession {
                id: "ENUM-1".to_string(),
                name: "Officer".to_string(),
                assigned_area: "East".to_string(),
                assigned_ward: "Ward 3".to_string(),
            })
            .await?;
        let a = survey("Priya");
        store.append(a.clone()).await?;
        store.mark_synced(&a.id).await?;
        store.append(survey("Amit")).await?;

        store.clear().await?;

        assert!(store.list_pending().await?.is_empty());
        assert!(store.list_synced().await?.is_empty());
        assert!(store.session().await?.is_none());
        assert_eq!(store.counts().await?, QueueCounts::default());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_writers_wait_for_the_lock() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = SqliteRecordStore::open(dir.path().join("queue.db")).await?;

        let seeded: Vec<SurveyRecord> = (0..200).map(|i| survey(&format!("seed-{i}"))).collect();
        for record in &seeded {
            store.append(record.clone()).await?;
        }

        let appender = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..400 {
                    store.append(survey(&format!("late-{i}"))).await?;
                }
                Ok::<_, StoreError>(())
            })
        };
        for record in &seeded {
            store.mark_synced(&record.id).await?;
        }
        appender.await??;

        assert_eq!(store.counts().await?, QueueCounts { pending: 400, synced: 200 });
        Ok(())
    }
}
