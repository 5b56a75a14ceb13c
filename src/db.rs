use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use rusqlite::{params, Connection, DatabaseName, OptionalExtension};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::models::{Concert, ConcertPatch};
use crate::utils;
use crate::validate::{validate_concert, ValidationError};

/// Layout version kept in `PRAGMA user_version`.
pub const STORE_SCHEMA_VERSION: i64 = 1;

const BACKUP_PREFIX: &str = "concerts-";
const BACKUP_SUFFIX: &str = ".sqlite";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid concert: {0}")]
    Invalid(#[from] ValidationError),
    #[error("concert not found: {0}")]
    NotFound(String),
    #[error("milestone not found: {0}")]
    MilestoneNotFound(String),
    #[error("concert already exists: {0}")]
    Duplicate(String),
    #[error("backup failed: {0}")]
    Backup(String),
    #[error("store schema version {found} is newer than supported {supported}")]
    SchemaVersion { found: i64, supported: i64 },
}

/// Persistence boundary for committed concerts.
pub trait ConcertStore {
    fn create(&self, concert: Concert) -> Result<Concert, StoreError>;
    fn list(&self) -> Result<Vec<Concert>, StoreError>;
    fn get(&self, id: &str) -> Result<Concert, StoreError>;
    fn patch(&self, id: &str, patch: ConcertPatch) -> Result<Concert, StoreError>;
    fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Applies the manual timeline toggle to one milestone and saves it.
    fn toggle_milestone(&self, concert_id: &str, milestone_id: &str) -> Result<Concert, StoreError> {
        let mut concert = self.get(concert_id)?;
        concert
            .milestone_mut(milestone_id)
            .ok_or_else(|| StoreError::MilestoneNotFound(milestone_id.to_string()))?
            .toggle();
        self.patch(
            concert_id,
            ConcertPatch {
                milestones: Some(concert.milestones),
                ..ConcertPatch::default()
            },
        )
    }
}

pub struct Store {
    conn: Connection,
    backup_dir: Option<PathBuf>,
    backup_retention: usize,
}

impl Store {
    pub fn open_default(config: &AppConfig) -> Result<Self, StoreError> {
        let path = utils::database_path();
        utils::ensure_parent(&path);
        Self::open(&path, Some(utils::backups_dir()), config.backup_retention)
    }

    pub fn open(
        path: &Path,
        backup_dir: Option<PathBuf>,
        backup_retention: usize,
    ) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, backup_dir, backup_retention)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, None, 0)
    }

    fn with_connection(
        conn: Connection,
        backup_dir: Option<PathBuf>,
        backup_retention: usize,
    ) -> Result<Self, StoreError> {
        let store = Self {
            conn,
            backup_dir,
            backup_retention,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let found: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        if found > STORE_SCHEMA_VERSION {
            return Err(StoreError::SchemaVersion {
                found,
                supported: STORE_SCHEMA_VERSION,
            });
        }
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS concerts(
                id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                created_at_utc TEXT NOT NULL,
                updated_at_utc TEXT NOT NULL
            );",
        )?;
        if found < STORE_SCHEMA_VERSION {
            self.conn
                .pragma_update(None, "user_version", STORE_SCHEMA_VERSION)?;
        }
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    /// Copies the database into the backup directory and prunes the oldest
    /// copies beyond the retention count. No-op without a backup directory.
    pub fn backup(&self) -> Result<Option<PathBuf>, StoreError> {
        let Some(dir) = &self.backup_dir else {
            return Ok(None);
        };
        fs::create_dir_all(dir).map_err(|err| StoreError::Backup(err.to_string()))?;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
        let path = dir.join(format!("{BACKUP_PREFIX}{stamp}{BACKUP_SUFFIX}"));
        self.conn
            .backup(DatabaseName::Main, &path, None)
            .map_err(|err| StoreError::Backup(err.to_string()))?;
        self.prune_backups(dir);
        Ok(Some(path))
    }

    fn prune_backups(&self, dir: &Path) {
        let mut backups: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| {
                            name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_SUFFIX)
                        })
                })
                .collect(),
            Err(err) => {
                warn!("cannot list backups in {:?}: {err}", dir);
                return;
            }
        };
        backups.sort();
        let excess = backups.len().saturating_sub(self.backup_retention.max(1));
        for old in backups.into_iter().take(excess) {
            if let Err(err) = fs::remove_file(&old) {
                warn!("cannot remove old backup {:?}: {err}", old);
            }
        }
    }

    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM concerts WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }
}

impl ConcertStore for Store {
    fn create(&self, concert: Concert) -> Result<Concert, StoreError> {
        validate_concert(&concert)?;
        if self.exists(&concert.id)? {
            return Err(StoreError::Duplicate(concert.id));
        }
        self.backup()?;
        let payload = serde_json::to_string(&concert)?;
        self.conn.execute(
            "INSERT INTO concerts (id, payload, created_at_utc, updated_at_utc)
             VALUES (?1, ?2, ?3, ?4)",
            params![concert.id, payload, concert.created_at, concert.updated_at],
        )?;
        info!(id = %concert.id, title = %concert.title, "concert created");
        Ok(concert)
    }

    fn list(&self) -> Result<Vec<Concert>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM concerts ORDER BY created_at_utc, id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    fn get(&self, id: &str) -> Result<Concert, StoreError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM concerts WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let payload = payload.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(serde_json::from_str(&payload)?)
    }

    fn patch(&self, id: &str, patch: ConcertPatch) -> Result<Concert, StoreError> {
        let mut concert = self.get(id)?;
        patch.apply(&mut concert);
        concert.updated_at = Utc::now().to_rfc3339();
        validate_concert(&concert)?;

        self.backup()?;
        let payload = serde_json::to_string(&concert)?;
        self.conn.execute(
            "UPDATE concerts SET payload = ?2, updated_at_utc = ?3 WHERE id = ?1",
            params![id, payload, concert.updated_at],
        )?;
        info!(id = %id, "concert patched");
        Ok(concert)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        if !self.exists(id)? {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.backup()?;
        self.conn
            .execute("DELETE FROM concerts WHERE id = ?1", params![id])?;
        info!(id = %id, "concert deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ConcertDraft, ConcertStatus, MilestoneStatus, MilestoneType, Source, TicketMilestone,
    };

    fn concert(title: &str) -> Concert {
        let draft = ConcertDraft {
            title: title.to_string(),
            venue: "日本武道館".to_string(),
            milestones: vec![TicketMilestone::planned(
                MilestoneType::GeneralSaleOpen,
                "2026-04-18".to_string(),
                Some("10:00".to_string()),
            )],
            ..ConcertDraft::default()
        };
        Concert::from_draft(draft, Source::manual(), Utc::now())
    }

    #[test]
    fn create_list_get_roundtrip() {
        let store = Store::open_in_memory().expect("store");
        let created = store.create(concert("SPRING LIVE")).expect("create");
        let listed = store.list().expect("list");
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(store.get(&created.id).expect("get"), created);
        assert_eq!(store.schema_version().expect("version"), STORE_SCHEMA_VERSION);
    }

    #[test]
    fn create_rejects_invalid_and_duplicate() {
        let store = Store::open_in_memory().expect("store");
        let err = store.create(concert("")).expect_err("empty title");
        assert!(matches!(err, StoreError::Invalid(ref e) if e.path == "title"));

        let created = store.create(concert("A")).expect("create");
        let err = store.create(created).expect_err("duplicate");
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn patch_updates_fields_and_keeps_created_at() {
        let store = Store::open_in_memory().expect("store");
        let created = store.create(concert("A")).expect("create");
        let patched = store
            .patch(
                &created.id,
                ConcertPatch {
                    title: Some("B".to_string()),
                    status: Some(ConcertStatus::Confirmed),
                    ..ConcertPatch::default()
                },
            )
            .expect("patch");
        assert_eq!(patched.title, "B");
        assert_eq!(patched.status, ConcertStatus::Confirmed);
        assert_eq!(patched.created_at, created.created_at);
        assert_eq!(store.get(&created.id).expect("get").title, "B");
    }

    #[test]
    fn patch_and_delete_unknown_id() {
        let store = Store::open_in_memory().expect("store");
        assert!(matches!(
            store.patch("nope", ConcertPatch::default()),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.delete("nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_removes_concert() {
        let store = Store::open_in_memory().expect("store");
        let created = store.create(concert("A")).expect("create");
        store.delete(&created.id).expect("delete");
        assert!(store.list().expect("list").is_empty());
    }

    #[test]
    fn toggle_milestone_cycles_and_persists() {
        let store = Store::open_in_memory().expect("store");
        let created = store.create(concert("A")).expect("create");
        let milestone_id = created.milestones[0].id.clone();

        let once = store
            .toggle_milestone(&created.id, &milestone_id)
            .expect("toggle");
        assert_eq!(once.milestones[0].status, MilestoneStatus::Done);
        let twice = store
            .toggle_milestone(&created.id, &milestone_id)
            .expect("toggle");
        assert_eq!(twice.milestones[0].status, MilestoneStatus::Planned);
        assert_eq!(
            store.get(&created.id).expect("get").milestones[0].status,
            MilestoneStatus::Planned
        );

        assert!(matches!(
            store.toggle_milestone(&created.id, "missing"),
            Err(StoreError::MilestoneNotFound(_))
        ));
    }

    #[test]
    fn mutations_write_pruned_backups() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backups = dir.path().join("backups");
        let store = Store::open(&dir.path().join("concerts.sqlite"), Some(backups.clone()), 2)
            .expect("store");

        let created = store.create(concert("A")).expect("create");
        for title in ["B", "C", "D"] {
            store
                .patch(
                    &created.id,
                    ConcertPatch {
                        title: Some(title.to_string()),
                        ..ConcertPatch::default()
                    },
                )
                .expect("patch");
        }

        let count = fs::read_dir(&backups).expect("backups dir").count();
        assert_eq!(count, 2);

        let reopened = Store::open(&dir.path().join("concerts.sqlite"), None, 0).expect("reopen");
        assert_eq!(reopened.get(&created.id).expect("get").title, "D");
    }

    #[test]
    fn refuses_newer_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("concerts.sqlite");
        {
            let conn = Connection::open(&path).expect("open");
            conn.pragma_update(None, "user_version", STORE_SCHEMA_VERSION + 1)
                .expect("pragma");
        }
        assert!(matches!(
            Store::open(&path, None, 0),
            Err(StoreError::SchemaVersion { .. })
        ));
    }
}
