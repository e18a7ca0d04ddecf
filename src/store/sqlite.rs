//! SQLite-backed record store
//!
//! Every call opens its own connection on the blocking pool, so the store
//! is cheap to clone and safe to share across tasks.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::debug;
use uuid::Uuid;

use super::{MemberRole, RecordFilter, RecordStore, StoreError, StoreResult, WorkspaceDirectory};
use crate::evaluation::{AnswerSet, ItemNotes};
use crate::property::{normalize_address, PropertyDraft, PropertyPatch, PropertyRecord};

const SELECT_COLUMNS: &str = "id, user_id, workspace_id, address, neighborhood, price, bedrooms, bathrooms, \
     year_built, property_taxes, square_footage, favorite, compare_selected, evaluation_status, \
     offer_intent, overall_rating, answers, primary_photo, created_at, updated_at, notes";

#[derive(Clone)]
pub struct SqliteRecordStore {
    db_path: PathBuf,
}

impl SqliteRecordStore {
    pub async fn new(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let path_clone = path.clone();

        task::spawn_blocking(move || {
            let conn = Connection::open(&path_clone)
                .with_context(|| format!("Failed to open {}", path_clone.display()))?;

            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS properties (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    workspace_id TEXT NOT NULL,
                    address TEXT NOT NULL,
                    address_key TEXT NOT NULL,
                    neighborhood TEXT,
                    price REAL NOT NULL,
                    bedrooms INTEGER NOT NULL DEFAULT 0,
                    bathrooms REAL NOT NULL DEFAULT 0,
                    year_built INTEGER,
                    property_taxes REAL,
                    square_footage INTEGER,
                    favorite INTEGER NOT NULL DEFAULT 0,
                    compare_selected INTEGER NOT NULL DEFAULT 0,
                    evaluation_status TEXT NOT NULL,
                    offer_intent TEXT NOT NULL,
                    overall_rating REAL NOT NULL DEFAULT 0,
                    answers TEXT NOT NULL DEFAULT '{}',
                    notes TEXT NOT NULL DEFAULT '{}',
                    primary_photo TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_properties_user ON properties(user_id, created_at);
                CREATE INDEX IF NOT EXISTS idx_properties_address ON properties(user_id, address_key);

                CREATE TABLE IF NOT EXISTS workspaces (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    owner_id TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS workspace_members (
                    workspace_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    PRIMARY KEY (workspace_id, user_id)
                );
                "#,
            )?;

            Ok::<_, anyhow::Error>(())
        })
        .await
        .map_err(join_error)??;

        Ok(Self { db_path: path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

fn join_error(err: task::JoinError) -> StoreError {
    StoreError::Backend(format!("blocking task failed: {}", err))
}

fn timestamp(at: DateTime<Utc>) -> String {
    // Fixed width so lexical order matches chronological order
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Raw column values, converted once the row is out of rusqlite's hands
struct PropertyRow {
    id: String,
    user_id: String,
    workspace_id: String,
    address: String,
    neighborhood: Option<String>,
    price: f64,
    bedrooms: u32,
    bathrooms: f32,
    year_built: Option<i32>,
    property_taxes: Option<f64>,
    square_footage: Option<u32>,
    favorite: bool,
    compare_selected: bool,
    evaluation_status: String,
    offer_intent: String,
    overall_rating: f64,
    answers: String,
    primary_photo: Option<String>,
    created_at: String,
    updated_at: String,
    notes: String,
}

impl PropertyRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            workspace_id: row.get(2)?,
            address: row.get(3)?,
            neighborhood: row.get(4)?,
            price: row.get(5)?,
            bedrooms: row.get(6)?,
            bathrooms: row.get(7)?,
            year_built: row.get(8)?,
            property_taxes: row.get(9)?,
            square_footage: row.get(10)?,
            favorite: row.get(11)?,
            compare_selected: row.get(12)?,
            evaluation_status: row.get(13)?,
            offer_intent: row.get(14)?,
            overall_rating: row.get(15)?,
            answers: row.get(16)?,
            primary_photo: row.get(17)?,
            created_at: row.get(18)?,
            updated_at: row.get(19)?,
            notes: row.get(20)?,
        })
    }

    fn into_record(self) -> anyhow::Result<PropertyRecord> {
        let answers: AnswerSet = serde_json::from_str(&self.answers)
            .with_context(|| format!("Corrupt answers for property {}", self.id))?;
        let notes: ItemNotes = serde_json::from_str(&self.notes)
            .with_context(|| format!("Corrupt notes for property {}", self.id))?;

        Ok(PropertyRecord {
            id: self.id,
            user_id: self.user_id,
            workspace_id: self.workspace_id,
            address: self.address,
            neighborhood: self.neighborhood,
            price: self.price,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            year_built: self.year_built,
            property_taxes: self.property_taxes,
            square_footage: self.square_footage,
            favorite: self.favorite,
            compare_selected: self.compare_selected,
            evaluation_status: self.evaluation_status.into(),
            offer_intent: self.offer_intent.into(),
            overall_rating: self.overall_rating,
            answers,
            notes,
            primary_photo: self.primary_photo,
            created_at: DateTime::parse_from_rfc3339(&self.created_at)?.with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&self.updated_at)?.with_timezone(&Utc),
        })
    }
}

fn load_record(conn: &Connection, id: &str) -> anyhow::Result<Option<PropertyRecord>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM properties WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            PropertyRow::from_row,
        )
        .optional()?;
    row.map(PropertyRow::into_record).transpose()
}

/// Overwrite every mutable column of an existing row
fn write_record(conn: &Connection, record: &PropertyRecord) -> anyhow::Result<()> {
    let answers = serde_json::to_string(&record.answers)?;
    let notes = serde_json::to_string(&record.notes)?;
    conn.execute(
        "UPDATE properties SET address = ?1, address_key = ?2, neighborhood = ?3, price = ?4, bedrooms = ?5, \
         bathrooms = ?6, year_built = ?7, property_taxes = ?8, square_footage = ?9, favorite = ?10, \
         compare_selected = ?11, evaluation_status = ?12, offer_intent = ?13, overall_rating = ?14, \
         answers = ?15, primary_photo = ?16, updated_at = ?17, notes = ?18 WHERE id = ?19",
        params![
            &record.address,
            normalize_address(&record.address),
            &record.neighborhood,
            record.price,
            record.bedrooms,
            record.bathrooms,
            record.year_built,
            record.property_taxes,
            record.square_footage,
            record.favorite,
            record.compare_selected,
            record.evaluation_status.as_str(),
            record.offer_intent.as_str(),
            record.overall_rating,
            answers,
            &record.primary_photo,
            timestamp(record.updated_at),
            notes,
            &record.id,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find(&self, filter: &RecordFilter) -> StoreResult<Option<PropertyRecord>> {
        let path = self.db_path.clone();
        let user_id = filter.user_id.clone();
        let address_key = filter.address.as_deref().map(normalize_address);

        let found = task::spawn_blocking(move || -> anyhow::Result<Option<PropertyRecord>> {
            let conn = Connection::open(&path)?;
            let row = match address_key {
                Some(key) => conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM properties WHERE user_id = ?1 AND address_key = ?2 LIMIT 1",
                            SELECT_COLUMNS
                        ),
                        params![&user_id, &key],
                        PropertyRow::from_row,
                    )
                    .optional()?,
                None => conn
                    .query_row(
                        &format!("SELECT {} FROM properties WHERE user_id = ?1 LIMIT 1", SELECT_COLUMNS),
                        params![&user_id],
                        PropertyRow::from_row,
                    )
                    .optional()?,
            };
            row.map(PropertyRow::into_record).transpose()
        })
        .await
        .map_err(join_error)??;

        Ok(found)
    }

    async fn insert(&self, draft: PropertyDraft) -> StoreResult<PropertyRecord> {
        let path = self.db_path.clone();
        let record = draft.into_record(Uuid::new_v4().to_string(), Utc::now());

        let stored = task::spawn_blocking(move || -> anyhow::Result<PropertyRecord> {
            let conn = Connection::open(&path)?;
            let answers = serde_json::to_string(&record.answers)?;
            let notes = serde_json::to_string(&record.notes)?;
            conn.execute(
                "INSERT INTO properties (id, user_id, workspace_id, address, address_key, neighborhood, price, \
                 bedrooms, bathrooms, year_built, property_taxes, square_footage, favorite, compare_selected, \
                 evaluation_status, offer_intent, overall_rating, answers, primary_photo, created_at, updated_at, notes) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
                params![
                    &record.id,
                    &record.user_id,
                    &record.workspace_id,
                    &record.address,
                    normalize_address(&record.address),
                    &record.neighborhood,
                    record.price,
                    record.bedrooms,
                    record.bathrooms,
                    record.year_built,
                    record.property_taxes,
                    record.square_footage,
                    record.favorite,
                    record.compare_selected,
                    record.evaluation_status.as_str(),
                    record.offer_intent.as_str(),
                    record.overall_rating,
                    answers,
                    &record.primary_photo,
                    timestamp(record.created_at),
                    timestamp(record.updated_at),
                    notes,
                ],
            )?;
            // Round-trip through the row so the caller sees what was stored
            load_record(&conn, &record.id)?.context("Inserted property vanished")
        })
        .await
        .map_err(join_error)??;

        debug!("Inserted property {} for user {}", stored.id, stored.user_id);
        Ok(stored)
    }

    async fn update(&self, id: &str, patch: &PropertyPatch) -> StoreResult<PropertyRecord> {
        let path = self.db_path.clone();
        let id_owned = id.to_string();
        let patch = patch.clone();

        let updated = task::spawn_blocking(move || -> anyhow::Result<Option<PropertyRecord>> {
            let mut conn = Connection::open(&path)?;
            let tx = conn.transaction()?;
            let Some(mut record) = load_record(&tx, &id_owned)? else {
                return Ok(None);
            };
            patch.apply_to(&mut record);
            record.updated_at = Utc::now();
            write_record(&tx, &record)?;
            let stored = load_record(&tx, &id_owned)?;
            tx.commit()?;
            Ok(stored)
        })
        .await
        .map_err(join_error)??;

        updated.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_many(&self, ids: &[String], patch: &PropertyPatch) -> StoreResult<()> {
        let path = self.db_path.clone();
        let ids = ids.to_vec();
        let patch = patch.clone();

        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)?;
            let tx = conn.transaction()?;
            let now = Utc::now();
            for id in &ids {
                if let Some(mut record) = load_record(&tx, id)? {
                    patch.apply_to(&mut record);
                    record.updated_at = now;
                    write_record(&tx, &record)?;
                }
            }
            tx.commit()?;
            Ok::<_, anyhow::Error>(())
        })
        .await
        .map_err(join_error)??;

        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let path = self.db_path.clone();
        let id_owned = id.to_string();

        let removed = task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            let removed = conn.execute("DELETE FROM properties WHERE id = ?1", params![&id_owned])?;
            Ok::<_, anyhow::Error>(removed)
        })
        .await
        .map_err(join_error)??;

        if removed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> StoreResult<Vec<PropertyRecord>> {
        let path = self.db_path.clone();
        let user_id = user_id.to_string();

        let records = task::spawn_blocking(move || -> anyhow::Result<Vec<PropertyRecord>> {
            let conn = Connection::open(&path)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM properties WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
                SELECT_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![&user_id], PropertyRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter()
                .map(PropertyRow::into_record)
                .collect::<anyhow::Result<Vec<_>>>()
        })
        .await
        .map_err(join_error)??;

        Ok(records)
    }
}

#[async_trait]
impl WorkspaceDirectory for SqliteRecordStore {
    async fn find_membership(&self, user_id: &str) -> StoreResult<Option<String>> {
        let path = self.db_path.clone();
        let user_id = user_id.to_string();

        let workspace = task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            let workspace: Option<String> = conn
                .query_row(
                    "SELECT workspace_id FROM workspace_members WHERE user_id = ?1 ORDER BY rowid LIMIT 1",
                    params![&user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok::<_, anyhow::Error>(workspace)
        })
        .await
        .map_err(join_error)??;

        Ok(workspace)
    }

    async fn create_workspace(&self, name: &str, owner_id: &str) -> StoreResult<String> {
        let path = self.db_path.clone();
        let id = Uuid::new_v4().to_string();
        let name = name.to_string();
        let owner_id = owner_id.to_string();

        let id = task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            conn.execute(
                "INSERT INTO workspaces (id, name, owner_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![&id, &name, &owner_id, timestamp(Utc::now())],
            )?;
            Ok::<_, anyhow::Error>(id)
        })
        .await
        .map_err(join_error)??;

        Ok(id)
    }

    async fn add_member(&self, workspace_id: &str, user_id: &str, role: MemberRole) -> StoreResult<()> {
        let path = self.db_path.clone();
        let workspace_id = workspace_id.to_string();
        let user_id = user_id.to_string();

        task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            conn.execute(
                "INSERT OR REPLACE INTO workspace_members (workspace_id, user_id, role) VALUES (?1, ?2, ?3)",
                params![&workspace_id, &user_id, role.as_str()],
            )?;
            Ok::<_, anyhow::Error>(())
        })
        .await
        .map_err(join_error)??;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{AnswerValue, RatingTier, ScoreAggregator};
    use crate::property::NewProperty;
    use tempfile::NamedTempFile;

    fn draft(address: &str) -> PropertyDraft {
        PropertyDraft::new("user-1", "ws-1", NewProperty::new(address, 500_000.0).with_rooms(3, 1.5))
    }

    #[tokio::test]
    async fn test_insert_find_list() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteRecordStore::new(temp_file.path()).await?;
        assert_eq!(store.path(), temp_file.path());

        let first = store.insert(draft("1 Oak Ave")).await?;
        let second = store.insert(draft("2 Pine Rd")).await?;

        let found = store
            .find(&RecordFilter::by_user("user-1").with_address("  1 OAK ave "))
            .await?
            .expect("Should find by normalized address");
        assert_eq!(found.id, first.id);
        assert!(store
            .find(&RecordFilter::by_user("user-2").with_address("1 Oak Ave"))
            .await?
            .is_none());

        let listed = store.list_by_user("user-1").await?;
        let ids: Vec<_> = listed.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_returns_authoritative_record() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteRecordStore::new(temp_file.path()).await?;
        let record = store.insert(draft("1 Oak Ave")).await?;

        let answers = AnswerSet::new().with("kitchen", "cabinets", AnswerValue::Rating(RatingTier::Fair));
        let summary = ScoreAggregator::default().summarize(&answers);
        let notes = ItemNotes::new().with("kitchen", "cabinets", "Soft-close hinges on uppers only");
        let patch = PropertyPatch::new()
            .favorite(true)
            .evaluation(answers.clone(), summary)
            .notes(notes.clone());
        let updated = store.update(&record.id, &patch).await?;

        assert!(updated.favorite);
        assert_eq!(updated.overall_rating, 3.0);
        assert_eq!(updated.answers, answers);
        assert_eq!(updated.notes, notes);
        assert!(record.notes.is_empty());
        assert!(updated.updated_at >= record.updated_at);

        let missing = store.update("nope", &PropertyPatch::new().favorite(true)).await;
        assert_eq!(missing, Err(StoreError::NotFound("nope".into())));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_many_and_delete() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteRecordStore::new(temp_file.path()).await?;
        let a = store.insert(draft("1 Oak Ave")).await?;
        let b = store.insert(draft("2 Pine Rd")).await?;

        let select = PropertyPatch::new().compare_selected(true);
        store.update_many(&[a.id.clone(), b.id.clone()], &select).await?;
        assert!(store.list_by_user("user-1").await?.iter().all(|r| r.compare_selected));

        store.delete(&a.id).await?;
        assert_eq!(store.list_by_user("user-1").await?.len(), 1);
        assert_eq!(store.delete(&a.id).await, Err(StoreError::NotFound(a.id.clone())));
        Ok(())
    }

    #[tokio::test]
    async fn test_workspace_membership() -> anyhow::Result<()> {
        let temp_file = NamedTempFile::new()?;
        let store = SqliteRecordStore::new(temp_file.path()).await?;

        assert!(store.find_membership("user-1").await?.is_none());
        let ws = store.create_workspace("Home Search", "user-1").await?;
        store.add_member(&ws, "user-1", MemberRole::Owner).await?;
        assert_eq!(store.find_membership("user-1").await?, Some(ws));
        Ok(())
    }
}
