//! Record Store Module
//!
//! The durable side of the property collection. The coordinator only
//! relies on these traits; `sqlite` provides the bundled implementation.

pub mod sqlite;

pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::property::{PropertyDraft, PropertyPatch, PropertyRecord};

/// Failures reported by a store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// No record with this id exists
    #[error("record not found: {0}")]
    NotFound(String),

    /// Transport or storage failure
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Backend(format!("{:#}", err))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Lookup filter for [`RecordStore::find`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub user_id: String,
    /// Matched case-insensitively after trimming
    pub address: Option<String>,
}

impl RecordFilter {
    pub fn by_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Role of a workspace member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Member => "member",
        }
    }
}

/// Durable storage of property records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// First record matching the filter
    async fn find(&self, filter: &RecordFilter) -> StoreResult<Option<PropertyRecord>>;

    /// Persist a draft; the store assigns id and timestamps
    async fn insert(&self, draft: PropertyDraft) -> StoreResult<PropertyRecord>;

    /// Apply a patch and return the authoritative record
    async fn update(&self, id: &str, patch: &PropertyPatch) -> StoreResult<PropertyRecord>;

    /// Apply one patch to every listed record
    async fn update_many(&self, ids: &[String], patch: &PropertyPatch) -> StoreResult<()>;

    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// All of a user's records, newest first
    async fn list_by_user(&self, user_id: &str) -> StoreResult<Vec<PropertyRecord>>;
}

/// Workspace membership lookups and provisioning
#[async_trait]
pub trait WorkspaceDirectory: Send + Sync {
    async fn find_membership(&self, user_id: &str) -> StoreResult<Option<String>>;

    async fn create_workspace(&self, name: &str, owner_id: &str) -> StoreResult<String>;

    async fn add_member(&self, workspace_id: &str, user_id: &str, role: MemberRole) -> StoreResult<()>;
}
