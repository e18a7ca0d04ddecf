//! Mutation Coordinator
//!
//! Keeps the in-memory property collection in step with a remote store.
//! Mutations are applied locally first, then committed remotely; a failed
//! commit restores the snapshot taken before the local write.
//!
//! Mutations against one record are serialized through a per-record gate so
//! a rollback can never clobber a newer optimistic write. The collection
//! lock itself is never held across a store call.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OnceCell, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use super::record::{NewProperty, PropertyDraft, PropertyPatch, PropertyRecord};
use super::selection::SelectionGuard;
use crate::error::{EvalError, EvalResult};
use crate::evaluation::{AnswerSet, EvaluationSchema, ItemNotes, ScoreAggregator};
use crate::store::{MemberRole, RecordFilter, RecordStore, StoreError, WorkspaceDirectory};

pub const DEFAULT_WORKSPACE_NAME: &str = "Home Search";

/// Local view of the user's records, most recent first
#[derive(Debug, Default)]
struct Collection {
    records: Vec<PropertyRecord>,
    /// Records whose local copy may disagree with the store until reload
    stale: HashSet<String>,
}

impl Collection {
    fn get(&self, id: &str) -> Option<&PropertyRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut PropertyRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    /// Overwrite the record with the same id; no-op if it has gone
    fn replace(&mut self, record: PropertyRecord) {
        if let Some(slot) = self.get_mut(&record.id) {
            *slot = record;
        }
    }

    fn remove(&mut self, id: &str) {
        self.records.retain(|r| r.id != id);
        self.stale.remove(id);
    }

    fn selected_count(&self, user_id: &str) -> usize {
        self.records
            .iter()
            .filter(|r| r.user_id == user_id && r.compare_selected)
            .count()
    }
}

/// Computes a patch from the current record and collection, under the
/// collection's write lock. Returning an error aborts before any write.
type PatchPlan<'a> = Box<dyn FnOnce(&PropertyRecord, &Collection) -> EvalResult<PropertyPatch> + Send + 'a>;

pub struct MutationCoordinator {
    user_id: String,
    workspace_name: String,
    store: Arc<dyn RecordStore>,
    directory: Arc<dyn WorkspaceDirectory>,
    schema: &'static EvaluationSchema,
    guard: SelectionGuard,
    state: Arc<RwLock<Collection>>,
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    workspace_id: OnceCell<String>,
}

impl MutationCoordinator {
    /// Coordinator over a store that also manages workspaces
    pub fn new<S>(user_id: impl Into<String>, store: Arc<S>) -> Self
    where
        S: RecordStore + WorkspaceDirectory + 'static,
    {
        let directory: Arc<dyn WorkspaceDirectory> = store.clone();
        Self::with_parts(user_id, store, directory)
    }

    pub fn with_parts(
        user_id: impl Into<String>,
        store: Arc<dyn RecordStore>,
        directory: Arc<dyn WorkspaceDirectory>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            workspace_name: DEFAULT_WORKSPACE_NAME.to_string(),
            store,
            directory,
            schema: EvaluationSchema::standard(),
            guard: SelectionGuard::default(),
            state: Arc::new(RwLock::new(Collection::default())),
            gates: Mutex::new(HashMap::new()),
            workspace_id: OnceCell::new(),
        }
    }

    pub fn with_workspace_name(mut self, name: impl Into<String>) -> Self {
        self.workspace_name = name.into();
        self
    }

    pub fn with_schema(mut self, schema: &'static EvaluationSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn schema(&self) -> &'static EvaluationSchema {
        self.schema
    }

    // ──────────────────────────────────────────────────────────────────────
    // QUERIES
    // ──────────────────────────────────────────────────────────────────────

    /// Snapshot of the local collection in presentation order
    pub async fn records(&self) -> Vec<PropertyRecord> {
        self.state.read().await.records.clone()
    }

    pub async fn get(&self, id: &str) -> Option<PropertyRecord> {
        self.state.read().await.get(id).cloned()
    }

    pub async fn compare_count(&self) -> usize {
        self.state.read().await.selected_count(&self.user_id)
    }

    /// Records currently marked for comparison
    pub async fn comparable(&self) -> Vec<PropertyRecord> {
        self.state
            .read()
            .await
            .records
            .iter()
            .filter(|r| r.compare_selected)
            .cloned()
            .collect()
    }

    pub async fn favorites(&self) -> Vec<PropertyRecord> {
        self.state
            .read()
            .await
            .records
            .iter()
            .filter(|r| r.favorite)
            .cloned()
            .collect()
    }

    /// Ids whose local copy is pending a reload
    pub async fn stale_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.state.read().await.stale.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Replace the local collection with the store's view
    pub async fn reload(&self) -> EvalResult<()> {
        let records = self.store.list_by_user(&self.user_id).await?;
        let mut state = self.state.write().await;
        info!("Reloaded {} properties for user {}", records.len(), self.user_id);
        state.records = records;
        state.stale.clear();
        Ok(())
    }

    // ──────────────────────────────────────────────────────────────────────
    // WORKSPACE
    // ──────────────────────────────────────────────────────────────────────

    /// Resolve the user's workspace, provisioning one on first use
    pub async fn ensure_workspace(&self) -> EvalResult<String> {
        let id = self
            .workspace_id
            .get_or_try_init(|| self.resolve_workspace())
            .await?;
        Ok(id.clone())
    }

    async fn resolve_workspace(&self) -> EvalResult<String> {
        if let Some(existing) = self.directory.find_membership(&self.user_id).await? {
            return Ok(existing);
        }
        let id = self
            .directory
            .create_workspace(&self.workspace_name, &self.user_id)
            .await?;
        self.directory
            .add_member(&id, &self.user_id, MemberRole::Owner)
            .await?;
        info!("Provisioned workspace {} for user {}", id, self.user_id);
        Ok(id)
    }

    // ──────────────────────────────────────────────────────────────────────
    // MUTATIONS
    // ──────────────────────────────────────────────────────────────────────

    /// Add a property; duplicates by normalized address are rejected
    pub async fn create(&self, input: NewProperty) -> EvalResult<PropertyRecord> {
        input.validate()?;

        let filter = RecordFilter::by_user(&self.user_id).with_address(input.address.clone());
        if self.store.find(&filter).await?.is_some() {
            warn!("Rejected duplicate address '{}'", input.address.trim());
            return Err(EvalError::Conflict("duplicate address".to_string()));
        }

        let workspace_id = self.ensure_workspace().await?;
        let draft = PropertyDraft::new(&self.user_id, workspace_id, input);
        let record = self.store.insert(draft).await?;

        info!("Created property {} ({})", record.id, record.address);
        self.state.write().await.records.insert(0, record.clone());
        Ok(record)
    }

    /// Apply user edits optimistically and commit them to the store.
    ///
    /// A new address must not collide with another of the user's records,
    /// and selecting for comparison is subject to the selection limit.
    pub async fn update(&self, id: &str, changes: PropertyPatch) -> EvalResult<PropertyRecord> {
        changes.validate()?;
        if changes.is_empty() {
            return self
                .get(id)
                .await
                .ok_or_else(|| EvalError::NotFound(id.to_string()));
        }

        if let Some(address) = changes.address_change() {
            let filter = RecordFilter::by_user(&self.user_id).with_address(address);
            if let Some(existing) = self.store.find(&filter).await? {
                if existing.id != id {
                    warn!("Rejected rename of {} to duplicate address '{}'", id, address);
                    return Err(EvalError::Conflict("duplicate address".to_string()));
                }
            }
        }

        let guard = self.guard;
        let user_id = self.user_id.clone();
        self.mutate(
            id,
            Box::new(move |record: &PropertyRecord, collection: &Collection| {
                if changes.compare_selected_change() == Some(true) && !record.compare_selected {
                    guard
                        .toggle_compare(collection.selected_count(&user_id), false)
                        .inspect_err(|_| info!("Compare limit reached; {} left unselected", record.id))?;
                }
                Ok(changes)
            }),
        )
        .await
    }

    pub async fn toggle_favorite(&self, id: &str) -> EvalResult<PropertyRecord> {
        self.mutate(
            id,
            Box::new(|record: &PropertyRecord, _: &Collection| {
                Ok(PropertyPatch::new().favorite(!record.favorite))
            }),
        )
        .await
    }

    /// Flip the compare flag, subject to the selection limit.
    ///
    /// A rejected selection returns before any local or remote write.
    pub async fn toggle_compare(&self, id: &str) -> EvalResult<PropertyRecord> {
        let guard = self.guard;
        let user_id = self.user_id.clone();
        self.mutate(
            id,
            Box::new(move |record: &PropertyRecord, collection: &Collection| {
                let selected = guard
                    .toggle_compare(collection.selected_count(&user_id), record.compare_selected)
                    .inspect_err(|_| info!("Compare limit reached; {} left unselected", record.id))?;
                Ok(PropertyPatch::new().compare_selected(selected))
            }),
        )
        .await
    }

    /// Validate and persist a new answer set with its derived rating.
    /// Existing item notes are left as they are.
    pub async fn save_evaluation(&self, id: &str, answers: AnswerSet) -> EvalResult<PropertyRecord> {
        self.commit_evaluation(id, answers, None).await
    }

    /// As [`Self::save_evaluation`], replacing the item notes as well
    pub async fn save_evaluation_with_notes(
        &self,
        id: &str,
        answers: AnswerSet,
        notes: ItemNotes,
    ) -> EvalResult<PropertyRecord> {
        self.commit_evaluation(id, answers, Some(notes)).await
    }

    async fn commit_evaluation(
        &self,
        id: &str,
        answers: AnswerSet,
        notes: Option<ItemNotes>,
    ) -> EvalResult<PropertyRecord> {
        self.schema.validate_answers(&answers)?;
        if let Some(notes) = &notes {
            self.schema.validate_notes(notes)?;
        }
        let summary = ScoreAggregator::new(self.schema).summarize(&answers);
        debug!(
            "Evaluation for {}: rating {:.1}, {}% complete",
            id, summary.overall_rating, summary.completion
        );

        let mut patch = PropertyPatch::new().evaluation(answers, summary);
        if let Some(notes) = notes {
            patch = patch.notes(notes);
        }
        self.mutate(id, Box::new(move |_: &PropertyRecord, _: &Collection| Ok(patch)))
            .await
    }

    /// Remove remotely, then locally. Never optimistic.
    pub async fn delete(&self, id: &str) -> EvalResult<()> {
        let gate = self.gate(id).await;
        let _permit = gate.lock_owned().await;

        self.store.delete(id).await?;
        self.state.write().await.remove(id);
        self.gates.lock().await.remove(id);
        info!("Deleted property {}", id);
        Ok(())
    }

    /// Unselect every compared record with one batched store call.
    ///
    /// On failure the whole collection is reloaded from the store.
    pub async fn clear_compare_selection(&self) -> EvalResult<()> {
        let mut ids: Vec<String> = self
            .state
            .read()
            .await
            .records
            .iter()
            .filter(|r| r.compare_selected)
            .map(|r| r.id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        ids.sort();

        // Sorted acquisition keeps concurrent bulk operations deadlock-free
        let mut permits = Vec::with_capacity(ids.len());
        for id in &ids {
            permits.push(self.gate(id).await.lock_owned().await);
        }

        let patch = PropertyPatch::new().compare_selected(false);
        {
            let mut state = self.state.write().await;
            for id in &ids {
                if let Some(record) = state.get_mut(id) {
                    patch.apply_to(record);
                }
            }
        }

        match self.store.update_many(&ids, &patch).await {
            Ok(()) => {
                info!("Cleared compare selection ({} records)", ids.len());
                Ok(())
            }
            Err(err) => {
                warn!("Bulk compare clear failed, resynchronizing: {}", err);
                if let Err(reload_err) = self.reload().await {
                    warn!("Resynchronization failed: {}", reload_err);
                    self.state.write().await.stale.extend(ids.iter().cloned());
                }
                Err(err.into())
            }
        }
    }

    // ──────────────────────────────────────────────────────────────────────
    // OPTIMISTIC ROUTINE
    // ──────────────────────────────────────────────────────────────────────

    async fn gate(&self, id: &str) -> Arc<Mutex<()>> {
        self.gates
            .lock()
            .await
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Snapshot, apply locally, then commit remotely or revert.
    ///
    /// The commit phase runs on its own task: dropping the returned future
    /// does not cancel the store call, and its outcome still lands in the
    /// collection as long as the coordinator is alive.
    async fn mutate(&self, id: &str, plan: PatchPlan<'_>) -> EvalResult<PropertyRecord> {
        let gate = self.gate(id).await;
        let permit = gate.lock_owned().await;

        let (snapshot, patch) = {
            let mut state = self.state.write().await;
            let record = state
                .get(id)
                .cloned()
                .ok_or_else(|| EvalError::NotFound(id.to_string()))?;
            let patch = plan(&record, &*state)?;
            if let Some(slot) = state.get_mut(id) {
                patch.apply_to(slot);
            }
            (record, patch)
        };
        debug!("Optimistically applied change to {}", id);

        let commit = tokio::spawn(commit_or_revert(
            self.store.clone(),
            Arc::downgrade(&self.state),
            snapshot,
            patch,
            permit,
        ));
        commit
            .await
            .map_err(|e| EvalError::Store(format!("commit task failed: {}", e)))?
    }
}

async fn commit_or_revert(
    store: Arc<dyn RecordStore>,
    state: Weak<RwLock<Collection>>,
    snapshot: PropertyRecord,
    patch: PropertyPatch,
    _permit: OwnedMutexGuard<()>,
) -> EvalResult<PropertyRecord> {
    let result = store.update(&snapshot.id, &patch).await;

    let Some(state) = state.upgrade() else {
        debug!("Collection dropped before {} resolved", snapshot.id);
        return result.map_err(EvalError::from);
    };
    let mut state = state.write().await;

    match result {
        Ok(record) => {
            debug!("Committed change to {}", record.id);
            state.replace(record.clone());
            state.stale.remove(&record.id);
            Ok(record)
        }
        Err(err) => {
            warn!("Store rejected change to {}, rolling back: {}", snapshot.id, err);
            if matches!(err, StoreError::NotFound(_)) {
                state.stale.insert(snapshot.id.clone());
            }
            state.replace(snapshot);
            Err(err.into())
        }
    }
}
