//! # Transactional Updater
//!
//! Stages proposed token sets, validates them against a hypothetical
//! snapshot, and commits or rolls them back.

use core::sync::atomic::{AtomicU64, Ordering};
use std::{collections::BTreeMap, path::Path, sync::Arc};

use parking_lot::Mutex;

use crate::{
    allocation::StableIdAllocator,
    errors::{STResult, StableTokError},
    store::VocabStore,
    support::{Clock, SystemClock},
    types::{STHashMap, TokenType},
    updater::{
        CommitRecord,
        PersistedState,
        StagedUpdate,
        UpdateStatus,
        UpdaterOptions,
        ValidationMetrics,
    },
};

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Default)]
struct UpdaterState {
    staged: STHashMap<String, StagedUpdate>,
    history: Vec<CommitRecord>,
}

/// Stage / validate / commit / rollback driver for vocabulary growth.
///
/// All store mutation flows through [`Self::commit`] (and [`Self::load_state`]);
/// commits are serialized by the updater's state lock.
pub struct TransactionalUpdater<T: TokenType> {
    store: Arc<VocabStore<T>>,
    allocator: StableIdAllocator,
    options: UpdaterOptions,
    clock: Arc<dyn Clock>,
    seq: AtomicU64,
    state: Mutex<UpdaterState>,
}

impl<T: TokenType> core::fmt::Debug for TransactionalUpdater<T> {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransactionalUpdater")
            .field("options", &self.options)
            .field("staged", &state.staged.len())
            .field("history", &state.history.len())
            .finish()
    }
}

impl<T: TokenType> TransactionalUpdater<T> {
    /// Create an updater over a store, using the system clock.
    pub fn new(
        store: Arc<VocabStore<T>>,
        allocator: StableIdAllocator,
        options: UpdaterOptions,
    ) -> STResult<Self> {
        options.validate()?;
        Ok(Self {
            store,
            allocator,
            options,
            clock: Arc::new(SystemClock),
            seq: AtomicU64::new(0),
            state: Mutex::new(UpdaterState::default()),
        })
    }

    /// Replace the clock, and return the updater.
    pub fn with_clock(
        mut self,
        clock: Arc<dyn Clock>,
    ) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the commit history, and return the updater.
    ///
    /// Pairs with a store built from [`PersistedState::restore_mapping`]
    /// to resume a saved state without installing its mapping twice.
    pub fn with_history(
        mut self,
        history: Vec<CommitRecord>,
    ) -> Self {
        self.state.get_mut().history = history;
        self
    }

    /// The store being updated.
    pub fn store(&self) -> &Arc<VocabStore<T>> {
        &self.store
    }

    /// The allocator.
    pub fn allocator(&self) -> &StableIdAllocator {
        &self.allocator
    }

    /// The updater options.
    pub fn options(&self) -> &UpdaterOptions {
        &self.options
    }

    /// Stage a proposed token set.
    ///
    /// ## Returns
    /// A fresh stage id, ``stage_{unix_secs}_{seq}``.
    pub fn stage<I, S>(
        &self,
        tokens: I,
        metadata: BTreeMap<String, String>,
    ) -> String
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = self.clock.now();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let stage_id = format!("stage_{}_{seq}", now.as_secs());

        let update = StagedUpdate {
            stage_id: stage_id.clone(),
            tokens: tokens.into_iter().map(Into::into).collect(),
            metadata,
            status: UpdateStatus::Pending,
            created_at: now.as_millis() as u64,
            metrics: None,
        };
        log::debug!("staged {stage_id}: {} tokens", update.tokens.len());

        self.state.lock().staged.insert(stage_id.clone(), update);
        stage_id
    }

    /// Validate a pending update against a corpus.
    ///
    /// The staged tokens are allocated against the live mapping into a
    /// hypothetical snapshot, which is never published.
    ///
    /// ## Returns
    /// The metrics, also recorded on the staged update; `UnknownStage` if
    /// `stage_id` is not a pending update.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, corpus)))]
    pub fn validate<I, S>(
        &self,
        stage_id: &str,
        corpus: I,
    ) -> STResult<ValidationMetrics>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = self.pending_tokens(stage_id)?;

        let live = self.store.snapshot();
        let allocation = self.allocator.allocate(live.mapping(), &tokens)?;
        let (hypothetical, added) = live.extend(allocation.assignments, self.store.options())?;

        let unk = hypothetical.unk_id();
        let mut total_bytes = 0usize;
        let mut total_tokens = 0usize;
        let mut unknown = 0usize;
        for text in corpus {
            let text = text.as_ref().as_bytes();
            let ids = hypothetical.segment(text);
            total_bytes += text.len();
            total_tokens += ids.len();
            unknown += ids.iter().filter(|&&t| t == unk).count();
        }

        let growth = hypothetical
            .estimated_memory_bytes()
            .saturating_sub(live.estimated_memory_bytes());
        let metrics = ValidationMetrics {
            compression_ratio: ratio(total_bytes, total_tokens),
            unknown_token_rate: ratio(unknown, total_tokens),
            memory_impact_mb: growth as f64 / MIB,
            tokens_assigned: added,
            timestamp: self.clock.now_millis(),
        };

        let mut state = self.state.lock();
        match state.staged.get_mut(stage_id) {
            Some(update) if update.status == UpdateStatus::Pending => {
                update.status = UpdateStatus::Validated;
                update.metrics = Some(metrics.clone());
            }
            _ => {
                return Err(StableTokError::UnknownStage {
                    stage_id: stage_id.to_string(),
                });
            }
        }
        log::debug!("validated {stage_id}: {metrics:?}");
        Ok(metrics)
    }

    fn pending_tokens(
        &self,
        stage_id: &str,
    ) -> STResult<Vec<String>> {
        let state = self.state.lock();
        match state.staged.get(stage_id) {
            Some(update) if update.status == UpdateStatus::Pending => Ok(update.tokens.clone()),
            _ => Err(StableTokError::UnknownStage {
                stage_id: stage_id.to_string(),
            }),
        }
    }

    /// Commit a validated update.
    ///
    /// ## Returns
    /// * `Ok(true)` - merged into the store, and archived in the history.
    /// * `Ok(false)` - rejected by the unknown-rate ceiling; nothing changes.
    /// * `Err(UnknownStage)` - no such staged update.
    /// * `Err(InvalidState)` - the update is not validated.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn commit(
        &self,
        stage_id: &str,
    ) -> STResult<bool> {
        let mut state = self.state.lock();

        let Some(update) = state.staged.get(stage_id) else {
            return Err(StableTokError::UnknownStage {
                stage_id: stage_id.to_string(),
            });
        };
        let metrics = match (&update.status, &update.metrics) {
            (UpdateStatus::Validated, Some(metrics)) => metrics.clone(),
            (status, _) => {
                return Err(StableTokError::InvalidState {
                    stage_id: stage_id.to_string(),
                    status: status.to_string(),
                });
            }
        };

        if metrics.unknown_token_rate > self.options.unknown_rate_ceiling {
            log::info!(
                "rejected {stage_id}: unknown rate {:.4} exceeds {:.4}",
                metrics.unknown_token_rate,
                self.options.unknown_rate_ceiling
            );
            return Ok(false);
        }

        let tokens = update.tokens.clone();
        let tokens_added = self.store.merge_with(|snapshot| {
            Ok(self
                .allocator
                .allocate(snapshot.mapping(), &tokens)?
                .assignments)
        })?;

        state.staged.remove(stage_id);
        state.history.push(CommitRecord {
            stage_id: stage_id.to_string(),
            tokens_added,
            metrics,
            timestamp: self.clock.now_millis(),
        });
        log::info!("committed {stage_id}: {tokens_added} tokens added");
        Ok(true)
    }

    /// Discard a pending or validated update.
    ///
    /// ## Returns
    /// `false` if there was no such staged update.
    pub fn rollback(
        &self,
        stage_id: &str,
    ) -> bool {
        let removed = self.state.lock().staged.remove(stage_id).is_some();
        if removed {
            log::info!("rolled back {stage_id}");
        }
        removed
    }

    /// Get a copy of a staged update.
    pub fn staged(
        &self,
        stage_id: &str,
    ) -> Option<StagedUpdate> {
        self.state.lock().staged.get(stage_id).cloned()
    }

    /// The ids of all staged updates, sorted.
    pub fn staged_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().staged.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// A copy of the commit history.
    pub fn history(&self) -> Vec<CommitRecord> {
        self.state.lock().history.clone()
    }

    /// The commit record of a committed stage.
    pub fn commit_record(
        &self,
        stage_id: &str,
    ) -> Option<CommitRecord> {
        self.state
            .lock()
            .history
            .iter()
            .rev()
            .find(|r| r.stage_id == stage_id)
            .cloned()
    }

    /// Capture the live mapping and commit history.
    pub fn persisted_state(&self) -> PersistedState {
        let state = self.state.lock();
        let snapshot = self.store.snapshot();
        PersistedState::capture(
            snapshot.mapping(),
            state.history.clone(),
            self.clock.now_millis(),
        )
    }

    /// Save the live mapping and commit history as JSON.
    pub fn save_state<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> STResult<()> {
        let doc = self.persisted_state();
        doc.save_path(path.as_ref())?;
        log::info!(
            "saved state to {}: {} tokens, {} commits",
            path.as_ref().display(),
            doc.mapping.len(),
            doc.history.len()
        );
        Ok(())
    }

    /// Restore a saved mapping and commit history.
    ///
    /// The document is fully validated before anything is installed;
    /// on success, all staged updates are discarded.
    pub fn load_state<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> STResult<()> {
        let doc = PersistedState::load_path(path.as_ref())?;
        self.restore(doc)?;
        log::info!("loaded state from {}", path.as_ref().display());
        Ok(())
    }

    /// Install a persisted state document.
    pub fn restore(
        &self,
        doc: PersistedState,
    ) -> STResult<()> {
        let mapping = doc.restore_mapping::<T>(self.allocator.policy())?;

        let mut state = self.state.lock();
        self.store.replace_mapping(mapping)?;
        state.history = doc.history;
        state.staged.clear();
        Ok(())
    }
}

fn ratio(
    num: usize,
    den: usize,
) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        allocation::{AllocatorOptions, build_stable_mapping},
        store::StoreOptions,
        vocab::VocabMapping,
    };

    type T = u32;

    fn updater() -> TransactionalUpdater<T> {
        let options = AllocatorOptions::default();
        let bytes: Vec<Vec<u8>> = (b'a'..=b'z').map(|b| vec![b]).collect();
        let mapping: VocabMapping<T> = build_stable_mapping(bytes, &options).unwrap();
        let store = Arc::new(VocabStore::new(mapping, StoreOptions::default()).unwrap());
        TransactionalUpdater::new(
            store,
            StableIdAllocator::new(options).unwrap(),
            UpdaterOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_accept() {
        let updater = updater();
        let stage_id = updater.stage(["hello", "world"], BTreeMap::new());
        assert_eq!(updater.staged(&stage_id).unwrap().status, UpdateStatus::Pending);

        let metrics = updater.validate(&stage_id, ["helloworld", "worldhello"]).unwrap();
        assert_eq!(metrics.tokens_assigned, 2);
        assert_eq!(metrics.unknown_token_rate, 0.0);
        assert_eq!(metrics.compression_ratio, 5.0);
        assert!(metrics.memory_impact_mb > 0.0);

        // Validation does not publish.
        assert!(!updater.store().contains(b"hello"));

        assert!(updater.commit(&stage_id).unwrap());
        assert!(updater.store().contains(b"hello"));
        assert!(updater.staged(&stage_id).is_none());

        let history = updater.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].stage_id, stage_id);
        assert_eq!(history[0].tokens_added, 2);
    }

    #[test]
    fn test_commit_requires_validation() {
        let updater = updater();
        let stage_id = updater.stage(["hello"], BTreeMap::new());

        assert!(matches!(
            updater.commit(&stage_id),
            Err(StableTokError::InvalidState { .. })
        ));
        assert!(matches!(
            updater.commit("stage_0_999"),
            Err(StableTokError::UnknownStage { .. })
        ));
        assert!(matches!(
            updater.validate("stage_0_999", ["x"]),
            Err(StableTokError::UnknownStage { .. })
        ));

        // Validating twice is not permitted.
        updater.validate(&stage_id, ["hello"]).unwrap();
        assert!(matches!(
            updater.validate(&stage_id, ["hello"]),
            Err(StableTokError::UnknownStage { .. })
        ));
    }

    #[test]
    fn test_reject() {
        let updater = updater();
        let stage_id = updater.stage(["hello"], BTreeMap::new());

        // Digits are not in the vocabulary.
        let metrics = updater.validate(&stage_id, ["1234hello"]).unwrap();
        assert!(metrics.unknown_token_rate > 0.1);

        let size = updater.store().size();
        assert!(!updater.commit(&stage_id).unwrap());
        assert_eq!(updater.store().size(), size);
        assert!(updater.history().is_empty());
        assert_eq!(
            updater.staged(&stage_id).unwrap().status,
            UpdateStatus::Validated
        );
    }

    #[test]
    fn test_rollback() {
        let updater = updater();
        let stage_id = updater.stage(["hello"], BTreeMap::new());
        let other = updater.stage(["world"], BTreeMap::new());
        assert_ne!(stage_id, other);
        assert_eq!(updater.staged_ids().len(), 2);

        assert!(updater.rollback(&stage_id));
        assert!(!updater.rollback(&stage_id));
        assert!(matches!(
            updater.commit(&stage_id),
            Err(StableTokError::UnknownStage { .. })
        ));
        assert_eq!(updater.staged_ids(), vec![other]);
    }

    #[test]
    fn test_resume_from_saved_state() {
        let original = updater();
        let stage_id = original.stage(["hello"], BTreeMap::new());
        original.validate(&stage_id, ["hello"]).unwrap();
        assert!(original.commit(&stage_id).unwrap());
        let doc = original.persisted_state();

        let allocator = StableIdAllocator::new(AllocatorOptions::default()).unwrap();
        let mapping: VocabMapping<T> = doc.restore_mapping(allocator.policy()).unwrap();
        let store = Arc::new(VocabStore::new(mapping, StoreOptions::default()).unwrap());
        let generation = store.snapshot().generation();

        let resumed = TransactionalUpdater::new(store, allocator, UpdaterOptions::default())
            .unwrap()
            .with_history(doc.history);

        // The store was built once; nothing was republished.
        assert_eq!(resumed.store().snapshot().generation(), generation);
        assert_eq!(resumed.history(), original.history());
        assert_eq!(
            resumed.store().token_id(b"hello"),
            original.store().token_id(b"hello")
        );

        let next = resumed.stage(["world"], BTreeMap::new());
        resumed.validate(&next, ["world"]).unwrap();
        assert!(resumed.commit(&next).unwrap());
        assert_eq!(resumed.history().len(), 2);
        assert_eq!(resumed.history()[0].stage_id, stage_id);
    }
}
