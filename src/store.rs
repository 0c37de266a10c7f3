//! In-memory repository store.
//!
//! The store is the single owner of the collection. Records live in an
//! insertion-ordered map keyed by id behind one `RwLock`: mutations take the
//! write lock for their whole read-modify-write, and `list` takes the read lock,
//! so no caller ever observes a half-applied change.

use crate::model::{NewRepository, Repository, RepositoryChanges, RepositoryId};
use clap::ValueEnum;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info};

/// How an update treats `title`, `url` and `techs` missing from the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Omitted fields are cleared.
    #[default]
    Overwrite,
    /// Omitted fields keep their current value.
    Merge,
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateMode::Overwrite => write!(f, "overwrite"),
            UpdateMode::Merge => write!(f, "merge"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("repository '{id}' not found")]
    NotFound { id: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Point-in-time counters, used by health checks and shutdown logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub records: usize,
    pub total_likes: u64,
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
    pub liked: u64,
}

pub struct RepositoryStore {
    records: RwLock<IndexMap<RepositoryId, Repository>>,
    update_mode: UpdateMode,
    created: AtomicU64,
    updated: AtomicU64,
    deleted: AtomicU64,
    liked: AtomicU64,
}

impl RepositoryStore {
    pub fn new(update_mode: UpdateMode) -> Self {
        Self {
            records: RwLock::new(IndexMap::new()),
            update_mode,
            created: AtomicU64::new(0),
            updated: AtomicU64::new(0),
            deleted: AtomicU64::new(0),
            liked: AtomicU64::new(0),
        }
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    /// Every repository, in creation order.
    pub fn list(&self) -> Vec<Repository> {
        self.records.read().values().cloned().collect()
    }

    pub fn get(&self, id: &RepositoryId) -> Option<Repository> {
        self.records.read().get(id).cloned()
    }

    /// Appends a new repository with a fresh id and zero likes.
    pub fn create(&self, new: NewRepository) -> Repository {
        let mut records = self.records.write();
        let mut id = RepositoryId::generate();
        while records.contains_key(&id) {
            id = RepositoryId::generate();
        }
        let repository = Repository::from_new(id, new);
        records.insert(id, repository.clone());
        drop(records);

        self.created.fetch_add(1, Ordering::Relaxed);
        info!(repository_id = %id, operation = "create", "repository created");
        repository
    }

    /// Applies `changes` to the record in place. `changes.likes` is ignored.
    pub fn update(&self, id: &RepositoryId, changes: RepositoryChanges) -> StoreResult<Repository> {
        let mut records = self.records.write();
        let repository = records.get_mut(id).ok_or_else(|| not_found(id))?;

        let RepositoryChanges {
            title,
            url,
            techs,
            likes,
        } = changes;
        match self.update_mode {
            UpdateMode::Overwrite => {
                repository.title = title;
                repository.url = url;
                repository.techs = techs;
            }
            UpdateMode::Merge => {
                if title.is_some() {
                    repository.title = title;
                }
                if url.is_some() {
                    repository.url = url;
                }
                if techs.is_some() {
                    repository.techs = techs;
                }
            }
        }
        if likes.is_some() {
            debug!(repository_id = %id, "ignoring likes in update body");
        }
        let updated = repository.clone();
        drop(records);

        self.updated.fetch_add(1, Ordering::Relaxed);
        info!(
            repository_id = %id,
            operation = "update",
            mode = %self.update_mode,
            "repository updated"
        );
        Ok(updated)
    }

    /// Removes the record, keeping the relative order of the others.
    pub fn delete(&self, id: &RepositoryId) -> StoreResult<Repository> {
        let removed = self
            .records
            .write()
            .shift_remove(id)
            .ok_or_else(|| not_found(id))?;

        self.deleted.fetch_add(1, Ordering::Relaxed);
        info!(repository_id = %id, operation = "delete", "repository deleted");
        Ok(removed)
    }

    /// Adds exactly one like.
    pub fn like(&self, id: &RepositoryId) -> StoreResult<Repository> {
        let mut records = self.records.write();
        let repository = records.get_mut(id).ok_or_else(|| not_found(id))?;
        repository.likes += 1;
        let liked = repository.clone();
        drop(records);

        self.liked.fetch_add(1, Ordering::Relaxed);
        debug!(repository_id = %id, likes = liked.likes, operation = "like", "repository liked");
        Ok(liked)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        let records = self.records.read();
        StoreStats {
            records: records.len(),
            total_likes: records.values().map(|repository| repository.likes).sum(),
            created: self.created.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            liked: self.liked.load(Ordering::Relaxed),
        }
    }
}

impl Default for RepositoryStore {
    fn default() -> Self {
        Self::new(UpdateMode::default())
    }
}

fn not_found(id: &RepositoryId) -> StoreError {
    debug!(repository_id = %id, "repository lookup missed");
    StoreError::NotFound { id: id.to_string() }
}
