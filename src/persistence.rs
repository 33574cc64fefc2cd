//! Durable local state surviving reloads.
//!
//! Read-through at startup, write-through on every change; no TTL. Holds the
//! user's filters, identity, subscription snapshot, and token pair in one
//! pretty-printed JSON file.

use std::path::PathBuf;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::api::session::TokenPair;
use crate::errors::{DirectoryError, DirectoryResult};
use crate::filters::FilterSet;
use crate::logger::{self, LogTag};
use crate::subscription::SubscriptionState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    #[serde(default)]
    pub filters: Option<FilterSet>,
    #[serde(default)]
    pub identity: Option<UserIdentity>,
    #[serde(default)]
    pub subscription: Option<SubscriptionState>,
    #[serde(default)]
    pub tokens: Option<TokenPair>,
}

#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    state: RwLock<LocalState>,
}

impl LocalStore {
    /// Load persisted state, or start empty when no file exists yet.
    pub async fn load(path: PathBuf) -> DirectoryResult<Self> {
        let state = match fs::read(&path).await {
            Ok(data) => serde_json::from_slice(&data).map_err(|err| {
                DirectoryError::Storage(format!(
                    "failed to parse {}: {}",
                    path.display(),
                    err
                ))
            })?,
            Err(_) => LocalState::default(),
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn state(&self) -> LocalState {
        self.state.read().clone()
    }

    /// Apply a mutation and write the whole snapshot through to disk.
    pub async fn update<F>(&self, apply: F) -> DirectoryResult<()>
    where
        F: FnOnce(&mut LocalState),
    {
        let snapshot = {
            let mut state = self.state.write();
            apply(&mut state);
            state.clone()
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|err| {
                DirectoryError::Storage(format!(
                    "failed to create {}: {}",
                    parent.display(),
                    err
                ))
            })?;
        }

        let data = serde_json::to_vec_pretty(&snapshot)?;
        fs::write(&self.path, data).await.map_err(|err| {
            DirectoryError::Storage(format!("failed to write {}: {}", self.path.display(), err))
        })?;

        logger::verbose(LogTag::Storage, "local state written through");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{FilterUpdate, SortOrder};

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::load(dir.path().join("state.json"))
            .await
            .expect("load");
        assert_eq!(store.state(), LocalState::default());
    }

    #[tokio::test]
    async fn state_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");

        let store = LocalStore::load(path.clone()).await.expect("load");
        let mut filters = FilterSet::default();
        filters.apply(FilterUpdate::County(Some("Cluj".into())));
        filters.apply(FilterUpdate::SortBy(SortOrder::RevenueDesc));
        store
            .update(|state| {
                state.filters = Some(filters.clone());
                state.identity = Some(UserIdentity {
                    user_id: "u-1".into(),
                    email: "ana@example.com".into(),
                    display_name: None,
                });
            })
            .await
            .expect("update");

        let reloaded = LocalStore::load(path).await.expect("reload");
        let state = reloaded.state();
        assert_eq!(state.filters, Some(filters));
        assert_eq!(state.identity.map(|i| i.user_id), Some("u-1".to_string()));
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"not json").await.expect("write");

        let err = LocalStore::load(path).await.expect_err("must fail");
        assert!(matches!(err, DirectoryError::Storage(_)));
    }
}
