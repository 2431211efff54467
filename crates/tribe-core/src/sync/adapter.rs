//! Adapters to external list sources.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::status::SyncSource;
use crate::error::{Error, Result};
use crate::models::{ListItem, Location};

/// An item as the external source describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl From<&ListItem> for ExternalItem {
    fn from(item: &ListItem) -> Self {
        Self {
            name: item.name.clone(),
            location: item.location.clone(),
        }
    }
}

/// Fetches and pushes the items of one external list.
///
/// Failures surface as `ExternalSourceUnavailable`, `ExternalSourceError` or
/// `ExternalSourceTimeout`; callers decide whether to retry.
#[async_trait]
pub trait SyncAdapter: Send + Sync {
    async fn fetch(&self, external_id: &str) -> Result<Vec<ExternalItem>>;

    async fn push(&self, external_id: &str, items: &[ExternalItem]) -> Result<()>;
}

/// Adapters keyed by the source they serve.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<SyncSource, Arc<dyn SyncAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: SyncSource, adapter: Arc<dyn SyncAdapter>) {
        self.adapters.insert(source, adapter);
    }

    #[must_use]
    pub fn with(mut self, source: SyncSource, adapter: Arc<dyn SyncAdapter>) -> Self {
        self.register(source, adapter);
        self
    }

    /// Adapter for `source`; `InvalidSyncSource` if none is registered.
    pub fn get(&self, source: SyncSource) -> Result<Arc<dyn SyncAdapter>> {
        self.adapters
            .get(&source)
            .cloned()
            .ok_or_else(|| Error::InvalidSyncSource(format!("no adapter registered for {source}")))
    }

    pub fn sources(&self) -> Vec<SyncSource> {
        let mut sources: Vec<_> = self.adapters.keys().copied().collect();
        sources.sort_by_key(SyncSource::as_str);
        sources
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AdapterRegistry")
            .field("sources", &self.sources())
            .finish()
    }
}

/// Keeps each external list as `<root>/<external_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileAdapter {
    root: PathBuf,
}

impl JsonFileAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, external_id: &str) -> Result<PathBuf> {
        let external_id = external_id.trim();
        if external_id.is_empty()
            || external_id.contains(['/', '\\'])
            || external_id.contains("..")
        {
            return Err(Error::ExternalSourceError(format!(
                "invalid external id '{external_id}'"
            )));
        }
        Ok(self.root.join(format!("{external_id}.json")))
    }
}

#[async_trait]
impl SyncAdapter for JsonFileAdapter {
    async fn fetch(&self, external_id: &str) -> Result<Vec<ExternalItem>> {
        let path = self.path_for(external_id)?;
        let raw = tokio::fs::read_to_string(&path).await.map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                Error::ExternalSourceUnavailable(format!("{} does not exist", path.display()))
            } else {
                Error::ExternalSourceError(format!("failed to read {}: {error}", path.display()))
            }
        })?;
        serde_json::from_str(&raw).map_err(|error| {
            Error::ExternalSourceError(format!("malformed {}: {error}", path.display()))
        })
    }

    async fn push(&self, external_id: &str, items: &[ExternalItem]) -> Result<()> {
        let path = self.path_for(external_id)?;
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            return Err(Error::ExternalSourceUnavailable(format!(
                "{} does not exist",
                self.root.display()
            )));
        }
        let body = serde_json::to_string_pretty(items)?;
        tokio::fs::write(&path, format!("{body}\n"))
            .await
            .map_err(|error| {
                Error::ExternalSourceError(format!("failed to write {}: {error}", path.display()))
            })
    }
}
