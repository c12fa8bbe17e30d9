use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actions::{ActionSet, IgnoreScope};
use crate::error::CoreError;
use crate::expansion::OccurrenceEngine;
use crate::models::{Expansion, ExpansionRequest, Item};

/// Where items and user actions come from.
///
/// Both are fetched in bulk before expansion starts; the engine itself never
/// performs I/O.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn items(&self) -> Result<Vec<Item>, CoreError>;
    async fn actions(&self) -> Result<ActionSet, CoreError>;

    /// Items and actions taken from one consistent state of the source.
    ///
    /// The default fetches both concurrently; sources that can change
    /// between two reads override it with a single read.
    async fn snapshot(&self) -> Result<(Vec<Item>, ActionSet), CoreError> {
        tokio::try_join!(self.items(), self.actions())
    }
}

/// On-disk and in-memory layout: `{ "items": [...], "completions": [...], "ignores": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaDocument {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub completions: HashSet<String>,
    #[serde(default)]
    pub ignores: Vec<IgnoreScope>,
}

impl AgendaDocument {
    pub fn action_set(&self) -> ActionSet {
        ActionSet {
            completions: self.completions.clone(),
            ignores: self.ignores.clone(),
        }
    }
}

#[async_trait]
impl ItemSource for AgendaDocument {
    async fn items(&self) -> Result<Vec<Item>, CoreError> {
        Ok(self.items.clone())
    }

    async fn actions(&self) -> Result<ActionSet, CoreError> {
        Ok(self.action_set())
    }

    async fn snapshot(&self) -> Result<(Vec<Item>, ActionSet), CoreError> {
        Ok((self.items.clone(), self.action_set()))
    }
}

/// Reads an [`AgendaDocument`] from a JSON file on every call.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<AgendaDocument, CoreError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let document: AgendaDocument = serde_json::from_str(&raw)?;
        debug!(
            path = %self.path.display(),
            items = document.items.len(),
            "loaded agenda document"
        );
        Ok(document)
    }
}

#[async_trait]
impl ItemSource for JsonFileSource {
    async fn items(&self) -> Result<Vec<Item>, CoreError> {
        Ok(self.load().await?.items)
    }

    async fn actions(&self) -> Result<ActionSet, CoreError> {
        Ok(self.load().await?.action_set())
    }

    async fn snapshot(&self) -> Result<(Vec<Item>, ActionSet), CoreError> {
        let document = self.load().await?;
        let actions = document.action_set();
        Ok((document.items, actions))
    }
}

/// Takes one snapshot of the source, then runs the synchronous agenda expansion.
pub async fn collect_agenda<S: ItemSource + ?Sized>(
    source: &S,
    engine: &OccurrenceEngine,
    request: &ExpansionRequest,
) -> Result<Expansion, CoreError> {
    let (items, actions) = source.snapshot().await?;
    Ok(engine.agenda(&items, &actions, request))
}
