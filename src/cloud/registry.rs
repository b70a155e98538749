//! Resource kind -> fetcher table
//!
//! Built once at startup and handed by reference to the refresh coordinator.
//! There is no global registry: tests build their own table with fakes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::Credentials;
use crate::models::ResourceKind;

/// Lists every record of one resource kind
///
/// Implemented once per kind. The returned order is the snapshot order.
#[async_trait]
pub trait Fetcher: Send + Sync {
    type Record: Serialize + DeserializeOwned + Send + Sync + 'static;

    fn kind(&self) -> ResourceKind;

    async fn fetch(&self, credentials: &Credentials) -> Result<Vec<Self::Record>>;
}

/// Type-erased fetcher stored in the registry
#[async_trait]
pub trait ErasedFetcher: Send + Sync {
    async fn fetch_json(&self, credentials: &Credentials) -> Result<Vec<Value>>;
}

#[async_trait]
impl<F: Fetcher> ErasedFetcher for F {
    async fn fetch_json(&self, credentials: &Credentials) -> Result<Vec<Value>> {
        let records = self.fetch(credentials).await?;
        records
            .iter()
            .map(|record| serde_json::to_value(record).context("Failed to serialize record"))
            .collect()
    }
}

/// Table of fetchers keyed by resource kind
#[derive(Clone, Default)]
pub struct FetchRegistry {
    fetchers: BTreeMap<ResourceKind, Arc<dyn ErasedFetcher>>,
}

impl FetchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fetcher under its own kind, replacing any previous one
    pub fn register<F: Fetcher + 'static>(&mut self, fetcher: F) -> &mut Self {
        let kind = fetcher.kind();
        self.fetchers.insert(kind, Arc::new(fetcher));
        self
    }

    pub fn get(&self, kind: ResourceKind) -> Option<Arc<dyn ErasedFetcher>> {
        self.fetchers.get(&kind).cloned()
    }

    /// Registered kinds in kind order
    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.fetchers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}

impl std::fmt::Debug for FetchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
