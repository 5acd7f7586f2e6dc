//! Shard store: a name-to-shard map persisted as BSON, matching the wire
//! format spec.md §6 specifies for the shard store file.

use crate::shard::Shard;
use crate::ShardError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ShardStore {
    shards: BTreeMap<String, Shard>,
}

impl ShardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, shard: Shard) {
        self.shards.insert(shard.name.clone(), shard);
    }

    pub fn get(&self, name: &str) -> Option<&Shard> {
        self.shards.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Shard> {
        self.shards.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shards.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Shard> {
        self.shards.values()
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Serialize to the BSON bytes persisted on disk.
    pub fn to_bson_bytes(&self) -> Result<Vec<u8>, ShardError> {
        bson::to_vec(self).map_err(|e| ShardError::InvalidShare(e.to_string()))
    }

    /// Parse shard-store BSON bytes read from disk.
    pub fn from_bson_bytes(bytes: &[u8]) -> Result<Self, ShardError> {
        bson::from_slice(bytes).map_err(|e| ShardError::InvalidShare(e.to_string()))
    }
}
