//! The explicit `App` value threaded through the REPL, replacing the
//! original's process-wide wallet/session/idle-counter/config globals.

use crate::config::Config;
use hermit_shard::shard::ShardSelector;
use hermit_shard::store::ShardStore;
use std::path::Path;

pub struct App {
    pub config: Config,
    pub wallet: hermit_core::wallet::Wallet,
    pub shard_store: ShardStore,
    /// In-progress quorum assembly for the current `unlock` attempt. Reset
    /// after every unlock attempt, successful or not.
    pub selector: ShardSelector,
    pub testnet: bool,
}

impl App {
    pub fn new(config: Config, testnet: bool) -> anyhow::Result<Self> {
        let shard_store = load_shard_store(&config.paths.shards_file)?;
        Ok(Self {
            config,
            wallet: hermit_core::wallet::Wallet::new(),
            shard_store,
            selector: ShardSelector::new(),
            testnet,
        })
    }

    pub fn persist_shard_store(&self) -> anyhow::Result<()> {
        let bytes = self.shard_store.to_bson_bytes()?;
        std::fs::write(&self.config.paths.shards_file, bytes)?;
        Ok(())
    }

    pub fn reload_shard_store(&mut self) -> anyhow::Result<()> {
        self.shard_store = load_shard_store(&self.config.paths.shards_file)?;
        Ok(())
    }
}

fn load_shard_store(path: &Path) -> anyhow::Result<ShardStore> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(ShardStore::from_bson_bytes(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ShardStore::new()),
        Err(e) => Err(e.into()),
    }
}
