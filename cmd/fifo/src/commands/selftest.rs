//! Store self-test command.

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::warn;

use giztoy_fifo::{BackingStore, FileStore, MemoryStore};

use super::StoreArgs;
use crate::Cli;

/// Initialize a store and verify it reads back what was written.
#[derive(Args)]
pub struct SelftestCommand {
    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Debug, Serialize)]
struct SelftestResult {
    store: String,
    capacity: usize,
    passed: bool,
}

impl SelftestCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let capacity = self.store.capacity;
        let passed = match &self.store.file {
            Some(path) => check(&mut FileStore::new(path, capacity))?,
            None => check(&mut MemoryStore::new(capacity))?,
        };

        let result = SelftestResult {
            store: self.store.describe(),
            capacity,
            passed,
        };
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!(
                "{} ({} bytes): {}",
                result.store,
                result.capacity,
                if passed { "ok" } else { "FAILED" }
            );
        }

        if !passed {
            warn!("store self-test failed");
            anyhow::bail!("self-test failed for {}", result.store);
        }
        Ok(())
    }
}

fn check(store: &mut impl BackingStore) -> anyhow::Result<bool> {
    store.init().context("failed to initialize store")?;
    store.self_test().context("self-test I/O failed")
}
