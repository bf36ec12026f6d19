// src/inventory/cache.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::errors::Result;
use crate::inventory::Inventory;
use crate::inventory::provider::TaskProvider;

/// Default time an inventory snapshot is reused before it is rebuilt.
pub const DEFAULT_INVENTORY_TTL: Duration = Duration::from_secs(5);

struct Snapshot {
    inventory: Arc<Inventory>,
    built_at: Instant,
}

/// Time-bounded cache of the task inventory and its producer index.
///
/// A multi-task build looks the inventory up once per runner; without the
/// cache every lookup would re-fetch and re-index every task. The lock is
/// held across the fetch, so callers arriving during a rebuild wait for it
/// and then share its snapshot instead of starting their own.
pub struct InventoryCache {
    provider: Arc<dyn TaskProvider>,
    ttl: Duration,
    state: Mutex<Option<Snapshot>>,
    invalidated: AtomicBool,
    builds: AtomicU64,
}

impl InventoryCache {
    pub fn new(provider: Arc<dyn TaskProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            state: Mutex::new(None),
            invalidated: AtomicBool::new(false),
            builds: AtomicU64::new(0),
        }
    }

    /// Current snapshot, rebuilding it if it is older than the TTL or has
    /// been invalidated.
    pub async fn get(&self) -> Result<Arc<Inventory>> {
        let mut guard = self.state.lock().await;
        let forced = self.invalidated.swap(false, Ordering::AcqRel);

        if !forced {
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.built_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(&snapshot.inventory));
                }
            }
        }

        let tasks = match self.provider.fetch_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                if forced {
                    self.invalidated.store(true, Ordering::Release);
                }
                return Err(e);
            }
        };

        let inventory = Arc::new(Inventory::new(tasks));
        let build = self.builds.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            build,
            tasks = inventory.tasks().len(),
            wildcard_rules = inventory.index().wildcard_rules().len(),
            forced,
            "rebuilt task inventory"
        );

        *guard = Some(Snapshot {
            inventory: Arc::clone(&inventory),
            built_at: Instant::now(),
        });
        Ok(inventory)
    }

    /// Force the next [`get`](Self::get) to rebuild.
    pub fn invalidate(&self) {
        debug!("task inventory invalidated");
        self.invalidated.store(true, Ordering::Release);
    }

    /// How many snapshots have been built so far.
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
