use crate::config::Config;
use crate::store::Store;
use crate::vendor::VoiceAgentApi;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OwnedMutexGuard;

type LockMap = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Serializes administrative operations per business so two requests cannot, say, each buy a
/// number for the same business.  Entries live only while someone holds or waits on them.
#[derive(Default)]
pub struct BusinessLocks {
    // business id => advisory lock
    locks: Mutex<LockMap>,
}

/// Held for the duration of one administrative operation.
pub struct BusinessGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a BusinessLocks,
}

impl Drop for BusinessGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        prune(&mut self.locks.map());
    }
}

// Only the map's own reference left: nobody holds or waits on the lock.
fn prune(locks: &mut LockMap) {
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
}

impl BusinessLocks {
    fn map(&self) -> MutexGuard<'_, LockMap> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub async fn acquire(&self, business_id: &str) -> BusinessGuard<'_> {
        let lock = {
            let mut locks = self.map();
            prune(&mut locks);
            locks
                .entry(business_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        BusinessGuard {
            guard: Some(lock.lock_owned().await),
            locks: self,
        }
    }

    /// Number of businesses with a held or awaited lock.
    pub fn tracked(&self) -> usize {
        self.map().len()
    }
}

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub vendor: Arc<dyn VoiceAgentApi>,
    pub business_locks: BusinessLocks,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>, vendor: Arc<dyn VoiceAgentApi>) -> Self {
        Self {
            config,
            store,
            vendor,
            business_locks: BusinessLocks::default(),
        }
    }
}
