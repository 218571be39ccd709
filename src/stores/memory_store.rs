use std::{collections::HashSet, sync::Mutex};

use async_trait::async_trait;

use super::store_trait::AnnouncementStore;

/// Keeps announced challenge ids for the lifetime of the process only
pub struct MemoryStore {
    inner: Mutex<Vec<u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Appended ids in insertion order
    #[cfg(test)]
    pub fn records(&self) -> Vec<u64> {
        self.inner.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AnnouncementStore for MemoryStore {
    async fn load(&self) -> Result<HashSet<u64>, anyhow::Error> {
        let records = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;

        Ok(records.iter().copied().collect())
    }

    async fn append(&self, challenge_id: u64) -> Result<(), anyhow::Error> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?
            .push(challenge_id);
        Ok(())
    }
}
