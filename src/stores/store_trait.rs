use std::collections::HashSet;

use async_trait::async_trait;

/// Durable record of the challenges whose first blood was already announced.
///
/// Records are only ever appended: `load` is called once at startup and
/// `append` once per successful announcement.
#[async_trait]
pub trait AnnouncementStore: Send + Sync + 'static {
    /// Every challenge id recorded so far. A store that was never written to
    /// yields an empty set.
    async fn load(&self) -> Result<HashSet<u64>, anyhow::Error>;

    /// Records one more announced challenge id without touching existing records.
    async fn append(&self, challenge_id: u64) -> Result<(), anyhow::Error>;
}
