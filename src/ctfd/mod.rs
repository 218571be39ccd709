use async_trait::async_trait;

pub mod client;
pub mod models;

pub use client::CtfdClient;
pub use models::{Challenge, Solve};

/// Read access to the scoring platform.
///
/// Both calls swallow their failures: an unreachable platform, an error status
/// or an unexpected body are logged and reported as an empty list, which the
/// scheduler treats as "nothing to do this cycle".
#[async_trait]
pub trait ScoreboardApi: Send + Sync + 'static {
    /// Every challenge currently visible to the API token
    async fn fetch_challenges(&self) -> Vec<Challenge>;

    /// Solves of one challenge, in the order the platform returns them
    /// (earliest first on CTFd)
    async fn fetch_solves(&self, challenge_id: u64) -> Vec<Solve>;
}
