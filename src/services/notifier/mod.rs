use async_trait::async_trait;

use crate::detector::FirstBlood;

pub mod discord;

pub use discord::DiscordNotifier;

/// Delivers first blood announcements to the chat destination
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Checks the chat credentials and returns the name the bot posts under.
    /// Called once at startup; an error there stops the process.
    async fn connect(&self) -> Result<String, anyhow::Error>;

    /// `Ok` only once the message was accepted by the chat service
    async fn announce(&self, first_blood: &FirstBlood) -> Result<(), anyhow::Error>;
}
