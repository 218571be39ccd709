use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use http::{header, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::{config::Discord, detector::FirstBlood, tools::join_url};

use super::Notifier;

const EMBED_TITLE: &str = "🩸 First Blood! 🩸";
const EMBED_COLOR: u32 = 0xFF_00_00;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of `POST /channels/{channel.id}/messages`
#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct CreateMessage {
    pub embeds: Vec<Embed>,
}

#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedThumbnail>,
}

#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct EmbedThumbnail {
    pub url: String,
}

/// Response from `GET /users/@me`
/// `{ "id": "80351110224678912", "username": "firstblood", ... }`
#[derive(Deserialize, Debug)]
struct CurrentUser {
    username: String,
}

/// Builds the announcement embed for a first blood
pub(crate) fn build_message(first_blood: &FirstBlood, thumbnail: Option<&str>) -> CreateMessage {
    let description = format!(
        "**Challenge :** ``{}``\n**Équipe :** {}\n**Résolu :** {}",
        first_blood.challenge_name, first_blood.solver, first_blood.solved_at
    );

    CreateMessage {
        embeds: vec![Embed {
            title: EMBED_TITLE.to_string(),
            description,
            color: EMBED_COLOR,
            thumbnail: thumbnail
                .filter(|url| !url.is_empty())
                .map(|url| EmbedThumbnail {
                    url: url.to_string(),
                }),
        }],
    }
}

/// Posts announcements to a single Discord channel through the REST API
pub struct DiscordNotifier {
    http: reqwest::Client,
    api_url: String,
    channel_id: u64,
    thumbnail: Option<String>,
}

impl DiscordNotifier {
    pub fn new(config: &Discord) -> Result<Self, anyhow::Error> {
        let bot_token = config
            .bot_token
            .as_deref()
            .ok_or_else(|| anyhow!("discord.bot_token is required"))?;
        let channel_id = config
            .channel_id
            .ok_or_else(|| anyhow!("discord.channel_id is required"))?;

        let mut token = HeaderValue::from_str(&format!("Bot {bot_token}"))
            .context("discord.bot_token contains characters not allowed in a header")?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, token);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("DiscordBot (firstblood, ", env!("CARGO_PKG_VERSION"), ")"))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            channel_id,
            thumbnail: config.thumbnail.clone(),
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn connect(&self) -> Result<String, anyhow::Error> {
        let response = self
            .http
            .get(join_url(&self.api_url, "users/@me"))
            .send()
            .await
            .context("could not reach Discord")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Discord rejected the bot token (status {status})");
        }

        let user = response.json::<CurrentUser>().await?;
        Ok(user.username)
    }

    async fn announce(&self, first_blood: &FirstBlood) -> Result<(), anyhow::Error> {
        let message = build_message(first_blood, self.thumbnail.as_deref());

        let response = self
            .http
            .post(join_url(
                &self.api_url,
                &format!("channels/{}/messages", self.channel_id),
            ))
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Discord answered {status}: {body}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use serde_json::json;

    use crate::tools::http_stub::{StubResponse, StubServer};

    use super::*;

    fn first_blood() -> FirstBlood {
        FirstBlood {
            challenge_id: 1,
            challenge_name: "Crypto1".to_string(),
            solver: "TeamA".to_string(),
            solved_at: "01/01/2024 11:00:00".to_string(),
        }
    }

    fn discord_config(url: &str) -> Discord {
        Discord {
            bot_token: Some("bot-token".to_string()),
            channel_id: Some(987),
            thumbnail: Some("https://ctf.example.org/logo.png".to_string()),
            api_url: Cow::Owned(url.to_string()),
        }
    }

    #[test]
    fn test_build_message() {
        let message = build_message(&first_blood(), Some("https://ctf.example.org/logo.png"));

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "embeds": [{
                    "title": "🩸 First Blood! 🩸",
                    "description": "**Challenge :** ``Crypto1``\n**Équipe :** TeamA\n**Résolu :** 01/01/2024 11:00:00",
                    "color": 0xFF0000,
                    "thumbnail": { "url": "https://ctf.example.org/logo.png" }
                }]
            })
        );
    }

    #[test]
    fn test_build_message_without_thumbnail() {
        let message = build_message(&first_blood(), None);
        let value = serde_json::to_value(&message).unwrap();

        assert!(value["embeds"][0].get("thumbnail").is_none());
        assert_eq!(build_message(&first_blood(), Some("")), message);
    }

    #[test]
    fn test_requires_token_and_channel() {
        assert!(DiscordNotifier::new(&Discord::default()).is_err());
    }

    #[tokio::test]
    async fn test_announce_posts_embed_to_channel() {
        let server = StubServer::start(|_| StubResponse::json(200, r#"{"id":"1"}"#)).await;
        let notifier = DiscordNotifier::new(&discord_config(&server.url)).unwrap();

        notifier.announce(&first_blood()).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/channels/987/messages");
        assert_eq!(requests[0].header("authorization"), Some("Bot bot-token"));

        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["embeds"][0]["title"], "🩸 First Blood! 🩸");
        assert_eq!(
            body["embeds"][0]["thumbnail"]["url"],
            "https://ctf.example.org/logo.png"
        );
    }

    #[tokio::test]
    async fn test_announce_failure_is_reported() {
        let server =
            StubServer::start(|_| StubResponse::json(403, r#"{"message":"Missing Access"}"#)).await;
        let notifier = DiscordNotifier::new(&discord_config(&server.url)).unwrap();

        let err = notifier.announce(&first_blood()).await.unwrap_err();

        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("Missing Access"));
    }

    #[tokio::test]
    async fn test_connect_returns_bot_name() {
        let server = StubServer::start(|request| {
            if request.path == "/users/@me" {
                StubResponse::json(200, r#"{"id":"80351110224678912","username":"firstblood"}"#)
            } else {
                StubResponse::json(404, "{}")
            }
        })
        .await;
        let notifier = DiscordNotifier::new(&discord_config(&server.url)).unwrap();

        assert_eq!(notifier.connect().await.unwrap(), "firstblood");
    }

    #[tokio::test]
    async fn test_connect_with_bad_token_fails() {
        let server = StubServer::start(|_| StubResponse::json(401, r#"{"message":"401: Unauthorized"}"#)).await;
        let notifier = DiscordNotifier::new(&discord_config(&server.url)).unwrap();

        assert!(notifier.connect().await.is_err());
    }
}
