use anyhow::anyhow;

use super::Config;

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// given a Config struct, validate the values to ensure
/// that the bot won't fail later on when it tries to use them
pub fn check_config(config: &Config) -> Result<(), anyhow::Error> {
    let mut missing = vec![];

    if is_blank(config.ctfd.api_key.as_deref()) {
        missing.push("ctfd.api_key (CTFD_API_KEY)");
    }
    if is_blank(config.ctfd.api_url.as_deref()) {
        missing.push("ctfd.api_url (CTFD_API_URL)");
    }
    if config.discord.channel_id.is_none() {
        missing.push("discord.channel_id (DISCORD_CHANNEL_ID)");
    }
    if is_blank(config.discord.bot_token.as_deref()) {
        missing.push("discord.bot_token (DISCORD_BOT_TOKEN)");
    }

    if !missing.is_empty() {
        return Err(anyhow!(
            "missing required configuration: {}",
            missing.join(", ")
        ));
    }

    if config.interval_secs == 0 {
        return Err(anyhow!("interval_secs must be greater than 0"));
    }

    if config.ctfd.timeout_secs == 0 {
        return Err(anyhow!("ctfd.timeout_secs must be greater than 0"));
    }

    if let Some(url) = config.ctfd.api_url.as_deref() {
        if !is_http_url(url) {
            return Err(anyhow!("ctfd.api_url must be an http(s) URL, got {url}"));
        }
    }

    if !is_http_url(&config.discord.api_url) {
        return Err(anyhow!(
            "discord.api_url must be an http(s) URL, got {}",
            config.discord.api_url
        ));
    }

    if config.store.path.as_os_str().is_empty() {
        return Err(anyhow!("store.path cannot be empty"));
    }

    Ok(())
}
