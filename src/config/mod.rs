use std::{borrow::Cow, path::PathBuf};

use clap::{Args, Parser, ValueEnum};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment, Provider,
};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::level_filters::LevelFilter;

mod validate;

/// Unprefixed environment variables (the names a plain `.env` next to the bot
/// uses) and the configuration key each of them fills in.
const RAW_ENV_KEYS: [(&str, &str); 5] = [
    ("CTFD_API_KEY", "ctfd.api_key"),
    ("CTFD_API_URL", "ctfd.api_url"),
    ("DISCORD_CHANNEL_ID", "discord.channel_id"),
    ("DISCORD_BOT_TOKEN", "discord.bot_token"),
    ("MESSAGE_THUMBNAIL", "discord.thumbnail"),
];

fn default_timeout_secs() -> u64 {
    10
}

fn default_discord_api_url() -> Cow<'static, str> {
    Cow::Borrowed("https://discord.com/api/v10")
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ValueEnum)]
pub enum StoreType {
    File,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone, Args)]
#[group(id = "store")]
pub struct StoreConfig {
    /// Where announced challenges are recorded: an append-only `file`
    /// or `memory` (nothing survives a restart)
    #[serde(deserialize_with = "store_type_deser")]
    #[arg(
        long = "store.type",
        required = false,
        value_enum,
        default_value = "file",
        id = "store.type"
    )]
    pub store_type: StoreType,

    /// Path of the file holding announced challenge ids (one per line)
    #[arg(
        long = "store.path",
        required = false,
        value_parser,
        default_value = "announced_first_bloods.csv",
        id = "store.path"
    )]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::File,
            path: PathBuf::from("announced_first_bloods.csv"),
        }
    }
}

/// Scoring platform (CTFd) settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Ctfd {
    /// API token sent as `Authorization: Token <key>`
    pub api_key: Option<String>,

    /// Challenges endpoint, e.g. `https://ctf.example.org/api/v1/challenges`.
    /// Solves are fetched from `{api_url}/{id}/solves`.
    pub api_url: Option<String>,

    /// Upper bound for a single request to the platform (default: 10 seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for Ctfd {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Chat (Discord) settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Discord {
    /// Bot token sent as `Authorization: Bot <token>`
    pub bot_token: Option<String>,

    /// The channel every announcement is posted to
    pub channel_id: Option<u64>,

    /// Optional image shown in the corner of every announcement
    pub thumbnail: Option<String>,

    /// Root of the Discord REST API (only worth changing for tests or proxies)
    #[serde(default = "default_discord_api_url")]
    pub api_url: Cow<'static, str>,
}

impl Default for Discord {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_id: None,
            thumbnail: None,
            api_url: default_discord_api_url(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Trace,
}

/// Transforms our custom `LogLevel` enum into a `tracing::level_filters::LevelFilter`
/// enum used by the `tracing` crate.
impl From<&LogLevel> for tracing::level_filters::LevelFilter {
    fn from(val: &LogLevel) -> Self {
        match val {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Serialize, Deserialize, Clone, Args)]
#[group(id = "logging")]
pub struct Logging {
    /// If logging is enabled at all. Setting this to `false` will disable all logging output.
    #[arg(
        long = "log.enabled",
        required = false,
        value_parser,
        default_value = "true",
        id = "log.enabled"
    )]
    pub enabled: bool,

    /// The level of logging to be used.
    #[serde(deserialize_with = "log_level_deser")]
    #[arg(
        long = "log.level",
        required = false,
        value_enum,
        default_value = "info"
    )]
    pub level: LogLevel,

    /// The format of the log output
    #[serde(deserialize_with = "log_format_deser")]
    #[arg(
        long = "log.format",
        required = false,
        value_enum,
        default_value = "pretty"
    )]
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
            format: LogFormat::Pretty,
        }
    }
}

/// The main configuration struct.
/// A configuration file (YAML or through ENV) will be parsed into this struct.
/// Example:
///
/// ```yaml
/// service_name: "firstblood"
/// interval_secs: 5
/// logging:
///   level: "INFO"
///   format: "json"
/// store:
///   store_type: "file"
///   path: "/var/lib/firstblood/announced_first_bloods.csv"
/// ctfd:
///   api_url: "https://ctf.example.org/api/v1/challenges"
///   api_key: "ctfd_0123456789abcdef"
///   timeout_secs: 10
/// discord:
///   channel_id: 123456789012345678
///   bot_token: "<token>"
///   thumbnail: "https://ctf.example.org/themes/core/static/img/logo.png"
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Parser)]
#[command(name = "firstblood")]
#[command(version, about, long_about = None)]
pub(crate) struct Config {
    /// The name of the service (will appear as a log property)
    #[serde(default)]
    #[clap(short, long, default_value = "firstblood")]
    pub service_name: Cow<'static, str>,

    /// Seconds between two checks for new first bloods
    #[clap(short, long, default_value = "5")]
    pub interval_secs: u64,

    /// The PATH to the configuration file to be used.
    ///
    /// Either a YAML file or a directory containing `firstblood.yaml`/`firstblood.yml`.
    #[clap(short, required = false, long)]
    #[allow(clippy::struct_field_names)]
    pub config_path: Option<Cow<'static, str>>,

    #[command(flatten)]
    pub logging: Logging,

    #[command(flatten)]
    pub store: StoreConfig,

    #[clap(skip)]
    pub ctfd: Ctfd,

    #[clap(skip)]
    pub discord: Discord,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            service_name: Cow::Borrowed("firstblood"),
            interval_secs: 5,
            config_path: None,
            logging: Logging::default(),
            store: StoreConfig::default(),
            ctfd: Ctfd::default(),
            discord: Discord::default(),
        }
    }
}

/// Implement the `Provider` trait for the `Config` struct.
/// This allows the `Config` struct to be used as a configuration provider with *defaults*.
impl Provider for Config {
    fn metadata(&self) -> figment::Metadata {
        figment::Metadata::named("firstblood")
    }

    fn data(
        &self,
    ) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, figment::Error> {
        Serialized::defaults(Config::default()).data()
    }
}

/// Load the configuration as a `Config` struct: defaults, command-line flags,
/// the optional YAML file and finally the environment.
///
/// Nested keys can be separated by double underscores (__) in the environment variables.
/// E.g. `FIRSTBLOOD_LOGGING__LEVEL=DEBUG` will set the `level` key in the `logging` key.
/// The bare variables of a classic `.env` deployment (`CTFD_API_KEY`, `DISCORD_BOT_TOKEN`, ...)
/// are honoured as well and take precedence.
pub fn load() -> Result<Config, figment::Error> {
    let parsed_commands = Config::parse();

    let config_path = parsed_commands.config_path.clone();
    load_from_path(config_path.as_deref(), &parsed_commands)
}

/// Test-friendly version of load that doesn't parse command line arguments
#[cfg(test)]
pub(crate) fn load_for_test(config_path: Option<&str>) -> Result<Config, figment::Error> {
    load_from_path(config_path, &Config::default())
}

pub(crate) fn load_from_path(
    config_path: Option<&str>,
    parsed_commands: &Config,
) -> Result<Config, figment::Error> {
    let mut figment = Figment::new()
        .merge(Config::default())
        .merge(Serialized::defaults(parsed_commands));

    if let Some(config_path) = config_path {
        if std::path::Path::new(config_path).is_file() {
            figment = figment.merge(Yaml::file(config_path));
        } else {
            figment = figment
                .merge(Yaml::file(format!("{config_path}/firstblood.yml")))
                .merge(Yaml::file(format!("{config_path}/firstblood.yaml")));
        }
    }

    let config: Config = figment
        .merge(Env::prefixed("FIRSTBLOOD_").split("__"))
        .merge(raw_env())
        .extract()?;

    // validate configuration and throw error upwards
    validate::check_config(&config).map_err(|err| figment::Error::from(err.to_string()))?;

    Ok(config)
}

/// Maps the unprefixed variables in `RAW_ENV_KEYS` onto their nested keys
fn raw_env() -> Env {
    let names = RAW_ENV_KEYS.map(|(name, _)| name);

    Env::raw().only(&names).map(|key| {
        RAW_ENV_KEYS
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map_or_else(|| key.as_str().into(), |(_, path)| (*path).into())
    })
}

/// Deserialize function to convert a string to a `LogLevel` Enum
fn log_level_deser<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.to_lowercase().as_str() {
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        "trace" => Ok(LogLevel::Trace),
        _ => Err(serde::de::Error::custom(
            "expected one of DEBUG, INFO, WARN, ERROR, TRACE",
        )),
    }
}

fn log_format_deser<'de, D>(deserializer: D) -> Result<LogFormat, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.to_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "pretty" => Ok(LogFormat::Pretty),
        _ => Err(serde::de::Error::custom("expected one of: json, pretty")),
    }
}

fn store_type_deser<'de, D>(deserializer: D) -> Result<StoreType, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.to_lowercase().as_str() {
        "file" => Ok(StoreType::File),
        "memory" => Ok(StoreType::Memory),
        _ => Err(serde::de::Error::custom("expected one of: file, memory")),
    }
}
