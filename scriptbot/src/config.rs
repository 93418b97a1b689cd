use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

use crate::{Error, consts};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Tracing configuration
    #[serde(default)]
    pub tracing: TracingConfig,
    /// IRC client configuration
    pub irc: IrcConfig,
    /// Shared HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,
    /// Electricity script configuration
    #[serde(default)]
    pub electricity: ElectricityConfig,
    /// Public IP script configuration
    #[serde(default)]
    pub public_ip: PublicIpConfig,
}

impl Config {
    /// Loads the TOML file at `path`, with `SCRIPTBOT_`-prefixed environment variables taking
    /// precedence. Nested keys are separated by `__`, e.g. `SCRIPTBOT_IRC__NICKNAME`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the merged configuration cannot be deserialized.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, Error> {
        let path = path.as_ref();

        trace!(?path, "loading config");

        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(consts::ENV_PREFIX).split("__"))
            .extract()
            .map_err(|err| Error::Config(Box::new(err)))
    }
}

/// The format of log lines written to stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Export spans over OTLP
    pub enabled: bool,
    /// Format of stdout logs
    pub format: LogFormat,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Total time allowed per request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// The `User-Agent` header to send
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout: consts::HTTP_TIMEOUT,
            user_agent: consts::HTTP_USER_AGENT.to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ElectricityConfig {
    /// Endpoint of the usage service, if not the public one
    pub endpoint: Option<Url>,
    /// Customer code identifying the university
    pub customer_code: u32,
    /// Path of the JSON file holding shortcut bindings
    pub store_path: PathBuf,
}

impl Default for ElectricityConfig {
    fn default() -> Self {
        ElectricityConfig {
            endpoint: None,
            customer_code: wanxiao::client::DEFAULT_CUSTOMER_CODE,
            store_path: PathBuf::from(consts::DEFAULT_BINDINGS_PATH),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PublicIpConfig {
    /// Lookup services, tried in order
    pub sources: Vec<Url>,
    /// Time allowed per source
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PublicIpConfig {
    fn default() -> Self {
        let sources = consts::PUBLIC_IP_SOURCES
            .iter()
            .filter_map(|source| Url::parse(source).ok())
            .collect();

        PublicIpConfig {
            sources,
            timeout: consts::PUBLIC_IP_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct IrcChannelConfig {
    /// The shared key to access the channel.
    pub key: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct IrcTlsConfig {
    /// Enable TLS.
    pub enabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IrcConfig {
    /// The client's nickname.
    pub nickname: String,
    /// Alternative nicknames for the client, if the default is taken.
    pub alt_nicks: Vec<String>,
    /// The hostname of the server to connect to.
    pub hostname: String,
    /// The password to connect to the server.
    pub password: Option<String>,
    /// The port number of the server to connect to.
    pub port: Option<u16>,
    /// TLS configuration.
    pub tls: Option<IrcTlsConfig>,
    /// Channels to join, with optional keys.
    pub channels: HashMap<String, Option<IrcChannelConfig>>,
}

impl IrcConfig {
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.fallback_port())
    }

    /// Return the port number to use based on whether the connection requires TLS or not.
    fn fallback_port(&self) -> u16 {
        if self.tls.as_ref().is_some_and(|tls| tls.enabled) {
            6697
        } else {
            6667
        }
    }
}

impl From<IrcConfig> for irc::client::data::Config {
    fn from(config: IrcConfig) -> Self {
        let port = config.port();
        let use_tls = config.tls.as_ref().map(|tls| tls.enabled);
        let channel_keys = config
            .channels
            .iter()
            .filter_map(|(channel, cfg)| {
                let key = cfg.as_ref()?.key.clone()?;
                Some((channel.clone(), key))
            })
            .collect();
        let channels = config.channels.into_keys().collect();

        irc::client::data::Config {
            nickname: Some(config.nickname),
            alt_nicks: config.alt_nicks,
            server: Some(config.hostname),
            password: config.password,
            port: Some(port),
            use_tls,
            channels,
            channel_keys,
            ..Default::default()
        }
    }
}
