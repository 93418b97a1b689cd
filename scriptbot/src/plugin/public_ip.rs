use std::net::Ipv4Addr;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::{http, plugin::prelude::*};

/// Public IP address lookup plugin.
pub struct PublicIp {
    client: reqwest::Client,
    sources: Vec<Url>,
    command: BotCommand,
}

/// Errors that can occur during a lookup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("unexpected status code: {0}")]
    Status(StatusCode),
    #[error("not an ipv4 address: {0:?}")]
    InvalidAddress(String),
    #[error("all sources failed")]
    Exhausted,
}

/// The response of sources that answer in JSON.
#[derive(Debug, Deserialize)]
struct Origin {
    /// One or more comma-separated addresses.
    origin: String,
}

impl PublicIp {
    /// Creates the plugin using `client` to query `sources` in order.
    #[must_use]
    pub fn with_sources(client: reqwest::Client, sources: Vec<Url>) -> PublicIp {
        PublicIp {
            client,
            sources,
            command: BotCommand::with_aliases(&[".公网", ".ip"]),
        }
    }

    /// Asks each source in turn and returns the first valid IPv4 address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exhausted`] if no source returned one.
    pub async fn lookup(&self) -> Result<Ipv4Addr, Error> {
        for source in &self.sources {
            match self.fetch(source).await {
                Ok(addr) => {
                    debug!(%source, %addr, "found public ip");

                    return Ok(addr);
                }
                Err(err) => warn!(%source, %err, "public ip source failed"),
            }
        }

        Err(Error::Exhausted)
    }

    async fn fetch(&self, source: &Url) -> Result<Ipv4Addr, Error> {
        let response = self
            .client
            .get(source.clone())
            .send()
            .await
            .map_err(Error::Request)?;

        if response.status() != StatusCode::OK {
            return Err(Error::Status(response.status()));
        }

        let text = response.text().await.map_err(Error::Request)?;

        parse_address(&text)
    }

    /// Returns the reply to `text`, or `None` if it is not addressed to this plugin.
    pub async fn respond(&self, text: &str) -> Option<String> {
        self.command.parse(text)?;

        Some(match self.lookup().await {
            Ok(addr) => format!("您的公网IP地址是：{addr}"),
            Err(_) => "获取IP失败 - 所有备用网站均不可用".to_string(),
        })
    }
}

/// Extracts the address from a plain-text or `{"origin": ...}` response, keeping only the first of
/// several comma-separated addresses.
fn parse_address(text: &str) -> Result<Ipv4Addr, Error> {
    let text = match serde_json::from_str::<Origin>(text) {
        Ok(Origin { origin }) => origin,
        Err(_) => text.to_string(),
    };
    let first = text.split(',').next().unwrap_or_default().trim();

    first
        .parse()
        .map_err(|_| Error::InvalidAddress(first.to_string()))
}

#[async_trait]
impl Plugin for PublicIp {
    fn name() -> Name {
        Name("public_ip")
    }

    fn author() -> Author {
        Author("Mikkel Kroman <mk@maero.dk>")
    }

    fn version() -> Version {
        Version("0.1")
    }

    fn commands() -> &'static [&'static str] {
        &[".公网"]
    }

    fn new(context: &Context) -> Result<PublicIp, BotError> {
        let config = &context.config.public_ip;
        let client = http::builder(&context.config.http)
            .timeout(config.timeout)
            .build()
            .map_err(BotError::HttpClient)?;

        Ok(PublicIp::with_sources(client, config.sources.clone()))
    }

    async fn handle_message(&self, message: &Message, client: &Client) -> Result<(), BotError> {
        if let Command::PRIVMSG(ref channel, ref user_message) = message.command
            && let Some(reply) = self.respond(user_message).await
        {
            let target = message.response_target().unwrap_or(channel.as_str());

            send_lines(client, target, &reply)?;
        }

        Ok(())
    }
}
