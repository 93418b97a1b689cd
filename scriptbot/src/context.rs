use crate::{Config, Error, http};

/// Shared context handed to plugins when they are constructed.
pub struct Context {
    /// The bot configuration.
    pub config: Config,
    /// The shared HTTP client.
    pub http: reqwest::Client,
}

impl Context {
    /// Creates a new context, building the shared HTTP client from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpClient`] if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, Error> {
        let http = http::build_client(&config.http)?;

        Ok(Self { config, http })
    }
}
