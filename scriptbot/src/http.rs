//! HTTP features

use reqwest::{Client, ClientBuilder, redirect::Policy};

use crate::Error;
use crate::config::HttpConfig;

/// Returns a default HTTP client builder using the given configuration.
#[must_use]
pub fn builder(config: &HttpConfig) -> ClientBuilder {
    ClientBuilder::new()
        .redirect(Policy::none())
        .timeout(config.timeout)
        .user_agent(&config.user_agent)
}

/// Builds a default HTTP client.
///
/// # Errors
///
/// Returns [`Error::HttpClient`] if the client cannot be built, e.g. due to an invalid user agent
/// or a broken TLS backend.
pub fn build_client(config: &HttpConfig) -> Result<Client, Error> {
    builder(config).build().map_err(Error::HttpClient)
}
