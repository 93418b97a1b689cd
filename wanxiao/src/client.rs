//! A client for the electricity usage endpoint.
//!
//! Each query is a single form-encoded POST. There are no retries: a timeout, a transport failure
//! or an unexpected status code is returned to the caller as-is.

use std::time::Duration;

use reqwest::{ClientBuilder, StatusCode, redirect::Policy};
use serde_json::Value;
use url::Url;

use crate::{Error, Usage, types::Envelope};

/// The endpoint of the smart water and electricity service.
pub const DEFAULT_ENDPOINT: &str =
    "https://xqh5.17wanxiao.com/smartWaterAndElectricityService/SWAEServlet";
/// The customer code identifying the university.
pub const DEFAULT_CUSTOMER_CODE: u32 = 1575;
/// The total time a query may take.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// The command that returns the student index page, which includes the balance.
const STUDENT_INDEX_CMD: &str = "h5_getstuindexpage";

/// An asynchronous client for the electricity usage endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    /// The endpoint to send queries to.
    endpoint: Url,
    /// The customer code sent along with every query.
    customer_code: u32,
    /// The underlying [`reqwest::Client`] used for making HTTP requests.
    client: reqwest::Client,
}

impl Client {
    /// Constructs a new `Client` with default settings.
    ///
    /// # Panics
    ///
    /// Panics if the underlying HTTP client cannot be built. For a non-panicking version, see
    /// [`Client::try_new`].
    #[must_use]
    pub fn new() -> Client {
        Client::try_new().expect("could not construct http client")
    }

    /// Attempts to construct a new `Client` with a 30-second timeout and redirects disabled.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::BuildClient`] if the underlying `reqwest` client fails to build.
    pub fn try_new() -> Result<Client, Error> {
        let client = ClientBuilder::new()
            .redirect(Policy::none())
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(Error::BuildClient)?;

        Ok(Self::with_client(client))
    }

    /// Constructs a `Client` using a pre-configured `reqwest::Client`.
    ///
    /// The timeout of the given client is the timeout of every query.
    ///
    /// # Panics
    ///
    /// Never; the default endpoint is a valid URL.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Client {
        let endpoint = Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid url");

        Client {
            endpoint,
            customer_code: DEFAULT_CUSTOMER_CODE,
            client,
        }
    }

    /// Sets the endpoint to send queries to.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Client {
        self.endpoint = endpoint;
        self
    }

    /// Sets the customer code sent along with every query.
    #[must_use]
    pub const fn with_customer_code(mut self, customer_code: u32) -> Client {
        self.customer_code = customer_code;
        self
    }

    /// Returns the endpoint queries are sent to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Queries the remaining balance, room and recent usage of the given student account.
    ///
    /// Exactly one request is sent, and none at all if the account is blank.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyAccount`] if `account` is empty or whitespace.
    /// - [`Error::Timeout`] if the request takes longer than the client timeout.
    /// - [`Error::Request`] on any other transport failure.
    /// - [`Error::Status`] if the response status is not `200 OK`.
    /// - Any parse error of [`Envelope::into_usage`].
    pub async fn usage(&self, account: &str) -> Result<Usage, Error> {
        let account = account.trim();

        if account.is_empty() {
            return Err(Error::EmptyAccount);
        }

        let param = format!(
            r#"{{"cmd":"{STUDENT_INDEX_CMD}","account":{account}}}"#,
            account = Value::from(account)
        );
        let customer_code = self.customer_code.to_string();
        let form = [
            ("param", param.as_str()),
            ("customercode", customer_code.as_str()),
        ];

        #[cfg(feature = "log")]
        tracing::debug!(endpoint = %self.endpoint, %account, "querying electricity usage");

        let request = self.client.post(self.endpoint.clone()).form(&form);
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        if status != StatusCode::OK {
            #[cfg(feature = "log")]
            tracing::warn!(%status, "electricity service returned unexpected status");

            return Err(Error::Status(status));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;

        Envelope::from_slice(&bytes)?.into_usage()
    }
}

impl Default for Client {
    /// Creates a default `Client` instance.
    ///
    /// This is equivalent to calling [`Client::new`].
    fn default() -> Self {
        Self::new()
    }
}

/// Separates timeouts from other transport failures.
fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(err)
    } else {
        Error::Request(err)
    }
}
