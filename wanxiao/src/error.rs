use thiserror::Error;

/// Errors that can occur while querying the electricity service.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying HTTP client could not be built.
    #[cfg(feature = "client")]
    #[error("could not construct http client: {0}")]
    BuildClient(#[source] reqwest::Error),
    /// The account was empty or only whitespace.
    #[error("account is empty")]
    EmptyAccount,
    /// The request did not complete within the client timeout.
    #[cfg(feature = "client")]
    #[error("request timed out")]
    Timeout(#[source] reqwest::Error),
    /// The request failed before a response was received.
    #[cfg(feature = "client")]
    #[error("request error: {0}")]
    Request(#[source] reqwest::Error),
    /// The service responded with something other than `200 OK`.
    #[cfg(feature = "client")]
    #[error("unexpected http status: {0}")]
    Status(reqwest::StatusCode),
    /// The outer envelope is not valid JSON or lacks required fields.
    #[error("could not parse response envelope: {0}")]
    Envelope(#[source] serde_path_to_error::Error<serde_json::Error>),
    /// The `body` field could not be decoded as a JSON object.
    #[error("could not parse response body: {0}")]
    Body(#[source] serde_path_to_error::Error<serde_json::Error>),
    /// The envelope reported success but carried no body.
    #[error("response envelope has no body")]
    MissingBody,
    /// The envelope reported a non-zero status code.
    #[error("service rejected the request ({code}): {message}")]
    Rejected {
        /// The raw `code_` value.
        code: String,
        /// The `message_` value, possibly empty.
        message: String,
    },
    /// The account exists but is not bound to a room.
    #[error("account is not bound to any room")]
    Unbound,
    /// None of the known balance fields held a number.
    #[error("balance not found in response")]
    BalanceNotFound,
    /// The balance parsed but lies outside the plausible range.
    #[error("anomalous balance value: {0}")]
    BalanceOutOfRange(String),
}
