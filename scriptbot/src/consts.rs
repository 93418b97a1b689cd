use std::time::Duration;

/// The `User-Agent` header to send when issuing HTTP requests.
pub const HTTP_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:141.0) Gecko/20100101 Firefox/141.0";

/// The duration before a HTTP request times out.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The duration before a single public IP source is given up on.
pub const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(10);

/// Public IP lookup services, in the order they are tried.
pub const PUBLIC_IP_SOURCES: &[&str] = &[
    "https://ip.3322.net",
    "https://api.ipify.org",
    "https://ifconfig.me",
    "https://api.ip.sb/ip",
    "https://httpbin.org/ip",
];

/// The default location of the electricity binding store.
pub const DEFAULT_BINDINGS_PATH: &str = "data/electricity_bindings.json";

/// The prefix of environment variables that override the config file.
pub const ENV_PREFIX: &str = "SCRIPTBOT_";
