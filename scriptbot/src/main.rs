use std::path::PathBuf;

use argh::FromArgs;
use miette::WrapErr;
use tracing::{info, warn};

use scriptbot::{Config, ScriptBot, telemetry};

/// IRC bot that answers electricity balance queries
#[derive(Debug, FromArgs)]
struct Opts {
    /// path to config file
    #[argh(option, default = "PathBuf::from(\"config.toml\")")]
    config_path: PathBuf,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let opts: Opts = argh::from_env();
    let config = Config::load(&opts.config_path)?;

    telemetry::try_init(&config.tracing)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %opts.config_path.display(),
        "starting scriptbot"
    );

    let mut bot = ScriptBot::new(config)?;
    let result = bot
        .run()
        .await
        .wrap_err("running the irc client");

    warn!("the irc connection closed");

    result
}
