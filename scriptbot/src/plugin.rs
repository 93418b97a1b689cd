use std::fmt::{self, Display};

use async_trait::async_trait;
use irc::client::Client;
use irc::proto::Message;
use tracing::{debug, error};

use crate::{Context, Error};

/// The name of a plugin.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Name(&'static str);
/// The author of a plugin.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Author(&'static str);
/// The version of a plugin.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Version(&'static str);

impl Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Electricity balance lookups with shortcut bindings
#[cfg(feature = "plugin-electricity")]
pub mod electricity;
/// Public IP address lookup
#[cfg(feature = "plugin-public-ip")]
pub mod public_ip;

/// Common includes used in plugins.
#[allow(unused)]
mod prelude {
    pub use super::{Author, Name, Plugin, Version, send_lines};
    pub use crate::Context;
    pub use crate::Error as BotError;
    pub use crate::command::Command as BotCommand;
    pub use async_trait::async_trait;
    pub use irc::client::Client;
    pub use irc::proto::{Command, Message};
}

/// The base trait that all plugins must implement.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Returns the name of the plugin.
    fn name() -> Name
    where
        Self: Sized;

    /// Returns the author of the plugin.
    fn author() -> Author
    where
        Self: Sized;

    /// Returns the version of the plugin.
    fn version() -> Version
    where
        Self: Sized;

    /// Returns the commands the plugin responds to.
    fn commands() -> &'static [&'static str]
    where
        Self: Sized;

    /// The constructor for a new plugin.
    ///
    /// # Errors
    ///
    /// Returns an error if the plugin cannot be set up with the given context.
    fn new(context: &Context) -> Result<Self, Error>
    where
        Self: Sized;

    /// Process an IRC protocol message.
    async fn handle_message(&self, _message: &Message, _client: &Client) -> Result<(), Error> {
        Ok(())
    }
}

/// A plugin together with the metadata shown to users.
pub struct Loaded {
    /// The plugin name.
    pub name: Name,
    /// The plugin version.
    pub version: Version,
    /// The commands the plugin responds to.
    pub commands: &'static [&'static str],
    /// The plugin itself.
    pub plugin: Box<dyn Plugin>,
}

/// Plugin registry.
#[derive(Default)]
pub struct Registry {
    /// List of loaded plugins.
    pub plugins: Vec<Loaded>,
}

impl Registry {
    /// Constructs and returns a new, empty plugin registry.
    #[must_use]
    pub fn new() -> Registry {
        Registry { plugins: vec![] }
    }

    /// Constructs and returns a new plugin registry with every plugin enabled at compile time.
    ///
    /// Plugins that fail to construct are logged and left out.
    #[must_use]
    pub fn preloaded(context: &Context) -> Registry {
        let mut registry = Self::new();
        debug!("registering plugins");

        #[cfg(feature = "plugin-electricity")]
        registry.register::<electricity::Electricity>(context);
        #[cfg(feature = "plugin-public-ip")]
        registry.register::<public_ip::PublicIp>(context);

        let num_plugins = registry.plugins.len();
        debug!(%num_plugins, "finished registering plugins");

        registry
    }

    /// Registers a new plugin based on its type.
    ///
    /// Returns whether the plugin was constructed successfully.
    pub fn register<P: Plugin + 'static>(&mut self, context: &Context) -> bool {
        match P::new(context) {
            Ok(plugin) => {
                debug!(
                    name = %P::name(),
                    author = %P::author(),
                    version = %P::version(),
                    "registered plugin"
                );

                self.plugins.push(Loaded {
                    name: P::name(),
                    version: P::version(),
                    commands: P::commands(),
                    plugin: Box::new(plugin),
                });

                true
            }
            Err(err) => {
                error!(name = %P::name(), %err, "could not load plugin");

                false
            }
        }
    }

    /// Returns the number of loaded plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns whether no plugins are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Renders the list of loaded plugins and their commands.
    #[must_use]
    pub fn listing(&self) -> String {
        if self.plugins.is_empty() {
            return "当前没有可用的脚本".to_string();
        }

        let lines: Vec<String> = self
            .plugins
            .iter()
            .map(|loaded| {
                format!(
                    "{} v{}: {}",
                    loaded.name,
                    loaded.version,
                    loaded.commands.join(" ")
                )
            })
            .collect();

        format!("可用的脚本列表：\n{}", lines.join("\n"))
    }
}

/// Sends every non-empty line of `text` to `target` as a separate message.
///
/// # Errors
///
/// Returns [`Error::Irc`] if a message cannot be sent.
pub fn send_lines(client: &Client, target: &str, text: &str) -> Result<(), Error> {
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        client.send_privmsg(target, line)?;
    }

    Ok(())
}
