//! The main process for communicating over IRC and managing loaded scripts.
use futures::stream::StreamExt;
use irc::client::prelude::Client;
use irc::proto::{Command, Message};
use tracing::{debug, error, info};

use crate::Error;
use crate::Registry;
use crate::command::Command as BotCommand;
use crate::config::Config;
use crate::context::Context;
use crate::plugin::send_lines;

/// Reply to a finished reload.
pub const RELOADED: &str = "脚本重新加载完成";

/// The main IRC bot struct that manages connection state and message handling.
pub struct ScriptBot {
    /// The shared context for plugins
    context: Context,
    /// The currently loaded plugins
    registry: Registry,
    /// Lists the loaded plugins
    script_command: BotCommand,
    /// Reloads every plugin
    reload_command: BotCommand,
}

impl ScriptBot {
    /// Creates a new bot from the provided configuration and loads every plugin.
    ///
    /// The IRC connection is not established until [`ScriptBot::run`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HttpClient`] if the shared HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, Error> {
        let context = Context::new(config)?;
        let registry = Registry::preloaded(&context);

        info!(num_plugins = registry.len(), "loaded plugins");

        Ok(ScriptBot {
            context,
            registry,
            script_command: BotCommand::with_aliases(&[".script", ".scripts"]),
            reload_command: BotCommand::new(".reload"),
        })
    }

    /// Returns the loaded plugins.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Starts the bot and begins processing IRC messages.
    ///
    /// # Errors
    ///
    /// This function will return an error in the following situations:
    ///
    /// - [`Error::IrcClient`] - if the instantiation of the IRC client fails (e.g. due to
    ///   configuration issues.)
    /// - [`Error::IrcRegistration`] - if user registration fails (e.g. if the nickname is already taken.)
    /// - [`Error::Irc`] - if a protocol or communication error occurred.
    pub async fn run(&mut self) -> Result<(), Error> {
        let mut client = Client::from_config(self.context.config.irc.clone().into())
            .await
            .map_err(Error::IrcClient)?;

        client.identify().map_err(Error::IrcRegistration)?;

        let mut stream = client.stream()?;

        while let Some(message) = stream.next().await.transpose()? {
            self.handle_message(&client, message).await?;
        }

        Ok(())
    }

    /// Processes a single IRC message, answering built-in commands and then dispatching it to
    /// every loaded plugin.
    ///
    /// A plugin that fails is logged and does not stop the others.
    async fn handle_message(&mut self, client: &Client, message: Message) -> Result<(), Error> {
        debug!(?message, "processing irc message");

        if let Command::PRIVMSG(ref channel, ref text) = message.command
            && let Some(reply) = self.handle_builtin(text)
        {
            let target = message.response_target().unwrap_or(channel.as_str());

            send_lines(client, target, &reply)?;
        }

        for loaded in &self.registry.plugins {
            if let Err(err) = loaded.plugin.handle_message(&message, client).await {
                error!(plugin = %loaded.name, %err, "plugin failed to handle message");
            }
        }

        Ok(())
    }

    /// Answers the built-in `.script` and `.reload` commands.
    ///
    /// Returns `None` if `text` is neither.
    pub fn handle_builtin(&mut self, text: &str) -> Option<String> {
        if self.script_command.parse(text).is_some() {
            return Some(self.registry.listing());
        }

        if self.reload_command.parse(text).is_some() {
            self.reload();

            return Some(RELOADED.to_string());
        }

        None
    }

    /// Replaces every plugin with a freshly constructed one.
    pub fn reload(&mut self) {
        self.registry = Registry::preloaded(&self.context);

        info!(num_plugins = self.registry.len(), "reloaded plugins");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(dir: &tempfile::TempDir) -> ScriptBot {
        let mut config = Config::default();
        config.electricity.store_path = dir.path().join("bindings.json");

        ScriptBot::new(config).unwrap()
    }

    #[test]
    #[cfg(feature = "plugins-all")]
    fn script_lists_loaded_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = bot(&dir);

        let listing = bot.handle_builtin(".script").unwrap();

        assert!(listing.starts_with("可用的脚本列表："));
        assert!(listing.contains("electricity v0.2: .电费 .电费绑定 .电费解绑"));
        assert!(listing.contains("public_ip v0.1: .公网"));
    }

    #[test]
    fn reload_rebuilds_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = bot(&dir);
        let before = bot.registry().len();

        assert_eq!(bot.handle_builtin(".reload").as_deref(), Some(RELOADED));
        assert_eq!(bot.registry().len(), before);
    }

    #[test]
    fn other_messages_are_not_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let mut bot = bot(&dir);

        assert_eq!(bot.handle_builtin(".scripting"), None);
        assert_eq!(bot.handle_builtin(".电费 5096"), None);
    }
}
