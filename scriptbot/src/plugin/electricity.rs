//! Electricity balance queries against the campus service, with shortcut bindings for repeat
//! queries.

use tracing::debug;

use crate::plugin::prelude::*;

pub mod bindings;
pub mod report;
pub mod resolver;

use bindings::BindingStore;
use resolver::Resolver;

/// Electricity balance plugin.
pub struct Electricity {
    resolver: Resolver,
    query: BotCommand,
    list: BotCommand,
    unbind: BotCommand,
}

impl Electricity {
    /// Creates the plugin around an existing resolver.
    #[must_use]
    pub fn with_resolver(resolver: Resolver) -> Electricity {
        Electricity {
            resolver,
            query: BotCommand::with_aliases(&[".电费", ".ele"]),
            list: BotCommand::with_aliases(&[".电费绑定", ".ele-list"]),
            unbind: BotCommand::with_aliases(&[".电费解绑", ".ele-unbind"]),
        }
    }

    /// Returns the resolver answering queries.
    #[must_use]
    pub const fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Returns the reply to `text`, or `None` if it is not addressed to this plugin.
    pub async fn respond(&self, text: &str) -> Option<String> {
        if let Some(args) = self.query.parse(text) {
            let token = args.split_whitespace().next().unwrap_or_default();

            return Some(self.resolver.query(token).await);
        }

        if self.list.parse(text).is_some() {
            return Some(report::bindings(&*self.resolver.store().await));
        }

        if let Some(args) = self.unbind.parse(text) {
            let shortcut = shlex::split(args)
                .and_then(|args| args.into_iter().next())
                .unwrap_or_default();

            if shortcut.is_empty() {
                return Some(report::UNBIND_USAGE.to_string());
            }

            let removed = self.resolver.store().await.remove(&shortcut).await;
            debug!(%shortcut, %removed, "unbind");

            return Some(report::unbind(&shortcut, removed));
        }

        None
    }
}

#[async_trait]
impl Plugin for Electricity {
    fn name() -> Name {
        Name("electricity")
    }

    fn author() -> Author {
        Author("Mikkel Kroman <mk@maero.dk>")
    }

    fn version() -> Version {
        Version("0.2")
    }

    fn commands() -> &'static [&'static str] {
        &[".电费", ".电费绑定", ".电费解绑"]
    }

    fn new(context: &Context) -> Result<Electricity, BotError> {
        let config = &context.config.electricity;
        let mut client = wanxiao::Client::with_client(context.http.clone())
            .with_customer_code(config.customer_code);

        if let Some(endpoint) = &config.endpoint {
            client = client.with_endpoint(endpoint.clone());
        }

        let store = BindingStore::open(&config.store_path);

        Ok(Electricity::with_resolver(Resolver::new(client, store)))
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
