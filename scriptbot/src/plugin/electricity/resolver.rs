//! Resolves user supplied tokens to accounts and hands out shortcuts.
//!
//! A token is either a shortcut, which is looked up in the [`BindingStore`], or a full account.
//! The first successful query of a full account that has no shortcut yet binds a newly generated
//! shortcut to it.

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use wanxiao::{Room, Usage};

use super::bindings::BindingStore;
use super::report;

/// The maximum length of an account.
pub const MAX_ACCOUNT_LEN: usize = 20;
/// The number of numeric suffixes tried when a shortcut is taken.
const MAX_SUFFIX: u32 = 99;

/// Errors that can occur while answering a query.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The account has characters other than letters, digits, `-` and `_`, or is too long.
    #[error("invalid account: {0:?}")]
    InvalidAccount(String),
    /// No account is bound to the shortcut.
    #[error("unknown shortcut: {0}")]
    ShortcutNotFound(String),
    /// The electricity service query failed.
    #[error(transparent)]
    Query(#[from] wanxiao::Error),
}

/// A classified query token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// A shortcut bound to an account.
    Shortcut(&'a str),
    /// A full account.
    Account(&'a str),
}

/// Classifies a query token.
///
/// Tokens of 2 to 6 digits are shortcuts, everything else is an account. A numeric account of
/// that length is therefore never queried directly.
#[must_use]
pub fn classify(token: &str) -> Token<'_> {
    if (2..=6).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_digit()) {
        Token::Shortcut(token)
    } else {
        Token::Account(token)
    }
}

/// Checks that `account` is 1 to 20 characters of ASCII letters, digits, `-` or `_`.
///
/// # Errors
///
/// Returns [`Error::InvalidAccount`] otherwise.
pub fn validate_account(account: &str) -> Result<(), Error> {
    let valid = !account.is_empty()
        && account.len() <= MAX_ACCOUNT_LEN
        && account
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidAccount(account.to_string()))
    }
}

/// Returns the last `n` characters of `s`, or all of it if it is shorter.
fn tail(s: &str, n: usize) -> &str {
    let len = s.chars().count();

    if len <= n {
        return s;
    }

    s.char_indices().nth(len - n).map_or(s, |(idx, _)| &s[idx..])
}

/// Returns the preferred shortcut of `account`: its last 4 characters, or its last 2 if it is
/// shorter, or the whole account.
#[must_use]
pub fn shortcut_base(account: &str) -> &str {
    match account.chars().count() {
        len if len >= 4 => tail(account, 4),
        len if len >= 2 => tail(account, 2),
        _ => account,
    }
}

/// Picks a free shortcut for `account`.
///
/// Returns `None` if the preferred shortcut, all of its numeric suffixes and the `e`-prefixed
/// fallback are taken.
#[must_use]
pub fn allocate_shortcut(account: &str, store: &BindingStore) -> Option<String> {
    let base = format!("{:0>2}", shortcut_base(account));

    if !store.contains(&base) {
        return Some(base);
    }

    if let Some(shortcut) = (1..=MAX_SUFFIX)
        .map(|suffix| format!("{base}{suffix}"))
        .find(|candidate| !store.contains(candidate))
    {
        return Some(shortcut);
    }

    let fallback = format!("e{}", tail(account, 2));

    (!store.contains(&fallback)).then_some(fallback)
}

/// The shortcut outcome of a successful full-account query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The account already had this shortcut.
    Existing(String),
    /// This shortcut was bound to the account.
    Created(String),
    /// No free shortcut was left.
    Exhausted,
}

/// Answers balance queries, binding shortcuts as accounts are seen.
pub struct Resolver {
    /// The electricity service client.
    client: wanxiao::Client,
    /// Shortcut bindings, locked for the whole lookup-allocate-add sequence.
    store: Mutex<BindingStore>,
}

impl Resolver {
    /// Creates a resolver querying through `client` and binding shortcuts in `store`.
    #[must_use]
    pub fn new(client: wanxiao::Client, store: BindingStore) -> Resolver {
        Resolver {
            client,
            store: Mutex::new(store),
        }
    }

    /// Locks and returns the binding store.
    pub async fn store(&self) -> MutexGuard<'_, BindingStore> {
        self.store.lock().await
    }

    /// Answers a query for either a shortcut or a full account.
    ///
    /// Every failure is turned into a reply, so this always returns something to show the user.
    pub async fn query(&self, token: &str) -> String {
        let token = token.trim();

        if token.is_empty() {
            return report::USAGE.to_string();
        }

        let result = match classify(token) {
            Token::Shortcut(shortcut) => self
                .query_shortcut(shortcut)
                .await
                .map(|usage| report::usage(&usage)),
            Token::Account(account) => self
                .resolve_and_register(account)
                .await
                .map(|(_, text)| text),
        };

        result.unwrap_or_else(|err| {
            debug!(%token, %err, "query failed");

            report::failure(&err)
        })
    }

    /// Queries the account bound to `shortcut`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShortcutNotFound`] without querying anything if the shortcut is unknown,
    /// or the query error otherwise.
    pub async fn query_shortcut(&self, shortcut: &str) -> Result<Usage, Error> {
        let account = self
            .store()
            .await
            .account_for(shortcut)
            .map(ToString::to_string)
            .ok_or_else(|| Error::ShortcutNotFound(shortcut.to_string()))?;

        debug!(%shortcut, %account, "resolved shortcut");

        Ok(self.client.usage(&account).await?)
    }

    /// Queries a full account and binds a shortcut to it if it has none yet.
    ///
    /// Returns the room and the reply text, which ends with the shortcut of the account.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAccount`] without querying anything if the account is malformed,
    /// or the query error otherwise. No binding is made on error.
    pub async fn resolve_and_register(&self, account: &str) -> Result<(Room, String), Error> {
        let account = account.trim();

        validate_account(account)?;

        let usage = self.client.usage(account).await?;
        let registration = self.register(account, &usage.room).await;
        let text = format!(
            "{}\n{}",
            report::usage(&usage),
            report::registration(&registration)
        );

        Ok((usage.room, text))
    }

    async fn register(&self, account: &str, room: &Room) -> Registration {
        let mut store = self.store().await;

        if let Some(shortcut) = store.shortcut_for(account) {
            return Registration::Existing(shortcut.to_string());
        }

        let Some(shortcut) = allocate_shortcut(account, &store) else {
            warn!(%account, "no free shortcut left");

            return Registration::Exhausted;
        };

        store.add(&shortcut, account, &room.to_string()).await;
        info!(%shortcut, %account, "bound new shortcut");

        Registration::Created(shortcut)
    }
}
