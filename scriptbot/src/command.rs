//! User command parsing

/// Simple prefix command parser.
///
/// This is useful when you want to extract a command and some arguments from a users message. A
/// command may be known under several prefixes, the first one being its canonical name.
///
/// # Example
///
/// ```rust
/// use scriptbot::command::Command;
/// let command = Command::with_aliases(&[".电费", ".ele"]);
/// assert_eq!(command.parse(".电费"), Some(""));
/// assert_eq!(command.parse(".ele 5096"), Some("5096"));
/// assert_eq!(command.parse(".电费绑定"), None);
/// assert_eq!(command.name(), ".电费");
/// ```
#[derive(Debug, Clone)]
pub struct Command {
    /// The prefixes to match against, canonical first.
    prefixes: Vec<String>,
}

impl Command {
    /// Creates a new prefix command parser that expects the given prefix.
    #[must_use]
    pub fn new(prefix: &str) -> Command {
        Command::with_aliases(&[prefix])
    }

    /// Creates a new prefix command parser that accepts any of the given prefixes.
    ///
    /// # Panics
    ///
    /// Panics if `prefixes` is empty.
    #[must_use]
    pub fn with_aliases(prefixes: &[&str]) -> Command {
        assert!(!prefixes.is_empty(), "a command needs at least one prefix");

        Command {
            prefixes: prefixes.iter().map(ToString::to_string).collect(),
        }
    }

    /// Returns the canonical prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.prefixes[0]
    }

    /// Checks if the supplied input starts with one of the command prefixes, and if so, returns a
    /// string slice that makes up the arguments, if any.
    #[must_use]
    pub fn parse<'a>(&self, input: &'a str) -> Option<&'a str> {
        self.prefixes
            .iter()
            .find_map(|prefix| Self::parse_prefix(prefix, input))
    }

    fn parse_prefix<'a>(prefix: &str, input: &'a str) -> Option<&'a str> {
        let suffix = input.strip_prefix(prefix)?;

        match suffix.chars().next() {
            // The proceeding character is a whitespace, so we return a slice skipping it
            Some(' ') => Some(&suffix[1..]),
            // There's a proceeding character and it's not whitespace, so it's most likely part
            // of a word and thus is longer than our command prefix.
            Some(_) => None,
            // The input is identical to the command prefix, so return an empty string.
            None => Some(""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_args() {
        let command = Command::new("!test");

        assert_eq!(command.parse("!test --help"), Some("--help"));
    }

    #[test]
    fn parse_command_is_some() {
        let command = Command::new("!test");

        assert_eq!(command.parse("!test"), Some(""));
    }

    #[test]
    fn parse_preserves_whitespace() {
        let command = Command::new("!test");

        assert_eq!(command.parse("!test   --help"), Some("  --help"));
    }

    #[test]
    fn skip_on_non_whitespace_chars() {
        let command = Command::new("!test");

        assert_eq!(command.parse("!testing --help"), None);
    }

    #[test]
    fn parse_accepts_aliases() {
        let command = Command::with_aliases(&[".公网", ".ip"]);

        assert_eq!(command.parse(".公网"), Some(""));
        assert_eq!(command.parse(".ip"), Some(""));
        assert_eq!(command.parse(".ipv6"), None);
    }

    #[test]
    fn parse_handles_multibyte_prefixes() {
        let command = Command::new(".电费");

        assert_eq!(command.parse(".电费 20225080905096"), Some("20225080905096"));
        assert_eq!(command.parse(".电费解绑 5096"), None);
    }
}
