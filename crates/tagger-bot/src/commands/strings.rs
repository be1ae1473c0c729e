use serde::Deserialize;

use super::Command;

/// Every user-visible text the bot produces.
///
/// Templates use `{}` placeholders that are filled positionally by [`fill`].
/// Any field can be overridden from the configuration file; missing fields
/// keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Strings {
    /// `{sender}`, `{tags}`
    pub tag_list: String,
    /// `{sender}`
    pub tag_list_empty: String,
    /// `{sender}`, `{tags}`, `{users}`
    pub tag_search: String,
    /// `{user}`
    pub tag_search_item: String,
    /// `{sender}`, `{tags}`
    pub tag_search_empty: String,
    /// `{sender}`, `{tag}`, `{suggestion}`
    pub tag_search_typo: String,
    /// `{sender}`, `{tag}`
    pub tag_search_unknown: String,
    pub tag_join_and: String,
    /// `{users}`
    pub tag_limit: String,
    pub tag_unlimit: String,
    pub err_param: String,
    /// `{command}`
    pub err_command: String,

    pub help_text: String,
    /// `{bot}`, `{command}`, `{syntax}`, `{help}`
    pub help_line: String,

    pub command_help: String,
    pub command_list: String,
    pub command_add: String,
    pub command_remove: String,
    pub command_search: String,
    pub command_limit: String,
    pub command_unlimit: String,

    pub syntax_help: String,
    pub syntax_list: String,
    pub syntax_add: String,
    pub syntax_remove: String,
    pub syntax_search: String,
    pub syntax_limit: String,
    pub syntax_unlimit: String,

    pub help_help: String,
    pub help_list: String,
    pub help_add: String,
    pub help_remove: String,
    pub help_search: String,
    pub help_limit: String,
    pub help_unlimit: String,
}

impl Default for Strings {
    fn default() -> Self {
        Self {
            tag_list: "Hi {}, you are currently tagged with: {}".into(),
            tag_list_empty: "Hi {}, you are not tagged with anything yet".into(),
            tag_search: "Hi {}, here's a list of everybody tagged with: {}\n\n{}".into(),
            tag_search_item: "- {}".into(),
            tag_search_empty: "Hi {}, nobody is tagged with: {}".into(),
            tag_search_typo: "Hi {}, I don't know the tag '{}' - did you mean '{}'?".into(),
            tag_search_unknown: "Hi {}, I don't know the tag '{}'".into(),
            tag_join_and: "and".into(),
            tag_limit: "Tag search is currently limited to: {}".into(),
            tag_unlimit: "Tag search is currently unlimited".into(),
            err_param: "Sorry, I didn't understand you, a parameter is missing".into(),
            err_command: "Sorry, '{}' is not a command I understand.".into(),

            help_text: "This bot allows users to store and query the tag-set of other users."
                .into(),
            help_line: "- @{} {}: {}  -> {}".into(),

            command_help: "help".into(),
            command_list: "list".into(),
            command_add: "add".into(),
            command_remove: "remove".into(),
            command_search: "search".into(),
            command_limit: "limit".into(),
            command_unlimit: "unlimit".into(),

            syntax_help: String::new(),
            syntax_list: String::new(),
            syntax_add: "<tag>, <tag>, ...".into(),
            syntax_remove: "<tag>, <tag>, ...".into(),
            syntax_search: "<tag>, <tag>, ...".into(),
            syntax_limit: "<user>, <user>, ...".into(),
            syntax_unlimit: String::new(),

            help_help: "To show all commands the bot supports.".into(),
            help_list: "Show all tags currently applied to the user.".into(),
            help_add: "To add personal tag(s).".into(),
            help_remove: "To remove personal tag(s).".into(),
            help_search: "To search for somebody with <tag>.".into(),
            help_limit: "Limit search to this group of users.".into(),
            help_unlimit: "Remove all search limits.".into(),
        }
    }
}

impl Strings {
    /// The token that invokes `command`.
    #[must_use]
    pub fn token(&self, command: Command) -> &str {
        match command {
            Command::Help => &self.command_help,
            Command::List => &self.command_list,
            Command::Add => &self.command_add,
            Command::Remove => &self.command_remove,
            Command::Search => &self.command_search,
            Command::Limit => &self.command_limit,
            Command::Unlimit => &self.command_unlimit,
        }
    }

    #[must_use]
    pub fn syntax(&self, command: Command) -> &str {
        match command {
            Command::Help => &self.syntax_help,
            Command::List => &self.syntax_list,
            Command::Add => &self.syntax_add,
            Command::Remove => &self.syntax_remove,
            Command::Search => &self.syntax_search,
            Command::Limit => &self.syntax_limit,
            Command::Unlimit => &self.syntax_unlimit,
        }
    }

    #[must_use]
    pub fn help(&self, command: Command) -> &str {
        match command {
            Command::Help => &self.help_help,
            Command::List => &self.help_list,
            Command::Add => &self.help_add,
            Command::Remove => &self.help_remove,
            Command::Search => &self.help_search,
            Command::Limit => &self.help_limit,
            Command::Unlimit => &self.help_unlimit,
        }
    }
}

/// Replace each `{}` in `template` with the next item of `args`.
///
/// Placeholders beyond the supplied arguments are left as they are, and
/// surplus arguments are ignored.
#[must_use]
pub fn fill(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(at) = rest.find("{}") {
        out.push_str(&rest[..at]);
        match args.next() {
            Some(arg) => out.push_str(arg),
            None => out.push_str("{}"),
        }
        rest = &rest[at + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_in_order() {
        assert_eq!(
            fill("Hi {}, you are tagged with: {}", &["alice", "rust, go"]),
            "Hi alice, you are tagged with: rust, go"
        );
    }

    #[test]
    fn fill_leaves_missing_placeholders() {
        assert_eq!(fill("{} and {}", &["a"]), "a and {}");
        assert_eq!(fill("no placeholders", &["unused"]), "no placeholders");
    }

    #[test]
    fn fill_does_not_rescan_arguments() {
        assert_eq!(fill("{}!", &["{}"]), "{}!");
    }

    #[test]
    fn every_command_has_a_token() {
        let strings = Strings::default();
        for command in Command::ALL {
            assert!(!strings.token(command).is_empty(), "{command:?}");
            assert!(!strings.help(command).is_empty(), "{command:?}");
        }
    }

    #[test]
    fn overrides_keep_other_defaults() {
        let strings: Strings =
            serde_json::from_str(r#"{"command_add": "tag", "err_param": "?"}"#).unwrap();
        assert_eq!(strings.token(Command::Add), "tag");
        assert_eq!(strings.err_param, "?");
        assert_eq!(strings.token(Command::Remove), "remove");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<Strings>(r#"{"command_frobnicate": "x"}"#).is_err());
    }
}
