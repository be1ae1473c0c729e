mod parse;
mod strings;

use std::collections::BTreeSet;

use tagger_index::matcher::TYPO_THRESHOLD;
use tagger_index::store::{self, Store, StoreExt};
use tagger_index::{CaseFolding, Selector, TagMapping};

pub use strings::Strings;

use strings::fill;

/// Store key holding the users search results are restricted to.
pub const LIMIT_KEY: &str = "limit";

/// The operations the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    List,
    Add,
    Remove,
    Search,
    Limit,
    Unlimit,
}

impl Command {
    /// All commands, in the order they are listed in the help text.
    pub const ALL: [Self; 7] = [
        Self::Help,
        Self::List,
        Self::Add,
        Self::Remove,
        Self::Search,
        Self::Limit,
        Self::Unlimit,
    ];
}

/// A command that was refused with an explanation for the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A parameter-taking command got no parameters.
    MissingParameter,
    /// No command is registered under this token.
    UnknownCommand(String),
    /// A searched tag is not carried by anybody.
    UnknownTag {
        tag: String,
        /// A close known tag, when one scores above [`TYPO_THRESHOLD`].
        suggestion: Option<String>,
    },
}

/// Why a command produced no regular reply.
#[derive(Debug)]
enum Failure {
    Rejected(Rejection),
    Internal(exn::Exn<store::Error>),
}

impl From<Rejection> for Failure {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl From<exn::Exn<store::Error>> for Failure {
    fn from(err: exn::Exn<store::Error>) -> Self {
        Self::Internal(err)
    }
}

/// Turns message bodies into replies.
///
/// Every call to [`handle`](Self::handle) is an independent transaction: the
/// mapping is loaded fresh from the store and written back only when a
/// command changed it and completed.
pub struct Dispatcher {
    strings: Strings,
    folding: CaseFolding,
    bot_name: String,
}

impl Dispatcher {
    #[must_use]
    pub fn new(strings: Strings, folding: CaseFolding, bot_name: impl Into<String>) -> Self {
        Self {
            strings,
            folding,
            bot_name: bot_name.into(),
        }
    }

    /// Full help text: the description followed by one line per command.
    #[must_use]
    pub fn usage(&self) -> String {
        let lines: Vec<String> = Command::ALL
            .into_iter()
            .map(|command| {
                fill(
                    &self.strings.help_line,
                    &[
                        self.bot_name.as_str(),
                        self.strings.token(command),
                        self.strings.syntax(command),
                        self.strings.help(command),
                    ],
                )
            })
            .collect();
        format!("{}\n\n{}", self.strings.help_text, lines.join("\n"))
    }

    /// Handle one message from `sender`.
    ///
    /// Returns the reply to send, or `None` when the command failed
    /// internally. Internal failures are logged and never shown in chat.
    pub fn handle<S: Store + ?Sized>(&self, storage: &S, sender: &str, body: &str) -> Option<String> {
        let (token, params) = parse::split(body);
        let result = match self.lookup(token) {
            Some(command) => {
                tracing::debug!(?command, sender, "dispatching command");
                self.apply(command, storage, sender, params)
            }
            None => Err(Rejection::UnknownCommand(token.to_owned()).into()),
        };
        match result {
            Ok(reply) => Some(reply),
            Err(Failure::Rejected(rejection)) => {
                tracing::debug!(?rejection, sender, "command rejected");
                Some(self.render_rejection(sender, &rejection))
            }
            Err(Failure::Internal(err)) => {
                tracing::error!(error = ?err, sender, command = token, "command failed");
                None
            }
        }
    }

    fn lookup(&self, token: &str) -> Option<Command> {
        Command::ALL
            .into_iter()
            .find(|command| self.strings.token(*command) == token)
    }

    fn apply<S: Store + ?Sized>(
        &self,
        command: Command,
        storage: &S,
        sender: &str,
        params: Option<&str>,
    ) -> Result<String, Failure> {
        match command {
            Command::Help => Ok(self.usage()),
            Command::List => self.manage(storage, sender, |_| {}),
            Command::Add => {
                let tags = parse::read_parameters(params)?;
                self.manage(storage, sender, |mapping| mapping.add(sender, &tags))
            }
            Command::Remove => {
                let tags = parse::read_parameters(params)?;
                self.manage(storage, sender, |mapping| mapping.remove(sender, &tags))
            }
            Command::Search => self.search(storage, sender, params),
            Command::Limit => {
                let users = parse::read_parameters(params)?;
                let mut limit: BTreeSet<String> = storage.get_or(LIMIT_KEY, BTreeSet::new())?;
                limit.extend(users);
                storage.put_as(LIMIT_KEY, &limit)?;
                Ok(self.render_limit(&limit))
            }
            Command::Unlimit => {
                storage.put_as(LIMIT_KEY, &BTreeSet::<String>::new())?;
                Ok(self.render_limit(&BTreeSet::new()))
            }
        }
    }

    /// Run `mutate` against the sender's mapping and report their tags.
    fn manage<S, F>(&self, storage: &S, sender: &str, mutate: F) -> Result<String, Failure>
    where
        S: Store + ?Sized,
        F: FnOnce(&mut TagMapping),
    {
        let tags = TagMapping::scoped(storage, self.folding, |mapping| {
            mutate(mapping);
            Ok(mapping.find(Selector::User(sender)).clone())
        })?;
        Ok(self.render_tags(sender, &tags))
    }

    fn search<S: Store + ?Sized>(
        &self,
        storage: &S,
        sender: &str,
        params: Option<&str>,
    ) -> Result<String, Failure> {
        let queried: BTreeSet<String> = parse::read_parameters(params)?
            .iter()
            .map(|tag| self.folding.normalize(tag).into_owned())
            .collect();
        let limit: BTreeSet<String> = storage.get_or(LIMIT_KEY, BTreeSet::new())?;
        let found = TagMapping::scoped(storage, self.folding, |mapping| {
            Ok(matching_users(mapping, &queried, &limit))
        })??;

        let and = format!(" {} ", self.strings.tag_join_and);
        let tags: Vec<&str> = queried.iter().map(String::as_str).collect();
        let tags = tags.join(and.as_str());
        if found.is_empty() {
            return Ok(fill(&self.strings.tag_search_empty, &[sender, tags.as_str()]));
        }
        let users: Vec<String> = found
            .iter()
            .map(|user| fill(&self.strings.tag_search_item, &[user.as_str()]))
            .collect();
        Ok(fill(
            &self.strings.tag_search,
            &[sender, tags.as_str(), users.join("\n").as_str()],
        ))
    }

    fn render_tags(&self, sender: &str, tags: &BTreeSet<String>) -> String {
        if tags.is_empty() {
            return fill(&self.strings.tag_list_empty, &[sender]);
        }
        let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
        fill(&self.strings.tag_list, &[sender, tags.join(", ").as_str()])
    }

    fn render_limit(&self, limit: &BTreeSet<String>) -> String {
        if limit.is_empty() {
            return self.strings.tag_unlimit.clone();
        }
        let users: Vec<&str> = limit.iter().map(String::as_str).collect();
        fill(&self.strings.tag_limit, &[users.join(", ").as_str()])
    }

    fn render_rejection(&self, sender: &str, rejection: &Rejection) -> String {
        match rejection {
            Rejection::MissingParameter => self.strings.err_param.clone(),
            Rejection::UnknownCommand(token) => fill(&self.strings.err_command, &[token.as_str()]),
            Rejection::UnknownTag {
                tag,
                suggestion: Some(suggestion),
            } => fill(
                &self.strings.tag_search_typo,
                &[sender, tag.as_str(), suggestion.as_str()],
            ),
            Rejection::UnknownTag {
                tag,
                suggestion: None,
            } => fill(&self.strings.tag_search_unknown, &[sender, tag.as_str()]),
        }
    }
}

/// Users carrying every tag in `queried`, restricted to `limit` unless it is
/// empty.
///
/// Stops at the first tag nobody carries, suggesting the closest known tag
/// if it looks like a typo.
fn matching_users(
    mapping: &TagMapping,
    queried: &BTreeSet<String>,
    limit: &BTreeSet<String>,
) -> Result<BTreeSet<String>, Rejection> {
    if let Some(unknown) = queried.iter().find(|tag| !mapping.contains(tag)) {
        let suggestion = mapping
            .nearest(unknown)
            .filter(|nearest| nearest.ratio > TYPO_THRESHOLD)
            .map(|nearest| nearest.tag);
        return Err(Rejection::UnknownTag {
            tag: unknown.clone(),
            suggestion,
        });
    }

    let mut sets = queried.iter().map(|tag| mapping.find(Selector::Tag(tag)));
    let mut found = sets.next().cloned().unwrap_or_default();
    for users in sets {
        found.retain(|user| users.contains(user));
    }
    if !limit.is_empty() {
        found.retain(|user| limit.contains(user));
    }
    Ok(found)
}
