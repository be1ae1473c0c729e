use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use futures_lite::Stream;

use super::Inbound;
use crate::telegram::{ApiClient, TgMessage, ERROR_BACKOFF, POLL_TIMEOUT};

/// `Telegram` bot chat interface.
///
/// Receives messages via long polling and answers in the chat each message
/// came from. With a `chat_id` set, every other chat is ignored.
pub struct Chat {
    api: ApiClient,
    chat_id: Option<i64>,
}

impl Chat {
    pub fn new(bot_token: &str, chat_id: Option<i64>) -> Result<Self, String> {
        Ok(Self {
            api: ApiClient::new(bot_token)?,
            chat_id,
        })
    }

    /// Turn a `Telegram` message into an [`Inbound`], if it is meant for us.
    fn inbound(&self, message: TgMessage, username: Option<&str>) -> Option<Inbound> {
        if self.chat_id.is_some_and(|id| id != message.chat.id) {
            return None;
        }
        let from = message.from.filter(|user| !user.is_bot)?;
        let body = command_text(message.text.as_deref()?, username)?;
        Some(Inbound {
            body,
            sender: from.full_name(),
            chat: message.chat.id,
        })
    }
}

impl super::Chat for Chat {
    fn messages(&self) -> Pin<Box<dyn Stream<Item = Inbound> + Send + '_>> {
        struct PollState {
            offset: i64,
            buffer: VecDeque<Inbound>,
            username: Option<String>,
            resolved: bool,
        }

        let initial = PollState {
            offset: 0,
            buffer: VecDeque::new(),
            username: None,
            resolved: false,
        };

        Box::pin(futures_lite::stream::unfold(initial, move |mut state| {
            async move {
                if let Some(item) = state.buffer.pop_front() {
                    return Some((item, state));
                }

                if !state.resolved {
                    match self.api.get_me().await {
                        Ok(me) => {
                            tracing::info!(username = ?me.username, "Telegram bot identity");
                            state.username = me.username;
                            state.resolved = true;
                        }
                        Err(e) => tracing::warn!("Telegram getMe error: {e}"),
                    }
                }

                loop {
                    match self.api.get_updates(state.offset, POLL_TIMEOUT).await {
                        Ok(updates) => {
                            for update in updates {
                                if update.update_id >= state.offset {
                                    state.offset = update.update_id + 1;
                                }
                                let Some(message) = update.message else {
                                    continue;
                                };
                                if let Some(inbound) =
                                    self.inbound(message, state.username.as_deref())
                                {
                                    state.buffer.push_back(inbound);
                                }
                            }
                            if let Some(item) = state.buffer.pop_front() {
                                return Some((item, state));
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Telegram getUpdates error: {e}");
                            async_io::Timer::after(ERROR_BACKOFF).await;
                        }
                    }
                }
            }
        }))
    }

    fn reply<'a>(
        &'a self,
        to: &'a Inbound,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if let Err(e) = self.api.send_message(to.chat, text).await {
                tracing::warn!(chat = to.chat, "Telegram sendMessage error: {e}");
            }
        })
    }
}

/// Strip `Telegram` addressing from `text`, leaving the command body.
///
/// A leading `@username` mention and a leading `/` are removed, as is the
/// `@username` suffix of `/command@username`. Messages that mention or
/// address a different bot yield `None`, as do empty ones.
fn command_text(text: &str, username: Option<&str>) -> Option<String> {
    let is_us = |name: &str| username.is_some_and(|ours| ours.eq_ignore_ascii_case(name));

    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix('@') {
        let (name, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if !is_us(name) {
            return None;
        }
        body = tail.trim_start();
    }

    let body = match body.strip_prefix('/') {
        Some(rest) => {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == ':')
                .unwrap_or(rest.len());
            let (token, tail) = rest.split_at(end);
            let command = match token.split_once('@') {
                Some((command, target)) if is_us(target) => command,
                Some(_) => return None,
                None => token,
            };
            format!("{command}{tail}")
        }
        None => body.to_owned(),
    };

    let body = body.trim();
    (!body.is_empty()).then(|| body.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: Option<&str> = Some("TaggerBot");

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(command_text("  add: rust ", BOT).as_deref(), Some("add: rust"));
    }

    #[test]
    fn leading_mention_is_stripped() {
        assert_eq!(
            command_text("@taggerbot search: rust", BOT).as_deref(),
            Some("search: rust")
        );
        assert_eq!(command_text("@TaggerBot", BOT), None);
    }

    #[test]
    fn other_mentions_are_ignored() {
        assert_eq!(command_text("@alice search: rust", BOT), None);
        assert_eq!(command_text("@taggerbot list", None), None);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(command_text("/list", BOT).as_deref(), Some("list"));
        assert_eq!(command_text("/add rust, go", BOT).as_deref(), Some("add rust, go"));
        assert_eq!(command_text("/add: rust", BOT).as_deref(), Some("add: rust"));
    }

    #[test]
    fn slash_command_with_bot_suffix() {
        assert_eq!(
            command_text("/search@TaggerBot rust", BOT).as_deref(),
            Some("search rust")
        );
        assert_eq!(command_text("/search@OtherBot rust", BOT), None);
    }

    #[test]
    fn mention_then_slash() {
        assert_eq!(command_text("@TaggerBot /help", BOT).as_deref(), Some("help"));
    }

    #[test]
    fn empty_messages() {
        assert_eq!(command_text("   ", BOT), None);
        assert_eq!(command_text("/", BOT), None);
    }
}
