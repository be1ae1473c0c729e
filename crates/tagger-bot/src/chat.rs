pub mod telegram;
pub mod terminal;

use std::future::Future;
use std::pin::Pin;

use futures_lite::Stream;

/// A message addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Command text with any transport-specific addressing removed.
    pub body: String,
    /// Display identity of the author. Tags are stored under this name.
    pub sender: String,
    /// Conversation the reply goes back to. Zero for the terminal.
    pub chat: i64,
}

/// A chat interface the bot listens on.
///
/// Implementations turn transport messages into [`Inbound`] values and
/// deliver reply text back to the conversation it came from.
pub trait Chat: Send + Sync {
    /// Stream of inbound messages. Ends when the source disconnects.
    fn messages(&self) -> Pin<Box<dyn Stream<Item = Inbound> + Send + '_>>;

    /// Deliver `text` as the answer to `to`. Delivery errors are logged.
    fn reply<'a>(
        &'a self,
        to: &'a Inbound,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

#[must_use]
pub const fn terminal(user: String) -> terminal::Chat {
    terminal::Chat::new(user)
}

pub fn telegram(bot_token: &str, chat_id: Option<i64>) -> Result<telegram::Chat, String> {
    telegram::Chat::new(bot_token, chat_id)
}
