use std::future::Future;
use std::pin::Pin;

use futures_lite::Stream;

use super::Inbound;

/// Console-based chat interface using stdin/stdout.
///
/// Every line is a message from the same local user.
pub struct Chat {
    user: String,
}

impl Chat {
    #[must_use]
    pub const fn new(user: String) -> Self {
        Self { user }
    }
}

impl super::Chat for Chat {
    fn messages(&self) -> Pin<Box<dyn Stream<Item = Inbound> + Send + '_>> {
        use futures_lite::io::AsyncBufReadExt;
        use futures_lite::StreamExt;

        let stdin = blocking::Unblock::new(std::io::stdin());
        let reader = futures_lite::io::BufReader::new(stdin);
        let lines = reader.lines();
        Box::pin(lines.filter_map(move |line| {
            let Ok(line) = line else { return None };
            let body = line.trim();
            if body.is_empty() {
                return None;
            }
            Some(Inbound {
                body: body.to_owned(),
                sender: self.user.clone(),
                chat: 0,
            })
        }))
    }

    fn reply<'a>(
        &'a self,
        _to: &'a Inbound,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            println!("{text}");
        })
    }
}
