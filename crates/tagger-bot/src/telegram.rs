use std::time::Duration;

use isahc::config::Configurable;
use isahc::AsyncReadResponseExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// `Telegram` Bot API limits messages to 4096 characters.
const MAX_MESSAGE_LEN: usize = 4096;

/// Long-poll timeout sent to `Telegram` (seconds, server-side).
pub const POLL_TIMEOUT: u64 = 30;

/// HTTP request timeout for `getUpdates` (must exceed [`POLL_TIMEOUT`]).
const HTTP_TIMEOUT: Duration = Duration::from_secs(45);

/// Backoff duration after a `getUpdates` error.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Telegram Bot API wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<TgMessage>,
}

#[derive(Deserialize)]
pub struct TgMessage {
    pub chat: TgChat,
    pub text: Option<String>,
    pub from: Option<TgUser>,
}

#[derive(Deserialize)]
pub struct TgChat {
    pub id: i64,
}

#[derive(Deserialize)]
pub struct TgUser {
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl TgUser {
    /// First and last name, the way `Telegram` clients display them.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct BotUser {
    pub username: Option<String>,
}

#[derive(Deserialize)]
pub struct SentMessage {
    #[allow(dead_code)]
    pub message_id: i64,
}

#[derive(Serialize)]
struct GetUpdatesBody {
    offset: i64,
    timeout: u64,
    allowed_updates: Vec<String>,
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: i64,
    text: &'a str,
}

// ---------------------------------------------------------------------------
// API client
// ---------------------------------------------------------------------------

pub struct ApiClient {
    http: isahc::HttpClient,
    base_url: String,
}

impl ApiClient {
    pub fn new(bot_token: &str) -> Result<Self, String> {
        Ok(Self {
            http: isahc::HttpClient::new().map_err(|e| e.to_string())?,
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
        })
    }

    pub async fn get_me(&self) -> Result<BotUser, String> {
        let request = isahc::Request::get(format!("{}/getMe", self.base_url))
            .body(Vec::new())
            .map_err(|e: isahc::http::Error| e.to_string())?;
        let parsed: ApiResponse<BotUser> = self.call(request).await?;
        into_result(parsed)
    }

    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, String> {
        let body = GetUpdatesBody {
            offset,
            timeout,
            allowed_updates: vec!["message".into()],
        };
        let json = serde_json::to_vec(&body).map_err(|e| e.to_string())?;

        let request = isahc::Request::post(format!("{}/getUpdates", self.base_url))
            .timeout(HTTP_TIMEOUT)
            .header("Content-Type", "application/json")
            .body(json)
            .map_err(|e: isahc::http::Error| e.to_string())?;

        let parsed: ApiResponse<Vec<Update>> = self.call(request).await?;
        if parsed.ok {
            Ok(parsed.result.unwrap_or_default())
        } else {
            Err(parsed.description.unwrap_or_else(|| "unknown error".into()))
        }
    }

    /// Send plain `text` to `chat_id`, truncated to the API limit.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<SentMessage, String> {
        let truncated = truncate(text);
        let body = SendMessageBody {
            chat_id,
            text: &truncated,
        };
        let json = serde_json::to_vec(&body).map_err(|e| e.to_string())?;

        let request = isahc::Request::post(format!("{}/sendMessage", self.base_url))
            .header("Content-Type", "application/json")
            .body(json)
            .map_err(|e: isahc::http::Error| e.to_string())?;

        let parsed: ApiResponse<SentMessage> = self.call(request).await?;
        into_result(parsed)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: isahc::Request<Vec<u8>>,
    ) -> Result<ApiResponse<T>, String> {
        let mut response = self
            .http
            .send_async(request)
            .await
            .map_err(|e| e.to_string())?;
        let text = response.text().await.map_err(|e| e.to_string())?;
        serde_json::from_str(&text).map_err(|e| e.to_string())
    }
}

fn into_result<T>(parsed: ApiResponse<T>) -> Result<T, String> {
    if parsed.ok {
        parsed.result.ok_or_else(|| "no result".into())
    } else {
        Err(parsed.description.unwrap_or_else(|| "unknown error".into()))
    }
}

/// Cut `text` to [`MAX_MESSAGE_LEN`] characters, marking the cut with `...`.
#[must_use]
pub fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_LEN {
        text.to_owned()
    } else {
        let mut s: String = text.chars().take(MAX_MESSAGE_LEN - 3).collect();
        s.push_str("...");
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate("Hi alice"), "Hi alice");
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let text = "ä".repeat(MAX_MESSAGE_LEN + 10);
        let cut = truncate(&text);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_LEN);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn updates_decode() {
        let parsed: ApiResponse<Vec<Update>> = serde_json::from_str(
            r#"{"ok": true, "result": [{
                "update_id": 7,
                "message": {
                    "message_id": 1,
                    "chat": {"id": -100},
                    "from": {"id": 5, "is_bot": false, "first_name": "Ada", "last_name": "Lovelace"},
                    "text": "add: math"
                }
            }]}"#,
        )
        .unwrap();
        let updates = into_result(parsed).unwrap();
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(updates[0].update_id, 7);
        assert_eq!(message.chat.id, -100);
        assert_eq!(message.text.as_deref(), Some("add: math"));
        assert_eq!(message.from.as_ref().unwrap().full_name(), "Ada Lovelace");
    }

    #[test]
    fn api_error_description() {
        let parsed: ApiResponse<BotUser> =
            serde_json::from_str(r#"{"ok": false, "description": "Unauthorized"}"#).unwrap();
        assert_eq!(into_result(parsed).err().as_deref(), Some("Unauthorized"));
    }
}
