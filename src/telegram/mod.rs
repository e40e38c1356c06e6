//! Report delivery over Telegram.
//!
//! Uses teloxide `Bot` directly (send-only, no dispatcher). Each account may
//! carry its own bot token; the configured fallback token is used otherwise.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};
use tracing::debug;
use url::Url;

/// Where a report goes.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Destination {
    /// Telegram chat id or `@channel` username, as stored on the account.
    pub chat_id: Option<String>,
    /// Per-account bot token.
    pub bot_token: Option<String>,
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("chat_id", &self.chat_id)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Errors from report delivery.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// The stored chat id is neither numeric nor an `@username`.
    #[error("invalid chat id: {0}")]
    InvalidChatId(String),

    /// The Telegram API call failed.
    #[error("telegram request failed: {0}")]
    Api(#[from] teloxide::RequestError),
}

/// Best-effort push of report text.
#[async_trait]
pub trait MessagingChannel: Send + Sync {
    /// Deliver `text` to `destination`.
    ///
    /// Returns `Ok(false)` when the destination is not configured.
    ///
    /// # Errors
    ///
    /// Returns [`MessagingError`] if a configured delivery failed.
    async fn deliver(&self, destination: &Destination, text: &str) -> Result<bool, MessagingError>;
}

/// Telegram implementation of [`MessagingChannel`].
#[derive(Clone, Default)]
pub struct TelegramNotifier {
    fallback_token: Option<String>,
    api_url: Option<Url>,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("fallback_token", &self.fallback_token.as_ref().map(|_| "[REDACTED]"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl TelegramNotifier {
    /// Create a notifier with an optional fallback bot token.
    pub fn new(fallback_token: Option<String>) -> Self {
        Self {
            fallback_token: fallback_token.filter(|t| !t.trim().is_empty()),
            api_url: None,
        }
    }

    /// Point the bot at a different Bot API server.
    #[must_use]
    pub fn with_api_url(mut self, api_url: Url) -> Self {
        self.api_url = Some(api_url);
        self
    }

    fn bot_for(&self, token: &str) -> Bot {
        let bot = Bot::new(token);
        match &self.api_url {
            Some(url) => bot.set_api_url(url.clone()),
            None => bot,
        }
    }
}

#[async_trait]
impl MessagingChannel for TelegramNotifier {
    async fn deliver(&self, destination: &Destination, text: &str) -> Result<bool, MessagingError> {
        let Some(raw_chat_id) = non_blank(destination.chat_id.as_deref()) else {
            debug!("no chat id, skipping report delivery");
            return Ok(false);
        };
        let Some(token) = non_blank(destination.bot_token.as_deref())
            .or_else(|| non_blank(self.fallback_token.as_deref()))
        else {
            debug!("no bot token, skipping report delivery");
            return Ok(false);
        };

        let chat = recipient(raw_chat_id)?;
        self.bot_for(token)
            .send_message(chat, html_escape(text))
            .parse_mode(ParseMode::Html)
            .await?;
        debug!(chat_id = raw_chat_id, "report delivered");
        Ok(true)
    }
}

fn recipient(raw: &str) -> Result<Recipient, MessagingError> {
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    match raw.strip_prefix('@') {
        Some(name) if !name.is_empty() && !name.contains(char::is_whitespace) => {
            Ok(Recipient::ChannelUsername(raw.to_owned()))
        }
        _ => Err(MessagingError::InvalidChatId(raw.to_owned())),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Escape text for Telegram's HTML parse mode.
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
