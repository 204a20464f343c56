//! Notification sinks
//!
//! Delivery is best effort: callers log failures and move on. Retries or
//! backoff belong in a sink implementation, not in the alerting logic.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::NotifyError;

/// Base URL for the Telegram Bot API
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;

    /// Sink name for logging
    fn name(&self) -> &'static str;
}

/// Writes alerts to the log, optionally ringing the terminal bell
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier {
    bell: bool,
}

impl ConsoleNotifier {
    pub fn new(bell: bool) -> Self {
        Self { bell }
    }
}

#[async_trait]
impl NotificationSink for ConsoleNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        for line in message.lines().filter(|l| !l.trim().is_empty()) {
            info!("{}", line);
        }
        if self.bell {
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(b"\x07");
            let _ = stdout.flush();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Telegram Bot API `sendMessage`
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.bot_token)
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: message,
        };

        let response = self
            .client
            .post(self.send_message_url())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api { status, body });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

/// Delivers each message to every inner sink; succeeds if any sink succeeds
pub struct FanoutNotifier {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl FanoutNotifier {
    pub fn new(sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl NotificationSink for FanoutNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let mut last_error = None;
        let mut delivered = false;

        for sink in &self.sinks {
            match sink.send(message).await {
                Ok(()) => delivered = true,
                Err(e) => {
                    warn!("Notification via {} failed: {}", sink.name(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !delivered => Err(e),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "fanout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recording {
        messages: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl NotificationSink for Recording {
        async fn send(&self, message: &str) -> Result<(), NotifyError> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct Failing;

    #[async_trait]
    impl NotificationSink for Failing {
        async fn send(&self, _message: &str) -> Result<(), NotifyError> {
            Err(NotifyError::Api {
                status: 500,
                body: "down".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_fanout_delivers_past_failures() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let fanout = FanoutNotifier::new(vec![
            Box::new(Failing),
            Box::new(Recording {
                messages: messages.clone(),
            }),
        ]);

        assert!(fanout.send("hello").await.is_ok());
        assert_eq!(*messages.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_fanout_fails_when_every_sink_fails() {
        let fanout = FanoutNotifier::new(vec![Box::new(Failing), Box::new(Failing)]);
        assert!(matches!(
            fanout.send("hello").await,
            Err(NotifyError::Api { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_console_notifier_never_fails() {
        let console = ConsoleNotifier::new(false);
        assert!(console.send("\n*** ALERT ***\nline two").await.is_ok());
    }

    #[test]
    fn test_telegram_url() {
        let notifier = TelegramNotifier::new("123:abc", "42", Duration::from_secs(5)).unwrap();
        assert_eq!(
            notifier.send_message_url(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }
}
