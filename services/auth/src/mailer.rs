//! Outbound mail delivery
//!
//! Confirmation codes leave the service through a [`Mailer`]. The log backend
//! is meant for development; production deployments point the HTTP backend
//! at a mail relay that accepts JSON messages.

use async_trait::async_trait;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{error, info};

/// A plain-text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail delivery errors
#[derive(Error, Debug)]
pub enum MailError {
    /// The relay could not be reached
    #[error("Mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The relay answered with a non-success status
    #[error("Mail relay rejected the message with status {status}")]
    Rejected { status: u16 },

    /// Misconfigured mail backend
    #[error("Mail configuration error: {0}")]
    Configuration(String),
}

/// Delivers email messages
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Default sender address
    fn sender(&self) -> &str;

    /// Deliver a message; failures must be reported, never swallowed
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Mail backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailBackend {
    /// Write messages to the log
    Log,
    /// POST messages to an HTTP relay
    Http,
}

/// Mailer configuration
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub backend: MailBackend,
    /// Sender address
    pub from: String,
    /// Relay endpoint, required by the HTTP backend
    pub http_url: Option<String>,
    /// Bearer token sent to the relay
    pub http_token: Option<String>,
    /// Upper bound on a single relay request
    pub http_timeout: Duration,
}

impl MailerConfig {
    /// Create a new MailerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `MAIL_BACKEND`: `log` or `http` (default: `log`)
    /// - `MAIL_FROM`: Sender address (default: `noreply@critiq.local`)
    /// - `MAIL_HTTP_URL`: Relay endpoint for the `http` backend
    /// - `MAIL_HTTP_TOKEN`: Optional bearer token for the relay
    /// - `MAIL_HTTP_TIMEOUT`: Relay request timeout in seconds (default: 10)
    pub fn from_env() -> Result<Self, MailError> {
        let backend = match std::env::var("MAIL_BACKEND")
            .unwrap_or_else(|_| "log".to_string())
            .as_str()
        {
            "log" => MailBackend::Log,
            "http" => MailBackend::Http,
            other => {
                return Err(MailError::Configuration(format!(
                    "Unknown MAIL_BACKEND: {}",
                    other
                )));
            }
        };

        let from =
            std::env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@critiq.local".to_string());

        let http_timeout = std::env::var("MAIL_HTTP_TIMEOUT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        Ok(MailerConfig {
            backend,
            from,
            http_url: std::env::var("MAIL_HTTP_URL").ok(),
            http_token: std::env::var("MAIL_HTTP_TOKEN").ok(),
            http_timeout: Duration::from_secs(http_timeout),
        })
    }

    /// Build the configured mailer
    pub fn build(&self) -> Result<Arc<dyn Mailer>, MailError> {
        match self.backend {
            MailBackend::Log => Ok(Arc::new(LogMailer::new(self.from.clone()))),
            MailBackend::Http => {
                let url = self.http_url.clone().ok_or_else(|| {
                    MailError::Configuration("MAIL_HTTP_URL must be set for the http backend".into())
                })?;
                Ok(Arc::new(HttpMailer::new(
                    url,
                    self.http_token.clone(),
                    self.from.clone(),
                    self.http_timeout,
                )?))
            }
        }
    }
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: String) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    fn sender(&self) -> &str {
        &self.from
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Email (log backend): {}",
            message.body
        );
        Ok(())
    }
}

/// Delivers messages to an HTTP mail relay
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(
        endpoint: String,
        token: Option<String>,
        from: String,
        timeout: Duration,
    ) -> Result<Self, MailError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            token,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn sender(&self) -> &str {
        &self.from
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let mut request = self.client.post(&self.endpoint).json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!("Failed to reach mail relay: {}", e);
            MailError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("Mail relay rejected message to {}: {}", message.to, status);
            return Err(MailError::Rejected {
                status: status.as_u16(),
            });
        }

        info!("Email delivered to {}", message.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn message() -> EmailMessage {
        EmailMessage {
            from: "noreply@critiq.local".to_string(),
            to: "reader@example.com".to_string(),
            subject: "Your confirmation code".to_string(),
            body: "Code: abc".to_string(),
        }
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_messages() {
        let mailer = LogMailer::new("noreply@critiq.local".to_string());
        assert_eq!(mailer.sender(), "noreply@critiq.local");
        assert!(mailer.send(&message()).await.is_ok());
    }

    #[tokio::test]
    async fn test_http_mailer_reports_unreachable_relay() {
        // Port 9 (discard) is not expected to accept HTTP connections locally
        let mailer = HttpMailer::new(
            "http://127.0.0.1:9/messages".to_string(),
            None,
            "noreply@critiq.local".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = mailer.send(&message()).await.unwrap_err();
        assert!(matches!(err, MailError::Transport(_)));
    }

    #[tokio::test]
    async fn test_http_mailer_gives_up_on_silent_relay() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let held = tokio::spawn(async move {
            let mut sockets = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                sockets.push(socket);
            }
        });

        let mailer = HttpMailer::new(
            format!("http://{}/messages", addr),
            None,
            "noreply@critiq.local".to_string(),
            Duration::from_millis(300),
        )
        .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), mailer.send(&message())).await;
        held.abort();

        let err = result.expect("send should time out on its own").unwrap_err();
        match err {
            MailError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_http_backend_requires_url() {
        let config = MailerConfig {
            backend: MailBackend::Http,
            from: "noreply@critiq.local".to_string(),
            http_url: None,
            http_token: None,
            http_timeout: Duration::from_secs(10),
        };

        assert!(matches!(config.build(), Err(MailError::Configuration(_))));
    }

    #[test]
    #[serial]
    fn test_mailer_config_from_env() {
        unsafe {
            std::env::remove_var("MAIL_BACKEND");
            std::env::remove_var("MAIL_FROM");
            std::env::set_var("MAIL_HTTP_TIMEOUT", "3");
        }
        let config = MailerConfig::from_env().unwrap();
        assert_eq!(config.backend, MailBackend::Log);
        assert_eq!(config.from, "noreply@critiq.local");
        assert_eq!(config.http_timeout, Duration::from_secs(3));

        unsafe {
            std::env::set_var("MAIL_BACKEND", "pigeon");
        }
        assert!(matches!(
            MailerConfig::from_env(),
            Err(MailError::Configuration(_))
        ));

        unsafe {
            std::env::remove_var("MAIL_BACKEND");
            std::env::remove_var("MAIL_HTTP_TIMEOUT");
        }
    }
}
