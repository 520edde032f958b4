//! Mailgun email delivery behind the `Mailer` trait.

use mediaplan_core::config::MailgunConfig;
use mediaplan_core::HubResult;
use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// A fully rendered message ready for the provider.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Transactional email seam. Delivery is best-effort; callers decide whether
/// a failure matters.
pub trait Mailer: Send + Sync {
    /// Send one message, returning the provider message id.
    fn send(&self, email: &OutboundEmail) -> HubResult<String>;
}

/// Mailgun provider.
/// In production: POST to https://api.mailgun.net/v3/{domain}/messages.
pub struct MailgunMailer {
    config: MailgunConfig,
}

impl MailgunMailer {
    pub fn new(config: MailgunConfig) -> Self {
        info!(
            domain = %config.domain,
            from = %config.from_email,
            "Mailgun mailer initialized"
        );
        Self { config }
    }
}

impl Mailer for MailgunMailer {
    fn send(&self, email: &OutboundEmail) -> HubResult<String> {
        // Build the Mailgun form payload (stub — in production, HTTP POST
        // with the api key as basic auth).
        let _payload = serde_json::json!({
            "from": format!("{} <{}>", self.config.from_name, self.config.from_email),
            "to": email.to,
            "subject": email.subject,
            "html": email.html,
        });

        let message_id = format!("mg-{}", Uuid::new_v4());
        debug!(to = %email.to, subject = %email.subject, %message_id, "Email queued via Mailgun");
        metrics::counter!("notify.emails_sent").increment(1);
        Ok(message_id)
    }
}

/// Mailer used when EMAIL_NOTIFICATIONS_ENABLED is off: logs and drops.
pub struct DisabledMailer;

impl Mailer for DisabledMailer {
    fn send(&self, email: &OutboundEmail) -> HubResult<String> {
        debug!(to = %email.to, subject = %email.subject, "Email notifications disabled, dropping");
        metrics::counter!("notify.emails_suppressed").increment(1);
        Ok("suppressed".to_string())
    }
}

/// Captures outbound mail for assertions in tests.
#[derive(Default)]
pub struct CaptureMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl CaptureMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Mailer for CaptureMailer {
    fn send(&self, email: &OutboundEmail) -> HubResult<String> {
        self.sent.lock().push(email.clone());
        Ok(format!("cap-{}", self.sent.lock().len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutboundEmail {
        OutboundEmail {
            to: "dana@example.com".into(),
            subject: "Creative asset uploaded".into(),
            html: "<html></html>".into(),
        }
    }

    #[test]
    fn mailgun_returns_message_id() {
        let mailer = MailgunMailer::new(MailgunConfig::default());
        let id = mailer.send(&email()).unwrap();
        assert!(id.starts_with("mg-"));
    }

    #[test]
    fn capture_mailer_records() {
        let mailer = CaptureMailer::new();
        mailer.send(&email()).unwrap();
        assert_eq!(mailer.count(), 1);
        assert_eq!(mailer.sent()[0].to, "dana@example.com");
    }
}
