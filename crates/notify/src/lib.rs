//! Email + in-app notification delivery.

pub mod email;
pub mod notifications;
pub mod templates;

pub use email::{CaptureMailer, DisabledMailer, Mailer, MailgunMailer, OutboundEmail};
pub use notifications::{Notification, NotificationKind, NotificationStore};
