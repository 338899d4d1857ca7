//! Outbound side effects: guest reply email and browser push.
//!
//! Both transports sit behind traits so the API can be driven with recording
//! fakes. Failures here never roll back the write that triggered them.

pub mod email;
pub mod push;

pub use email::{escape_html, GuestReply, Mailer, OutgoingEmail, ResendMailer};
pub use push::{PushDelivery, PushPayload, PushTransport, RelayPushTransport};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Transport not configured: {0}")]
    NotConfigured(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
