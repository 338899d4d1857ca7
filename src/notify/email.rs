use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use super::NotifyError;
use crate::config::NotifyConfig;

/// A fully rendered message ready for the email API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// False when sending would be a no-op (e.g. no API key).
    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError>;
}

/// Staff reply forwarded to a guest who left an email address.
#[derive(Debug, Clone)]
pub struct GuestReply {
    pub to: String,
    pub guest_name: Option<String>,
    pub customer_name: String,
    pub customer_slug: String,
    pub message: String,
}

impl GuestReply {
    pub fn chat_url(&self, chat_domain: &str) -> String {
        format!("https://{}.{}?chat=open", self.customer_slug, chat_domain)
    }

    pub fn render(&self, config: &NotifyConfig) -> OutgoingEmail {
        let customer = escape_html(&self.customer_name);
        let guest = escape_html(self.guest_name.as_deref().unwrap_or("there"));
        let html = format!(
            r#"<!DOCTYPE html>
<html>
<body style="font-family: Georgia, serif; line-height: 1.7; color: #2d3e2f;">
  <div style="max-width: 500px; margin: 0 auto; padding: 20px;">
    <h1 style="text-align: center;">{customer}</h1>
    <p>Hi {guest}!</p>
    <p>We have replied to your message:</p>
    <div style="background: #f0fdf4; border-left: 4px solid #2d3e2f; padding: 16px;">
      <p style="margin: 0; white-space: pre-wrap;">{message}</p>
    </div>
    <p style="text-align: center; margin-top: 24px;">
      <a href="{url}">Open the chat to reply</a>
    </p>
    <p>Kind regards,<br><em>The team at {customer}</em></p>
  </div>
</body>
</html>"#,
            customer = customer,
            guest = guest,
            message = escape_html(&self.message),
            url = self.chat_url(&config.chat_domain),
        );

        OutgoingEmail {
            from: format!("{} <{}>", self.customer_name, config.email_from_address),
            to: self.to.clone(),
            subject: format!("Reply from {}", self.customer_name),
            html,
        }
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// Sends through the Resend HTTP API.
pub struct ResendMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl ResendMailer {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.email_api_url.clone(),
            api_key: config.resend_api_key.clone(),
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(NotifyError::NotConfigured("RESEND_API_KEY"))?;

        debug!("Sending email '{}' to {}", email.subject, email.to);
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&json!({
                "from": email.from,
                "to": email.to,
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Email sent to {}", email.to);
        Ok(())
    }
}
