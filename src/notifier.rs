// SPDX-License-Identifier: PMPL-1.0-or-later
//! Sales notification for newly stored leads.
//!
//! Delivery is best-effort. Every outcome, including a missing transport, is
//! reported as a [`NotifyOutcome`] and never as an error.

use crate::config::MailConfig;
use crate::models::{EmailStatus, Lead};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reason recorded when no transport is configured.
pub const NOT_CONFIGURED: &str = "not configured";

/// Mail delivery failure.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// A composed plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail contract.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

/// SMTP relay transport (STARTTLS).
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailTransport {
    /// Build a transport from configuration, or `None` when host or
    /// credentials are missing.
    pub fn from_config(config: &MailConfig) -> Result<Option<Self>, MailError> {
        let (Some(host), Some(user), Some(password)) = (
            config.smtp_host.as_deref(),
            config.smtp_user.as_deref(),
            config.smtp_password.as_deref(),
        ) else {
            return Ok(None);
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .timeout(Some(config.timeout()))
            .build();

        Ok(Some(Self {
            transport,
            from: config.from_address.parse()?,
        }))
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())?;

        let response = self.transport.send(message).await?;
        if !response.is_positive() {
            return Err(MailError::Rejected(response.code().to_string()));
        }
        Ok(())
    }
}

/// Notification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    NotSent { reason: String },
}

impl NotifyOutcome {
    /// Email status and error detail to record on the lead.
    pub fn into_status(self) -> (EmailStatus, Option<String>) {
        match self {
            Self::Sent => (EmailStatus::Sent, None),
            Self::NotSent { reason } => (EmailStatus::Error, Some(reason)),
        }
    }
}

/// Composes and sends lead notifications to the sales address.
pub struct Notifier {
    transport: Option<Arc<dyn MailTransport>>,
    sales_address: String,
    timeout: Duration,
}

impl Notifier {
    pub fn new(
        transport: Option<Arc<dyn MailTransport>>,
        sales_address: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            sales_address: sales_address.into(),
            timeout,
        }
    }

    /// Notifier with no transport; every lead is only logged.
    pub fn unconfigured(sales_address: impl Into<String>) -> Self {
        Self::new(None, sales_address, Duration::from_secs(10))
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Build the sales message for a lead.
    pub fn compose(&self, lead: &Lead) -> OutboundEmail {
        let phone = if lead.phone.is_empty() {
            "-"
        } else {
            lead.phone.as_str()
        };
        let body = format!(
            "New quote request received.\n\n\
             Company:    {}\n\
             Email:      {}\n\
             Phone:      {}\n\
             Fleet size: {}\n\
             Interest:   {}\n\n\
             Lead ID:    {}\n\
             Received:   {}\n",
            lead.company_name,
            lead.email,
            phone,
            lead.fleet_size,
            lead.fuel_type,
            lead.id,
            lead.created_at.to_rfc3339(),
        );

        OutboundEmail {
            to: self.sales_address.clone(),
            subject: format!("New quote request: {}", lead.company_name),
            body,
        }
    }

    /// Send the notification for `lead`.
    pub async fn notify(&self, lead: &Lead) -> NotifyOutcome {
        let email = self.compose(lead);

        let Some(transport) = &self.transport else {
            info!(
                lead_id = %lead.id,
                to = %email.to,
                subject = %email.subject,
                body = %email.body,
                "Mail transport not configured, notification logged only"
            );
            return NotifyOutcome::NotSent {
                reason: NOT_CONFIGURED.to_string(),
            };
        };

        match tokio::time::timeout(self.timeout, transport.send(&email)).await {
            Ok(Ok(())) => {
                debug!(lead_id = %lead.id, to = %email.to, "Lead notification sent");
                NotifyOutcome::Sent
            }
            Ok(Err(e)) => {
                warn!(lead_id = %lead.id, error = %e, "Lead notification failed");
                NotifyOutcome::NotSent {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                warn!(lead_id = %lead.id, timeout = ?self.timeout, "Lead notification timed out");
                NotifyOutcome::NotSent {
                    reason: "timed out".to_string(),
                }
            }
        }
    }
}
