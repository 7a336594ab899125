// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission pipeline.
//!
//! Each submission walks
//! `Received → RateChecked → Verified → Validated → Persisted → Notified`
//! and stops at the first step that rejects it. Once a lead is persisted the
//! submission has succeeded; notification runs in its own task and only
//! annotates the stored lead.

use crate::config::{IntakeOptions, NotifyMode};
use crate::error::IntakeError;
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::metrics::Metrics;
use crate::models::{EmailStatus, Lead, QuoteSubmission};
use crate::notifier::{Notifier, NotifyOutcome};
use crate::store::LeadStore;
use crate::validator::LeadValidator;
use crate::verification::CaptchaVerifier;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Position of a submission in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Received,
    RateChecked,
    Verified,
    Validated,
    Persisted,
    Notified,
    Rejected,
}

impl fmt::Display for IntakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::RateChecked => "rate_checked",
            Self::Verified => "verified",
            Self::Validated => "validated",
            Self::Persisted => "persisted",
            Self::Notified => "notified",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Successful submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub lead_id: String,
    /// Recorded status when notification ran inline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_status: Option<EmailStatus>,
}

/// Runs submissions through abuse guard, verification, validation, storage
/// and notification.
pub struct IntakeService {
    limiter: Arc<RateLimiter>,
    verifier: CaptchaVerifier,
    validator: LeadValidator,
    store: Arc<dyn LeadStore>,
    notifier: Arc<Notifier>,
    metrics: Arc<Metrics>,
    options: IntakeOptions,
}

impl IntakeService {
    pub fn new(
        limiter: Arc<RateLimiter>,
        verifier: CaptchaVerifier,
        validator: LeadValidator,
        store: Arc<dyn LeadStore>,
        notifier: Arc<Notifier>,
        metrics: Arc<Metrics>,
        options: IntakeOptions,
    ) -> Self {
        Self {
            limiter,
            verifier,
            validator,
            store,
            notifier,
            metrics,
            options,
        }
    }

    /// Process one submission from `client_key`.
    pub async fn submit(
        &self,
        client_key: &str,
        client_ip: Option<IpAddr>,
        submission: QuoteSubmission,
    ) -> Result<SubmissionReceipt, IntakeError> {
        self.submit_body(client_key, client_ip, Ok(submission)).await
    }

    /// Process a request body that may not have decoded.
    ///
    /// The abuse guard runs first either way, so an unreadable body still
    /// counts against the client's window.
    pub async fn submit_body(
        &self,
        client_key: &str,
        client_ip: Option<IpAddr>,
        body: Result<QuoteSubmission, String>,
    ) -> Result<SubmissionReceipt, IntakeError> {
        debug!(client = %client_key, stage = %IntakeStage::Received, "Submission received");

        if let RateLimitResult::Limited { retry_after } = self.limiter.check(client_key).await {
            return Err(self.reject(
                client_key,
                IntakeStage::Received,
                IntakeError::RateLimited { retry_after },
            ));
        }
        debug!(client = %client_key, stage = %IntakeStage::RateChecked, "Within submission limit");

        let submission = match body {
            Ok(submission) => submission,
            Err(reason) => {
                debug!(client = %client_key, error = %reason, "Unreadable submission body");
                return Err(self.reject(
                    client_key,
                    IntakeStage::RateChecked,
                    IntakeError::UnreadableBody(reason),
                ));
            }
        };

        if !self
            .verifier
            .verify(submission.captcha_token.as_deref(), client_ip)
            .await
        {
            return Err(self.reject(
                client_key,
                IntakeStage::RateChecked,
                IntakeError::VerificationFailed,
            ));
        }
        debug!(client = %client_key, stage = %IntakeStage::Verified, "Submitter verified");

        let new_lead = match self.validator.validate(&submission) {
            Ok(lead) => lead,
            Err(errors) => {
                return Err(self.reject(
                    client_key,
                    IntakeStage::Verified,
                    IntakeError::ValidationFailed(errors),
                ))
            }
        };
        debug!(client = %client_key, stage = %IntakeStage::Validated, "Submission valid");

        let lead = match tokio::time::timeout(
            self.options.store_timeout(),
            self.store.insert(new_lead),
        )
        .await
        {
            Ok(Ok(lead)) => lead,
            Ok(Err(e)) => {
                error!(client = %client_key, error = %e, "Failed to persist lead");
                return Err(self.reject(
                    client_key,
                    IntakeStage::Validated,
                    IntakeError::PersistenceFailed,
                ));
            }
            Err(_) => {
                error!(client = %client_key, timeout = ?self.options.store_timeout(), "Lead insert timed out");
                return Err(self.reject(
                    client_key,
                    IntakeStage::Validated,
                    IntakeError::PersistenceFailed,
                ));
            }
        };

        info!(
            client = %client_key,
            lead_id = %lead.id,
            stage = %IntakeStage::Persisted,
            "Quote request saved"
        );
        self.metrics.record_submission("accepted");

        let lead_id = lead.id.clone();
        let notification = self.spawn_notification(lead);

        let email_status = match self.options.notify_mode {
            NotifyMode::Inline => match notification.await {
                Ok(status) => Some(status),
                Err(e) => {
                    error!(lead_id = %lead_id, error = %e, "Notification supervisor failed");
                    None
                }
            },
            NotifyMode::Background => None,
        };

        Ok(SubmissionReceipt {
            lead_id,
            email_status,
        })
    }

    fn reject(&self, client_key: &str, stage: IntakeStage, err: IntakeError) -> IntakeError {
        let rejected = IntakeStage::Rejected;
        match &err {
            IntakeError::PersistenceFailed => warn!(
                client = %client_key,
                from = %stage,
                stage = %rejected,
                outcome = err.outcome(),
                "Submission rejected"
            ),
            _ => info!(
                client = %client_key,
                from = %stage,
                stage = %rejected,
                outcome = err.outcome(),
                "Submission rejected"
            ),
        }
        self.metrics.record_submission(err.outcome());
        err
    }

    /// Notify sales and record the outcome on the lead.
    ///
    /// The send runs in an inner task so a panic in the transport becomes an
    /// `error` status instead of unwinding into the request.
    fn spawn_notification(&self, lead: Lead) -> JoinHandle<EmailStatus> {
        let notifier = Arc::clone(&self.notifier);
        let store = Arc::clone(&self.store);
        let metrics = Arc::clone(&self.metrics);
        let store_timeout = self.options.store_timeout();

        tokio::spawn(async move {
            let lead_id = lead.id.clone();
            let send = tokio::spawn(async move { notifier.notify(&lead).await });

            let outcome = match send.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(lead_id = %lead_id, error = %e, "Notification task failed");
                    NotifyOutcome::NotSent {
                        reason: "notification task failed".to_string(),
                    }
                }
            };

            let (status, detail) = outcome.into_status();
            metrics.record_notification(status);

            if tokio::time::timeout(
                store_timeout,
                store.update_email_status(&lead_id, status, detail),
            )
            .await
            .is_err()
            {
                warn!(lead_id = %lead_id, status = %status, "Email status update timed out");
            }

            info!(
                lead_id = %lead_id,
                email_status = %status,
                stage = %IntakeStage::Notified,
                "Lead notification recorded"
            );
            status
        })
    }
}
