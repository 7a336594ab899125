// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for the intake pipeline.

use crate::models::EmailStatus;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Pipeline counters on a private registry.
pub struct Metrics {
    registry: Registry,
    submissions: IntCounterVec,
    notifications: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new("lead_submissions_total", "Quote submissions by outcome"),
            &["outcome"],
        )?;
        let notifications = IntCounterVec::new(
            Opts::new("lead_notifications_total", "Lead notifications by email status"),
            &["status"],
        )?;

        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(notifications.clone()))?;

        Ok(Self {
            registry,
            submissions,
            notifications,
        })
    }

    pub fn record_submission(&self, outcome: &str) {
        self.submissions.with_label_values(&[outcome]).inc();
    }

    pub fn record_notification(&self, status: EmailStatus) {
        self.notifications.with_label_values(&[status.as_str()]).inc();
    }

    pub fn submissions(&self, outcome: &str) -> u64 {
        self.submissions.with_label_values(&[outcome]).get()
    }

    pub fn notifications(&self, status: EmailStatus) -> u64 {
        self.notifications.with_label_values(&[status.as_str()]).get()
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
