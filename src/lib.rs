// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Lead Intake
//!
//! Backend for a B2B quote request form. Each submission passes through:
//!
//! - Per-client fixed-window rate limiting (5 per 15 minutes by default)
//! - Human verification against a Turnstile-compatible provider
//! - Field validation with per-field error messages
//! - Durable storage of the accepted lead
//! - Best-effort email notification to sales, recorded on the lead
//!
//! Stored leads are readable by an authenticated admin through a signed
//! session cookie.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod intake;
pub mod limiter;
pub mod metrics;
pub mod models;
pub mod notifier;
pub mod session;
pub mod store;
pub mod validator;
pub mod verification;

pub use config::Config;
pub use error::{IntakeError, StoreError};
pub use intake::{IntakeService, SubmissionReceipt};
pub use limiter::{RateLimitResult, RateLimiter};
pub use models::{EmailStatus, Lead, NewLead, QuoteSubmission};
pub use store::{LeadStore, MemoryLeadStore};
pub use validator::{FieldErrors, LeadValidator};
