// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Quote form validator.
//!
//! Checks every field of a [`QuoteSubmission`] and either returns the
//! normalized [`NewLead`] or the complete set of per-field errors. Pure: no
//! I/O, no clock.

use crate::config::ValidationConfig;
use crate::models::{NewLead, QuoteSubmission};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Per-field error messages, keyed by the form's camelCase field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }
}

/// Quote form validator.
pub struct LeadValidator {
    config: ValidationConfig,
}

impl Default for LeadValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl LeadValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate and normalize a submission, reporting every bad field.
    pub fn validate(&self, raw: &QuoteSubmission) -> Result<NewLead, FieldErrors> {
        let mut errors = FieldErrors::new();
        for &field in &raw.mistyped {
            errors.add(field, type_error(field));
        }

        let company_name = trimmed(raw.company_name.as_deref());
        if !raw.is_mistyped("companyName") {
            self.check_company_name(company_name, &mut errors);
        }

        let email = trimmed(raw.email.as_deref()).to_lowercase();
        if !raw.is_mistyped("email") {
            self.check_email(&email, &mut errors);
        }

        let fleet_size = trimmed(raw.fleet_size.as_deref());
        if fleet_size.is_empty() && !raw.is_mistyped("fleetSize") {
            errors.add("fleetSize", "Fleet size is required");
        }

        let phone = trimmed(raw.phone.as_deref());
        if phone.chars().count() > self.config.phone_max_len {
            errors.add(
                "phone",
                format!("Phone must be at most {} characters", self.config.phone_max_len),
            );
        }

        if !errors.is_empty() {
            debug!(fields = ?errors.fields().collect::<Vec<_>>(), "Submission failed validation");
            return Err(errors);
        }

        Ok(NewLead {
            company_name: company_name.to_string(),
            fleet_size: fleet_size.to_string(),
            fuel_type: self.interest_line(raw),
            email,
            phone: phone.to_string(),
        })
    }

    fn check_company_name(&self, company_name: &str, errors: &mut FieldErrors) {
        let company_len = company_name.chars().count();
        if company_name.is_empty() {
            errors.add("companyName", "Company name is required");
        } else if company_len < self.config.company_min_len {
            errors.add(
                "companyName",
                format!(
                    "Company name must be at least {} characters",
                    self.config.company_min_len
                ),
            );
        } else if company_len > self.config.company_max_len {
            errors.add(
                "companyName",
                format!(
                    "Company name must be at most {} characters",
                    self.config.company_max_len
                ),
            );
        }
    }

    fn check_email(&self, email: &str, errors: &mut FieldErrors) {
        if email.is_empty() {
            errors.add("email", "Email is required");
        } else if !is_plausible_email(email) {
            errors.add("email", "Invalid email address");
        } else if email.chars().count() > self.config.email_max_len {
            errors.add(
                "email",
                format!("Email must be at most {} characters", self.config.email_max_len),
            );
        }
    }

    /// Pick the product/service interest line, falling back to the sentinel.
    fn interest_line(&self, raw: &QuoteSubmission) -> String {
        let explicit = [raw.fuel_type.as_deref(), raw.product_needs.as_deref()]
            .into_iter()
            .map(trimmed)
            .find(|v| !v.is_empty());

        if let Some(value) = explicit {
            return value.to_string();
        }

        let interests: Vec<&str> = raw
            .service_interests
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        if interests.is_empty() {
            self.config.unspecified_interest.clone()
        } else {
            interests.join(", ")
        }
    }
}

fn type_error(field: &str) -> &'static str {
    match field {
        "companyName" => "Company name must be text",
        "fleetSize" => "Fleet size must be text",
        "fuelType" => "Fuel type must be text",
        "productNeeds" => "Product needs must be text",
        "serviceInterests" => "Service interests must be a list of text",
        "email" => "Email must be text",
        "phone" => "Phone must be text",
        "captchaToken" => "Verification token must be text",
        _ => "Invalid value",
    }
}

fn trimmed(value: Option<&str>) -> &str {
    value.map(str::trim).unwrap_or("")
}

/// `local@domain` with both parts present and no whitespace.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
