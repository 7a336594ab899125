// SPDX-License-Identifier: PMPL-1.0-or-later
//! Data models for quote requests and stored leads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Notification state of a lead.
///
/// Starts at `Pending` and moves at most once, to `Sent` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Pending,
    Sent,
    Error,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether moving from `self` to `next` respects the forward-only order.
    pub fn can_transition_to(&self, next: EmailStatus) -> bool {
        matches!((self, next), (Self::Pending, _))
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw quote form as posted by the public site.
///
/// Every field is optional here; the validator decides what is required.
/// Decoding only fails when the body is not a JSON object. A field holding
/// the wrong JSON type is left empty and named in `mistyped`, so it is
/// reported next to the other field errors.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSubmission {
    pub company_name: Option<String>,
    pub fleet_size: Option<String>,
    pub fuel_type: Option<String>,
    pub product_needs: Option<String>,
    pub service_interests: Vec<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub captcha_token: Option<String>,
    /// Form fields that arrived with the wrong JSON type
    #[serde(skip)]
    pub mistyped: Vec<&'static str>,
}

impl QuoteSubmission {
    pub fn is_mistyped(&self, field: &str) -> bool {
        self.mistyped.iter().any(|f| *f == field)
    }
}

impl<'de> Deserialize<'de> for QuoteSubmission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        let mut mistyped = Vec::new();

        let mut text = |name: &'static str| match fields.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(value)) => Some(value.clone()),
            Some(_) => {
                mistyped.push(name);
                None
            }
        };

        let company_name = text("companyName");
        let fleet_size = text("fleetSize");
        let fuel_type = text("fuelType");
        let product_needs = text("productNeeds");
        let email = text("email");
        let phone = text("phone");
        let captcha_token = text("captchaToken");

        let service_interests = match fields.get("serviceInterests") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => {
                let strings: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect();
                strings.unwrap_or_else(|| {
                    mistyped.push("serviceInterests");
                    Vec::new()
                })
            }
            Some(_) => {
                mistyped.push("serviceInterests");
                Vec::new()
            }
        };

        Ok(Self {
            company_name,
            fleet_size,
            fuel_type,
            product_needs,
            service_interests,
            email,
            phone,
            captcha_token,
            mistyped,
        })
    }
}

/// A validated, normalized lead that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLead {
    pub company_name: String,
    pub fleet_size: String,
    pub fuel_type: String,
    pub email: String,
    pub phone: String,
}

/// A persisted quote request, as returned to admin clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Store-assigned identifier
    pub id: String,
    pub company_name: String,
    pub fleet_size: String,
    /// Fuel type or product/service interest line
    pub fuel_type: String,
    pub email: String,
    pub phone: String,
    pub email_status: EmailStatus,
    /// Reason recorded alongside an `error` status
    pub email_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Materialize a new lead with store-assigned identity and timestamp.
    pub fn from_new(id: String, lead: NewLead, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            company_name: lead.company_name,
            fleet_size: lead.fleet_size,
            fuel_type: lead.fuel_type,
            email: lead.email,
            phone: lead.phone,
            email_status: EmailStatus::Pending,
            email_error: None,
            created_at,
        }
    }
}
