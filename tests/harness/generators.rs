// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for submission floods.

use lead_intake::models::QuoteSubmission;
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// A submission that passes validation.
pub fn valid_submission(i: usize) -> QuoteSubmission {
    QuoteSubmission {
        company_name: Some(format!("Fleet Co {}", i)),
        fleet_size: Some("10-50".to_string()),
        fuel_type: Some("Diesel".to_string()),
        email: Some(format!("ops{}@fleet.example.com", i)),
        phone: Some("+1 555 0100".to_string()),
        ..Default::default()
    }
}

/// Submissions that must fail validation, with the field expected to fail.
pub fn invalid_submissions() -> Vec<(QuoteSubmission, &'static str)> {
    let base = valid_submission(0);
    vec![
        (
            QuoteSubmission {
                company_name: None,
                ..base.clone()
            },
            "companyName",
        ),
        (
            QuoteSubmission {
                company_name: Some(" A ".to_string()),
                ..base.clone()
            },
            "companyName",
        ),
        (
            QuoteSubmission {
                company_name: Some("x".repeat(201)),
                ..base.clone()
            },
            "companyName",
        ),
        (
            QuoteSubmission {
                email: Some("not-an-email".to_string()),
                ..base.clone()
            },
            "email",
        ),
        (
            QuoteSubmission {
                email: Some("a@b@c".to_string()),
                ..base.clone()
            },
            "email",
        ),
        (
            QuoteSubmission {
                email: Some("   ".to_string()),
                ..base.clone()
            },
            "email",
        ),
        (
            QuoteSubmission {
                fleet_size: Some(String::new()),
                ..base.clone()
            },
            "fleetSize",
        ),
        (
            QuoteSubmission {
                phone: Some("9".repeat(41)),
                ..base
            },
            "phone",
        ),
    ]
}

/// Request bodies that can never produce a lead: undecodable, not an
/// object, or carrying wrong-typed fields.
pub fn garbage_bodies() -> Vec<&'static str> {
    vec![
        "",
        "not json",
        "{",
        "[]",
        "null",
        "42",
        r#"{"companyName": 12}"#,
        r#"{"serviceInterests": "Diesel"}"#,
        r#"{"companyName": "Acme Co", "fleetSize": 10, "email": "a@b.co"}"#,
        r#"{"companyName": "Acme Co", "fleetSize": "1", "email": ["a@b.co"]}"#,
        "companyName=Acme&email=a@b.com",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }
}
