// SPDX-License-Identifier: PMPL-1.0-or-later
// Human-verification check for the public quote form.
//
// Posts the widget token to a siteverify-style endpoint (Cloudflare
// Turnstile by default) and reads back `{ "success": bool }`.

use crate::config::CaptchaConfig;
use serde::Deserialize;
use std::net::IpAddr;
use tracing::{debug, info, warn};

/// How verification behaves with the current configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    /// Explicitly switched off; every submission passes
    Disabled,
    /// No secret configured; every submission passes
    FailOpen,
    /// No secret configured and a secret is required; every submission fails
    FailClosed,
    /// Tokens are checked against the provider
    Enforced,
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Human-verification provider client
pub struct CaptchaVerifier {
    config: CaptchaConfig,
    client: reqwest::Client,
}

impl CaptchaVerifier {
    /// Create new verifier; every provider call is bounded by the configured timeout
    pub fn new(config: CaptchaConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { config, client })
    }

    pub fn mode(&self) -> VerificationMode {
        if self.config.disabled {
            return VerificationMode::Disabled;
        }
        match self.secret() {
            Some(_) => VerificationMode::Enforced,
            None if self.config.require_secret => VerificationMode::FailClosed,
            None => VerificationMode::FailOpen,
        }
    }

    fn secret(&self) -> Option<&str> {
        self.config
            .secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Check a submitter's token. Never errors: every fault is a `false`.
    pub async fn verify(&self, token: Option<&str>, remote_ip: Option<IpAddr>) -> bool {
        let secret = match self.mode() {
            VerificationMode::Disabled => {
                debug!("Human verification disabled, skipping");
                return true;
            }
            VerificationMode::FailOpen => {
                debug!("No verification secret configured, skipping");
                return true;
            }
            VerificationMode::FailClosed => {
                warn!("No verification secret configured and one is required, rejecting");
                return false;
            }
            VerificationMode::Enforced => match self.secret() {
                Some(secret) => secret,
                None => return false,
            },
        };

        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => {
                info!("Verification token missing");
                return false;
            }
        };

        let remote_ip = remote_ip.map(|ip| ip.to_string());
        let mut form = vec![("secret", secret), ("response", token)];
        if let Some(ip) = remote_ip.as_deref() {
            form.push(("remoteip", ip));
        }

        let response = match self
            .client
            .post(&self.config.verify_url)
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(error = %e, "Verification provider timed out");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Verification provider unreachable");
                return false;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Verification provider returned an error status");
            return false;
        }

        match response.json::<SiteVerifyResponse>().await {
            Ok(result) if result.success => {
                debug!("Verification token accepted");
                true
            }
            Ok(result) => {
                info!(error_codes = ?result.error_codes, "Verification token rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "Malformed verification response");
                false
            }
        }
    }
}
