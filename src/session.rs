// SPDX-License-Identifier: PMPL-1.0-or-later
//! Admin session cookies.
//!
//! A session token is `base64url(claims) "." hex(mac)` where the MAC is a
//! keyed BLAKE3 hash over the encoded claims. The key is derived from the
//! configured session secret, so rotating the secret logs every admin out.
//! Admin passwords are checked against an Argon2 PHC string.

use crate::config::AdminConfig;
use crate::error::AuthError;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Cookie carrying the admin session.
pub const SESSION_COOKIE: &str = "lead_admin_session";

/// BLAKE3 key-derivation context for session MACs.
const KEY_CONTEXT: &str = "lead-intake 2025 admin session cookie v1";

/// Identity extracted from a valid session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminIdentity {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    exp: i64,
}

/// Issues and verifies admin sessions.
pub struct SessionGuard {
    key: Option<[u8; 32]>,
    ttl: Duration,
    admin_email: Option<String>,
    password_hash: Option<String>,
}

impl SessionGuard {
    pub fn new(config: &AdminConfig) -> Self {
        let key = config
            .session_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|secret| blake3::derive_key(KEY_CONTEXT, secret.as_bytes()));

        if key.is_none() {
            warn!("SESSION_SECRET not set, admin sessions are disabled");
        }

        Self {
            key,
            ttl: config.session_ttl(),
            admin_email: config.email.clone(),
            password_hash: config.password_hash.clone(),
        }
    }

    /// Verify a session token. `None` on any failure.
    pub fn authenticate(&self, token: Option<&str>) -> Option<AdminIdentity> {
        let key = self.key.as_ref()?;
        let (payload, signature) = token?.trim().split_once('.')?;

        let provided = blake3::Hash::from_hex(signature).ok()?;
        // blake3::Hash equality is constant-time.
        if blake3::keyed_hash(key, payload.as_bytes()) != provided {
            debug!("Session signature mismatch");
            return None;
        }

        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let claims: SessionClaims = serde_json::from_slice(&bytes).ok()?;

        if claims.exp <= Utc::now().timestamp() {
            debug!(sub = %claims.sub, "Session expired");
            return None;
        }

        Some(AdminIdentity { email: claims.sub })
    }

    /// Issue a signed token for `email`, valid for the configured TTL.
    pub fn issue(&self, email: &str) -> Result<String, AuthError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = SessionClaims {
            sub: email.to_string(),
            exp: Utc::now().timestamp().saturating_add(ttl),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        let key = self.key.as_ref().ok_or(AuthError::NotConfigured)?;
        let json = serde_json::to_vec(claims).map_err(|e| AuthError::Internal(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let mac = blake3::keyed_hash(key, payload.as_bytes());
        Ok(format!("{}.{}", payload, mac.to_hex()))
    }

    /// Check admin credentials and issue a session token.
    ///
    /// Runs an Argon2 verification; call it off the async executor.
    pub fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let (Some(admin_email), Some(hash)) = (&self.admin_email, &self.password_hash) else {
            warn!("Admin login attempted but ADMIN_EMAIL/ADMIN_PASSWORD_HASH are not set");
            return Err(AuthError::NotConfigured);
        };

        let parsed = PasswordHash::new(hash).map_err(|e| {
            warn!(error = %e, "ADMIN_PASSWORD_HASH is not a valid PHC string");
            AuthError::NotConfigured
        })?;

        let password_ok = Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();

        if !password_ok || !admin_email.eq_ignore_ascii_case(email) {
            debug!("Admin login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        self.issue(admin_email)
    }

    /// `Set-Cookie` value carrying `token`.
    pub fn cookie(&self, token: &str, secure: bool) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            SESSION_COOKIE,
            token,
            self.ttl.as_secs(),
            if secure { "; Secure" } else { "" }
        )
    }

    /// `Set-Cookie` value that removes the session.
    pub fn clear_cookie(&self, secure: bool) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
            SESSION_COOKIE,
            if secure { "; Secure" } else { "" }
        )
    }
}

/// Extract the session token from the request's `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// Hash a password into an Argon2id PHC string for `ADMIN_PASSWORD_HASH`.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| AuthError::Internal(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(e.to_string()))
}
