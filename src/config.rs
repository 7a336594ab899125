// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the lead intake service.
//!
//! Every section has serde defaults so a partial config deserializes, and
//! [`Config::from_env`] maps the environment-style surface onto it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default human-verification endpoint (Cloudflare Turnstile siteverify).
pub const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Configuration for the lead intake service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Deployment environment (default: development)
    #[serde(default)]
    pub environment: Environment,

    /// Use the first `X-Forwarded-For` hop as the client key (default: false)
    #[serde(default)]
    pub trust_proxy_headers: bool,

    /// Origins allowed to post the public form cross-site
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub captcha: CaptchaConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub intake: IntakeOptions,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Lead store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `memory`, `mem://`, `ws://host:port` or `wss://host:port` (default: memory)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Upgrade `ws://` endpoints to `wss://` (default: false)
    #[serde(default)]
    pub tls: bool,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// Per-client submission throttling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Submissions admitted per window (default: 5)
    #[serde(default = "default_max_submissions")]
    pub max_submissions: u32,

    /// Window length in seconds, measured from the first submission (default: 900)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Upper bound on tracked client keys (default: 10000)
    #[serde(default = "default_max_tracked_keys")]
    pub max_tracked_keys: usize,

    /// Interval of the expired-record sweep in seconds (default: 60)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Human-verification provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    /// Provider secret; verification is skipped when absent unless `require_secret` is set
    #[serde(default)]
    pub secret: Option<String>,

    /// Skip verification entirely (default: false)
    #[serde(default)]
    pub disabled: bool,

    /// Reject submissions when no secret is configured (default: false)
    #[serde(default)]
    pub require_secret: bool,

    #[serde(default = "default_verify_url")]
    pub verify_url: String,

    /// Provider call timeout in milliseconds (default: 5000)
    #[serde(default = "default_captcha_timeout_ms")]
    pub timeout_ms: u64,
}

/// Field rules for the quote form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_company_min_len")]
    pub company_min_len: usize,

    #[serde(default = "default_company_max_len")]
    pub company_max_len: usize,

    #[serde(default = "default_email_max_len")]
    pub email_max_len: usize,

    #[serde(default = "default_phone_max_len")]
    pub phone_max_len: usize,

    /// Stored when no product or service interest is given
    #[serde(default = "default_unspecified_interest")]
    pub unspecified_interest: String,
}

/// Outbound mail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_user: Option<String>,

    #[serde(default)]
    pub smtp_password: Option<String>,

    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Destination of lead notifications
    #[serde(default = "default_sales_address")]
    pub sales_address: String,

    /// Send timeout in milliseconds (default: 10000)
    #[serde(default = "default_smtp_timeout_ms")]
    pub timeout_ms: u64,
}

/// How the orchestrator waits on notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    /// Await notification and the status update before replying
    Inline,
    /// Reply once the lead is persisted
    #[default]
    Background,
}

/// Orchestrator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeOptions {
    #[serde(default)]
    pub notify_mode: NotifyMode,

    /// Bound on each store call in milliseconds (default: 10000)
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

/// Admin session and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Key material for session cookies; admin access is closed when absent
    #[serde(default)]
    pub session_secret: Option<String>,

    /// Session lifetime in seconds (default: 28800)
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    #[serde(default)]
    pub email: Option<String>,

    /// Argon2 PHC string
    #[serde(default)]
    pub password_hash: Option<String>,

    /// Serve admin reads without a session; ignored in production
    #[serde(default)]
    pub open_access: bool,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_url() -> String {
    "memory".to_string()
}

fn default_namespace() -> String {
    "leads".to_string()
}

fn default_database() -> String {
    "intake".to_string()
}

fn default_max_submissions() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_max_tracked_keys() -> usize {
    10_000
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_verify_url() -> String {
    TURNSTILE_VERIFY_URL.to_string()
}

fn default_captcha_timeout_ms() -> u64 {
    5_000
}

fn default_company_min_len() -> usize {
    2
}

fn default_company_max_len() -> usize {
    200
}

fn default_email_max_len() -> usize {
    254
}

fn default_phone_max_len() -> usize {
    40
}

fn default_unspecified_interest() -> String {
    "Not specified".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "noreply@localhost".to_string()
}

fn default_sales_address() -> String {
    "sales@localhost".to_string()
}

fn default_smtp_timeout_ms() -> u64 {
    10_000
}

fn default_store_timeout_ms() -> u64 {
    10_000
}

fn default_session_ttl_secs() -> u64 {
    8 * 60 * 60
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            environment: Environment::default(),
            trust_proxy_headers: false,
            cors_origins: Vec::new(),
            database: DatabaseConfig::default(),
            rate_limit: RateLimitConfig::default(),
            captcha: CaptchaConfig::default(),
            validation: ValidationConfig::default(),
            mail: MailConfig::default(),
            intake: IntakeOptions::default(),
            admin: AdminConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            tls: false,
            namespace: default_namespace(),
            database: default_database(),
            username: None,
            password: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_submissions: default_max_submissions(),
            window_secs: default_window_secs(),
            max_tracked_keys: default_max_tracked_keys(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            secret: None,
            disabled: false,
            require_secret: false,
            verify_url: default_verify_url(),
            timeout_ms: default_captcha_timeout_ms(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            company_min_len: default_company_min_len(),
            company_max_len: default_company_max_len(),
            email_max_len: default_email_max_len(),
            phone_max_len: default_phone_max_len(),
            unspecified_interest: default_unspecified_interest(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_user: None,
            smtp_password: None,
            from_address: default_from_address(),
            sales_address: default_sales_address(),
            timeout_ms: default_smtp_timeout_ms(),
        }
    }
}

impl Default for IntakeOptions {
    fn default() -> Self {
        Self {
            notify_mode: NotifyMode::default(),
            store_timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            session_secret: None,
            session_ttl_secs: default_session_ttl_secs(),
            email: None,
            password_hash: None,
            open_access: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl CaptchaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl MailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl IntakeOptions {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl AdminConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unset, blank, or unparsable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let defaults = Config::default();

        Config {
            bind_addr: env.string("BIND_ADDR").unwrap_or(defaults.bind_addr),
            environment: env
                .string("APP_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or_default(),
            trust_proxy_headers: env.flag("TRUST_PROXY_HEADERS", false),
            cors_origins: env
                .string("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            database: DatabaseConfig {
                url: env.string("DATABASE_URL").unwrap_or(defaults.database.url),
                tls: env.flag("DB_TLS", false) || env.flag("DB_SSL", false),
                namespace: env.string("DB_NAMESPACE").unwrap_or(defaults.database.namespace),
                database: env.string("DB_DATABASE").unwrap_or(defaults.database.database),
                username: env.string("DB_USER"),
                password: env.string("DB_PASSWORD"),
            },
            rate_limit: RateLimitConfig {
                max_submissions: env.parse("RATE_LIMIT_MAX", defaults.rate_limit.max_submissions),
                window_secs: env.parse("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit.window_secs),
                max_tracked_keys: env
                    .parse("RATE_LIMIT_MAX_KEYS", defaults.rate_limit.max_tracked_keys),
                cleanup_interval_secs: env.parse(
                    "RATE_LIMIT_CLEANUP_SECS",
                    defaults.rate_limit.cleanup_interval_secs,
                ),
            },
            captcha: CaptchaConfig {
                secret: env.string("CAPTCHA_SECRET"),
                disabled: env.flag("CAPTCHA_DISABLED", false),
                require_secret: env.flag("CAPTCHA_REQUIRE_SECRET", false),
                verify_url: env
                    .string("CAPTCHA_VERIFY_URL")
                    .unwrap_or(defaults.captcha.verify_url),
                timeout_ms: env.parse("CAPTCHA_TIMEOUT_MS", defaults.captcha.timeout_ms),
            },
            validation: defaults.validation,
            mail: MailConfig {
                smtp_host: env.string("SMTP_HOST"),
                smtp_port: env.parse("SMTP_PORT", defaults.mail.smtp_port),
                smtp_user: env.string("SMTP_USER"),
                smtp_password: env.string("SMTP_PASSWORD"),
                from_address: env.string("SMTP_FROM").unwrap_or(defaults.mail.from_address),
                sales_address: env.string("SALES_EMAIL").unwrap_or(defaults.mail.sales_address),
                timeout_ms: env.parse("SMTP_TIMEOUT_MS", defaults.mail.timeout_ms),
            },
            intake: IntakeOptions {
                notify_mode: match env.string("NOTIFY_MODE") {
                    Some(mode) if mode.eq_ignore_ascii_case("inline") => NotifyMode::Inline,
                    _ => NotifyMode::Background,
                },
                store_timeout_ms: env.parse("STORE_TIMEOUT_MS", defaults.intake.store_timeout_ms),
            },
            admin: AdminConfig {
                session_secret: env.string("SESSION_SECRET"),
                session_ttl_secs: env.parse("SESSION_TTL_SECS", defaults.admin.session_ttl_secs),
                email: env.string("ADMIN_EMAIL"),
                password_hash: env.string("ADMIN_PASSWORD_HASH"),
                open_access: env.flag("ADMIN_OPEN_ACCESS", false),
            },
            metrics: MetricsConfig {
                enabled: env.flag("METRICS_ENABLED", defaults.metrics.enabled),
                path: defaults.metrics.path,
            },
        }
    }

    /// Whether admin reads may skip the session check.
    pub fn admin_open_access(&self) -> bool {
        self.admin.open_access && !self.environment.is_production()
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str, default: T) -> T {
        self.string(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.string(key).map(|v| v.to_lowercase()).as_deref() {
            Some("true" | "1" | "yes" | "on") => true,
            Some("false" | "0" | "no" | "off") => false,
            _ => default,
        }
    }
}
