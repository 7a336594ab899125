// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pipeline fixtures: stub transports, faulty stores and app wiring.

use async_trait::async_trait;
use lead_intake::{
    config::{CaptchaConfig, Config, IntakeOptions, NotifyMode, RateLimitConfig},
    error::StoreError,
    handlers::AppState,
    intake::IntakeService,
    limiter::RateLimiter,
    metrics::Metrics,
    models::{EmailStatus, Lead, NewLead},
    notifier::{MailError, MailTransport, Notifier, OutboundEmail},
    session::{self, SessionGuard},
    store::{LeadStore, MemoryLeadStore},
    validator::LeadValidator,
    verification::CaptchaVerifier,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const SALES_ADDRESS: &str = "sales@example.com";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Records every message instead of sending it.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingTransport {
    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

/// Relay that refuses every message.
pub struct FailingTransport;

#[async_trait]
impl MailTransport for FailingTransport {
    async fn send(&self, _email: &OutboundEmail) -> Result<(), MailError> {
        Err(MailError::Rejected("554 relay unavailable".to_string()))
    }
}

/// Relay that panics mid-send.
pub struct PanickingTransport;

#[async_trait]
impl MailTransport for PanickingTransport {
    async fn send(&self, _email: &OutboundEmail) -> Result<(), MailError> {
        panic!("transport exploded");
    }
}

/// Store whose writes always fail.
pub struct FailingStore;

#[async_trait]
impl LeadStore for FailingStore {
    async fn insert(&self, _lead: NewLead) -> Result<Lead, StoreError> {
        Err(StoreError::Internal("disk full".to_string()))
    }

    async fn update_email_status(&self, _id: &str, _status: EmailStatus, _error: Option<String>) {}

    async fn list_recent(&self, _limit: usize) -> Vec<Lead> {
        Vec::new()
    }

    async fn find(&self, _id: &str) -> Result<Option<Lead>, StoreError> {
        Ok(None)
    }
}

/// Store whose writes never complete in time.
pub struct StalledStore;

#[async_trait]
impl LeadStore for StalledStore {
    async fn insert(&self, _lead: NewLead) -> Result<Lead, StoreError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(StoreError::Internal("unreachable".to_string()))
    }

    async fn update_email_status(&self, _id: &str, _status: EmailStatus, _error: Option<String>) {}

    async fn list_recent(&self, _limit: usize) -> Vec<Lead> {
        Vec::new()
    }

    async fn find(&self, _id: &str) -> Result<Option<Lead>, StoreError> {
        Ok(None)
    }
}

/// Store that accepts inserts but stalls every later read and status update.
#[derive(Default)]
pub struct StalledFollowUpStore {
    pub inner: MemoryLeadStore,
}

#[async_trait]
impl LeadStore for StalledFollowUpStore {
    async fn insert(&self, lead: NewLead) -> Result<Lead, StoreError> {
        self.inner.insert(lead).await
    }

    async fn update_email_status(&self, _id: &str, _status: EmailStatus, _error: Option<String>) {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }

    async fn list_recent(&self, _limit: usize) -> Vec<Lead> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Vec::new()
    }

    async fn find(&self, _id: &str) -> Result<Option<Lead>, StoreError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
    }
}

/// Knobs for [`pipeline`].
pub struct PipelineOptions {
    pub rate_limit: RateLimitConfig,
    pub captcha: CaptchaConfig,
    pub transport: Option<Arc<dyn MailTransport>>,
    pub notify_mode: NotifyMode,
    pub store_timeout_ms: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            captcha: CaptchaConfig {
                disabled: true,
                ..Default::default()
            },
            transport: None,
            notify_mode: NotifyMode::Inline,
            store_timeout_ms: 2_000,
        }
    }
}

/// A wired intake service plus handles for inspecting it.
pub struct Pipeline {
    pub service: IntakeService,
    pub metrics: Arc<Metrics>,
}

pub fn pipeline(store: Arc<dyn LeadStore>, options: PipelineOptions) -> Pipeline {
    let metrics = Arc::new(Metrics::new().unwrap());
    let notifier = Arc::new(Notifier::new(
        options.transport,
        SALES_ADDRESS,
        Duration::from_secs(2),
    ));
    let service = IntakeService::new(
        Arc::new(RateLimiter::new(options.rate_limit)),
        CaptchaVerifier::new(options.captcha).unwrap(),
        LeadValidator::default(),
        store,
        notifier,
        Arc::clone(&metrics),
        IntakeOptions {
            notify_mode: options.notify_mode,
            store_timeout_ms: options.store_timeout_ms,
        },
    );
    Pipeline { service, metrics }
}

/// Memory store plus a pipeline writing into it.
pub fn memory_pipeline(options: PipelineOptions) -> (Arc<MemoryLeadStore>, Pipeline) {
    let store = Arc::new(MemoryLeadStore::new());
    let pipeline = pipeline(store.clone(), options);
    (store, pipeline)
}

/// Configuration for HTTP tests: admin credentials set, verification off.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.captcha.disabled = true;
    config.admin.session_secret = Some("integration-test-session-secret".to_string());
    config.admin.email = Some(ADMIN_EMAIL.to_string());
    config.admin.password_hash = Some(session::hash_password(ADMIN_PASSWORD).unwrap());
    config.intake.notify_mode = NotifyMode::Inline;
    config
}

/// Full application state over a memory store.
pub fn app_state(config: Config) -> (Arc<MemoryLeadStore>, Arc<AppState>) {
    let store = Arc::new(MemoryLeadStore::new());
    let state = app_state_with_store(config, store.clone());
    (store, state)
}

/// Full application state over any store.
pub fn app_state_with_store(config: Config, dyn_store: Arc<dyn LeadStore>) -> Arc<AppState> {
    let metrics = Arc::new(Metrics::new().unwrap());

    let intake = IntakeService::new(
        Arc::new(RateLimiter::new(config.rate_limit.clone())),
        CaptchaVerifier::new(config.captcha.clone()).unwrap(),
        LeadValidator::new(config.validation.clone()),
        Arc::clone(&dyn_store),
        Arc::new(Notifier::unconfigured(SALES_ADDRESS)),
        Arc::clone(&metrics),
        config.intake.clone(),
    );

    Arc::new(AppState {
        intake,
        store: dyn_store,
        sessions: Arc::new(SessionGuard::new(&config.admin)),
        metrics,
        config,
    })
}

/// Wait until the lead leaves `pending`, or give up after two seconds.
pub async fn settled_status(store: &MemoryLeadStore, id: &str) -> Option<Lead> {
    for _ in 0..200 {
        if let Ok(Some(lead)) = store.find(id).await {
            if lead.email_status.is_terminal() {
                return Some(lead);
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    None
}
