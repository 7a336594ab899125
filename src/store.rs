// SPDX-License-Identifier: PMPL-1.0-or-later
//! Lead store contract and the in-process implementation

use crate::error::StoreError;
use crate::models::{EmailStatus, Lead, NewLead};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Hard cap on a single `list_recent` read.
pub const MAX_LIST_LIMIT: usize = 100;

/// Durable boundary for leads.
///
/// Leads are never deleted, and only `email_status`/`email_error` change
/// after insertion.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Persist a new lead with a store-assigned `id` and `created_at`.
    ///
    /// Atomic: either the whole lead is stored or nothing is.
    async fn insert(&self, lead: NewLead) -> Result<Lead, StoreError>;

    /// Record the notification outcome. Best-effort: faults are logged, and a
    /// lead that already left `pending` keeps its status.
    async fn update_email_status(&self, id: &str, status: EmailStatus, error: Option<String>);

    /// Newest leads first, at most `min(limit, 100)`. Empty on fault.
    async fn list_recent(&self, limit: usize) -> Vec<Lead>;

    /// Look up one lead.
    async fn find(&self, id: &str) -> Result<Option<Lead>, StoreError>;
}

/// In-process lead store.
#[derive(Default)]
pub struct MemoryLeadStore {
    leads: RwLock<Vec<Lead>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.leads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.leads.read().await.is_empty()
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn insert(&self, lead: NewLead) -> Result<Lead, StoreError> {
        let lead = Lead::from_new(Uuid::new_v4().to_string(), lead, Utc::now());
        self.leads.write().await.push(lead.clone());
        debug!(lead_id = %lead.id, "Lead stored in memory");
        Ok(lead)
    }

    async fn update_email_status(&self, id: &str, status: EmailStatus, error: Option<String>) {
        let mut leads = self.leads.write().await;
        match leads.iter_mut().find(|l| l.id == id) {
            Some(lead) if lead.email_status.can_transition_to(status) => {
                lead.email_status = status;
                lead.email_error = error;
            }
            Some(lead) => {
                debug!(
                    lead_id = %id,
                    current = %lead.email_status,
                    requested = %status,
                    "Ignoring backward email status transition"
                );
            }
            None => warn!(lead_id = %id, "Email status update for unknown lead"),
        }
    }

    async fn list_recent(&self, limit: usize) -> Vec<Lead> {
        let leads = self.leads.read().await;
        // Walk newest-inserted first so equal timestamps keep insertion recency.
        let mut recent: Vec<Lead> = leads.iter().rev().cloned().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit.min(MAX_LIST_LIMIT));
        recent
    }

    async fn find(&self, id: &str) -> Result<Option<Lead>, StoreError> {
        Ok(self.leads.read().await.iter().find(|l| l.id == id).cloned())
    }
}
