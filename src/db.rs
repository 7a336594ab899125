// SPDX-License-Identifier: PMPL-1.0-or-later
//! SurrealDB-backed lead store

use crate::{
    config::DatabaseConfig,
    error::StoreError,
    models::{EmailStatus, Lead, NewLead},
    store::{LeadStore, MAX_LIST_LIMIT},
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use surrealdb::{
    engine::any::{self, Any},
    opt::auth::Root,
    sql::{Datetime, Thing},
    Surreal,
};
use tracing::{debug, error, info};
use uuid::Uuid;

const TABLE: &str = "leads";

/// Row as written; the record id carries the lead id.
#[derive(Debug, Serialize)]
struct LeadContent<'a> {
    company_name: &'a str,
    fleet_size: &'a str,
    fuel_type: &'a str,
    email: &'a str,
    phone: &'a str,
    email_status: EmailStatus,
    email_error: Option<String>,
    created_at: Datetime,
}

/// Row as read back.
#[derive(Debug, Deserialize)]
struct LeadRecord {
    id: Thing,
    company_name: String,
    fleet_size: String,
    fuel_type: String,
    email: String,
    #[serde(default)]
    phone: Option<String>,
    email_status: EmailStatus,
    #[serde(default)]
    email_error: Option<String>,
    created_at: Datetime,
}

impl From<LeadRecord> for Lead {
    fn from(record: LeadRecord) -> Self {
        Lead {
            id: record.id.id.to_raw(),
            company_name: record.company_name,
            fleet_size: record.fleet_size,
            fuel_type: record.fuel_type,
            email: record.email,
            phone: record.phone.unwrap_or_default(),
            email_status: record.email_status,
            email_error: record.email_error,
            created_at: record.created_at.0,
        }
    }
}

/// Database connection wrapper
#[derive(Clone)]
pub struct SurrealLeadStore {
    db: Surreal<Any>,
}

impl SurrealLeadStore {
    /// Connect to SurrealDB and make sure the `leads` table exists.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let endpoint = endpoint(&config.url, config.tls);
        let db = any::connect(endpoint.as_str()).await?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;

        Self::init_schema(&db).await?;
        info!(endpoint = %redact(&endpoint), "Lead store ready");

        Ok(Self { db })
    }

    /// Connect to an embedded in-memory database.
    pub async fn memory() -> Result<Self, StoreError> {
        Self::connect(&DatabaseConfig::default()).await
    }

    /// Initialize database schema
    async fn init_schema(db: &Surreal<Any>) -> Result<(), StoreError> {
        db.query(
            r#"
            DEFINE TABLE IF NOT EXISTS leads SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS created_at_idx ON leads COLUMNS created_at;
            DEFINE INDEX IF NOT EXISTS email_status_idx ON leads COLUMNS email_status;
        "#,
        )
        .await?
        .check()?;

        Ok(())
    }

    async fn try_update_email_status(
        &self,
        id: &str,
        status: EmailStatus,
        email_error: Option<String>,
    ) -> Result<(), StoreError> {
        // Table-scoped so an unknown id never creates a record; the status
        // guard keeps transitions forward-only.
        self.db
            .query(
                "UPDATE leads \
                 SET email_status = $status, email_error = $email_error \
                 WHERE id = type::thing($table, $id) AND email_status = 'pending'",
            )
            .bind(("table", TABLE))
            .bind(("id", id.to_string()))
            .bind(("status", status))
            .bind(("email_error", email_error))
            .await?
            .check()?;
        Ok(())
    }

    async fn try_list_recent(&self, limit: usize) -> Result<Vec<Lead>, StoreError> {
        let limit = limit.min(MAX_LIST_LIMIT);
        let query = format!("SELECT * FROM {TABLE} ORDER BY created_at DESC LIMIT {limit}");

        let mut result = self.db.query(query).await?;
        let records: Vec<LeadRecord> = result.take(0)?;

        Ok(records.into_iter().map(Lead::from).collect())
    }
}

#[async_trait]
impl LeadStore for SurrealLeadStore {
    async fn insert(&self, lead: NewLead) -> Result<Lead, StoreError> {
        let id = Uuid::new_v4().to_string();
        let content = LeadContent {
            company_name: &lead.company_name,
            fleet_size: &lead.fleet_size,
            fuel_type: &lead.fuel_type,
            email: &lead.email,
            phone: &lead.phone,
            email_status: EmailStatus::Pending,
            email_error: None,
            created_at: Datetime::from(Utc::now()),
        };

        let created: Option<LeadRecord> = self
            .db
            .create((TABLE, id.as_str()))
            .content(content)
            .await?;

        let lead = created
            .map(Lead::from)
            .ok_or_else(|| StoreError::Internal("Failed to create lead".to_string()))?;
        debug!(lead_id = %lead.id, "Lead stored");
        Ok(lead)
    }

    async fn update_email_status(&self, id: &str, status: EmailStatus, email_error: Option<String>) {
        if let Err(e) = self.try_update_email_status(id, status, email_error).await {
            error!(lead_id = %id, status = %status, error = %e, "Failed to update lead email status");
        }
    }

    async fn list_recent(&self, limit: usize) -> Vec<Lead> {
        match self.try_list_recent(limit).await {
            Ok(leads) => leads,
            Err(e) => {
                error!(error = %e, "Failed to list leads");
                Vec::new()
            }
        }
    }

    async fn find(&self, id: &str) -> Result<Option<Lead>, StoreError> {
        let record: Option<LeadRecord> = self.db.select((TABLE, id)).await?;
        Ok(record.map(Lead::from))
    }
}

/// Map a configured URL onto a SurrealDB endpoint.
fn endpoint(url: &str, tls: bool) -> String {
    let url = url.trim();
    if url.is_empty() || url == "memory" {
        return "mem://".to_string();
    }
    match url.strip_prefix("ws://") {
        Some(rest) if tls => format!("wss://{rest}"),
        _ => url.to_string(),
    }
}

/// Drop any inline credentials before logging an endpoint.
fn redact(endpoint: &str) -> String {
    match (endpoint.split_once("://"), endpoint.rsplit_once('@')) {
        (Some((scheme, _)), Some((_, host))) => format!("{scheme}://***@{host}"),
        _ => endpoint.to_string(),
    }
}
