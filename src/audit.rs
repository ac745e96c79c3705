//! Audit trail of ledger mutations.
//!
//! Recording is best effort: the service writes the ledger first and a
//! recorder failure is reported back as a warning, never rolled back.
use chrono::Utc;
use uuid7::uuid7;

use super::line_item::TimeStamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum AuditAction {
    #[n(0)]
    LineAdded,
    #[n(1)]
    LineApproved,
    #[n(2)]
    LineDeclined,
    #[n(3)]
    LineDeleted,
    #[n(4)]
    ReversedApproved,
    #[n(5)]
    ReinstatedDeclined,
    #[n(6)]
    ReinstatedRemovedOriginal,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, minicbor::Encode, minicbor::Decode)]
pub struct AuditMetadata {
    #[n(0)]
    pub amount_before: Option<i64>, // contribution of the entity before the change
    #[n(1)]
    pub amount_after: Option<i64>,
    #[n(2)]
    pub ledger_digest_before: Option<String>,
    #[n(3)]
    pub ledger_digest_after: Option<String>,
    #[n(4)]
    pub related_line_id: Option<String>, // the reversal entry or reversed target
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct AuditEvent {
    #[n(0)]
    pub action: AuditAction,
    #[n(1)]
    pub assessment_id: String,
    #[n(2)]
    pub entity_id: String,
    #[n(3)]
    pub actor: String,
    #[n(4)]
    pub reason: Option<String>,
    #[n(5)]
    pub recorded_at: TimeStamp<Utc>,
    #[n(6)]
    pub metadata: AuditMetadata,
}

impl AuditEvent {
    pub fn new(action: AuditAction, assessment_id: &str, entity_id: &str, actor: &str) -> Self {
        Self {
            action,
            assessment_id: assessment_id.to_string(),
            entity_id: entity_id.to_string(),
            actor: actor.to_string(),
            reason: None,
            recorded_at: TimeStamp::new(),
            metadata: AuditMetadata::default(),
        }
    }
    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.trim().to_string());
        self
    }
    pub fn with_metadata(mut self, metadata: AuditMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Sink for audit events
pub trait AuditRecorder: Send + Sync {
    fn record(&self, event: &AuditEvent) -> anyhow::Result<()>;
}

/// Emits events as structured log lines only
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditRecorder;

impl AuditRecorder for TracingAuditRecorder {
    fn record(&self, event: &AuditEvent) -> anyhow::Result<()> {
        tracing::info!(
            action = ?event.action,
            assessment_id = %event.assessment_id,
            entity_id = %event.entity_id,
            actor = %event.actor,
            reason = event.reason.as_deref().unwrap_or(""),
            amount_before = ?event.metadata.amount_before,
            amount_after = ?event.metadata.amount_after,
            "audit"
        );
        Ok(())
    }
}

/// Persists events as cbor in a dedicated sled tree. Keys are uuid7 so
/// iteration yields events in recording order.
#[derive(Clone)]
pub struct SledAuditLog {
    tree: sled::Tree,
}

impl SledAuditLog {
    pub fn open(db: &sled::Db, tree_name: &str) -> anyhow::Result<Self> {
        Ok(Self {
            tree: db.open_tree(tree_name)?,
        })
    }

    pub fn events(&self) -> anyhow::Result<Vec<AuditEvent>> {
        self.tree
            .iter()
            .values()
            .map(|value| -> anyhow::Result<AuditEvent> {
                let value = value?;
                Ok(minicbor::decode(&value)?)
            })
            .collect()
    }

    pub fn events_for(&self, entity_id: &str) -> anyhow::Result<Vec<AuditEvent>> {
        Ok(self
            .events()?
            .into_iter()
            .filter(|e| {
                e.entity_id == entity_id
                    || e.metadata.related_line_id.as_deref() == Some(entity_id)
            })
            .collect())
    }

    pub fn events_for_assessment(&self, assessment_id: &str) -> anyhow::Result<Vec<AuditEvent>> {
        Ok(self
            .events()?
            .into_iter()
            .filter(|e| e.assessment_id == assessment_id)
            .collect())
    }
}

impl AuditRecorder for SledAuditLog {
    fn record(&self, event: &AuditEvent) -> anyhow::Result<()> {
        let key = uuid7();
        self.tree.insert(key.as_bytes(), minicbor::to_vec(event)?)?;
        Ok(())
    }
}
