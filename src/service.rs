//! Service layer API for assessment ledger operations
use std::sync::Arc;

use anyhow::Context;

use super::audit::{AuditAction, AuditEvent, AuditMetadata, AuditRecorder, SledAuditLog};
use super::config::LedgerConfig;
use super::ledger::AssessmentLedger;
use super::line_item::{LineDraft, LineItem};
use super::reversal::ReversalEngine;
use super::store::AssessmentStore;
use super::totals::EstimateTotals;

/// Result of a successful mutation. The ledger change is authoritative once
/// persisted; `audit_warning` is set when the audit sink rejected the event.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub ledger: AssessmentLedger,
    pub entry_id: String,
    pub audit_warning: Option<String>,
}

impl MutationOutcome {
    /// The entry the mutation created or changed, if it is still in the ledger
    pub fn entry(&self) -> Option<&LineItem> {
        self.ledger.get(&self.entry_id)
    }
}

/// Entry point for changes to stored assessment ledgers
pub struct AssessmentService {
    store: AssessmentStore,
    engine: ReversalEngine,
    audit: Arc<dyn AuditRecorder>,
}

impl AssessmentService {
    /// Service backed by `instance` with the audit trail kept in the same database
    pub fn new(instance: Arc<sled::Db>, config: &LedgerConfig) -> anyhow::Result<Self> {
        let audit = SledAuditLog::open(&instance, &config.audit_tree)?;
        Self::with_recorder(instance, ReversalEngine::new(config.min_reason_len), Arc::new(audit))
    }

    /// Service with an explicit reversal engine and audit sink
    pub fn with_recorder(
        instance: Arc<sled::Db>,
        engine: ReversalEngine,
        audit: Arc<dyn AuditRecorder>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            store: AssessmentStore::new(&instance)?,
            engine,
            audit,
        })
    }

    /// Opens the database at `config.db_path`
    pub fn open(config: &LedgerConfig) -> anyhow::Result<Self> {
        let db = sled::open(&config.db_path)
            .with_context(|| format!("failed to open ledger database at {}", config.db_path))?;
        tracing::info!(db_path = %config.db_path, "opened ledger database");
        Self::new(Arc::new(db), config)
    }

    /// Load the stored ledger of an assessment
    pub fn ledger(&self, assessment_id: &str) -> anyhow::Result<AssessmentLedger> {
        self.store.load(assessment_id)
    }

    /// Totals derived from the stored ledger
    pub fn totals(&self, assessment_id: &str) -> anyhow::Result<EstimateTotals> {
        Ok(EstimateTotals::from_ledger(&self.store.load(assessment_id)?))
    }

    /// Adds a pending line item, creating the assessment ledger on first use
    pub fn add_line_item(
        &self,
        assessment_id: &str,
        draft: LineDraft,
        actor: &str,
    ) -> anyhow::Result<MutationOutcome> {
        let mut ledger = self.store.load_or_new(assessment_id)?;
        let digest_before = ledger.digest()?;

        let entry = ledger.add_line_item(draft, actor)?;
        let entry_id = entry.id.clone();
        let metadata = AuditMetadata {
            amount_before: None,
            amount_after: Some(entry.amount),
            ..Default::default()
        };

        let event = AuditEvent::new(AuditAction::LineAdded, assessment_id, &entry_id, actor);
        self.commit(ledger, entry_id, digest_before, event, metadata)
    }

    /// Approve a pending line item
    pub fn approve(
        &self,
        assessment_id: &str,
        line_id: &str,
        actor: &str,
    ) -> anyhow::Result<MutationOutcome> {
        let mut ledger = self.store.load(assessment_id)?;
        let digest_before = ledger.digest()?;

        let amount = ledger.approve(line_id)?.amount;
        let metadata = AuditMetadata {
            amount_before: Some(0),
            amount_after: Some(amount),
            ..Default::default()
        };

        let event = AuditEvent::new(AuditAction::LineApproved, assessment_id, line_id, actor);
        self.commit(ledger, line_id.to_string(), digest_before, event, metadata)
    }

    /// Decline a pending line item. The reason must not be blank.
    pub fn decline(
        &self,
        assessment_id: &str,
        line_id: &str,
        reason: &str,
        actor: &str,
    ) -> anyhow::Result<MutationOutcome> {
        let mut ledger = self.store.load(assessment_id)?;
        let digest_before = ledger.digest()?;

        ledger.decline(line_id, reason)?;
        let metadata = AuditMetadata {
            amount_before: Some(0),
            amount_after: Some(0),
            ..Default::default()
        };

        let event = AuditEvent::new(AuditAction::LineDeclined, assessment_id, line_id, actor)
            .with_reason(reason);
        self.commit(ledger, line_id.to_string(), digest_before, event, metadata)
    }

    /// Deletes a pending item. Fails with `ImmutableEntry` for approved or declined items.
    pub fn delete_line_item(
        &self,
        assessment_id: &str,
        line_id: &str,
        actor: &str,
    ) -> anyhow::Result<MutationOutcome> {
        let mut ledger = self.store.load(assessment_id)?;
        let digest_before = ledger.digest()?;

        let removed = ledger.delete_line_item(line_id)?;
        let metadata = AuditMetadata {
            amount_before: Some(removed.amount),
            amount_after: None,
            ..Default::default()
        };

        let event = AuditEvent::new(AuditAction::LineDeleted, assessment_id, line_id, actor);
        self.commit(ledger, removed.id, digest_before, event, metadata)
    }

    /// Cancel an approved line item with an auto-approved counter entry
    pub fn reverse_approved(
        &self,
        assessment_id: &str,
        line_id: &str,
        reason: &str,
        actor: &str,
    ) -> anyhow::Result<MutationOutcome> {
        let mut ledger = self.store.load(assessment_id)?;
        let digest_before = ledger.digest()?;

        let entry = self.engine.reverse_approved(&mut ledger, line_id, reason, actor)?;
        let (entry_id, counter) = (entry.id.clone(), entry.amount);
        let metadata = AuditMetadata {
            amount_before: Some(-counter),
            amount_after: Some(0),
            related_line_id: Some(entry_id.clone()),
            ..Default::default()
        };

        let event = AuditEvent::new(AuditAction::ReversedApproved, assessment_id, line_id, actor)
            .with_reason(reason);
        self.commit(ledger, entry_id, digest_before, event, metadata)
    }

    /// Restore a declined line item's amount with an auto-approved counter entry
    pub fn reinstate_declined(
        &self,
        assessment_id: &str,
        line_id: &str,
        reason: &str,
        actor: &str,
    ) -> anyhow::Result<MutationOutcome> {
        let mut ledger = self.store.load(assessment_id)?;
        let digest_before = ledger.digest()?;

        let entry = self.engine.reinstate_declined(&mut ledger, line_id, reason, actor)?;
        let (entry_id, counter) = (entry.id.clone(), entry.amount);
        let metadata = AuditMetadata {
            amount_before: Some(0),
            amount_after: Some(counter),
            related_line_id: Some(entry_id.clone()),
            ..Default::default()
        };

        let event = AuditEvent::new(AuditAction::ReinstatedDeclined, assessment_id, line_id, actor)
            .with_reason(reason);
        self.commit(ledger, entry_id, digest_before, event, metadata)
    }

    /// Cancel the removal currently in effect for an original estimate line
    pub fn reinstate_removed_original(
        &self,
        assessment_id: &str,
        original_line_id: &str,
        reason: &str,
        actor: &str,
    ) -> anyhow::Result<MutationOutcome> {
        let mut ledger = self.store.load(assessment_id)?;
        let digest_before = ledger.digest()?;

        let entry = self
            .engine
            .reinstate_removed_original(&mut ledger, original_line_id, reason, actor)?;
        let (entry_id, counter) = (entry.id.clone(), entry.amount);
        let metadata = AuditMetadata {
            amount_before: Some(-counter),
            amount_after: Some(0),
            related_line_id: Some(entry_id.clone()),
            ..Default::default()
        };

        let event = AuditEvent::new(
            AuditAction::ReinstatedRemovedOriginal,
            assessment_id,
            original_line_id,
            actor,
        )
        .with_reason(reason);
        self.commit(ledger, entry_id, digest_before, event, metadata)
    }

    // Persist first, then hand the event to the recorder. A recorder failure
    // never undoes the persisted change.
    fn commit(
        &self,
        ledger: AssessmentLedger,
        entry_id: String,
        digest_before: String,
        event: AuditEvent,
        mut metadata: AuditMetadata,
    ) -> anyhow::Result<MutationOutcome> {
        self.store.save(&ledger)?;
        tracing::debug!(
            assessment_id = %ledger.assessment_id,
            entry_id = %entry_id,
            action = ?event.action,
            "ledger mutation persisted"
        );

        metadata.ledger_digest_before = Some(digest_before);
        metadata.ledger_digest_after = Some(ledger.digest()?);
        let event = event.with_metadata(metadata);

        let audit_warning = match self.audit.record(&event) {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(
                    assessment_id = %event.assessment_id,
                    entity_id = %event.entity_id,
                    action = ?event.action,
                    error = %err,
                    "audit record failed, ledger change kept"
                );
                Some(format!("audit record failed: {err}"))
            }
        };

        Ok(MutationOutcome {
            ledger,
            entry_id,
            audit_warning,
        })
    }
}
