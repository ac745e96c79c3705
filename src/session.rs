//! Client held editing state.
//!
//! A session keeps the last committed ledger apart from drafts the user has
//! not saved yet. Refreshing the committed side after a background save never
//! discards local drafts; only drafts that now appear in the committed ledger
//! are dropped.
use super::ledger::AssessmentLedger;
use super::line_item::LineDraft;
use super::totals::{EstimateTotals, LineItemView, line_item_views};

#[derive(Debug, Clone)]
pub struct EditSession {
    committed: AssessmentLedger,
    drafts: Vec<LineDraft>,
}

impl EditSession {
    pub fn new(committed: AssessmentLedger) -> Self {
        Self {
            committed,
            drafts: vec![],
        }
    }

    pub fn committed(&self) -> &AssessmentLedger {
        &self.committed
    }
    pub fn drafts(&self) -> &[LineDraft] {
        &self.drafts
    }
    pub fn has_unsaved_changes(&self) -> bool {
        !self.drafts.is_empty()
    }

    /// Stage a draft locally. Re-staging an id replaces the earlier draft.
    pub fn stage(&mut self, draft: LineDraft) {
        match self.drafts.iter_mut().find(|d| d.id == draft.id) {
            Some(existing) => *existing = draft,
            None => self.drafts.push(draft),
        }
    }

    pub fn discard(&mut self, draft_id: &str) -> Option<LineDraft> {
        let idx = self.drafts.iter().position(|d| d.id == draft_id)?;
        Some(self.drafts.remove(idx))
    }

    /// Drafts ready to be dispatched, in staging order
    pub fn pending_drafts(&self) -> impl Iterator<Item = &LineDraft> {
        self.drafts.iter()
    }

    /// Replace the committed snapshot and drop only drafts it now contains
    pub fn reconcile(&mut self, committed: AssessmentLedger) {
        if committed.assessment_id != self.committed.assessment_id {
            tracing::warn!(
                expected = %self.committed.assessment_id,
                got = %committed.assessment_id,
                "ignoring committed ledger for another assessment"
            );
            return;
        }
        self.drafts.retain(|d| !committed.contains(&d.id));
        self.committed = committed;
    }

    pub fn committed_views(&self) -> Vec<LineItemView<'_>> {
        line_item_views(&self.committed)
    }

    pub fn committed_totals(&self) -> EstimateTotals {
        EstimateTotals::from_ledger(&self.committed)
    }

    /// Committed pending total plus everything staged locally
    pub fn projected_pending_total(&self) -> i64 {
        self.drafts
            .iter()
            .fold(self.committed_totals().pending_total, |acc, d| acc.saturating_add(d.amount))
    }
}
