//! Counter entries that cancel or reinstate a prior line item.
//!
//! The target of a reversal is never touched. Each operation validates its
//! preconditions against the ledger first and only then appends, so a failed
//! call leaves the ledger exactly as it was.
use super::error::{LedgerError, ValidationError};
use super::ledger::AssessmentLedger;
use super::line_item::{LineAction, LineItem, LineStatus};
use super::utils::new_line_id;

pub const DEFAULT_MIN_REASON_LEN: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct ReversalEngine {
    min_reason_len: usize,
}

impl Default for ReversalEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_REASON_LEN)
    }
}

impl ReversalEngine {
    pub fn new(min_reason_len: usize) -> Self {
        Self { min_reason_len }
    }

    pub fn min_reason_len(&self) -> usize {
        self.min_reason_len
    }

    /// Cancels an approved entry by appending `-amount`
    pub fn reverse_approved<'a>(
        &self,
        ledger: &'a mut AssessmentLedger,
        line_id: &str,
        reason: &str,
        actor: &str,
    ) -> Result<&'a LineItem, LedgerError> {
        self.validate_reason(reason)?;
        let target = Self::reversible_target(ledger, line_id, LineStatus::Approved)?;

        let entry = LineItem::reversal(fresh_id()?, target, negated(target)?, reason, actor);
        Ok(ledger.append_reversal(entry))
    }

    /// Restores a declined entry by appending its originally intended amount
    pub fn reinstate_declined<'a>(
        &self,
        ledger: &'a mut AssessmentLedger,
        line_id: &str,
        reason: &str,
        actor: &str,
    ) -> Result<&'a LineItem, LedgerError> {
        self.validate_reason(reason)?;
        let target = Self::reversible_target(ledger, line_id, LineStatus::Declined)?;

        let entry = LineItem::reversal(fresh_id()?, target, target.amount, reason, actor);
        Ok(ledger.append_reversal(entry))
    }

    /// Cancels the approved removal of an original estimate line, bringing its
    /// contribution back into the totals
    pub fn reinstate_removed_original<'a>(
        &self,
        ledger: &'a mut AssessmentLedger,
        original_line_id: &str,
        reason: &str,
        actor: &str,
    ) -> Result<&'a LineItem, LedgerError> {
        self.validate_reason(reason)?;
        // Only the removal currently in effect can be cancelled. Older approved
        // removals that were already reinstated, and later declined ones, are skipped.
        let removal = match ledger.active_removal_of(original_line_id) {
            Some(active) => active,
            None => {
                let latest = ledger
                    .removal_of(original_line_id)
                    .ok_or_else(|| LedgerError::NotFound {
                        kind: "Removal of original line",
                        id: original_line_id.to_string(),
                    })?;
                return Err(match latest.status {
                    LineStatus::Pending => LedgerError::invalid_state(
                        &latest.id,
                        latest.status,
                        "removal has not been approved, delete it instead",
                    ),
                    LineStatus::Declined => LedgerError::invalid_state(
                        &latest.id,
                        latest.status,
                        "removal was declined and never took effect",
                    ),
                    // approved but no longer active, so it has already been reinstated
                    LineStatus::Approved => Self::reversible_target(ledger, &latest.id, LineStatus::Approved)
                        .err()
                        .unwrap_or_else(|| {
                            LedgerError::invalid_state(&latest.id, latest.status, "removal is not in effect")
                        }),
                });
            }
        };
        let removal = Self::reversible_target(ledger, &removal.id, LineStatus::Approved)?;

        let entry = LineItem::reversal(fresh_id()?, removal, negated(removal)?, reason, actor);
        Ok(ledger.append_reversal(entry))
    }

    fn validate_reason(&self, reason: &str) -> Result<(), ValidationError> {
        let actual = reason.trim().chars().count();
        if actual < self.min_reason_len {
            return Err(ValidationError::ReasonTooShort {
                min: self.min_reason_len,
                actual,
            });
        }
        Ok(())
    }

    // Shared preconditions: the target exists, sits in `expected` status, is not
    // itself a reversal and has not already been countered.
    fn reversible_target<'l>(
        ledger: &'l AssessmentLedger,
        line_id: &str,
        expected: LineStatus,
    ) -> Result<&'l LineItem, LedgerError> {
        let target = ledger
            .get(line_id)
            .ok_or_else(|| LedgerError::line_not_found(line_id))?;

        if target.action == LineAction::Reversal {
            return Err(LedgerError::invalid_state(
                line_id,
                target.status,
                "reversal entries cannot be reversed",
            ));
        }
        if target.status != expected {
            return Err(LedgerError::invalid_state(
                line_id,
                target.status,
                format!("expected a {} item", expected.label()),
            ));
        }
        if let Some(existing) = ledger.reversal_of(line_id) {
            return Err(LedgerError::invalid_state(
                line_id,
                target.status,
                format!("already reversed by {}", existing.id),
            ));
        }
        Ok(target)
    }
}

fn negated(target: &LineItem) -> Result<i64, LedgerError> {
    target
        .amount
        .checked_neg()
        .ok_or_else(|| LedgerError::AmountOverflow {
            line_id: target.id.clone(),
        })
}

fn fresh_id() -> Result<String, LedgerError> {
    new_line_id().map_err(|e| LedgerError::Identifier(e.to_string()))
}
