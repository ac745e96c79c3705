//! Totals and per entry display state derived from a ledger on read
use super::ledger::AssessmentLedger;
use super::line_item::{LineAction, LineItem, LineStatus};

/// Sum of every approved amount. Reversals are approved entries with signed
/// amounts, so reversed items net out without any special casing. Saturates
/// at the `i64` bounds rather than overflowing.
pub fn approved_total(ledger: &AssessmentLedger) -> i64 {
    ledger
        .items()
        .iter()
        .filter(|item| item.status == LineStatus::Approved)
        .fold(0i64, |acc, item| acc.saturating_add(item.amount))
}

/// True when a reversal entry points at `line_id`. Display only.
pub fn is_reversed(ledger: &AssessmentLedger, line_id: &str) -> bool {
    ledger.reversal_of(line_id).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EstimateTotals {
    pub approved_total: i64,
    pub pending_total: i64,
    pub approved_additions: i64,
    pub approved_removals: i64,
    pub reversal_adjustments: i64,
    pub pending_count: usize,
    pub approved_count: usize,
    pub declined_count: usize,
}

impl EstimateTotals {
    pub fn from_ledger(ledger: &AssessmentLedger) -> Self {
        let mut totals = ledger.items().iter().fold(Self::default(), |mut acc, item| {
            match item.status {
                LineStatus::Pending => {
                    acc.pending_count += 1;
                    acc.pending_total = acc.pending_total.saturating_add(item.amount);
                }
                LineStatus::Declined => acc.declined_count += 1,
                LineStatus::Approved => {
                    acc.approved_count += 1;
                    let bucket = match item.action {
                        LineAction::Added => &mut acc.approved_additions,
                        LineAction::Removed => &mut acc.approved_removals,
                        LineAction::Reversal => &mut acc.reversal_adjustments,
                    };
                    *bucket = bucket.saturating_add(item.amount);
                }
            }
            acc
        });
        totals.approved_total = totals
            .approved_additions
            .saturating_add(totals.approved_removals)
            .saturating_add(totals.reversal_adjustments);
        totals
    }
}

/// The badge shown next to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    Pending,
    Approved,
    Declined,
    Reversed,
    Reinstated,
    ReversalEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemView<'a> {
    pub item: &'a LineItem,
    pub reversed: bool,
    pub badge: DisplayStatus,
    /// What this entry and any reversal of it currently add to the total
    pub effective_amount: i64,
    pub can_delete: bool,
    pub can_reverse: bool,
    pub can_reinstate: bool,
}

/// One view row per entry in ledger order
pub fn line_item_views(ledger: &AssessmentLedger) -> Vec<LineItemView<'_>> {
    ledger
        .items()
        .iter()
        .map(|item| {
            let reversal = ledger.reversal_of(&item.id);
            let reversed = reversal.is_some();
            let counter = reversal.map_or(0, |r| r.amount);
            let own = if item.is_approved() { item.amount } else { 0 };

            let badge = match (item.action, item.status, reversed) {
                (LineAction::Reversal, _, _) => DisplayStatus::ReversalEntry,
                (_, LineStatus::Approved, true) if item.action == LineAction::Removed => {
                    DisplayStatus::Reinstated
                }
                (_, LineStatus::Approved, true) => DisplayStatus::Reversed,
                (_, LineStatus::Declined, true) => DisplayStatus::Reinstated,
                (_, LineStatus::Pending, _) => DisplayStatus::Pending,
                (_, LineStatus::Approved, false) => DisplayStatus::Approved,
                (_, LineStatus::Declined, false) => DisplayStatus::Declined,
            };
            let countable = !item.is_reversal() && !reversed;

            LineItemView {
                item,
                reversed,
                badge,
                effective_amount: if item.is_reversal() { 0 } else { own.saturating_add(counter) },
                can_delete: item.status == LineStatus::Pending,
                can_reverse: countable && item.status == LineStatus::Approved,
                can_reinstate: countable
                    && (item.status == LineStatus::Declined
                        || (item.action == LineAction::Removed
                            && item.status == LineStatus::Approved)),
            }
        })
        .collect()
}
