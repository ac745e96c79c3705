//! Property-based tests for the additionals ledger
//!
//! Random sequences of ledger operations are applied to a fresh ledger and
//! the append-only rules are checked after every step: terminal entries are
//! never rewritten, failed operations change nothing, and the approved total
//! always equals the fold over approved amounts.

use claims_ledger::{
    error::LedgerError,
    ledger::AssessmentLedger,
    line_item::{LineDraft, LineItem, LineStatus},
    reversal::ReversalEngine,
    totals::{EstimateTotals, approved_total, line_item_views},
};
use proptest::prelude::*;

const ACTOR: &str = "user_prop";
const REASON: &str = "Adjusted after insurer review";

#[derive(Debug, Clone)]
enum Op {
    Add(i64),
    Approve(usize),
    Decline(usize),
    Delete(usize),
    Reverse(usize),
    Reinstate(usize),
}

/// Indices are resolved modulo the ledger length at apply time
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..=50_000).prop_map(Op::Add),
        (-50_000i64..=-1).prop_map(Op::Add),
        any::<usize>().prop_map(Op::Approve),
        any::<usize>().prop_map(Op::Decline),
        any::<usize>().prop_map(Op::Delete),
        any::<usize>().prop_map(Op::Reverse),
        any::<usize>().prop_map(Op::Reinstate),
    ]
}

fn pick(ledger: &AssessmentLedger, idx: usize) -> Option<String> {
    if ledger.is_empty() {
        return None;
    }
    Some(ledger.items()[idx % ledger.len()].id.clone())
}

fn apply(ledger: &mut AssessmentLedger, op: &Op) -> Result<(), LedgerError> {
    let engine = ReversalEngine::default();
    match op {
        Op::Add(amount) => {
            let draft = LineDraft::additional("Generated line", *amount).expect("draft id");
            ledger.add_line_item(draft, ACTOR).map(|_| ())
        }
        Op::Approve(i) => match pick(ledger, *i) {
            Some(id) => ledger.approve(&id).map(|_| ()),
            None => Ok(()),
        },
        Op::Decline(i) => match pick(ledger, *i) {
            Some(id) => ledger.decline(&id, "Not covered").map(|_| ()),
            None => Ok(()),
        },
        Op::Delete(i) => match pick(ledger, *i) {
            Some(id) => ledger.delete_line_item(&id).map(|_| ()),
            None => Ok(()),
        },
        Op::Reverse(i) => match pick(ledger, *i) {
            Some(id) => engine.reverse_approved(ledger, &id, REASON, ACTOR).map(|_| ()),
            None => Ok(()),
        },
        Op::Reinstate(i) => match pick(ledger, *i) {
            Some(id) => engine.reinstate_declined(ledger, &id, REASON, ACTOR).map(|_| ()),
            None => Ok(()),
        },
    }
}

fn terminal_entries(ledger: &AssessmentLedger) -> Vec<LineItem> {
    ledger
        .items()
        .iter()
        .filter(|item| item.status.is_terminal())
        .cloned()
        .collect()
}

proptest! {
    /// Property: approved and declined entries are never rewritten or removed
    #[test]
    fn prop_terminal_entries_are_immutable(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut ledger = AssessmentLedger::new("assessment_prop");

        for op in &ops {
            let before = terminal_entries(&ledger);
            let _ = apply(&mut ledger, op);

            for entry in before {
                prop_assert_eq!(ledger.get(&entry.id), Some(&entry));
            }
        }
    }

    /// Property: a failed operation leaves the ledger exactly as it was
    #[test]
    fn prop_failed_operations_change_nothing(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut ledger = AssessmentLedger::new("assessment_prop");

        for op in &ops {
            let snapshot = ledger.clone();
            if apply(&mut ledger, op).is_err() {
                prop_assert_eq!(&ledger, &snapshot);
            }
        }
    }

    /// Property: no entry is ever the target of more than one reversal, and
    /// reversals never target other reversals
    #[test]
    fn prop_at_most_one_reversal_per_entry(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ledger = AssessmentLedger::new("assessment_prop");
        for op in &ops {
            let _ = apply(&mut ledger, op);
        }

        for item in ledger.items() {
            let reversals = ledger
                .items()
                .iter()
                .filter(|r| r.reverses_line_id.as_deref() == Some(item.id.as_str()))
                .count();
            prop_assert!(reversals <= 1);
            if item.is_reversal() {
                prop_assert_eq!(reversals, 0);
                prop_assert_eq!(item.status, LineStatus::Approved);
            }
        }
    }

    /// Property: every way of totalling the ledger agrees
    #[test]
    fn prop_totals_agree(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut ledger = AssessmentLedger::new("assessment_prop");
        for op in &ops {
            let _ = apply(&mut ledger, op);
        }

        let folded: i64 = ledger
            .items()
            .iter()
            .filter(|i| i.is_approved())
            .map(|i| i.amount)
            .sum();
        let effective: i64 = line_item_views(&ledger).iter().map(|v| v.effective_amount).sum();

        prop_assert_eq!(approved_total(&ledger), folded);
        prop_assert_eq!(EstimateTotals::from_ledger(&ledger).approved_total, folded);
        prop_assert_eq!(effective, folded);
    }

    /// Property: approve then reverse nets to zero for any amount
    #[test]
    fn prop_reverse_nets_to_zero(amount in prop_oneof![1i64..=1_000_000, -1_000_000i64..=-1]) {
        let mut ledger = AssessmentLedger::new("assessment_prop");
        let draft = LineDraft::additional("Generated line", amount).unwrap();
        let id = draft.id.clone();
        ledger.add_line_item(draft, ACTOR).unwrap();
        ledger.approve(&id).unwrap();

        let entry = ReversalEngine::default()
            .reverse_approved(&mut ledger, &id, REASON, ACTOR)
            .unwrap()
            .clone();

        prop_assert_eq!(entry.amount, -amount);
        prop_assert_eq!(approved_total(&ledger), 0);
        prop_assert_eq!(ledger.len(), 2);
    }

    /// Property: cbor round-trip keeps entries and their order
    #[test]
    fn prop_cbor_roundtrip_preserves_order(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let mut ledger = AssessmentLedger::new("assessment_prop");
        for op in &ops {
            let _ = apply(&mut ledger, op);
        }

        let (_hash, cbor) = ledger.serialize_with_hash().expect("Serialization should succeed");
        let decoded: AssessmentLedger = minicbor::decode(&cbor).expect("Deserialization should succeed");

        let ids: Vec<&str> = ledger.items().iter().map(|i| i.id.as_str()).collect();
        let decoded_ids: Vec<&str> = decoded.items().iter().map(|i| i.id.as_str()).collect();
        prop_assert_eq!(ids, decoded_ids);
        prop_assert_eq!(approved_total(&decoded), approved_total(&ledger));
    }
}
