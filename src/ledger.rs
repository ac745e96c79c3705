//! Append-only line item ledger for a single assessment
use super::error::{LedgerError, ValidationError};
use super::line_item::{LineAction, LineDraft, LineItem, LineStatus, TimeStamp};

/// The ordered entries belonging to one assessment. Insertion order is the
/// audit order and is preserved through encoding.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct AssessmentLedger {
    #[n(0)]
    pub assessment_id: String,
    #[n(1)]
    items: Vec<LineItem>,
}

impl AssessmentLedger {
    pub fn new(assessment_id: impl Into<String>) -> Self {
        Self {
            assessment_id: assessment_id.into(),
            items: vec![],
        }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }
    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    pub fn get(&self, line_id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == line_id)
    }
    pub fn contains(&self, line_id: &str) -> bool {
        self.get(line_id).is_some()
    }

    /// The reversal entry targeting `line_id`, if one exists
    pub fn reversal_of(&self, line_id: &str) -> Option<&LineItem> {
        self.items
            .iter()
            .find(|item| item.is_reversal() && item.reverses_line_id.as_deref() == Some(line_id))
    }

    /// The most recent removal entry for an original estimate line
    pub fn removal_of(&self, original_line_id: &str) -> Option<&LineItem> {
        self.items.iter().rev().find(|item| {
            item.action == LineAction::Removed
                && item.original_line_id.as_deref() == Some(original_line_id)
        })
    }

    /// The approved, unreversed removal currently lowering the total for an original line
    pub fn active_removal_of(&self, original_line_id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| {
            item.action == LineAction::Removed
                && item.status == LineStatus::Approved
                && item.original_line_id.as_deref() == Some(original_line_id)
                && self.reversal_of(&item.id).is_none()
        })
    }

    // A removal that is in effect, or pending and could come into effect
    fn open_removal_of(&self, original_line_id: &str) -> Option<&LineItem> {
        self.items
            .iter()
            .find(|item| {
                item.action == LineAction::Removed
                    && item.status == LineStatus::Pending
                    && item.original_line_id.as_deref() == Some(original_line_id)
            })
            .or_else(|| self.active_removal_of(original_line_id))
    }

    fn position(&self, line_id: &str) -> Result<usize, LedgerError> {
        self.items
            .iter()
            .position(|item| item.id == line_id)
            .ok_or_else(|| LedgerError::line_not_found(line_id))
    }

    /// Appends a new pending entry
    pub fn add_line_item(&mut self, draft: LineDraft, actor: &str) -> Result<&LineItem, LedgerError> {
        draft.validate()?;
        if self.contains(&draft.id) {
            return Err(ValidationError::DuplicateId(draft.id).into());
        }
        if let Some(original) = draft.original_line_id.as_deref() {
            if self.open_removal_of(original).is_some() {
                return Err(ValidationError::OriginalAlreadyRemoved(original.to_string()).into());
            }
        }

        self.items.push(LineItem::pending(draft, actor));
        Ok(&self.items[self.items.len() - 1])
    }

    /// Pending -> Approved
    pub fn approve(&mut self, line_id: &str) -> Result<&LineItem, LedgerError> {
        let idx = self.pending_position(line_id, "only pending items can be approved")?;

        let item = &mut self.items[idx];
        item.status = LineStatus::Approved;
        item.approved_at = Some(TimeStamp::new());
        Ok(&*item)
    }

    /// Pending -> Declined
    pub fn decline(&mut self, line_id: &str, reason: &str) -> Result<&LineItem, LedgerError> {
        if reason.trim().is_empty() {
            return Err(ValidationError::BlankDeclineReason.into());
        }
        let idx = self.pending_position(line_id, "only pending items can be declined")?;

        let item = &mut self.items[idx];
        item.status = LineStatus::Declined;
        item.decline_reason = Some(reason.trim().to_string());
        item.declined_at = Some(TimeStamp::new());
        Ok(&*item)
    }

    /// Removes a pending entry outright. Approved and declined entries are
    /// immutable and must be countered with a reversal instead.
    pub fn delete_line_item(&mut self, line_id: &str) -> Result<LineItem, LedgerError> {
        let idx = self.position(line_id)?;

        match self.items[idx].status {
            LineStatus::Pending => Ok(self.items.remove(idx)),
            status @ (LineStatus::Approved | LineStatus::Declined) => {
                Err(LedgerError::ImmutableEntry {
                    line_id: line_id.to_string(),
                    status,
                })
            }
        }
    }

    fn pending_position(&self, line_id: &str, message: &str) -> Result<usize, LedgerError> {
        let idx = self.position(line_id)?;
        let item = &self.items[idx];

        if item.status != LineStatus::Pending {
            return Err(LedgerError::invalid_state(line_id, item.status, message));
        }
        Ok(idx)
    }

    pub(crate) fn append_reversal(&mut self, entry: LineItem) -> &LineItem {
        self.items.push(entry);
        &self.items[self.items.len() - 1]
    }

    /// Serialises the ledger into cbor and returns it with its sha256 digest
    pub fn serialize_with_hash(&self) -> anyhow::Result<(String, Vec<u8>)> {
        let cbor = minicbor::to_vec(self)?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }

    /// Fingerprint of the current ledger contents
    pub fn digest(&self) -> anyhow::Result<String> {
        Ok(self.serialize_with_hash()?.0)
    }

    /// Emit the audit order of the ledger as structured log events
    pub fn view_history(&self) {
        for (seq, item) in self.items.iter().enumerate() {
            tracing::info!(
                assessment_id = %self.assessment_id,
                seq,
                line_id = %item.id,
                action = ?item.action,
                status = ?item.status,
                amount = item.amount,
                reverses = item.reverses_line_id.as_deref().unwrap_or("-"),
                created_by = %item.created_by,
                created_at = %item.created_at.to_datetime_utc(),
                "{}",
                item.description
            );
        }
    }
}
