//! Line item records and their lifecycle tags
use chrono::{DateTime, TimeZone, Utc};

use super::error::ValidationError;
use super::utils::new_line_id;

/// Largest accepted magnitude of a single line amount, in minor units
pub const MAX_LINE_AMOUNT: i64 = 1_000_000_000_000_000;

/// How an entry came to exist in the ledger
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineAction {
    #[n(0)]
    Added,
    #[n(1)]
    Removed,
    #[n(2)]
    Reversal,
}

/// Workflow state of an entry. Approved and Declined are terminal for edits.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Declined,
}

impl LineStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LineStatus::Pending => "pending",
            LineStatus::Approved => "approved",
            LineStatus::Declined => "declined",
        }
    }
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LineStatus::Pending)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// One estimate entry: an additional, a removal of an original line, or a reversal.
///
/// Once `status` leaves `Pending` the record is never rewritten. Corrections are
/// made by appending a reversal that points back through `reverses_line_id`.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    #[n(0)]
    pub id: String, // bech32 encoded uuid7, hrp `line_`
    #[n(1)]
    pub description: String,
    #[n(2)]
    pub amount: i64, // minor currency units, signed
    #[n(3)]
    pub action: LineAction,
    #[n(4)]
    pub status: LineStatus,
    #[n(5)]
    pub reverses_line_id: Option<String>,
    #[n(6)]
    pub original_line_id: Option<String>,
    #[n(7)]
    pub reversal_reason: Option<String>,
    #[n(8)]
    pub decline_reason: Option<String>,
    #[n(9)]
    pub created_by: String,
    #[n(10)]
    pub created_at: TimeStamp<Utc>,
    #[n(11)]
    pub approved_at: Option<TimeStamp<Utc>>,
    #[n(12)]
    pub declined_at: Option<TimeStamp<Utc>>,
}

impl LineItem {
    /// A pending entry built from a validated draft
    pub(crate) fn pending(draft: LineDraft, actor: &str) -> Self {
        Self {
            id: draft.id,
            description: draft.description,
            amount: draft.amount,
            action: draft.action,
            status: LineStatus::Pending,
            reverses_line_id: None,
            original_line_id: draft.original_line_id,
            reversal_reason: None,
            decline_reason: None,
            created_by: actor.to_string(),
            created_at: TimeStamp::new(),
            approved_at: None,
            declined_at: None,
        }
    }

    /// An auto-approved counter entry for `target`
    pub(crate) fn reversal(
        id: String,
        target: &LineItem,
        amount: i64,
        reason: &str,
        actor: &str,
    ) -> Self {
        let now = TimeStamp::new();
        Self {
            id,
            description: format!("Reversal of: {}", target.description),
            amount,
            action: LineAction::Reversal,
            status: LineStatus::Approved,
            reverses_line_id: Some(target.id.clone()),
            original_line_id: target.original_line_id.clone(),
            reversal_reason: Some(reason.trim().to_string()),
            decline_reason: None,
            created_by: actor.to_string(),
            created_at: now.clone(),
            approved_at: Some(now),
            declined_at: None,
        }
    }

    pub fn is_reversal(&self) -> bool {
        self.action == LineAction::Reversal
    }
    pub fn is_approved(&self) -> bool {
        self.status == LineStatus::Approved
    }
}

/// Input for a new ledger entry. The id is generated client side so unsaved
/// drafts can be matched against committed state later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDraft {
    pub id: String,
    pub description: String,
    pub amount: i64,
    pub action: LineAction,
    pub original_line_id: Option<String>,
}

impl LineDraft {
    /// An additional repair line
    pub fn additional(description: &str, amount: i64) -> anyhow::Result<Self> {
        Ok(Self {
            id: new_line_id()?,
            description: description.to_string(),
            amount,
            action: LineAction::Added,
            original_line_id: None,
        })
    }

    /// Removal of an original estimate line. The entry carries the negated
    /// original amount so the approved total drops by that much.
    pub fn removal(
        original_line_id: &str,
        description: &str,
        original_amount: i64,
    ) -> anyhow::Result<Self> {
        check_amount_range(original_amount)?;
        Ok(Self {
            id: new_line_id()?,
            description: description.to_string(),
            amount: -original_amount,
            action: LineAction::Removed,
            original_line_id: Some(original_line_id.to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::BlankDescription);
        }
        if self.amount == 0 {
            return Err(ValidationError::ZeroAmount);
        }
        check_amount_range(self.amount)?;
        match self.action {
            LineAction::Reversal => Err(ValidationError::ManualReversal),
            LineAction::Removed if self.original_line_id.is_none() => {
                Err(ValidationError::MissingOriginalLine)
            }
            LineAction::Added if self.original_line_id.is_some() => {
                Err(ValidationError::UnexpectedOriginalLine)
            }
            LineAction::Added | LineAction::Removed => Ok(()),
        }
    }
}

// Keeps negation and ledger sums clear of i64 overflow
fn check_amount_range(amount: i64) -> Result<(), ValidationError> {
    if amount.unsigned_abs() > MAX_LINE_AMOUNT.unsigned_abs() {
        return Err(ValidationError::AmountOutOfRange {
            max: MAX_LINE_AMOUNT,
            actual: amount,
        });
    }
    Ok(())
}
