use crate::line_item::LineStatus;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Reason must be at least {min} characters, got {actual}")]
    ReasonTooShort { min: usize, actual: usize },
    #[error("Line item description is blank")]
    BlankDescription,
    #[error("Decline reason is blank")]
    BlankDeclineReason,
    #[error("Removed line items must reference the original estimate line")]
    MissingOriginalLine,
    #[error("Only removed line items may reference an original estimate line")]
    UnexpectedOriginalLine,
    #[error("Reversal entries can only be created by reversing or reinstating an entry")]
    ManualReversal,
    #[error("Line item {0} already exists in this ledger")]
    DuplicateId(String),
    #[error("Line item amount must not be zero")]
    ZeroAmount,
    #[error("Line item amount {actual} is outside the allowed range of +/-{max}")]
    AmountOutOfRange { max: i64, actual: i64 },
    #[error("Original line {0} already has a removal in effect or awaiting approval")]
    OriginalAlreadyRemoved(String),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Line item {line_id} is {status:?}: {message}")]
    InvalidState {
        line_id: String,
        status: LineStatus,
        message: String,
    },
    #[error("Cannot delete {label} item {line_id}, only pending items may be deleted", label = .status.label())]
    ImmutableEntry { line_id: String, status: LineStatus },
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("Counter amount for line item {line_id} cannot be represented")]
    AmountOverflow { line_id: String },
    #[error("Failed to generate line item id: {0}")]
    Identifier(String),
}

impl LedgerError {
    pub(crate) fn invalid_state(line_id: &str, status: LineStatus, message: impl Into<String>) -> Self {
        LedgerError::InvalidState {
            line_id: line_id.to_string(),
            status,
            message: message.into(),
        }
    }
    pub(crate) fn line_not_found(line_id: &str) -> Self {
        LedgerError::NotFound {
            kind: "Line item",
            id: line_id.to_string(),
        }
    }
}
