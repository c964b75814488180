use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

#[derive(Error, Debug, Clone, Serialize, PartialEq, Eq)]
pub enum LedgerError {
    /// User with given ID not found
    #[error("User {0} not found")]
    UserNotFound(String),

    /// Group with given ID not found
    #[error("Group {0} not found")]
    GroupNotFound(String),

    /// Payment with given ID not found
    #[error("Payment {0} not found")]
    PaymentNotFound(String),

    /// User is not a member of the group
    #[error("User {0} is not a group member")]
    NotGroupMember(String),

    /// User is registered twice in the same group
    #[error("User {0} is already a group member")]
    AlreadyGroupMember(String),

    /// User specified in split is invalid
    #[error("Invalid split user: {0}")]
    InvalidSplitUser(String),

    /// Split amounts don't add up to the expense amount
    #[error("Invalid split amounts")]
    InvalidSplit,

    /// Payer and receiver of a payment are the same user
    #[error("Cannot create payment to self")]
    SelfPayment,

    /// Generic input validation error with detailed field information
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),

    /// Wallet address is not a 20-byte hex address
    #[error("Invalid wallet address: {0}")]
    InvalidWalletAddress(String),

    /// Amount cannot be represented in the registry's fixed-point convention
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),

    /// The balance graph broke one of its structural invariants
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),

    /// Scoped simplification found debt that belongs to another scope
    #[error("Scope mismatch: {0}")]
    ScopeMismatch(String),

    #[error("Logging error: {0}")]
    LoggingError(String),

    /// The settlement worker is gone and can no longer accept jobs
    #[error("Settlement queue closed")]
    QueueClosed,

    /// Environment settings are inconsistent
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LedgerError {
    pub(crate) fn invalid_amount(field: &str, description: &str) -> Self {
        LedgerError::InvalidInput(
            field.to_string(),
            FieldError {
                field: field.to_string(),
                title: "Invalid Amount".to_string(),
                description: description.to_string(),
            },
        )
    }
}
