use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Magnitudes below this are treated as zero (absorbs rounding of repeated updates).
pub const EPSILON: Decimal = dec!(0.01);

/// Upper bound accepted for a single expense or payment.
pub const MAX_AMOUNT: Decimal = dec!(1000000);

pub const USER_ADDED: &str = "USER_ADDED";
pub const GROUP_CREATED: &str = "GROUP_CREATED";
pub const EXPENSE_ADDED: &str = "EXPENSE_ADDED";
pub const PAYMENT_CREATED: &str = "PAYMENT_CREATED";
pub const PAYMENT_CONFIRMED: &str = "PAYMENT_CONFIRMED";
pub const PAYMENT_REJECTED: &str = "PAYMENT_REJECTED";
pub const DEBTS_SIMPLIFIED: &str = "DEBTS_SIMPLIFIED";
pub const SETTLEMENT_RECORDED: &str = "SETTLEMENT_RECORDED";
pub const SETTLEMENT_SKIPPED: &str = "SETTLEMENT_SKIPPED";
pub const SETTLEMENT_DEAD_LETTERED: &str = "SETTLEMENT_DEAD_LETTERED";
pub const SETTLEMENT_REQUEUED: &str = "SETTLEMENT_REQUEUED";
