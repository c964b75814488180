pub mod audit;
pub mod balance;
pub mod expense;
pub mod group;
pub mod ids;
pub mod payment;
pub mod settlement;
pub mod user;

pub use audit::AppLog;
pub use balance::BalanceEdge;
pub use expense::{Expense, ExpenseSplit, NewExpense};
pub use group::Group;
pub use ids::{ExpenseId, GroupId, PaymentId, UserId};
pub use payment::{NewPayment, Payment, PaymentEvent, PaymentMethod, PaymentStatus, Transition};
pub use settlement::{SettlementProof, SettlementRecord, SettlementStatus};
pub use user::{User, WalletAddress};
