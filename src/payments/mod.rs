//! Payment provider integration module
//!
//! Gateway-neutral types, the status normalization tables shared by every
//! provider, and the provider clients themselves.

pub mod amount;
pub mod providers;
pub mod status;
pub mod traits;
pub mod types;

pub use status::{resolve_status, PaymentStatus, StatusTable, TransactionStatus};
pub use traits::PaymentProvider;
