//! Payment provider implementations
//!
//! Concrete implementations of the PaymentProvider trait for different providers.

pub mod payzen;

pub use payzen::PayzenProvider;
