//! Payment provider implementations
//!
//! Concrete implementations of the PaymentProvider trait for different providers.

pub mod duitku;

pub use duitku::DuitkuProvider;
