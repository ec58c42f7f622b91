//! Duitku payment gateway integration
//!
//! Creates signed payment requests against the Duitku processor and verifies
//! the payment-status callbacks it sends back, finalizing paid orders through
//! an idempotent fulfillment collaborator.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod payments;

pub use error::{AppError, AppResult};
pub use payments::providers::DuitkuProvider;
