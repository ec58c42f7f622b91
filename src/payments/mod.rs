//! Payment gateway integration module
//!
//! Signs and sends create-payment requests to Duitku and verifies the status
//! callbacks it posts back. Both processor APIs (invoice and inquiry) go
//! through the same pipeline, parameterized by [`types::ProtocolVariant`].

pub mod builder;
pub mod callback;
pub mod client;
pub mod providers;
pub mod reconciler;
pub mod signature;
pub mod traits;
pub mod types;
