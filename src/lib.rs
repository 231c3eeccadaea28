//! Rust client library for the `cobranca` debt tracking API.
//!
//! This crate provides a typed client for the cobranca backend plus the
//! session and charge-ledger controller that sits between a presentation
//! layer and the server: it owns the authentication state, caches the open
//! charges of the searched debtor, and translates server failures into
//! user-facing messages.
//!
//! ```no_run
//! # #[cfg(feature = "blocking")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use cobranca_rs::client::CobrancaBlockingClient;
//! use cobranca_rs::controller::SessionLedgerBlockingController;
//! use cobranca_rs::models::TaxId;
//! use secrecy::SecretString;
//!
//! let client = CobrancaBlockingClient::builder()
//!     .base_url("http://localhost:8000")
//!     .build()?;
//! let controller = SessionLedgerBlockingController::new(client);
//! if !controller.probe_session().is_authenticated() {
//!     let _identity = controller.login(
//!         TaxId::from("71484654862"),
//!         SecretString::from("123change"),
//!     )?;
//! }
//! let _charges = controller.list_charges(TaxId::from("34792144697825"))?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "blocking"))]
//! # fn main() {}
//! ```

#[cfg(any(feature = "async", feature = "blocking"))]
pub mod client;
pub mod controller;
pub mod error;
pub mod models;
pub mod state;
pub mod transport;
pub mod translator;
