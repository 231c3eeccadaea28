//! Data models for the cobranca API.
//!
//! Wire types for sessions and charges, newtype identifiers, and the
//! client-side charge draft.

mod auth;
mod charge;
mod identity;
mod ids;

pub use auth::{AuthEcho, LoginRequest, SignupRequest};
pub use charge::{ChargeDraft, ChargeFilter, ChargeRecord, PaymentRequest};
pub use chrono::NaiveDateTime;
pub use identity::{EntityKind, Identity};
pub use ids::{ChargeId, TaxId};
pub use rust_decimal::Decimal;
