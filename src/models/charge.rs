//! Charge ledger models: fetched rows, the creation draft, the listing
//! filter and the payment instruction.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ChargeId, Identity, TaxId};

/// Date format used when presenting `created_at` (pt-BR short date).
const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// A debt obligation from a debtor to a creditor, as returned by the server.
///
/// Records are never mutated locally: `paid_at` and `is_active` only change
/// by fetching the charge again after a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRecord {
    /// Unique identifier (UUID).
    pub id: ChargeId,
    /// Tax id of the party owed the amount.
    #[serde(rename = "creditor_cpf_cnpj")]
    pub creditor_tax_id: TaxId,
    /// Tax id of the party owing the amount.
    #[serde(rename = "debtor_cpf_cnpj")]
    pub debtor_tax_id: TaxId,
    /// Amount owed.
    #[serde(rename = "debito", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Creation timestamp.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: NaiveDateTime,
    /// Settlement timestamp, absent while the charge is open.
    #[serde(
        rename = "payed_at",
        default,
        deserialize_with = "timestamp::deserialize_option"
    )]
    pub paid_at: Option<NaiveDateTime>,
    /// `true` while the charge is unpaid.
    pub is_active: bool,
}

impl ChargeRecord {
    /// Returns `true` once the charge has been settled.
    #[inline]
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        self.paid_at.is_some() || !self.is_active
    }

    /// Renders `created_at` as a locale short date (`dd/mm/YYYY`).
    #[inline]
    #[must_use]
    pub fn display_date(&self) -> String {
        self.created_at.format(DISPLAY_DATE_FORMAT).to_string()
    }
}

/// Client-staged input for a charge-creation request.
///
/// The zero value (empty debtor, empty creditor, amount `0`) is the reset
/// state. `creditor_tax_id` is always replaced with the session identity
/// before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeDraft {
    /// Party that will owe the amount.
    pub debtor: Identity,
    /// Party owed the amount.
    #[serde(rename = "creditor_cpf_cnpj")]
    pub creditor_tax_id: TaxId,
    /// Amount to charge.
    #[serde(rename = "debito", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl ChargeDraft {
    /// Creates a draft against `debtor` with an empty creditor.
    #[inline]
    #[must_use]
    pub fn new(debtor: Identity, amount: Decimal) -> Self {
        Self {
            debtor,
            creditor_tax_id: TaxId::default(),
            amount,
        }
    }

    /// Returns a copy whose creditor is `creditor`.
    #[inline]
    #[must_use]
    pub fn with_creditor(mut self, creditor: TaxId) -> Self {
        self.creditor_tax_id = creditor;
        self
    }
}

/// Query parameters for `GET /api/v.1/charge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeFilter {
    /// Debtor whose charges are listed.
    pub debtor_cpf_cnpj: TaxId,
    /// Restricts to open (`true`) or settled (`false`) charges.
    pub is_active: bool,
}

impl ChargeFilter {
    /// Filter for the open charges of `debtor`.
    #[inline]
    #[must_use]
    pub const fn active_for(debtor: TaxId) -> Self {
        Self {
            debtor_cpf_cnpj: debtor,
            is_active: true,
        }
    }
}

/// Payment instruction for `POST /api/v.1/charge/payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Charge being settled.
    pub id: ChargeId,
    /// Creditor of the charge; checked by the server against the session.
    #[serde(rename = "creditor_cpf_cnpj")]
    pub creditor_tax_id: TaxId,
    /// Amount settled.
    #[serde(rename = "debito", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl PaymentRequest {
    /// Builds the instruction settling `charge` in full.
    #[inline]
    #[must_use]
    pub fn for_charge(charge: &ChargeRecord) -> Self {
        Self {
            id: charge.id.clone(),
            creditor_tax_id: charge.creditor_tax_id.clone(),
            amount: charge.amount,
        }
    }
}

/// Lenient ISO-8601 timestamp parsing.
///
/// The server emits naive timestamps (`2020-08-30T12:00:00.123456`) but an
/// offset-carrying form is accepted too and converted to UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer};

    /// Parses a single timestamp string.
    fn parse<E: serde::de::Error>(raw: &str) -> Result<NaiveDateTime, E> {
        raw.parse::<NaiveDateTime>()
            .or_else(|_naive_err| {
                DateTime::parse_from_rfc3339(raw).map(|stamp| stamp.naive_utc())
            })
            .map_err(E::custom)
    }

    /// Deserializes a required timestamp.
    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw)
    }

    /// Deserializes a nullable timestamp.
    pub(super) fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse(&raw))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use core::str::FromStr;

    /// A charge row exactly as the listing endpoint returns it.
    const ROW: &str = r#"{
        "id": "0b6cf8f6-3c55-4a5e-9d59-5b0a8c1f9a10",
        "debtor_cpf_cnpj": "34792144697825",
        "creditor_cpf_cnpj": "71484654862",
        "debito": 1000.26,
        "is_active": true,
        "created_at": "2020-08-30T14:05:09.123456",
        "payed_at": null
    }"#;

    #[test]
    fn deserialize_open_charge_row() {
        let charge: ChargeRecord = serde_json::from_str(ROW).unwrap();
        assert_eq!(charge.debtor_tax_id, TaxId::from("34792144697825"));
        assert_eq!(charge.creditor_tax_id, TaxId::from("71484654862"));
        assert_eq!(charge.amount, Decimal::from_str("1000.26").unwrap());
        assert!(charge.is_active);
        assert!(charge.paid_at.is_none());
        assert!(!charge.is_paid());
    }

    #[test]
    fn display_date_is_locale_short_date() {
        let charge: ChargeRecord = serde_json::from_str(ROW).unwrap();
        assert_eq!(charge.display_date(), "30/08/2020");
    }

    #[test]
    fn deserialize_paid_charge_with_offset_timestamp() {
        let json = r#"{
            "id": "c-1",
            "debtor_cpf_cnpj": "34792144697825",
            "creditor_cpf_cnpj": "71484654862",
            "debito": 10,
            "is_active": false,
            "created_at": "2020-08-30T14:05:09+00:00",
            "payed_at": "2020-09-01T10:00:00-03:00"
        }"#;
        let charge: ChargeRecord = serde_json::from_str(json).unwrap();
        assert!(charge.is_paid());
        let paid = charge.paid_at.unwrap();
        assert_eq!(paid.to_string(), "2020-09-01 13:00:00");
    }

    #[test]
    fn draft_serializes_to_wire_shape() {
        let draft = ChargeDraft::new(
            Identity::new("Loja do Ze", "34792144697825"),
            Decimal::from_str("1000.26").unwrap(),
        )
        .with_creditor(TaxId::from("71484654862"));
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["debtor"]["name"], "Loja do Ze");
        assert_eq!(json["debtor"]["cpf_cnpj"], "34792144697825");
        assert_eq!(json["creditor_cpf_cnpj"], "71484654862");
        assert_eq!(json["debito"], 1000.26);
    }

    #[test]
    fn default_draft_is_zero_value() {
        let draft = ChargeDraft::default();
        assert!(draft.debtor.name.is_empty());
        assert!(draft.debtor.tax_id.is_empty());
        assert!(draft.creditor_tax_id.is_empty());
        assert_eq!(draft.amount, Decimal::ZERO);
    }

    #[test]
    fn payment_request_settles_whole_charge() {
        let charge: ChargeRecord = serde_json::from_str(ROW).unwrap();
        let payment = PaymentRequest::for_charge(&charge);
        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["id"], "0b6cf8f6-3c55-4a5e-9d59-5b0a8c1f9a10");
        assert_eq!(json["creditor_cpf_cnpj"], "71484654862");
        assert_eq!(json["debito"], 1000.26);
    }

    #[test]
    fn active_filter_shape() {
        let filter = ChargeFilter::active_for(TaxId::from("34792144697825"));
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["debtor_cpf_cnpj"], "34792144697825");
        assert_eq!(json["is_active"], true);
    }
}
