//! Translation of transport outcomes into domain failures and user-facing
//! messages.
//!
//! Classification follows a fixed precedence: an auth-rejection status
//! always wins, then structured field violations, and anything else is
//! unclassified (logged, usually not surfaced).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CobrancaError;
use crate::state::Family;

/// Canonical user-facing messages (pt-BR).
pub mod messages {
    /// Login or session probe rejected.
    pub const INVALID_CREDENTIALS: &str = "CPF/CNPJ ou Senha Inválido!";
    /// Registration refused the tax id.
    pub const SIGNUP_INVALID_TAX_ID: &str = "CPF/CNPJ está inválido!";
    /// Registration found the tax id already registered.
    pub const SIGNUP_DUPLICATE: &str = "CPF/CNPJ já está cadastrado!";
    /// Registration succeeded with an empty password.
    pub const SIGNUP_INVALID_PASSWORD: &str = "A Senha está inválida!";
    /// No open charge for the searched debtor.
    pub const CHARGE_NOT_FOUND: &str = "Pendência Não Encontrada";
    /// Creditor and debtor are the same party.
    pub const SELF_CHARGE: &str = "Você não pode adicionar débitos para você mesmo.";
    /// Amount is zero or negative.
    pub const NON_POSITIVE_AMOUNT: &str = "O valor do débito tem que ser maior que 0.";
    /// Amount is not a number.
    pub const INVALID_AMOUNT_FORMAT: &str = "Campo valor está inválido. Exemplo: 100.50";
    /// Debtor tax id refused.
    pub const INVALID_TAX_ID: &str = "CPF/CNPJ inválido.";
    /// Any other field violation.
    pub const INVALID_FIELDS: &str = "Campos Inválidos.";
    /// Draft submitted without a debtor name.
    pub const EMPTY_DEBTOR_NAME: &str = "Campo nome está vazio.";
    /// Payment instruction refused or lost.
    pub const PAYMENT_FAILED: &str = "Não foi possível registrar o pagamento.";
}

/// Server message texts recognised out of the box.
mod server_text {
    /// Creditor equals debtor.
    pub(super) const SELF_CHARGE: &str = "You can not add debt for yourself";
    /// Positive-float constraint.
    pub(super) const NON_POSITIVE_AMOUNT: &str = "ensure this value is greater than 0";
    /// Float parse failure.
    pub(super) const INVALID_AMOUNT_FORMAT: &str = "value is not a valid float";
    /// CPF/CNPJ validator failure.
    pub(super) const INVALID_TAX_ID: &str = "Invalid CPF / CNPJ";
}

/// Logical endpoint an outcome came from. Status codes mean different
/// things on different endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /api/v.1/entity-logged`.
    Session,
    /// `POST /api/v.1/authenticate`.
    Login,
    /// `DELETE /api/v.1/authenticate`.
    Logout,
    /// `POST /api/v.1/entity`.
    Signup,
    /// `GET /api/v.1/charge`.
    ListCharges,
    /// `POST /api/v.1/charge`.
    CreateCharge,
    /// `POST /api/v.1/charge/payment`.
    Payment,
}

/// One entry of a validation-rejection body (`detail[n]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Path of the offending field (mixed strings and indices).
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    /// Human-readable violation text, matched against the lookup table.
    pub msg: String,
    /// Machine-readable violation type, when present.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Body of a validation-rejection response.
#[derive(Debug, Deserialize)]
struct ValidationBody {
    /// Violations in server order.
    detail: Vec<FieldViolation>,
}

/// Domain-level classification of a failed exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// Credentials or session refused.
    #[error("authentication rejected")]
    AuthRejected,
    /// Structured field violations.
    #[error("validation rejected ({} violation(s))", .0.len())]
    ValidationRejected(Vec<FieldViolation>),
    /// Nothing matched the request.
    #[error("not found")]
    NotFound,
    /// The resource being registered already exists.
    #[error("already registered")]
    Duplicate,
    /// Network errors and unexpected statuses.
    #[error("unclassified failure: {0}")]
    Unclassified(String),
}

/// Tagged meaning of a server violation text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Creditor and debtor are the same party.
    SelfCharge,
    /// Amount is not strictly positive.
    NonPositiveAmount,
    /// Amount is not numeric.
    InvalidAmountFormat,
    /// Tax id failed validation.
    InvalidTaxId,
    /// Generic invalid input.
    InvalidFields,
    /// Server text mapped to a configured message.
    Custom(String),
}

impl ViolationKind {
    /// Localized message for this violation.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        match *self {
            Self::SelfCharge => messages::SELF_CHARGE,
            Self::NonPositiveAmount => messages::NON_POSITIVE_AMOUNT,
            Self::InvalidAmountFormat => messages::INVALID_AMOUNT_FORMAT,
            Self::InvalidTaxId => messages::INVALID_TAX_ID,
            Self::InvalidFields => messages::INVALID_FIELDS,
            Self::Custom(ref text) => text.as_str(),
        }
    }
}

/// Lookup table from exact server violation text to [`ViolationKind`].
///
/// Deserializes from a JSON object, so new server messages are added as
/// configuration:
///
/// ```
/// use cobranca_rs::translator::{ViolationKind, ViolationTable};
///
/// let extra: ViolationTable =
///     serde_json::from_str(r#"{"Debtor not found": "InvalidFields"}"#).unwrap();
/// let table = ViolationTable::default().merged(extra);
/// assert_eq!(
///     table.lookup("Debtor not found"),
///     &ViolationKind::InvalidFields
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationTable(HashMap<String, ViolationKind>);

impl Default for ViolationTable {
    #[inline]
    fn default() -> Self {
        Self::empty()
            .with_entry(server_text::SELF_CHARGE, ViolationKind::SelfCharge)
            .with_entry(server_text::NON_POSITIVE_AMOUNT, ViolationKind::NonPositiveAmount)
            .with_entry(
                server_text::INVALID_AMOUNT_FORMAT,
                ViolationKind::InvalidAmountFormat,
            )
            .with_entry(server_text::INVALID_TAX_ID, ViolationKind::InvalidTaxId)
    }
}

/// Fallback for texts missing from a [`ViolationTable`].
static FALLBACK: ViolationKind = ViolationKind::InvalidFields;

impl ViolationTable {
    /// A table with no entries; every lookup yields the fallback.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Adds or replaces the mapping for `text`.
    #[inline]
    #[must_use]
    pub fn with_entry<T: Into<String>>(mut self, text: T, kind: ViolationKind) -> Self {
        let _previous = self.0.insert(text.into(), kind);
        self
    }

    /// Returns `self` extended with every entry of `other` (entries of
    /// `other` win).
    #[inline]
    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Looks up a server text, falling back to
    /// [`ViolationKind::InvalidFields`].
    #[inline]
    #[must_use]
    pub fn lookup(&self, text: &str) -> &ViolationKind {
        self.0.get(text).unwrap_or(&FALLBACK)
    }

    /// Number of configured entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no entry is configured.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Maps transport errors to [`Failure`]s and failures to surfaced messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translator {
    /// Violation text lookup for charge creation.
    table: ViolationTable,
}

impl Translator {
    /// Creates a translator over the given violation table.
    #[inline]
    #[must_use]
    pub const fn new(table: ViolationTable) -> Self {
        Self { table }
    }

    /// Returns the violation table in use.
    #[inline]
    #[must_use]
    pub const fn table(&self) -> &ViolationTable {
        &self.table
    }

    /// Classifies a transport error coming from `endpoint`.
    #[inline]
    #[must_use]
    pub fn classify(&self, endpoint: Endpoint, error: &CobrancaError) -> Failure {
        if let CobrancaError::Api {
            status,
            ref message,
        } = *error
        {
            Self::classify_status(endpoint, status, message)
        } else {
            Failure::Unclassified(error.to_string())
        }
    }

    /// Classifies a non-success status and its body.
    fn classify_status(endpoint: Endpoint, status: u16, body: &str) -> Failure {
        if is_auth_rejection(endpoint, status) {
            return Failure::AuthRejected;
        }
        match (endpoint, status) {
            (Endpoint::CreateCharge | Endpoint::Signup, 422) => {
                Failure::ValidationRejected(parse_violations(body))
            }
            (Endpoint::ListCharges, 404 | 422) => Failure::NotFound,
            (Endpoint::Signup, 400) => Failure::Duplicate,
            _ => Failure::Unclassified(format!("status {status}: {body}")),
        }
    }

    /// Returns the message surfaced in `family` for `failure`, if any.
    #[inline]
    #[must_use]
    pub fn message(&self, family: Family, failure: &Failure) -> Option<String> {
        let text = match (family, failure) {
            (Family::Login, &Failure::AuthRejected) => messages::INVALID_CREDENTIALS,
            (Family::Signup, &Failure::ValidationRejected(_)) => messages::SIGNUP_INVALID_TAX_ID,
            (Family::Signup, &Failure::Duplicate) => messages::SIGNUP_DUPLICATE,
            (Family::List, &Failure::NotFound) => messages::CHARGE_NOT_FOUND,
            (Family::Create, &Failure::ValidationRejected(ref violations)) => violations
                .first()
                .map_or(messages::INVALID_FIELDS, |first| {
                    self.table.lookup(&first.msg).message()
                }),
            (Family::Payment, &Failure::Unclassified(_)) => messages::PAYMENT_FAILED,
            _ => return None,
        };
        Some(text.to_owned())
    }
}

/// Statuses meaning "invalid credentials / no session" for `endpoint`.
///
/// 401/403 reject the session everywhere; probe and login also use 400 and
/// 422 for bad or missing credentials.
const fn is_auth_rejection(endpoint: Endpoint, status: u16) -> bool {
    match status {
        401 | 403 => true,
        400 | 422 => matches!(endpoint, Endpoint::Session | Endpoint::Login),
        _ => false,
    }
}

/// Extracts `detail[..]` violations; bodies of any other shape yield none.
fn parse_violations(body: &str) -> Vec<FieldViolation> {
    serde_json::from_str::<ValidationBody>(body)
        .map(|parsed| parsed.detail)
        .unwrap_or_else(|err| {
            tracing::debug!(error = %err, "validation body without field violations");
            Vec::new()
        })
}
