//! Party identity model.

use serde::{Deserialize, Serialize};

use super::TaxId;

/// Legal nature of a party, derived by the server from the tax id format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Individual (CPF).
    Pf,
    /// Organization (CNPJ).
    Pj,
}

/// A named party: the logged-in entity, a debtor, or a creditor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// CPF or CNPJ.
    #[serde(rename = "cpf_cnpj")]
    pub tax_id: TaxId,
    /// Individual or organization, when the server reports it.
    #[serde(
        rename = "type_entity",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<EntityKind>,
}

impl Identity {
    /// Creates an identity without a known [`EntityKind`].
    #[inline]
    #[must_use]
    pub fn new<N: Into<String>, T: Into<TaxId>>(name: N, tax_id: T) -> Self {
        Self {
            name: name.into(),
            tax_id: tax_id.into(),
            kind: None,
        }
    }
}
