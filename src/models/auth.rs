//! Session request/response models.

use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Identity, TaxId};

/// Serializes a secret as a plain string. Only used for outgoing bodies.
fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Wraps an incoming optional string into a secret.
fn conceal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// Credentials exchange for `POST /api/v.1/authenticate`.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    /// CPF or CNPJ of the entity logging in.
    pub cpf_cnpj: TaxId,
    /// Account password.
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
    /// Asks the server to set the session cookie.
    pub set_cookie: bool,
}

impl LoginRequest {
    /// Creates a cookie-setting login request.
    #[inline]
    #[must_use]
    pub const fn new(cpf_cnpj: TaxId, password: SecretString) -> Self {
        Self {
            cpf_cnpj,
            password,
            set_cookie: true,
        }
    }
}

/// Registration payload for `POST /api/v.1/entity`.
#[derive(Debug, Serialize)]
pub struct SignupRequest {
    /// Display name.
    pub name: String,
    /// CPF or CNPJ.
    pub cpf_cnpj: TaxId,
    /// Account password.
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
}

/// Successful login response.
#[derive(Debug, Deserialize)]
pub struct AuthEcho {
    /// Tax id of the authenticated entity.
    pub cpf_cnpj: TaxId,
    /// Display name, when the server includes it.
    #[serde(default)]
    pub name: Option<String>,
    /// Session key mirrored in the cookie. Never surfaced.
    #[serde(default, deserialize_with = "conceal")]
    pub api_key: Option<SecretString>,
}

impl AuthEcho {
    /// Converts the echo into the session identity.
    #[inline]
    #[must_use]
    pub fn into_identity(self) -> Identity {
        Identity::new(self.name.unwrap_or_default(), self.cpf_cnpj)
    }
}
