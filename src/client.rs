//! HTTP client for the cobranca API.
//!
//! Provides both async and blocking client variants behind feature flags.
//! The session lives in the `api_key` cookie, so both clients keep a cookie
//! jar for their whole lifetime.

/// Default base URL of the cobranca backend.
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Logged-in entity endpoint path.
const SESSION_PATH: &str = "/api/v.1/entity-logged";

/// Login (`POST`) and logout (`DELETE`) endpoint path.
const AUTHENTICATE_PATH: &str = "/api/v.1/authenticate";

/// Entity registration endpoint path.
const ENTITY_PATH: &str = "/api/v.1/entity";

/// Charge listing and creation endpoint path.
const CHARGE_PATH: &str = "/api/v.1/charge";

/// Payment endpoint path.
const PAYMENT_PATH: &str = "/api/v.1/charge/payment";

/// Generates a cobranca client (async or blocking) with builder, methods, and tests.
macro_rules! define_client {
    (
        client_name: $client:ident,
        builder_name: $builder:ident,
        http_type: $http_type:ty,
        request_type: $req_type:ty,
        response_type: $resp_type:ty,
        client_doc: $client_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder {
            /// Base URL override (for testing or remote deployments).
            base_url: Option<String>,
            /// Per-request timeout.
            timeout: Option<Duration>,
        }

        impl $builder {
            /// Overrides the base URL (useful for testing with a mock server).
            #[inline]
            #[must_use]
            pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
                self.base_url = Some(url.into());
                self
            }

            /// Sets a timeout applied to every request.
            #[inline]
            #[must_use]
            pub const fn timeout(mut self, timeout: Duration) -> Self {
                self.timeout = Some(timeout);
                self
            }

            /// Builds the client.
            ///
            /// # Errors
            ///
            /// Returns [`CobrancaError::Http`] if the HTTP client fails to build.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub fn build(self) -> Result<$client> {
                let base_url = self
                    .base_url
                    .map_or_else(
                        || DEFAULT_BASE_URL.to_owned(),
                        |url| url.trim_end_matches('/').to_owned(),
                    );
                tracing::debug!(base_url = %base_url, "building client");
                let mut http_builder = <$http_type>::builder().cookie_store(true);
                if let Some(timeout) = self.timeout {
                    http_builder = http_builder.timeout(timeout);
                }
                let http = http_builder.build()?;

                Ok($client { http, base_url })
            }
        }

        #[doc = $client_doc]
        #[derive(Debug)]
        pub struct $client {
            /// Underlying HTTP client, owning the session cookie jar.
            http: $http_type,
            /// API base URL without a trailing slash.
            base_url: String,
        }

        impl $client {
            /// Creates a new builder for configuring the client.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder {
                $builder {
                    base_url: None,
                    timeout: None,
                }
            }

            /// Returns the base URL requests are sent to.
            #[inline]
            #[must_use]
            pub fn base_url(&self) -> &str {
                &self.base_url
            }

            /// Fetches the entity bound to the session cookie via
            /// `GET /api/v.1/entity-logged`.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the server returns a
            /// non-success status, or the response cannot be deserialized.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn entity_logged(&self) -> Result<Identity> {
                let response =
                    Self::send(self.request(Method::GET, SESSION_PATH))
                    $( .$await_ext )? ?;
                Self::parse(response) $( .$await_ext )?
            }

            /// Logs in via `POST /api/v.1/authenticate`. On success the server
            /// sets the session cookie, which the client keeps.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the server returns a
            /// non-success status, or the response cannot be deserialized.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn authenticate(&self, request: &LoginRequest) -> Result<AuthEcho> {
                let response =
                    Self::send(self.request(Method::POST, AUTHENTICATE_PATH).json(request))
                    $( .$await_ext )? ?;
                Self::parse(response) $( .$await_ext )?
            }

            /// Logs out via `DELETE /api/v.1/authenticate`. The response body
            /// is ignored.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails or the server returns
            /// a non-success status.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn delete_session(&self) -> Result<()> {
                let _response =
                    Self::send(self.request(Method::DELETE, AUTHENTICATE_PATH))
                    $( .$await_ext )? ?;
                Ok(())
            }

            /// Registers an entity via `POST /api/v.1/entity`.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the server returns a
            /// non-success status, or the response cannot be deserialized.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn create_entity(&self, request: &SignupRequest) -> Result<Identity> {
                let response =
                    Self::send(self.request(Method::POST, ENTITY_PATH).json(request))
                    $( .$await_ext )? ?;
                Self::parse(response) $( .$await_ext )?
            }

            /// Lists charges via `GET /api/v.1/charge` with `filter` as the
            /// query string.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the server returns a
            /// non-success status, or the response cannot be deserialized.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn filter_charges(
                &self,
                filter: &ChargeFilter,
            ) -> Result<Vec<ChargeRecord>> {
                let response =
                    Self::send(self.request(Method::GET, CHARGE_PATH).query(filter))
                    $( .$await_ext )? ?;
                Self::parse(response) $( .$await_ext )?
            }

            /// Creates a charge via `POST /api/v.1/charge`.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the server returns a
            /// non-success status, or the response cannot be deserialized.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn create_charge(&self, draft: &ChargeDraft) -> Result<ChargeRecord> {
                let response =
                    Self::send(self.request(Method::POST, CHARGE_PATH).json(draft))
                    $( .$await_ext )? ?;
                Self::parse(response) $( .$await_ext )?
            }

            /// Records a payment via `POST /api/v.1/charge/payment`. The
            /// response body is ignored.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails or the server returns
            /// a non-success status.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn charge_payment(&self, payment: &PaymentRequest) -> Result<()> {
                let _response =
                    Self::send(self.request(Method::POST, PAYMENT_PATH).json(payment))
                    $( .$await_ext )? ?;
                Ok(())
            }

            /// Starts a request against `path`.
            fn request(&self, method: Method, path: &str) -> $req_type {
                let url = format!("{}{path}", self.base_url);
                tracing::trace!(method = %method, url = %url, "sending request");
                self.http.request(method, url)
            }

            /// Sends `request`, turning non-success statuses into
            /// [`CobrancaError::Api`] carrying the raw body.
            $($async_kw)? fn send(request: $req_type) -> Result<$resp_type> {
                let response: $resp_type = request.send() $( .$await_ext )? ?;

                let status = response.status();
                tracing::debug!(status = %status, "received response");
                if status.is_success() {
                    Ok(response)
                } else {
                    let message = response
                        .text()
                        $( .$await_ext )?
                        .unwrap_or_else(|_| "unknown error".to_owned());
                    tracing::debug!(status = status.as_u16(), message = %message, "API error");
                    Err(CobrancaError::Api {
                        status: status.as_u16(),
                        message,
                    })
                }
            }

            /// Deserializes a successful response body.
            $($async_kw)? fn parse<Resp: serde::de::DeserializeOwned>(
                response: $resp_type,
            ) -> Result<Resp> {
                let body = response.text() $( .$await_ext )? ?;
                tracing::trace!(body_len = body.len(), "parsing response body");
                serde_json::from_str(&body).map_err(CobrancaError::from)
            }
        }

    };
}

#[cfg(feature = "async")]
mod async_client {
    //! Async HTTP client for the cobranca API.

    use core::time::Duration;

    use reqwest::Method;

    use super::{
        AUTHENTICATE_PATH, CHARGE_PATH, DEFAULT_BASE_URL, ENTITY_PATH, PAYMENT_PATH, SESSION_PATH,
    };
    use crate::error::{CobrancaError, Result};
    use crate::models::{
        AuthEcho, ChargeDraft, ChargeFilter, ChargeRecord, Identity, LoginRequest, PaymentRequest,
        SignupRequest,
    };

    define_client! {
        client_name: CobrancaClient,
        builder_name: CobrancaClientBuilder,
        http_type: reqwest::Client,
        request_type: reqwest::RequestBuilder,
        response_type: reqwest::Response,
        client_doc: "Async client for the cobranca API.\n\nUse [`CobrancaClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`CobrancaClient`].",
        async_kw: async,
        await_kw: await,
    }
}

#[cfg(feature = "blocking")]
mod blocking_client {
    //! Blocking (synchronous) HTTP client for the cobranca API.

    use core::time::Duration;

    use reqwest::Method;

    use super::{
        AUTHENTICATE_PATH, CHARGE_PATH, DEFAULT_BASE_URL, ENTITY_PATH, PAYMENT_PATH, SESSION_PATH,
    };
    use crate::error::{CobrancaError, Result};
    use crate::models::{
        AuthEcho, ChargeDraft, ChargeFilter, ChargeRecord, Identity, LoginRequest, PaymentRequest,
        SignupRequest,
    };

    define_client! {
        client_name: CobrancaBlockingClient,
        builder_name: CobrancaBlockingClientBuilder,
        http_type: reqwest::blocking::Client,
        request_type: reqwest::blocking::RequestBuilder,
        response_type: reqwest::blocking::Response,
        client_doc: "Blocking (synchronous) client for the cobranca API.\n\nUse [`CobrancaBlockingClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`CobrancaBlockingClient`].",
    }
}

#[cfg(feature = "async")]
pub use async_client::{CobrancaClient, CobrancaClientBuilder};
#[cfg(feature = "blocking")]
pub use blocking_client::{CobrancaBlockingClient, CobrancaBlockingClientBuilder};
