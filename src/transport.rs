//! Seam between the controller and the wire.
//!
//! [`Transport`] (async) and [`BlockingTransport`] (blocking) are generated
//! from one method list, the same way the HTTP clients are. Both clients in
//! [`crate::client`] implement them; tests plug in scripted doubles.

/// Generates a transport trait (async or blocking) with all exchange methods.
///
/// Uses `@methods` to define the method list once, and `@method` to render
/// each method in async (`impl Future + Send`) or blocking (`fn`) style.
macro_rules! define_transport {
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: async_mode,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_transport!(@methods async_mode);
        }
    };
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: blocking,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_transport!(@methods blocking);
        }
    };

    (@methods $mode:ident) => {
        // Session
        define_transport!(@method $mode, current_session,
            "Resolves the identity behind the current session.\n\n# Errors\n\nReturns an error if no session is active or the exchange fails.",
            -> Result<Identity>);
        define_transport!(@method $mode, login,
            "Opens a session for the given credentials.\n\n# Errors\n\nReturns an error if the credentials are refused or the exchange fails.",
            request: &LoginRequest, -> Result<AuthEcho>);
        define_transport!(@method $mode, logout,
            "Closes the current session. The response body is ignored.\n\n# Errors\n\nReturns an error if the exchange fails.",
            -> Result<()>);
        define_transport!(@method $mode, register,
            "Registers a new entity.\n\n# Errors\n\nReturns an error if registration is refused or the exchange fails.",
            request: &SignupRequest, -> Result<Identity>);

        // Ledger
        define_transport!(@method $mode, list_charges,
            "Lists the charges matching `filter`.\n\n# Errors\n\nReturns an error if nothing matched or the exchange fails.",
            filter: &ChargeFilter, -> Result<Vec<ChargeRecord>>);
        define_transport!(@method $mode, submit_charge,
            "Creates a charge from `draft`.\n\n# Errors\n\nReturns an error if the draft is rejected or the exchange fails.",
            draft: &ChargeDraft, -> Result<ChargeRecord>);
        define_transport!(@method $mode, submit_payment,
            "Records a payment. The response body is ignored.\n\n# Errors\n\nReturns an error if the payment is refused or the exchange fails.",
            payment: &PaymentRequest, -> Result<()>);
    };

    (@method blocking, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*) -> $ret;
    };

    (@method async_mode, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*)
            -> impl core::future::Future<Output = $ret> + Send;
    };
}

#[cfg(feature = "async")]
mod async_transport {
    //! Async transport trait and its HTTP implementation.

    use crate::client::CobrancaClient;
    use crate::error::Result;
    use crate::models::{
        AuthEcho, ChargeDraft, ChargeFilter, ChargeRecord, Identity, LoginRequest, PaymentRequest,
        SignupRequest,
    };

    define_transport! {
        trait_name: Transport,
        trait_doc: "Async exchange surface used by [`crate::controller::SessionLedgerController`].",
        mode: async_mode,
    }

    impl Transport for CobrancaClient {
        #[inline]
        async fn current_session(&self) -> Result<Identity> {
            self.entity_logged().await
        }

        #[inline]
        async fn login(&self, request: &LoginRequest) -> Result<AuthEcho> {
            self.authenticate(request).await
        }

        #[inline]
        async fn logout(&self) -> Result<()> {
            self.delete_session().await
        }

        #[inline]
        async fn register(&self, request: &SignupRequest) -> Result<Identity> {
            self.create_entity(request).await
        }

        #[inline]
        async fn list_charges(&self, filter: &ChargeFilter) -> Result<Vec<ChargeRecord>> {
            self.filter_charges(filter).await
        }

        #[inline]
        async fn submit_charge(&self, draft: &ChargeDraft) -> Result<ChargeRecord> {
            self.create_charge(draft).await
        }

        #[inline]
        async fn submit_payment(&self, payment: &PaymentRequest) -> Result<()> {
            self.charge_payment(payment).await
        }
    }
}

#[cfg(feature = "blocking")]
mod blocking_transport {
    //! Blocking transport trait and its HTTP implementation.

    use crate::client::CobrancaBlockingClient;
    use crate::error::Result;
    use crate::models::{
        AuthEcho, ChargeDraft, ChargeFilter, ChargeRecord, Identity, LoginRequest, PaymentRequest,
        SignupRequest,
    };

    define_transport! {
        trait_name: BlockingTransport,
        trait_doc: "Blocking exchange surface used by [`crate::controller::SessionLedgerBlockingController`].",
        mode: blocking,
    }

    impl BlockingTransport for CobrancaBlockingClient {
        #[inline]
        fn current_session(&self) -> Result<Identity> {
            self.entity_logged()
        }

        #[inline]
        fn login(&self, request: &LoginRequest) -> Result<AuthEcho> {
            self.authenticate(request)
        }

        #[inline]
        fn logout(&self) -> Result<()> {
            self.delete_session()
        }

        #[inline]
        fn register(&self, request: &SignupRequest) -> Result<Identity> {
            self.create_entity(request)
        }

        #[inline]
        fn list_charges(&self, filter: &ChargeFilter) -> Result<Vec<ChargeRecord>> {
            self.filter_charges(filter)
        }

        #[inline]
        fn submit_charge(&self, draft: &ChargeDraft) -> Result<ChargeRecord> {
            self.create_charge(draft)
        }

        #[inline]
        fn submit_payment(&self, payment: &PaymentRequest) -> Result<()> {
            self.charge_payment(payment)
        }
    }
}

#[cfg(feature = "async")]
pub use async_transport::Transport;
#[cfg(feature = "blocking")]
pub use blocking_transport::BlockingTransport;
