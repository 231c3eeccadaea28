//! Session and charge-ledger command surface.
//!
//! A controller owns one transport and one [`StateStore`]. Every command
//! marks its family busy, performs at most a few exchanges, and commits the
//! outcome through [`crate::state::reduce`]. Failures are classified by the
//! [`Translator`] and either surfaced as a message in the view state or only
//! logged.
//!
//! Both an async ([`SessionLedgerController`]) and a blocking
//! ([`SessionLedgerBlockingController`]) variant are generated from the same
//! macro, mirroring [`crate::client`].

use crate::error::CobrancaError;
use crate::models::{ChargeDraft, TaxId};
use crate::state::{Event, Family, StateStore};
use crate::translator::{Endpoint, Failure, Translator, ViolationTable, messages};

/// Result of a controller command.
pub type CommandResult<T> = Result<T, CommandError>;

/// Why a controller command did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The server refused the exchange or it failed in transit.
    #[error("{failure}")]
    Server {
        /// Classification of the failure.
        failure: Failure,
        /// Message surfaced in the view state, if any.
        message: Option<String>,
    },
    /// The command was refused before any exchange.
    #[error("{message}")]
    Local {
        /// Message surfaced in the view state.
        message: String,
    },
    /// The command needs an authenticated session.
    #[error("not authenticated")]
    NotAuthenticated,
}

impl CommandError {
    /// Returns the user-facing message, if one was surfaced.
    #[inline]
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match *self {
            Self::Server { ref message, .. } => message.as_deref(),
            Self::Local { ref message } => Some(message),
            Self::NotAuthenticated => None,
        }
    }

    /// Returns the server failure classification, if any.
    #[inline]
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match *self {
            Self::Server { ref failure, .. } => Some(failure),
            Self::Local { .. } | Self::NotAuthenticated => None,
        }
    }
}

/// Transport-independent half of a controller.
#[derive(Debug)]
struct Core {
    /// Current view state.
    store: StateStore,
    /// Failure classification and message lookup.
    translator: Translator,
}

impl Core {
    /// Creates a core with a fresh store.
    fn new(table: ViolationTable) -> Self {
        Self {
            store: StateStore::default(),
            translator: Translator::new(table),
        }
    }

    /// Classifies `error`, commits the outcome for `family` and returns the
    /// command error.
    fn reject(&self, family: Family, endpoint: Endpoint, error: &CobrancaError) -> CommandError {
        let failure = self.translator.classify(endpoint, error);
        self.surface(family, failure)
    }

    /// Commits an already classified failure for `family`.
    fn surface(&self, family: Family, failure: Failure) -> CommandError {
        let message = self.translator.message(family, &failure);
        match failure {
            Failure::Unclassified(ref detail) => {
                tracing::warn!(?family, detail = %detail, "request failed");
            }
            Failure::AuthRejected if family != Family::Login => {
                tracing::info!(?family, "session rejected by server");
            }
            Failure::AuthRejected
            | Failure::ValidationRejected(_)
            | Failure::NotFound
            | Failure::Duplicate => {
                tracing::debug!(?family, failure = %failure, "request rejected");
            }
        }
        let event = if failure == Failure::AuthRejected {
            Event::SessionRejected {
                family,
                message: message.clone(),
            }
        } else {
            Event::Failed {
                family,
                message: message.clone(),
            }
        };
        self.store.dispatch(event);
        CommandError::Server { failure, message }
    }

    /// Refuses a command locally, surfacing `message` for `family`.
    fn refuse(&self, family: Family, message: &str) -> CommandError {
        tracing::debug!(?family, message = %message, "command refused");
        self.store.dispatch(Event::Failed {
            family,
            message: Some(message.to_owned()),
        });
        CommandError::Local {
            message: message.to_owned(),
        }
    }

    /// Validates `draft` and binds it to the session creditor.
    fn prepare_charge(&self, draft: ChargeDraft) -> CommandResult<ChargeDraft> {
        let Some(creditor) = self
            .store
            .session()
            .identity()
            .map(|identity| identity.tax_id.clone())
        else {
            tracing::debug!("charge creation without a session");
            return Err(CommandError::NotAuthenticated);
        };
        if draft.debtor.name.trim().is_empty() {
            return Err(self.refuse(Family::Create, messages::EMPTY_DEBTOR_NAME));
        }
        if draft.debtor.tax_id.is_empty() {
            return Err(self.refuse(Family::Create, messages::INVALID_TAX_ID));
        }
        Ok(draft.with_creditor(creditor))
    }
}

/// Generates a controller (async or blocking) with builder and commands.
macro_rules! define_controller {
    (
        controller_name: $controller:ident,
        builder_name: $builder:ident,
        transport_trait: $transport_trait:ident,
        controller_doc: $controller_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder<T: $transport_trait> {
            /// Exchange implementation.
            transport: Option<T>,
            /// Violation lookup override.
            table: Option<ViolationTable>,
        }

        impl<T: $transport_trait> $builder<T> {
            /// Sets the transport.
            #[inline]
            #[must_use]
            pub fn transport(mut self, transport: T) -> Self {
                self.transport = Some(transport);
                self
            }

            /// Layers `table` over the built-in violation table; its entries
            /// win on conflicting server texts.
            #[inline]
            #[must_use]
            pub fn violation_table(mut self, table: ViolationTable) -> Self {
                self.table = Some(table);
                self
            }

            /// Builds the controller.
            ///
            /// # Errors
            ///
            /// Returns [`CobrancaError::Config`] if no transport was provided.
            #[inline]
            pub fn build(self) -> Result<$controller<T>> {
                let transport = self
                    .transport
                    .ok_or_else(|| CobrancaError::Config("transport is required".into()))?;
                let table = self
                    .table
                    .map_or_else(ViolationTable::default, |custom| {
                        ViolationTable::default().merged(custom)
                    });
                Ok($controller {
                    transport,
                    core: Core::new(table),
                })
            }
        }

        #[doc = $controller_doc]
        #[derive(Debug)]
        pub struct $controller<T: $transport_trait> {
            /// Exchange implementation.
            transport: T,
            /// State store and translator.
            core: Core,
        }

        impl<T: $transport_trait> $controller<T> {
            /// Creates a new builder for configuring the controller.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder<T> {
                $builder {
                    transport: None,
                    table: None,
                }
            }

            /// Creates a controller over `transport` with the built-in
            /// violation table.
            #[inline]
            #[must_use]
            pub fn new(transport: T) -> Self {
                Self {
                    transport,
                    core: Core::new(ViolationTable::default()),
                }
            }

            /// Asks the server whether a session already exists and adopts
            /// it. A rejection means an anonymous visitor and surfaces no
            /// message.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn probe_session(&self) -> SessionState {
                self.core.store.dispatch(Event::ProbeStarted);
                match self.transport.current_session() $( .$await_ext )? {
                    Ok(identity) => {
                        tracing::debug!(tax_id = %identity.tax_id, "session found");
                        self.core.store.dispatch(Event::ProbeResolved(identity));
                    }
                    Err(err) => {
                        let failure = self.core.translator.classify(Endpoint::Session, &err);
                        if failure == Failure::AuthRejected {
                            tracing::debug!("no active session");
                            self.core.store.dispatch(Event::ProbeRejected);
                        } else {
                            tracing::warn!(failure = %failure, "session probe failed");
                            self.core.store.dispatch(Event::ProbeFailed);
                        }
                    }
                }
                self.core.store.session()
            }

            /// Logs in and adopts the returned identity.
            ///
            /// The login response carries only the tax id, so a second
            /// exchange with the session endpoint resolves the display name.
            /// If that lookup fails the tax-id-only identity is kept.
            ///
            /// # Errors
            ///
            /// Returns [`CommandError::Server`] if the credentials are
            /// refused or the exchange fails.
            #[tracing::instrument(skip_all, fields(tax_id = %tax_id))]
            pub $($async_kw)? fn login(
                &self,
                tax_id: TaxId,
                password: SecretString,
            ) -> CommandResult<Identity> {
                self.core.store.dispatch(Event::Started(Family::Login));
                let request = LoginRequest::new(tax_id, password);
                let echo = match self.transport.login(&request) $( .$await_ext )? {
                    Ok(echo) => echo,
                    Err(err) => return Err(self.core.reject(Family::Login, Endpoint::Login, &err)),
                };
                let mut identity = echo.into_identity();
                if identity.name.is_empty() {
                    match self.transport.current_session() $( .$await_ext )? {
                        Ok(resolved) if resolved.tax_id == identity.tax_id => identity = resolved,
                        Ok(resolved) => {
                            tracing::warn!(
                                expected = %identity.tax_id,
                                got = %resolved.tax_id,
                                "session resolved to another entity"
                            );
                        }
                        Err(err) => tracing::debug!(error = %err, "could not resolve session name"),
                    }
                }
                tracing::info!("logged in");
                self.core.store.dispatch(Event::LoggedIn(identity.clone()));
                Ok(identity)
            }

            /// Registers a new entity, then logs in with the same
            /// credentials.
            ///
            /// # Errors
            ///
            /// Returns [`CommandError::Server`] if registration or the
            /// subsequent login fails, and [`CommandError::Local`] if the
            /// password is empty.
            #[tracing::instrument(skip_all, fields(tax_id = %tax_id))]
            pub $($async_kw)? fn signup<N: Into<String>>(
                &self,
                name: N,
                tax_id: TaxId,
                password: SecretString,
            ) -> CommandResult<Identity> {
                self.core.store.dispatch(Event::Started(Family::Signup));
                let request = SignupRequest {
                    name: name.into(),
                    cpf_cnpj: tax_id,
                    password,
                };
                if let Err(err) = self.transport.register(&request) $( .$await_ext )? {
                    return Err(self.core.reject(Family::Signup, Endpoint::Signup, &err));
                }
                tracing::info!("registered");
                self.core.store.dispatch(Event::Registered);
                if request.password.expose_secret().is_empty() {
                    return Err(self.core.refuse(Family::Signup, messages::SIGNUP_INVALID_PASSWORD));
                }
                let SignupRequest {
                    cpf_cnpj, password, ..
                } = request;
                self.login(cpf_cnpj, password) $( .$await_ext )?
            }

            /// Ends the session. Local state is cleared even if the server
            /// call fails.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn logout(&self) {
                self.core.store.dispatch(Event::Started(Family::Login));
                if let Err(err) = self.transport.logout() $( .$await_ext )? {
                    tracing::warn!(error = %err, "logout request failed");
                }
                tracing::info!("logged out");
                self.core.store.dispatch(Event::LoggedOut);
            }

            /// Replaces the cached list with the open charges of `search`.
            ///
            /// Nothing found is not an error: the list is emptied, the
            /// not-found message is surfaced and `Ok` with no rows is
            /// returned.
            ///
            /// # Errors
            ///
            /// Returns [`CommandError::Server`] for any other failure; the
            /// previous rows are kept.
            #[tracing::instrument(skip_all, fields(search = %search))]
            pub $($async_kw)? fn list_charges(&self, search: TaxId) -> CommandResult<Vec<ChargeRecord>> {
                self.core.store.dispatch(Event::ListRequested(search.clone()));
                let filter = ChargeFilter::active_for(search);
                match self.transport.list_charges(&filter) $( .$await_ext )? {
                    Ok(charges) => {
                        tracing::debug!(count = charges.len(), "charges listed");
                        self.core.store.dispatch(Event::ChargesListed(charges.clone()));
                        Ok(charges)
                    }
                    Err(err) => {
                        let failure = self.core.translator.classify(Endpoint::ListCharges, &err);
                        if failure == Failure::NotFound {
                            tracing::debug!("no charges found");
                            self.core.store.dispatch(Event::ChargesNotFound);
                            Ok(Vec::new())
                        } else {
                            Err(self.core.surface(Family::List, failure))
                        }
                    }
                }
            }

            /// Creates a charge owed to the session identity, then refreshes
            /// the list for the search key current when the command was
            /// issued.
            ///
            /// The draft's creditor is always replaced with the session tax id.
            ///
            /// # Errors
            ///
            /// Returns [`CommandError::NotAuthenticated`] without a session,
            /// [`CommandError::Local`] for an empty debtor, and
            /// [`CommandError::Server`] if the server refuses the charge.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn create_charge(&self, draft: ChargeDraft) -> CommandResult<ChargeRecord> {
                let prepared = self.core.prepare_charge(draft)?;
                let refresh = self.core.store.search();
                self.core.store.dispatch(Event::Started(Family::Create));
                match self.transport.submit_charge(&prepared) $( .$await_ext )? {
                    Ok(created) => {
                        tracing::info!(id = %created.id, "charge created");
                        self.core.store.dispatch(Event::ChargeCreated);
                        self.refresh(refresh) $( .$await_ext )?;
                        Ok(created)
                    }
                    Err(err) => Err(self.core.reject(Family::Create, Endpoint::CreateCharge, &err)),
                }
            }

            /// Records a payment, then refreshes the list for the search key
            /// current when the command was issued, whatever the outcome.
            ///
            /// # Errors
            ///
            /// Returns [`CommandError::Server`] if the payment is refused.
            #[tracing::instrument(skip_all, fields(id = %payment.id))]
            pub $($async_kw)? fn record_payment(&self, payment: &PaymentRequest) -> CommandResult<()> {
                let refresh = self.core.store.search();
                self.core.store.dispatch(Event::Started(Family::Payment));
                let outcome = match self.transport.submit_payment(payment) $( .$await_ext )? {
                    Ok(()) => {
                        tracing::info!("payment recorded");
                        self.core.store.dispatch(Event::PaymentRecorded);
                        Ok(())
                    }
                    Err(err) => Err(self.core.reject(Family::Payment, Endpoint::Payment, &err)),
                };
                self.refresh(refresh) $( .$await_ext )?;
                outcome
            }

            /// Replaces the staged draft.
            #[inline]
            pub fn set_draft(&self, draft: ChargeDraft) {
                self.core.store.dispatch(Event::DraftChanged(draft));
            }

            /// Resets the staged draft to its zero value.
            #[inline]
            pub fn reset_draft(&self) {
                self.core.store.dispatch(Event::DraftReset);
            }

            /// Submits the staged draft through [`Self::create_charge`].
            ///
            /// # Errors
            ///
            /// Same as [`Self::create_charge`].
            #[inline]
            pub $($async_kw)? fn submit_draft(&self) -> CommandResult<ChargeRecord> {
                self.create_charge(self.core.store.draft()) $( .$await_ext )?
            }

            /// Returns the current view state.
            #[inline]
            #[must_use]
            pub fn state(&self) -> ViewState {
                self.core.store.snapshot()
            }

            /// Subscribes to committed view states.
            #[inline]
            #[must_use]
            pub fn subscribe(&self) -> watch::Receiver<ViewState> {
                self.core.store.subscribe()
            }

            /// Returns the translator in use.
            #[inline]
            #[must_use]
            pub const fn translator(&self) -> &Translator {
                &self.core.translator
            }

            /// Returns a reference to the transport.
            #[inline]
            #[must_use]
            pub const fn transport(&self) -> &T {
                &self.transport
            }

            /// Re-lists `search` after a mutation. Failures are already
            /// committed by [`Self::list_charges`].
            $($async_kw)? fn refresh(&self, search: TaxId) {
                if let Err(err) = self.list_charges(search) $( .$await_ext )? {
                    tracing::debug!(error = %err, "refresh failed");
                }
            }
        }
    };
}

// ── Async variant ───────────────────────────────────────────────────────

#[cfg(feature = "async")]
mod async_controller {
    //! Async controller.

    use secrecy::{ExposeSecret as _, SecretString};
    use tokio::sync::watch;

    use super::{CommandResult, Core};
    use crate::error::{CobrancaError, Result};
    use crate::models::{
        ChargeDraft, ChargeFilter, ChargeRecord, Identity, LoginRequest, PaymentRequest,
        SignupRequest, TaxId,
    };
    use crate::state::{Event, Family, SessionState, ViewState};
    use crate::transport::Transport;
    use crate::translator::{Endpoint, Failure, Translator, ViolationTable, messages};

    define_controller! {
        controller_name: SessionLedgerController,
        builder_name: SessionLedgerControllerBuilder,
        transport_trait: Transport,
        controller_doc: "Async session and charge-ledger controller.\n\nUse [`SessionLedgerController::new()`] or [`SessionLedgerController::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`SessionLedgerController`].",
        async_kw: async,
        await_kw: await,
    }
}

// ── Blocking variant ────────────────────────────────────────────────────

#[cfg(feature = "blocking")]
mod blocking_controller {
    //! Blocking controller.

    use secrecy::{ExposeSecret as _, SecretString};
    use tokio::sync::watch;

    use super::{CommandResult, Core};
    use crate::error::{CobrancaError, Result};
    use crate::models::{
        ChargeDraft, ChargeFilter, ChargeRecord, Identity, LoginRequest, PaymentRequest,
        SignupRequest, TaxId,
    };
    use crate::state::{Event, Family, SessionState, ViewState};
    use crate::transport::BlockingTransport;
    use crate::translator::{Endpoint, Failure, Translator, ViolationTable, messages};

    define_controller! {
        controller_name: SessionLedgerBlockingController,
        builder_name: SessionLedgerBlockingControllerBuilder,
        transport_trait: BlockingTransport,
        controller_doc: "Blocking session and charge-ledger controller.\n\nUse [`SessionLedgerBlockingController::new()`] or [`SessionLedgerBlockingController::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`SessionLedgerBlockingController`].",
    }
}

#[cfg(feature = "async")]
pub use async_controller::{SessionLedgerController, SessionLedgerControllerBuilder};
#[cfg(feature = "blocking")]
pub use blocking_controller::{
    SessionLedgerBlockingController, SessionLedgerBlockingControllerBuilder,
};

#[cfg(all(test, feature = "blocking"))]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use secrecy::{ExposeSecret as _, SecretString};

    use crate::error::Result;
    use crate::models::{
        AuthEcho, ChargeFilter, ChargeId, ChargeRecord, Decimal, Identity, LoginRequest,
        NaiveDateTime, PaymentRequest, SignupRequest,
    };
    use crate::state::{SessionState, ViewState};
    use crate::transport::BlockingTransport;

    /// Tax id of the logged-in creditor in every scenario.
    const CREDITOR: &str = "71484654862";

    /// Tax id of the debtor in every scenario.
    const DEBTOR: &str = "34792144697825";

    /// Canned outcomes and recorded calls of a [`ScriptedTransport`].
    #[derive(Debug, Default)]
    struct Script {
        /// Outcomes of `current_session`.
        sessions: VecDeque<Result<Identity>>,
        /// Outcomes of `login`.
        logins: VecDeque<Result<AuthEcho>>,
        /// Outcomes of `logout`.
        logouts: VecDeque<Result<()>>,
        /// Outcomes of `register`.
        registrations: VecDeque<Result<Identity>>,
        /// Outcomes of `list_charges`.
        listings: VecDeque<Result<Vec<ChargeRecord>>>,
        /// Outcomes of `submit_charge`.
        creations: VecDeque<Result<ChargeRecord>>,
        /// Outcomes of `submit_payment`.
        payments: VecDeque<Result<()>>,
        /// `(tax id, password)` of every login attempt.
        login_calls: Vec<(TaxId, String)>,
        /// Every listing filter sent.
        filters: Vec<ChargeFilter>,
        /// Every draft sent.
        drafts: Vec<ChargeDraft>,
        /// Every payment sent.
        payment_calls: Vec<PaymentRequest>,
        /// Number of logout calls.
        logout_calls: usize,
    }

    /// Blocking transport answering from a script.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        /// Script behind a mutex for interior mutability.
        inner: Mutex<Script>,
    }

    /// Pops the next scripted outcome; unscripted calls fail in transit.
    fn next<T>(queue: &mut VecDeque<Result<T>>) -> Result<T> {
        queue
            .pop_front()
            .unwrap_or_else(|| Err(CobrancaError::Config("unscripted call".into())))
    }

    impl BlockingTransport for ScriptedTransport {
        fn current_session(&self) -> Result<Identity> {
            next(&mut self.inner.lock().unwrap().sessions)
        }

        fn login(&self, request: &LoginRequest) -> Result<AuthEcho> {
            let mut script = self.inner.lock().unwrap();
            script.login_calls.push((
                request.cpf_cnpj.clone(),
                request.password.expose_secret().to_owned(),
            ));
            next(&mut script.logins)
        }

        fn logout(&self) -> Result<()> {
            let mut script = self.inner.lock().unwrap();
            script.logout_calls += 1;
            next(&mut script.logouts)
        }

        fn register(&self, _request: &SignupRequest) -> Result<Identity> {
            next(&mut self.inner.lock().unwrap().registrations)
        }

        fn list_charges(&self, filter: &ChargeFilter) -> Result<Vec<ChargeRecord>> {
            let mut script = self.inner.lock().unwrap();
            script.filters.push(filter.clone());
            next(&mut script.listings)
        }

        fn submit_charge(&self, draft: &ChargeDraft) -> Result<ChargeRecord> {
            let mut script = self.inner.lock().unwrap();
            script.drafts.push(draft.clone());
            next(&mut script.creations)
        }

        fn submit_payment(&self, payment: &PaymentRequest) -> Result<()> {
            let mut script = self.inner.lock().unwrap();
            script.payment_calls.push(payment.clone());
            next(&mut script.payments)
        }
    }

    /// Controller type under test.
    type Controller = SessionLedgerBlockingController<ScriptedTransport>;

    /// Builds a controller, letting `setup` fill the script first.
    fn controller(setup: impl FnOnce(&mut Script)) -> Controller {
        let transport = ScriptedTransport::default();
        setup(&mut *transport.inner.lock().unwrap());
        SessionLedgerBlockingController::new(transport)
    }

    /// Reads the recorded calls.
    fn recorded<R>(controller: &Controller, read: impl FnOnce(&Script) -> R) -> R {
        read(&*controller.transport().inner.lock().unwrap())
    }

    /// A non-success response.
    fn status(code: u16, body: &str) -> CobrancaError {
        CobrancaError::Api {
            status: code,
            message: body.to_owned(),
        }
    }

    /// A 422 body with a single violation.
    fn violation(msg: &str) -> CobrancaError {
        status(
            422,
            &serde_json::json!({
                "detail": [{"loc": ["body", "charge"], "msg": msg, "type": "value_error"}]
            })
            .to_string(),
        )
    }

    /// Identity of the creditor as the probe returns it.
    fn creditor() -> Identity {
        Identity::new("Maria", CREDITOR)
    }

    /// Login echo for the creditor.
    fn echo() -> AuthEcho {
        AuthEcho {
            cpf_cnpj: TaxId::from(CREDITOR),
            name: None,
            api_key: Some(SecretString::from("k3y")),
        }
    }

    /// An open charge against the debtor.
    fn charge() -> ChargeRecord {
        ChargeRecord {
            id: ChargeId::from(uuid::Uuid::new_v4().to_string()),
            creditor_tax_id: TaxId::from(CREDITOR),
            debtor_tax_id: TaxId::from(DEBTOR),
            amount: Decimal::new(100_026, 2),
            created_at: NaiveDateTime::default(),
            paid_at: None,
            is_active: true,
        }
    }

    /// The scenario draft, with a creditor that must be overwritten.
    fn draft() -> ChargeDraft {
        ChargeDraft::new(Identity::new("Loja do Ze", DEBTOR), Decimal::new(100_026, 2))
            .with_creditor(TaxId::from("00000000000"))
    }

    /// Scripts a successful login.
    fn script_login(script: &mut Script) {
        script.logins.push_back(Ok(echo()));
        script.sessions.push_back(Ok(creditor()));
    }

    /// Logs in with the scenario credentials.
    fn log_in(controller: &Controller) {
        let _identity = controller
            .login(TaxId::from(CREDITOR), SecretString::from("123change"))
            .unwrap();
    }

    #[test]
    fn login_success_authenticates() {
        let ctl = controller(script_login);
        let identity = ctl
            .login(TaxId::from(CREDITOR), SecretString::from("123change"))
            .unwrap();
        assert_eq!(identity, creditor());

        let state = ctl.state();
        assert_eq!(state.session, SessionState::Authenticated(creditor()));
        assert!(!state.show_login());
        assert!(!state.busy.any());
        recorded(&ctl, |script| {
            assert_eq!(
                script.login_calls,
                vec![(TaxId::from(CREDITOR), "123change".to_owned())]
            );
        });
    }

    #[test]
    fn login_keeps_echo_identity_when_name_lookup_fails() {
        let ctl = controller(|script| script.logins.push_back(Ok(echo())));
        let identity = ctl
            .login(TaxId::from(CREDITOR), SecretString::from("123change"))
            .unwrap();
        assert_eq!(identity.tax_id, TaxId::from(CREDITOR));
        assert!(identity.name.is_empty());
        assert!(ctl.state().session.is_authenticated());
    }

    #[test]
    fn login_rejected_surfaces_invalid_credentials() {
        let ctl = controller(|script| {
            script
                .logins
                .push_back(Err(status(400, r#"{"detail":"Invalid login"}"#)));
        });
        let err = ctl
            .login(TaxId::from(CREDITOR), SecretString::from("wrong"))
            .unwrap_err();
        assert_eq!(err.failure(), Some(&Failure::AuthRejected));
        assert_eq!(err.message(), Some(messages::INVALID_CREDENTIALS));

        let state = ctl.state();
        assert_eq!(state.session, SessionState::Unauthenticated);
        assert_eq!(
            state.messages.get(Family::Login),
            Some(messages::INVALID_CREDENTIALS)
        );
        assert!(!state.busy.login);
    }

    #[test]
    fn login_network_failure_is_silent() {
        let ctl = controller(|_| {});
        let err = ctl
            .login(TaxId::from(CREDITOR), SecretString::from("123change"))
            .unwrap_err();
        assert!(matches!(err.failure(), Some(&Failure::Unclassified(_))));
        assert_eq!(err.message(), None);
        let state = ctl.state();
        assert_eq!(state.session, SessionState::Unauthenticated);
        assert!(state.messages.is_empty());
    }

    #[test]
    fn probe_rejection_is_silent() {
        let ctl = controller(|script| script.sessions.push_back(Err(status(403, ""))));
        assert_eq!(ctl.probe_session(), SessionState::Unauthenticated);
        let state = ctl.state();
        assert!(state.show_login());
        assert!(state.messages.is_empty());
    }

    #[test]
    fn probe_adopts_existing_session() {
        let ctl = controller(|script| script.sessions.push_back(Ok(creditor())));
        assert_eq!(
            ctl.probe_session(),
            SessionState::Authenticated(creditor())
        );
    }

    #[test]
    fn probe_transport_failure_leaves_unauthenticated() {
        let ctl = controller(|_| {});
        assert_eq!(ctl.probe_session(), SessionState::Unauthenticated);
        assert!(ctl.state().messages.is_empty());
    }

    #[test]
    fn create_overwrites_creditor_and_refreshes_prior_search() {
        let created = charge();
        let ctl = controller(|script| {
            script_login(script);
            script.listings.push_back(Ok(Vec::new()));
            script.creations.push_back(Ok(created.clone()));
            script.listings.push_back(Ok(vec![created.clone()]));
        });
        log_in(&ctl);
        let _rows = ctl.list_charges(TaxId::from(DEBTOR)).unwrap();

        let record = ctl.create_charge(draft()).unwrap();
        assert_eq!(record, created);

        recorded(&ctl, |script| {
            assert_eq!(script.drafts.len(), 1);
            assert_eq!(script.drafts[0].creditor_tax_id, TaxId::from(CREDITOR));
            assert_eq!(script.drafts[0].debtor.name, "Loja do Ze");
            assert_eq!(script.filters.len(), 2);
            assert_eq!(script.filters[1], ChargeFilter::active_for(TaxId::from(DEBTOR)));
        });
        let state = ctl.state();
        assert_eq!(state.charges, vec![created]);
        assert_eq!(state.draft, ChargeDraft::default());
        assert!(state.messages.is_empty());
        assert!(!state.busy.any());
    }

    #[test]
    fn create_without_search_refreshes_empty_key() {
        let ctl = controller(|script| {
            script_login(script);
            script.creations.push_back(Ok(charge()));
            script.listings.push_back(Ok(Vec::new()));
        });
        log_in(&ctl);
        let _record = ctl.create_charge(draft()).unwrap();
        recorded(&ctl, |script| {
            assert_eq!(script.filters.len(), 1);
            assert_eq!(script.filters[0], ChargeFilter::active_for(TaxId::from("")));
        });
    }

    #[test]
    fn payment_without_search_refreshes_empty_key() {
        let row = charge();
        let ctl = controller(|script| {
            script_login(script);
            script.payments.push_back(Ok(()));
            script.listings.push_back(Ok(Vec::new()));
        });
        log_in(&ctl);
        ctl.record_payment(&PaymentRequest::for_charge(&row)).unwrap();
        recorded(&ctl, |script| {
            assert_eq!(script.filters.len(), 1);
            assert_eq!(script.filters[0], ChargeFilter::active_for(TaxId::from("")));
        });
    }

    #[test]
    fn create_requires_session() {
        let ctl = controller(|_| {});
        assert_eq!(
            ctl.create_charge(draft()).unwrap_err(),
            CommandError::NotAuthenticated
        );
        recorded(&ctl, |script| assert!(script.drafts.is_empty()));
    }

    #[test]
    fn create_refuses_empty_debtor_name() {
        let ctl = controller(script_login);
        log_in(&ctl);
        let empty = ChargeDraft::new(Identity::new("  ", DEBTOR), Decimal::ONE);
        let err = ctl.create_charge(empty).unwrap_err();
        assert_eq!(err.message(), Some(messages::EMPTY_DEBTOR_NAME));
        assert_eq!(
            ctl.state().messages.get(Family::Create),
            Some(messages::EMPTY_DEBTOR_NAME)
        );
        recorded(&ctl, |script| assert!(script.drafts.is_empty()));
    }

    #[test]
    fn create_refuses_empty_debtor_tax_id() {
        let ctl = controller(script_login);
        log_in(&ctl);
        let empty = ChargeDraft::new(Identity::new("Loja do Ze", ""), Decimal::ONE);
        let err = ctl.create_charge(empty).unwrap_err();
        assert_eq!(err.message(), Some(messages::INVALID_TAX_ID));
    }

    #[test]
    fn create_self_charge_maps_violation() {
        let ctl = controller(|script| {
            script_login(script);
            script
                .creations
                .push_back(Err(violation("You can not add debt for yourself")));
        });
        log_in(&ctl);
        let err = ctl.create_charge(draft()).unwrap_err();
        assert_eq!(err.message(), Some(messages::SELF_CHARGE));

        let state = ctl.state();
        assert_eq!(state.messages.get(Family::Create), Some(messages::SELF_CHARGE));
        assert_eq!(state.draft, ChargeDraft::default());
        assert!(state.session.is_authenticated());
        assert!(!state.busy.create);
    }

    #[test]
    fn create_unknown_violation_falls_back_to_generic() {
        let ctl = controller(|script| {
            script_login(script);
            script.creations.push_back(Err(violation("Debtor not found")));
        });
        log_in(&ctl);
        let err = ctl.create_charge(draft()).unwrap_err();
        assert_eq!(err.message(), Some(messages::INVALID_FIELDS));
    }

    #[test]
    fn custom_violation_table_is_used() {
        let table = ViolationTable::default().with_entry(
            "Debtor not found",
            crate::translator::ViolationKind::Custom("Devedor não encontrado.".into()),
        );
        let transport = ScriptedTransport::default();
        {
            let mut script = transport.inner.lock().unwrap();
            script_login(&mut script);
            script.creations.push_back(Err(violation("Debtor not found")));
        }
        let ctl = SessionLedgerBlockingController::builder()
            .transport(transport)
            .violation_table(table)
            .build()
            .unwrap();
        log_in(&ctl);
        let err = ctl.create_charge(draft()).unwrap_err();
        assert_eq!(err.message(), Some("Devedor não encontrado."));
    }

    #[test]
    fn custom_violation_table_keeps_built_in_entries() {
        let table = ViolationTable::empty().with_entry(
            "Debtor not found",
            crate::translator::ViolationKind::Custom("Devedor".into()),
        );
        let transport = ScriptedTransport::default();
        {
            let mut script = transport.inner.lock().unwrap();
            script_login(&mut script);
            script
                .creations
                .push_back(Err(violation("You can not add debt for yourself")));
        }
        let ctl = SessionLedgerBlockingController::builder()
            .transport(transport)
            .violation_table(table)
            .build()
            .unwrap();
        log_in(&ctl);
        let err = ctl.create_charge(draft()).unwrap_err();
        assert_eq!(err.message(), Some(messages::SELF_CHARGE));
    }

    #[test]
    fn builder_requires_transport() {
        let result = SessionLedgerBlockingController::<ScriptedTransport>::builder().build();
        assert!(matches!(result, Err(CobrancaError::Config(_))));
    }

    #[test]
    fn submit_draft_sends_staged_draft() {
        let ctl = controller(|script| {
            script_login(script);
            script.creations.push_back(Ok(charge()));
            script.listings.push_back(Ok(Vec::new()));
        });
        log_in(&ctl);
        ctl.set_draft(draft());
        assert_eq!(ctl.state().draft.debtor.name, "Loja do Ze");
        let _record = ctl.submit_draft().unwrap();
        recorded(&ctl, |script| assert_eq!(script.drafts[0].debtor.tax_id, TaxId::from(DEBTOR)));
        assert_eq!(ctl.state().draft, ChargeDraft::default());
    }

    #[test]
    fn reset_draft_clears_staged_input() {
        let ctl = controller(|_| {});
        ctl.set_draft(draft());
        ctl.reset_draft();
        assert_eq!(ctl.state().draft, ChargeDraft::default());
    }

    #[test]
    fn list_not_found_empties_with_message() {
        let ctl = controller(|script| {
            script_login(script);
            script.listings.push_back(Ok(vec![charge()]));
            script.listings.push_back(Err(status(404, r#"{"detail":"Charge not found"}"#)));
        });
        log_in(&ctl);
        let _rows = ctl.list_charges(TaxId::from(DEBTOR)).unwrap();
        let rows = ctl.list_charges(TaxId::from("11144477735")).unwrap();
        assert!(rows.is_empty());

        let state = ctl.state();
        assert!(state.charges.is_empty());
        assert_eq!(state.search, TaxId::from("11144477735"));
        assert_eq!(
            state.messages.get(Family::List),
            Some(messages::CHARGE_NOT_FOUND)
        );
    }

    #[test]
    fn list_other_failure_keeps_rows_silently() {
        let row = charge();
        let ctl = controller(|script| {
            script_login(script);
            script.listings.push_back(Ok(vec![row.clone()]));
            script.listings.push_back(Err(status(500, "boom")));
        });
        log_in(&ctl);
        let _rows = ctl.list_charges(TaxId::from(DEBTOR)).unwrap();
        let err = ctl.list_charges(TaxId::from(DEBTOR)).unwrap_err();
        assert!(matches!(err.failure(), Some(&Failure::Unclassified(_))));

        let state = ctl.state();
        assert_eq!(state.charges, vec![row]);
        assert!(state.messages.is_empty());
        assert!(!state.busy.list);
    }

    #[test]
    fn session_expiry_mid_use_drops_session() {
        let ctl = controller(|script| {
            script_login(script);
            script.listings.push_back(Err(status(403, "")));
        });
        log_in(&ctl);
        let err = ctl.list_charges(TaxId::from(DEBTOR)).unwrap_err();
        assert_eq!(err.failure(), Some(&Failure::AuthRejected));
        assert_eq!(err.message(), None);

        let state = ctl.state();
        assert_eq!(state.session, SessionState::Unauthenticated);
        assert!(state.show_login());
        assert!(state.messages.is_empty());
    }

    #[test]
    fn signup_then_login() {
        let ctl = controller(|script| {
            script.registrations.push_back(Ok(creditor()));
            script_login(script);
        });
        let identity = ctl
            .signup("Maria", TaxId::from(CREDITOR), SecretString::from("s3cret"))
            .unwrap();
        assert_eq!(identity, creditor());
        assert!(ctl.state().session.is_authenticated());
        recorded(&ctl, |script| {
            assert_eq!(script.login_calls[0].1, "s3cret");
        });
    }

    #[test]
    fn signup_with_empty_password_skips_login() {
        let ctl = controller(|script| script.registrations.push_back(Ok(creditor())));
        let err = ctl
            .signup("Maria", TaxId::from(CREDITOR), SecretString::from(""))
            .unwrap_err();
        assert_eq!(err.message(), Some(messages::SIGNUP_INVALID_PASSWORD));
        assert_eq!(
            ctl.state().messages.get(Family::Signup),
            Some(messages::SIGNUP_INVALID_PASSWORD)
        );
        assert!(!ctl.state().session.is_authenticated());
        recorded(&ctl, |script| assert!(script.login_calls.is_empty()));
    }

    #[test]
    fn signup_duplicate_and_invalid_tax_id() {
        let ctl = controller(|script| {
            script
                .registrations
                .push_back(Err(status(400, r#"{"detail":"Entity already exists"}"#)));
            script.registrations.push_back(Err(violation("Invalid CPF / CNPJ")));
        });
        let duplicate = ctl
            .signup("Maria", TaxId::from(CREDITOR), SecretString::from("s3cret"))
            .unwrap_err();
        assert_eq!(duplicate.message(), Some(messages::SIGNUP_DUPLICATE));
        let invalid = ctl
            .signup("Maria", TaxId::from("123"), SecretString::from("s3cret"))
            .unwrap_err();
        assert_eq!(invalid.message(), Some(messages::SIGNUP_INVALID_TAX_ID));
        assert!(!ctl.state().busy.signup);
    }

    #[test]
    fn logout_clears_state_even_on_failure() {
        let ctl = controller(|script| {
            script_login(script);
            script.listings.push_back(Ok(vec![charge()]));
            script.logouts.push_back(Err(status(500, "boom")));
        });
        log_in(&ctl);
        let _rows = ctl.list_charges(TaxId::from(DEBTOR)).unwrap();
        ctl.set_draft(draft());

        ctl.logout();
        assert_eq!(ctl.state(), ViewState::default());
        recorded(&ctl, |script| assert_eq!(script.logout_calls, 1));
    }

    #[test]
    fn payment_success_refreshes_list() {
        let row = charge();
        let ctl = controller(|script| {
            script_login(script);
            script.listings.push_back(Ok(vec![row.clone()]));
            script.payments.push_back(Ok(()));
            script.listings.push_back(Ok(Vec::new()));
        });
        log_in(&ctl);
        let _rows = ctl.list_charges(TaxId::from(DEBTOR)).unwrap();
        ctl.record_payment(&PaymentRequest::for_charge(&row)).unwrap();

        recorded(&ctl, |script| {
            assert_eq!(script.payment_calls[0].id, row.id);
            assert_eq!(script.filters.len(), 2);
        });
        let state = ctl.state();
        assert!(state.charges.is_empty());
        assert!(!state.busy.payment);
    }

    #[test]
    fn payment_failure_surfaces_generic_message_and_refreshes() {
        let row = charge();
        let ctl = controller(|script| {
            script_login(script);
            script.listings.push_back(Ok(vec![row.clone()]));
            script.payments.push_back(Err(status(400, "Charge already paid")));
            script.listings.push_back(Ok(vec![row.clone()]));
        });
        log_in(&ctl);
        let _rows = ctl.list_charges(TaxId::from(DEBTOR)).unwrap();
        let err = ctl
            .record_payment(&PaymentRequest::for_charge(&row))
            .unwrap_err();
        assert_eq!(err.message(), Some(messages::PAYMENT_FAILED));

        let state = ctl.state();
        assert_eq!(
            state.messages.get(Family::Payment),
            Some(messages::PAYMENT_FAILED)
        );
        assert_eq!(state.charges, vec![row]);
        recorded(&ctl, |script| assert_eq!(script.filters.len(), 2));
    }

    #[test]
    fn subscribers_observe_commits() {
        let ctl = controller(script_login);
        let mut rx = ctl.subscribe();
        log_in(&ctl);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().session.is_authenticated());
    }
}
