//! View state shared with the presentation layer.
//!
//! [`ViewState`] is an immutable snapshot. Every change goes through
//! [`reduce`], a pure function of the previous snapshot and an [`Event`],
//! and is committed by a single [`StateStore`] that notifies subscribers.
//! Concurrent completions are applied in commit order, so the last one to
//! resolve wins.

use tokio::sync::watch;

use crate::models::{ChargeDraft, ChargeRecord, Identity, TaxId};

/// Command families owning a busy flag and a message slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Session probe, login and logout.
    Login,
    /// Registration.
    Signup,
    /// Charge listing.
    List,
    /// Charge creation.
    Create,
    /// Payment recording.
    Payment,
}

/// Authentication status of the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No session.
    #[default]
    Unauthenticated,
    /// A probe or login is in flight and no session is known.
    Authenticating,
    /// Session established for the identity.
    Authenticated(Identity),
}

impl SessionState {
    /// Returns `true` for [`SessionState::Authenticated`].
    #[inline]
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(*self, Self::Authenticated(_))
    }

    /// Returns the session identity, if authenticated.
    #[inline]
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match *self {
            Self::Authenticated(ref identity) => Some(identity),
            Self::Unauthenticated | Self::Authenticating => None,
        }
    }
}

/// In-flight indicator per command family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "one independent flag per command family"
)]
pub struct BusyFlags {
    /// Login, logout or probe in flight.
    pub login: bool,
    /// Registration in flight.
    pub signup: bool,
    /// Listing in flight.
    pub list: bool,
    /// Creation in flight.
    pub create: bool,
    /// Payment in flight.
    pub payment: bool,
}

impl BusyFlags {
    /// Returns the flag of `family`.
    #[inline]
    #[must_use]
    pub const fn get(&self, family: Family) -> bool {
        match family {
            Family::Login => self.login,
            Family::Signup => self.signup,
            Family::List => self.list,
            Family::Create => self.create,
            Family::Payment => self.payment,
        }
    }

    /// Sets the flag of `family`.
    const fn set(&mut self, family: Family, value: bool) {
        match family {
            Family::Login => self.login = value,
            Family::Signup => self.signup = value,
            Family::List => self.list = value,
            Family::Create => self.create = value,
            Family::Payment => self.payment = value,
        }
    }

    /// Returns `true` if any family is busy.
    #[inline]
    #[must_use]
    pub const fn any(&self) -> bool {
        self.login || self.signup || self.list || self.create || self.payment
    }
}

/// One surfaced message slot per family; the latest attempt overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Messages {
    /// Login family message.
    pub login: Option<String>,
    /// Signup family message.
    pub signup: Option<String>,
    /// Listing family message.
    pub list: Option<String>,
    /// Creation family message.
    pub create: Option<String>,
    /// Payment family message.
    pub payment: Option<String>,
}

impl Messages {
    /// Returns the message surfaced for `family`.
    #[inline]
    #[must_use]
    pub fn get(&self, family: Family) -> Option<&str> {
        self.slot(family).as_deref()
    }

    /// Returns `true` if no family has a surfaced message.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.login.is_none()
            && self.signup.is_none()
            && self.list.is_none()
            && self.create.is_none()
            && self.payment.is_none()
    }

    /// Iterates over `(family, message)` for every surfaced message.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (Family, &str)> {
        [
            Family::Login,
            Family::Signup,
            Family::List,
            Family::Create,
            Family::Payment,
        ]
        .into_iter()
        .filter_map(|family| self.get(family).map(|text| (family, text)))
    }

    /// Borrows the slot of `family`.
    const fn slot(&self, family: Family) -> &Option<String> {
        match family {
            Family::Login => &self.login,
            Family::Signup => &self.signup,
            Family::List => &self.list,
            Family::Create => &self.create,
            Family::Payment => &self.payment,
        }
    }

    /// Mutably borrows the slot of `family`.
    const fn slot_mut(&mut self, family: Family) -> &mut Option<String> {
        match family {
            Family::Login => &mut self.login,
            Family::Signup => &mut self.signup,
            Family::List => &mut self.list,
            Family::Create => &mut self.create,
            Family::Payment => &mut self.payment,
        }
    }
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Authentication status.
    pub session: SessionState,
    /// Debtor filter of the last listing request; empty before any query.
    pub search: TaxId,
    /// Open charges for `search`, in server order.
    pub charges: Vec<ChargeRecord>,
    /// Staged charge-creation input.
    pub draft: ChargeDraft,
    /// In-flight flags.
    pub busy: BusyFlags,
    /// Surfaced messages.
    pub messages: Messages,
}

impl ViewState {
    /// Returns `true` while the login form should be shown.
    #[inline]
    #[must_use]
    pub const fn show_login(&self) -> bool {
        !self.session.is_authenticated()
    }

    /// Drops any session assumption.
    fn end_session(&mut self) {
        self.session = SessionState::Unauthenticated;
    }

    /// Leaves a pending `Authenticating` state after an inconclusive
    /// exchange; an established session is kept.
    fn settle_session(&mut self) {
        if self.session == SessionState::Authenticating {
            self.session = SessionState::Unauthenticated;
        }
    }
}

/// A committed state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A session probe was issued.
    ProbeStarted,
    /// The probe found a session.
    ProbeResolved(Identity),
    /// The probe was rejected: normal unauthenticated visitor.
    ProbeRejected,
    /// The probe failed for another reason.
    ProbeFailed,
    /// A command of the family was issued.
    Started(Family),
    /// Login succeeded.
    LoggedIn(Identity),
    /// Registration succeeded (login not yet attempted).
    Registered,
    /// Logout completed, whatever the server said.
    LoggedOut,
    /// A listing for the debtor was issued.
    ListRequested(TaxId),
    /// The listing returned rows.
    ChargesListed(Vec<ChargeRecord>),
    /// The listing found nothing.
    ChargesNotFound,
    /// A charge was created.
    ChargeCreated,
    /// A payment was accepted.
    PaymentRecorded,
    /// The server rejected the session or credentials while serving the
    /// family.
    SessionRejected {
        /// Family whose exchange was rejected.
        family: Family,
        /// Message to surface, if any.
        message: Option<String>,
    },
    /// A command of the family failed without touching the session.
    Failed {
        /// Family whose command failed.
        family: Family,
        /// Message to surface, if any.
        message: Option<String>,
    },
    /// The draft was replaced.
    DraftChanged(ChargeDraft),
    /// The draft was reset to its zero value.
    DraftReset,
}

/// Applies `event` to `state`, returning the next snapshot.
#[inline]
#[must_use]
pub fn reduce(mut state: ViewState, event: Event) -> ViewState {
    match event {
        Event::ProbeStarted => {
            if !state.session.is_authenticated() {
                state.session = SessionState::Authenticating;
            }
        }
        Event::ProbeResolved(identity) => {
            state.session = SessionState::Authenticated(identity);
        }
        Event::ProbeRejected => state.end_session(),
        Event::ProbeFailed => state.settle_session(),
        Event::Started(family) => {
            state.busy.set(family, true);
            if family == Family::Login && !state.session.is_authenticated() {
                state.session = SessionState::Authenticating;
            }
        }
        Event::LoggedIn(identity) => {
            state.session = SessionState::Authenticated(identity);
            state.busy.set(Family::Login, false);
            state.messages = Messages::default();
            state.draft = ChargeDraft::default();
        }
        Event::Registered => state.busy.set(Family::Signup, false),
        Event::LoggedOut => {
            state.end_session();
            state.busy.set(Family::Login, false);
            state.messages = Messages::default();
            state.draft = ChargeDraft::default();
            state.search = TaxId::default();
            state.charges.clear();
        }
        Event::ListRequested(search) => {
            state.busy.set(Family::List, true);
            state.search = search;
        }
        Event::ChargesListed(charges) => {
            state.busy.set(Family::List, false);
            state.charges = charges;
            *state.messages.slot_mut(Family::List) = None;
        }
        Event::ChargesNotFound => {
            state.busy.set(Family::List, false);
            state.charges.clear();
            *state.messages.slot_mut(Family::List) =
                Some(crate::translator::messages::CHARGE_NOT_FOUND.to_owned());
        }
        Event::ChargeCreated => {
            state.busy.set(Family::Create, false);
            state.messages = Messages::default();
            state.draft = ChargeDraft::default();
        }
        Event::PaymentRecorded => {
            state.busy.set(Family::Payment, false);
            *state.messages.slot_mut(Family::Payment) = None;
        }
        Event::SessionRejected { family, message } => {
            state.end_session();
            state.busy.set(family, false);
            if message.is_some() {
                *state.messages.slot_mut(family) = message;
            }
        }
        Event::Failed { family, message } => {
            state.busy.set(family, false);
            if family == Family::Login {
                state.settle_session();
            }
            if message.is_some() {
                *state.messages.slot_mut(family) = message;
            }
        }
        Event::DraftChanged(draft) => state.draft = draft,
        Event::DraftReset => state.draft = ChargeDraft::default(),
    }
    state
}

/// Single owner of the current [`ViewState`].
///
/// Commits are serialized by the underlying watch channel, so readers never
/// observe a partially applied event.
#[derive(Debug)]
pub struct StateStore {
    /// Sender holding the current snapshot.
    tx: watch::Sender<ViewState>,
}

impl Default for StateStore {
    #[inline]
    fn default() -> Self {
        Self::new(ViewState::default())
    }
}

impl StateStore {
    /// Creates a store holding `initial`.
    #[inline]
    #[must_use]
    pub fn new(initial: ViewState) -> Self {
        Self {
            tx: watch::Sender::new(initial),
        }
    }

    /// Commits `event` and notifies subscribers.
    #[inline]
    pub fn dispatch(&self, event: Event) {
        tracing::trace!(?event, "dispatching");
        self.tx.send_modify(|state| {
            let current = core::mem::take(state);
            *state = reduce(current, event);
        });
    }

    /// Returns a copy of the current snapshot.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> ViewState {
        self.tx.borrow().clone()
    }

    /// Returns the current session state.
    #[inline]
    #[must_use]
    pub fn session(&self) -> SessionState {
        self.tx.borrow().session.clone()
    }

    /// Returns the current search key.
    #[inline]
    #[must_use]
    pub fn search(&self) -> TaxId {
        self.tx.borrow().search.clone()
    }

    /// Returns the current draft.
    #[inline]
    #[must_use]
    pub fn draft(&self) -> ChargeDraft {
        self.tx.borrow().draft.clone()
    }

    /// Subscribes to committed snapshots.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }
}
