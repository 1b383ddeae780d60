//! Session manager.
//!
//! Owns the current session and is the only writer of the persisted session
//! record, token and login time. Expiry is checked lazily in
//! [`SessionManager::initialize`] and [`SessionManager::validate`]; nothing
//! runs in the background.

use super::{directory, token};
use crate::clock::{Clock, SystemClock};
use crate::models::{Page, Session};
use crate::storage::{KvStore, LOGIN_TIME_KEY, SESSION_KEY, TOKEN_KEY};
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Default artificial latency applied to every login attempt.
pub const DEFAULT_LOGIN_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

/// Lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Active,
    /// Active in memory, but the token is past its expiry and awaits validation
    Expired,
}

/// Performs navigation decided by the session manager.
///
/// The browser implementation changes `window.location`; the CLI has nowhere
/// to go and uses [`NoopNavigator`].
pub trait Navigator: Send + Sync {
    fn navigate(&self, page: &Page);
}

/// Navigator that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, page: &Page) {
        tracing::debug!(target_page = %page.path(), "Navigation requested");
    }
}

/// Builder for [`SessionManager`].
pub struct SessionManagerBuilder {
    store: Arc<KvStore>,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    lifetime: Duration,
    login_delay: std::time::Duration,
}

impl SessionManagerBuilder {
    /// Time source for issue and expiry checks.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Where logout and redirect decisions are sent.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// How long a new session's token stays valid.
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Artificial latency before each login attempt resolves.
    pub fn login_delay(mut self, delay: std::time::Duration) -> Self {
        self.login_delay = delay;
        self
    }

    pub fn build(self) -> SessionManager {
        SessionManager {
            store: self.store,
            clock: self.clock,
            navigator: self.navigator,
            lifetime: self.lifetime,
            login_delay: self.login_delay,
            state: SessionState::NoSession,
            session: None,
            token: None,
        }
    }
}

/// Orchestrates login, logout, validation and redirect decisions.
pub struct SessionManager {
    store: Arc<KvStore>,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    lifetime: Duration,
    login_delay: std::time::Duration,
    state: SessionState,
    session: Option<Session>,
    token: Option<String>,
}

impl SessionManager {
    /// Start building a manager on `store` with system time, no navigation,
    /// the default lifetime and the default login delay.
    pub fn builder(store: Arc<KvStore>) -> SessionManagerBuilder {
        SessionManagerBuilder {
            store,
            clock: Arc::new(SystemClock),
            navigator: Arc::new(NoopNavigator),
            lifetime: Duration::hours(token::DEFAULT_SESSION_LIFETIME_HOURS),
            login_delay: DEFAULT_LOGIN_DELAY,
        }
    }

    /// Restore a persisted session, then validate it.
    ///
    /// Returns whether an authenticated session survived.
    pub fn initialize(&mut self) -> bool {
        self.restore().is_ok()
    }

    /// Like [`SessionManager::initialize`], reporting why no session survived.
    pub fn restore(&mut self) -> Result<()> {
        let session = self.store.get::<Session>(SESSION_KEY);
        let token = self.store.get::<String>(TOKEN_KEY);

        match (session, token) {
            (Some(session), Some(token)) => {
                tracing::debug!(subject = %session.subject_id, "Restored persisted session");
                self.session = Some(session);
                self.token = Some(token);
                self.state = SessionState::Active;
            }
            (None, None) => {
                self.state = SessionState::NoSession;
            }
            _ => {
                // Half a session is no session; drop the leftover
                tracing::warn!("Persisted session is incomplete, discarding");
                self.clear_persisted();
                self.state = SessionState::NoSession;
            }
        }

        self.check()
    }

    /// Authenticate against the credential directory.
    ///
    /// Always waits the configured login delay first, so failures and
    /// successes take the same time.
    pub async fn login(&mut self, identifier_or_alias: &str, secret: &str) -> Result<Session> {
        crate::sys::sleep(self.login_delay).await;
        self.authenticate(identifier_or_alias, secret)
    }

    /// The configured login delay.
    pub fn login_delay(&self) -> std::time::Duration {
        self.login_delay
    }

    /// [`SessionManager::login`] without the delay.
    ///
    /// For callers that cannot hold the manager across an await and sleep
    /// [`SessionManager::login_delay`] themselves.
    pub fn authenticate(&mut self, identifier_or_alias: &str, secret: &str) -> Result<Session> {
        if identifier_or_alias.trim().is_empty() || secret.is_empty() {
            return Err(Error::InvalidCredentials);
        }

        let Some(identity) = directory::find(identifier_or_alias, secret) else {
            tracing::info!(identifier = identifier_or_alias, "Login rejected");
            return Err(Error::InvalidCredentials);
        };

        let now = self.clock.now();
        let session = Session::for_identity(identity, now);
        let token = token::encode(identity, now, self.lifetime)?;

        let persisted = self.store.set(SESSION_KEY, &session)
            & self.store.set(TOKEN_KEY, &token)
            & self.store.set(LOGIN_TIME_KEY, &now.timestamp_millis());
        if !persisted {
            tracing::warn!(
                subject = %session.subject_id,
                "Session could not be persisted, it will not survive a reload"
            );
        }

        tracing::info!(subject = %session.subject_id, role = %session.role, "Logged in");
        self.session = Some(session.clone());
        self.token = Some(token);
        self.state = SessionState::Active;
        Ok(session)
    }

    /// End the session and send the UI to the login page.
    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(subject = %session.subject_id, "Logged out");
        }
        self.token = None;
        self.clear_persisted();
        self.state = SessionState::NoSession;
        self.navigator.navigate(&Page::Login);
    }

    fn clear_persisted(&self) {
        self.store.remove(SESSION_KEY);
        self.store.remove(TOKEN_KEY);
        self.store.remove(LOGIN_TIME_KEY);
    }

    /// Check the current session's token; log out if it is unusable.
    pub fn validate(&mut self) -> bool {
        self.check().is_ok()
    }

    /// Like [`SessionManager::validate`], reporting why the session is gone.
    ///
    /// Errors with `NotAuthenticated` when there was no session,
    /// `InvalidTokenFormat` when the token did not decode and
    /// `SessionExpired` when it was past expiry. The latter two log out.
    pub fn check(&mut self) -> Result<()> {
        if self.session.is_none() {
            return Err(Error::NotAuthenticated);
        }

        let decoded = match self.token.as_deref() {
            Some(token) => token::decode(token),
            None => Err(Error::InvalidTokenFormat("missing token".to_string())),
        };

        let payload = match decoded {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Session token rejected");
                self.logout();
                return Err(e);
            }
        };

        if payload.is_expired(self.clock.now()) {
            tracing::info!(subject = %payload.subject_id, "Session expired");
            self.logout();
            return Err(Error::SessionExpired);
        }

        Ok(())
    }

    /// Current lifecycle state.
    ///
    /// An active session whose token has run out reports `Expired` until the
    /// next validation clears it.
    pub fn state(&self) -> SessionState {
        match self.state {
            SessionState::Active if self.token_expired() => SessionState::Expired,
            state => state,
        }
    }

    fn token_expired(&self) -> bool {
        self.token
            .as_deref()
            .and_then(|t| token::decode(t).ok())
            .is_some_and(|payload| payload.is_expired(self.clock.now()))
    }

    /// True iff the state is active and the session says it is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Active
            && self.session.as_ref().is_some_and(|s| s.authenticated)
    }

    /// The current session, if any.
    pub fn current_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Subject id of the authenticated identity.
    pub fn active_subject(&self) -> Option<&str> {
        if self.is_authenticated() {
            self.session.as_ref().map(|s| s.subject_id.as_str())
        } else {
            None
        }
    }

    /// The raw token of the current session.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// When the current session logged in, as persisted.
    pub fn login_time(&self) -> Option<DateTime<Utc>> {
        self.session.as_ref()?;
        let millis = self.store.get::<i64>(LOGIN_TIME_KEY)?;
        DateTime::from_timestamp_millis(millis)
    }

    /// Time left on the current token.
    pub fn time_remaining(&self) -> Option<Duration> {
        let payload = token::decode(self.token.as_deref()?).ok()?;
        Some(payload.remaining(self.clock.now()))
    }

    /// Where an authenticated visitor on `current` should go instead, if anywhere.
    pub fn redirect_to_app(&self, current: &Page) -> Option<Page> {
        (self.is_authenticated() && *current == Page::Login).then_some(Page::App)
    }

    /// Where an unauthenticated visitor on `current` should go instead, if anywhere.
    pub fn redirect_to_login(&self, current: &Page) -> Option<Page> {
        (!self.is_authenticated() && *current == Page::App).then_some(Page::Login)
    }

    /// Apply whichever redirect applies to `current` through the navigator.
    pub fn enforce_redirects(&self, current: &Page) -> Option<Page> {
        let target = self
            .redirect_to_app(current)
            .or_else(|| self.redirect_to_login(current))?;
        self.navigator.navigate(&target);
        Some(target)
    }
}
