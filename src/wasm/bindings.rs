//! `TodoApp`, the object the page scripts talk to.
//!
//! Values cross the boundary as JSON strings; errors are rejected with the
//! user-facing message of the underlying error.

use super::{LocationNavigator, current_page};
use crate::auth::{DEFAULT_LOGIN_DELAY, SessionManager};
use crate::clock::{Clock, SystemClock};
use crate::mail;
use crate::models::FilterMode;
use crate::storage::{KvStore, LocalStorageBackend};
use crate::tasks::TaskStore;
use crate::{Error, Result};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use wasm_bindgen::prelude::*;

struct AppState {
    session: SessionManager,
    tasks: TaskStore,
}

impl AppState {
    /// Validate the session and make sure the loaded list is its owner's.
    fn owner(&mut self) -> Result<String> {
        self.session.check()?;
        let owner = self
            .session
            .active_subject()
            .map(String::from)
            .ok_or(Error::NotAuthenticated)?;
        if self.tasks.owner() != Some(owner.as_str()) {
            self.tasks.load(&owner);
        }
        Ok(owner)
    }
}

fn to_js(err: Error) -> JsValue {
    JsValue::from_str(&err.user_message())
}

fn to_json<T: Serialize>(value: &T) -> std::result::Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| to_js(e.into()))
}

/// Session plus task list for one browser tab.
#[wasm_bindgen]
pub struct TodoApp {
    state: Rc<RefCell<AppState>>,
    store: Arc<KvStore>,
    login_delay: std::time::Duration,
}

impl Default for TodoApp {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl TodoApp {
    /// Open localStorage (or the in-memory fallback) and restore any session.
    #[wasm_bindgen(constructor)]
    pub fn new() -> TodoApp {
        super::init_panic_hook();

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(KvStore::with_clock(
            Box::new(LocalStorageBackend::new()),
            clock.clone(),
        ));
        // Login delay is awaited in `login`, outside the RefCell borrow
        let session = SessionManager::builder(store.clone())
            .clock(clock.clone())
            .navigator(Arc::new(LocationNavigator))
            .login_delay(std::time::Duration::ZERO)
            .build();
        let tasks = TaskStore::new(store.clone(), clock);

        TodoApp {
            state: Rc::new(RefCell::new(AppState { session, tasks })),
            store,
            login_delay: DEFAULT_LOGIN_DELAY,
        }
    }

    /// Restore the persisted session and apply page redirects.
    ///
    /// Returns whether an authenticated session survived.
    pub fn initialize(&self) -> bool {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let authenticated = state.session.initialize();
        if authenticated {
            if let Err(e) = state.tasks.load_active(&state.session) {
                tracing::warn!(error = %e, "Could not load tasks");
            }
        }
        state.session.enforce_redirects(&current_page());
        authenticated
    }

    /// Log in; resolves with the session JSON or rejects with a message.
    pub fn login(&self, identifier: String, secret: String) -> js_sys::Promise {
        let state = self.state.clone();
        let delay = self.login_delay;
        wasm_bindgen_futures::future_to_promise(async move {
            crate::sys::sleep(delay).await;
            let mut state = state.borrow_mut();
            let state = &mut *state;
            let session = state
                .session
                .authenticate(&identifier, &secret)
                .map_err(to_js)?;
            state.tasks.load(&session.subject_id);
            Ok(JsValue::from_str(&to_json(&session)?))
        })
    }

    /// End the session; navigates to the login page.
    pub fn logout(&self) {
        self.state.borrow_mut().session.logout();
    }

    #[wasm_bindgen(js_name = isAuthenticated)]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().session.is_authenticated()
    }

    /// The current session as JSON, if any.
    #[wasm_bindgen(js_name = currentUser)]
    pub fn current_user(&self) -> Option<String> {
        let state = self.state.borrow();
        state
            .session
            .current_session()
            .and_then(|s| serde_json::to_string(s).ok())
    }

    #[wasm_bindgen(js_name = addTask)]
    pub fn add_task(&self, text: &str) -> std::result::Result<String, JsValue> {
        let mut state = self.state.borrow_mut();
        let owner = state.owner().map_err(to_js)?;
        let task = state.tasks.add(&owner, text).map_err(to_js)?;
        to_json(&task)
    }

    /// Toggle a task; ids are millisecond timestamps and fit an f64 exactly.
    #[wasm_bindgen(js_name = toggleTask)]
    pub fn toggle_task(&self, id: f64) -> std::result::Result<String, JsValue> {
        let mut state = self.state.borrow_mut();
        state.owner().map_err(to_js)?;
        let task = state.tasks.toggle(id as i64).map_err(to_js)?;
        to_json(&task)
    }

    #[wasm_bindgen(js_name = deleteTask)]
    pub fn delete_task(&self, id: f64) -> std::result::Result<(), JsValue> {
        let mut state = self.state.borrow_mut();
        state.owner().map_err(to_js)?;
        state.tasks.remove(id as i64).map_err(to_js)
    }

    #[wasm_bindgen(js_name = clearCompleted)]
    pub fn clear_completed(&self) -> std::result::Result<u32, JsValue> {
        let mut state = self.state.borrow_mut();
        state.owner().map_err(to_js)?;
        Ok(state.tasks.clear_completed() as u32)
    }

    /// Tasks under `filter` ("all", "active", "completed") as a JSON array.
    pub fn tasks(&self, filter: &str) -> std::result::Result<String, JsValue> {
        let mode = FilterMode::parse(filter).unwrap_or_default();
        let mut state = self.state.borrow_mut();
        state.owner().map_err(to_js)?;
        to_json(&state.tasks.filter(mode))
    }

    /// `{"total":..,"active":..,"completed":..}`
    pub fn counts(&self) -> std::result::Result<String, JsValue> {
        let mut state = self.state.borrow_mut();
        state.owner().map_err(to_js)?;
        to_json(&state.tasks.counts())
    }

    /// A `mailto:` URL listing completed tasks; the page opens it.
    #[wasm_bindgen(js_name = completedMailto)]
    pub fn completed_mailto(&self, to: Option<String>) -> std::result::Result<String, JsValue> {
        let mut state = self.state.borrow_mut();
        state.owner().map_err(to_js)?;
        let session = state
            .session
            .current_session()
            .ok_or_else(|| to_js(Error::NotAuthenticated))?;
        let draft = mail::compose_completed_summary(
            session,
            &state.tasks.filter(FilterMode::Completed),
            to.as_deref(),
        )
        .map_err(to_js)?;
        Ok(draft.mailto_url())
    }

    /// Whether localStorage is in use rather than the in-memory fallback.
    #[wasm_bindgen(js_name = storageAvailable)]
    pub fn storage_available(&self) -> bool {
        self.store.is_available()
    }
}
