//! Mock authentication gate.
//!
//! - [`directory`] - the fixed table of identities
//! - [`token`] - the structural, unverified session token
//! - [`session`] - login/logout/validation and redirect decisions

pub mod directory;
pub mod session;
pub mod token;

pub use session::{
    DEFAULT_LOGIN_DELAY, Navigator, NoopNavigator, SessionManager, SessionManagerBuilder,
    SessionState,
};
pub use token::TokenPayload;
