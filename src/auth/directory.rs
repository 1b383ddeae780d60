//! Static credential directory.
//!
//! A fixed table of known identities. Secrets are compared in plain text and
//! there is no lockout or rate limiting: this is a mock gate, not security.

use crate::models::{Identity, Role};

/// Every identity that can log in.
pub static IDENTITIES: &[Identity] = &[
    Identity {
        id: "1",
        identifier: "admin",
        alias: "admin@example.com",
        secret: "password123",
        role: Role::Admin,
    },
    Identity {
        id: "2",
        identifier: "user",
        alias: "user@example.com",
        secret: "user123",
        role: Role::User,
    },
    Identity {
        id: "3",
        identifier: "demo",
        alias: "demo@example.com",
        secret: "demo123",
        role: Role::User,
    },
];

/// Find the identity whose identifier or alias matches (case-insensitively)
/// and whose secret matches exactly.
pub fn find(identifier_or_alias: &str, secret: &str) -> Option<&'static Identity> {
    let needle = identifier_or_alias.trim();
    IDENTITIES.iter().find(|identity| {
        (identity.identifier.eq_ignore_ascii_case(needle)
            || identity.alias.eq_ignore_ascii_case(needle))
            && identity.secret == secret
    })
}
