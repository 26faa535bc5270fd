//! LDAP support for GQ
//!
//! Provides:
//! - Bound `ldap3` sessions with per-server connection caching
//! - Server health tracking (how often a server was found down)
//! - The entry relocation engine: move or copy an entry, optionally with
//!   its whole subtree, within one server or across servers

mod client;
mod engine;
pub mod result_code;
mod session;

#[cfg(test)]
mod testing;

pub use client::{LdapConnectionProvider, LdapSession, ServerRegistry};
pub use engine::{MoveProgress, RelocationEngine};
pub use result_code::result_code_text;
pub use session::{
    ConnectionProvider, DirectoryEntry, DirectorySession, OpStatus, SearchOutcome, SearchScope,
    ENGINE_SEARCH_ATTRS, MANAGE_DSA_IT_OID, MATCH_ALL_FILTER,
};
