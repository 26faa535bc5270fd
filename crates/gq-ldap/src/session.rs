//! Directory session abstraction
//!
//! The relocation engine talks to servers only through [`DirectorySession`]
//! and [`ConnectionProvider`], so it runs unchanged against a live `ldap3`
//! connection or an in-memory directory.

use crate::result_code::{self, result_code_text};
use async_trait::async_trait;
use gq_core::{Result, ServerId};

/// OID of the ManageDsaIT control (RFC 3296).
pub const MANAGE_DSA_IT_OID: &str = "2.16.840.1.113730.3.4.2";

/// Attributes requested on every engine search: all user attributes plus `ref`.
pub const ENGINE_SEARCH_ATTRS: [&str; 2] = ["*", "ref"];

/// Filter used for every engine search.
pub const MATCH_ALL_FILTER: &str = "(objectClass=*)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Exactly the named entry
    Base,
    /// Immediate children of the named entry
    OneLevel,
}

/// An entry as read from a server. Values are kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: Vec<(String, Vec<Vec<u8>>)>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr<V: AsRef<[u8]>>(mut self, name: &str, values: &[V]) -> Self {
        self.attrs.push((
            name.to_string(),
            values.iter().map(|v| v.as_ref().to_vec()).collect(),
        ));
        self
    }

    /// Values of an attribute; attribute names match case-insensitively.
    pub fn values(&self, name: &str) -> Option<&[Vec<u8>]> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }
}

/// Outcome of a single protocol operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpStatus {
    pub rc: u32,
    pub matched: String,
    /// Diagnostic text sent by the server
    pub text: String,
}

impl OpStatus {
    pub fn success() -> Self {
        Self::with_code(result_code::SUCCESS)
    }

    pub fn with_code(rc: u32) -> Self {
        Self {
            rc,
            matched: String::new(),
            text: String::new(),
        }
    }

    pub fn with_text(rc: u32, text: impl Into<String>) -> Self {
        Self {
            rc,
            matched: String::new(),
            text: text.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.rc == result_code::SUCCESS
    }

    pub fn is_server_down(&self) -> bool {
        self.rc == result_code::SERVER_DOWN
    }

    pub fn is_no_such_object(&self) -> bool {
        self.rc == result_code::NO_SUCH_OBJECT
    }

    pub fn is_size_limit_exceeded(&self) -> bool {
        self.rc == result_code::SIZE_LIMIT_EXCEEDED
    }

    /// The server (or client library) refused the request controls.
    pub fn control_unsupported(&self) -> bool {
        self.rc == result_code::UNAVAILABLE_CRITICAL_EXTENSION
            || self.rc == result_code::NOT_SUPPORTED
    }

    /// Result text plus any server diagnostic, for error messages.
    pub fn describe(&self) -> String {
        if self.text.is_empty() {
            result_code_text(self.rc).to_string()
        } else {
            format!(
                "{}. Additional info: {}",
                result_code_text(self.rc),
                self.text
            )
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub entries: Vec<DirectoryEntry>,
    pub status: OpStatus,
}

impl SearchOutcome {
    pub fn failed(status: OpStatus) -> Self {
        Self {
            entries: Vec::new(),
            status,
        }
    }
}

/// One bound session against one directory server.
///
/// Operations never fail at the Rust level: transport failures are reported
/// as [`result_code::SERVER_DOWN`] so callers handle every outcome uniformly.
#[async_trait]
pub trait DirectorySession: Send {
    /// Sessions with equal ids share one underlying connection.
    fn connection_id(&self) -> u64;

    fn server(&self) -> &ServerId;

    fn protocol_version(&self) -> u32;

    /// Search with [`MATCH_ALL_FILTER`] requesting [`ENGINE_SEARCH_ATTRS`].
    /// A size-limited result still carries the entries returned so far.
    async fn search(&mut self, base: &str, scope: SearchScope, manage_dsa_it: bool)
        -> SearchOutcome;

    async fn add(
        &mut self,
        dn: &str,
        attrs: &[(String, Vec<Vec<u8>>)],
        manage_dsa_it: bool,
    ) -> OpStatus;

    async fn delete(&mut self, dn: &str, manage_dsa_it: bool) -> OpStatus;

    async fn rename(
        &mut self,
        dn: &str,
        new_rdn: &str,
        new_superior: &str,
        delete_old_rdn: bool,
        manage_dsa_it: bool,
    ) -> OpStatus;

    /// Tear down the underlying connection.
    async fn unbind(&mut self);
}

/// Hands out bound sessions and owns their lifecycle.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Open (or reuse) a bound session. An unreachable server yields
    /// `Error::ServerDown` and bumps that server's failure counter.
    async fn open(&self, server: &ServerId) -> Result<Box<dyn DirectorySession>>;

    /// Release a session. Without `force` the provider may keep the
    /// connection cached for later opens.
    async fn close(&self, session: Box<dyn DirectorySession>, force: bool);

    /// Record that `server` was found to be down.
    fn server_down(&self, server: &ServerId);

    fn server_down_count(&self, server: &ServerId) -> u32;
}
