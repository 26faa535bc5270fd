//! Deferred refresh requests
//!
//! After a move the caller usually wants to re-read the parents whose
//! children changed. The queue is owned by the caller and drained once the
//! move has finished.

use crate::dn::dn_eq;
use crate::types::ServerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub server: ServerId,
    pub dn: String,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshQueue {
    requests: Vec<RefreshRequest>,
}

impl RefreshQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a refresh of `dn`. Duplicates (same server, equal DN) are dropped.
    pub fn push(&mut self, server: &ServerId, dn: impl Into<String>) {
        let dn = dn.into();
        let exists = self
            .requests
            .iter()
            .any(|r| &r.server == server && dn_eq(&r.dn, &dn));
        if !exists {
            self.requests.push(RefreshRequest {
                server: server.clone(),
                dn,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn drain(&mut self) -> Vec<RefreshRequest> {
        std::mem::take(&mut self.requests)
    }
}
