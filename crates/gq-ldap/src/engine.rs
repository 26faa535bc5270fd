//! Entry relocation engine
//!
//! Moves or copies a directory entry, optionally with its whole subtree, from
//! one location to a new parent on the same or another server. Within one
//! connection a move is a single modrdn; otherwise every entry is copied with
//! its exact attribute bytes and, for moves, deleted afterwards.
//!
//! Failures never abort the process. Each failure path pushes a message to
//! the caller's [`ErrorSink`] and yields `None`. Nothing is rolled back, so an
//! interrupted subtree move can leave copies at the target while the
//! originals remain at the source.

use crate::session::{
    ConnectionProvider, DirectoryEntry, DirectorySession, OpStatus, SearchOutcome, SearchScope,
};
use futures::future::{BoxFuture, FutureExt};
use gq_core::dn::{child_dn, leading_rdn, normalize_dn};
use gq_core::{Error, ErrorSink, MoveFlags, MoveRequest, ServerId};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Notified once per entry created at the target (not per deletion).
pub trait MoveProgress: Send {
    fn entry_moved(&mut self, from_dn: &str, to_dn: &str, new_dn: &str);
}

impl<F> MoveProgress for F
where
    F: FnMut(&str, &str, &str) + Send,
{
    fn entry_moved(&mut self, from_dn: &str, to_dn: &str, new_dn: &str) {
        self(from_dn, to_dn, new_dn)
    }
}

pub struct RelocationEngine<P> {
    provider: P,
}

impl<P: ConnectionProvider> RelocationEngine<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Relocate `request.source_dn` to sit directly below
    /// `request.target_parent_dn`, returning the new DN.
    pub async fn move_entry(
        &self,
        request: &MoveRequest,
        progress: &mut dyn MoveProgress,
        errors: &mut ErrorSink,
    ) -> Option<String> {
        debug!(
            source = %request.source_dn,
            source_server = %request.source_server,
            target = %request.target_parent_dn,
            target_server = %request.target_server,
            flags = %request.flags,
            "Moving entry"
        );

        if request.is_cross_server() && !request.flags.allows_cross_server() {
            errors.push(Error::CrossServerNotAllowed(request.source_dn.clone()).to_string());
            return None;
        }

        let mut source = match self.provider.open(&request.source_server).await {
            Ok(session) => session,
            Err(e) => {
                errors.push(e.to_string());
                return None;
            }
        };

        let mut target = match self.provider.open(&request.target_server).await {
            Ok(session) => session,
            Err(e) => {
                errors.push(e.to_string());
                self.provider.close(source, false).await;
                return None;
            }
        };

        let new_dn = self
            .relocate_root(request, source.as_mut(), target.as_mut(), progress, errors)
            .await;

        self.provider.close(source, false).await;
        self.provider.close(target, false).await;

        match &new_dn {
            Some(dn) => info!(source = %request.source_dn, new_dn = %dn, "Entry moved"),
            None => warn!(source = %request.source_dn, "Entry move failed"),
        }
        new_dn
    }

    async fn relocate_root(
        &self,
        request: &MoveRequest,
        source: &mut dyn DirectorySession,
        target: &mut dyn DirectorySession,
        progress: &mut dyn MoveProgress,
        errors: &mut ErrorSink,
    ) -> Option<String> {
        let outcome = search_managed(source, &request.source_dn, SearchScope::Base).await;
        if !outcome.status.is_success() {
            report(
                &self.provider,
                errors,
                &request.source_server,
                "Could not read",
                &request.source_dn,
                &outcome.status,
            );
            return None;
        }

        let Some(entry) = outcome.entries.into_iter().next() else {
            errors.push(format!(
                "Entry '{}' not found on server '{}'",
                request.source_dn, request.source_server
            ));
            return None;
        };

        let mut ctx = MoveContext {
            source,
            target,
            source_server: &request.source_server,
            target_server: &request.target_server,
            flags: request.flags,
            progress,
            errors,
            provider: &self.provider,
        };

        relocate(&mut ctx, entry, &request.target_parent_dn).await
    }
}

/// Everything the recursive worker threads through the call stack.
struct MoveContext<'a> {
    source: &'a mut dyn DirectorySession,
    target: &'a mut dyn DirectorySession,
    source_server: &'a ServerId,
    target_server: &'a ServerId,
    flags: MoveFlags,
    progress: &'a mut dyn MoveProgress,
    errors: &'a mut ErrorSink,
    provider: &'a dyn ConnectionProvider,
}

impl MoveContext<'_> {
    /// A native modrdn relocates a whole subtree atomically, but only when
    /// both ends share one connection and the source is being removed.
    fn can_rename(&self) -> bool {
        self.flags.deletes_moved()
            && self.source.connection_id() == self.target.connection_id()
            && self.source.protocol_version() >= 3
    }

    fn report_source(&mut self, action: &str, dn: &str, status: &OpStatus) {
        report(self.provider, self.errors, self.source_server, action, dn, status);
    }

    fn report_target(&mut self, action: &str, dn: &str, status: &OpStatus) {
        report(self.provider, self.errors, self.target_server, action, dn, status);
    }
}

fn report<P: ConnectionProvider + ?Sized>(
    provider: &P,
    errors: &mut ErrorSink,
    server: &ServerId,
    action: &str,
    dn: &str,
    status: &OpStatus,
) {
    if status.is_server_down() {
        provider.server_down(server);
    }
    errors.push(format!(
        "{} '{}' on server '{}': {}",
        action,
        dn,
        server,
        status.describe()
    ));
}

/// Move one already-fetched entry below `target_parent_dn`, then its
/// children. Returns the entry's new DN, or `None` if any part failed.
fn relocate<'c, 'a: 'c>(
    ctx: &'c mut MoveContext<'a>,
    entry: DirectoryEntry,
    target_parent_dn: &'c str,
) -> BoxFuture<'c, Option<String>> {
    async move {
        let source_dn = entry.dn.clone();
        let rdn = match leading_rdn(&source_dn) {
            Ok(rdn) => rdn,
            Err(e) => {
                ctx.errors.push(e.to_string());
                return None;
            }
        };
        let new_dn = child_dn(&rdn, target_parent_dn);

        if ctx.can_rename() {
            let status =
                rename_managed(&mut *ctx.source, &source_dn, &rdn, target_parent_dn).await;
            if !status.is_success() {
                ctx.report_source("Could not move", &source_dn, &status);
                return None;
            }
            debug!(from = %source_dn, to = %new_dn, "Renamed entry");
            ctx.progress.entry_moved(&source_dn, target_parent_dn, &new_dn);
            return Some(new_dn);
        }

        let status = add_managed(&mut *ctx.target, &new_dn, &entry.attrs).await;
        if !status.is_success() {
            ctx.report_target("Could not add new entry", &new_dn, &status);
            return None;
        }
        debug!(from = %source_dn, to = %new_dn, "Copied entry");
        ctx.progress.entry_moved(&source_dn, target_parent_dn, &new_dn);

        let mut ok = true;

        if ctx.flags.is_recursive() {
            // Children that failed stay at the source and show up in every
            // later wave; they are not retried.
            let mut failed: HashSet<String> = HashSet::new();
            loop {
                let outcome =
                    search_managed(&mut *ctx.source, &source_dn, SearchScope::OneLevel).await;
                if !outcome.status.is_success() && !outcome.status.is_size_limit_exceeded() {
                    ctx.report_source("Could not list children of", &source_dn, &outcome.status);
                    ok = false;
                    break;
                }

                let mut attempted = false;
                for child in outcome.entries {
                    let key = child_key(&child.dn);
                    if failed.contains(&key) {
                        continue;
                    }
                    attempted = true;
                    if relocate(ctx, child, &new_dn).await.is_none() {
                        failed.insert(key);
                        ok = false;
                    }
                }

                // Deleted children make room for entries a size limit hid.
                if !ctx.flags.deletes_moved() || !attempted {
                    break;
                }
            }
        }

        if ctx.flags.deletes_moved() && ok {
            let status = delete_managed(&mut *ctx.source, &source_dn).await;
            if !status.is_success() && !status.is_no_such_object() {
                ctx.report_source("Could not delete", &source_dn, &status);
                ok = false;
            }
        }

        ok.then_some(new_dn)
    }
    .boxed()
}

fn child_key(dn: &str) -> String {
    normalize_dn(dn).unwrap_or_else(|_| dn.to_lowercase())
}

// =========================================================================
// ManageDsaIT with fallback: each operation is tried at most twice
// =========================================================================

async fn search_managed(
    session: &mut dyn DirectorySession,
    base: &str,
    scope: SearchScope,
) -> SearchOutcome {
    let outcome = session.search(base, scope, true).await;
    if outcome.status.control_unsupported() {
        debug!(base, "ManageDsaIT unsupported, searching without controls");
        return session.search(base, scope, false).await;
    }
    outcome
}

async fn add_managed(
    session: &mut dyn DirectorySession,
    dn: &str,
    attrs: &[(String, Vec<Vec<u8>>)],
) -> OpStatus {
    let status = session.add(dn, attrs, true).await;
    if status.control_unsupported() {
        debug!(dn, "ManageDsaIT unsupported, adding without controls");
        return session.add(dn, attrs, false).await;
    }
    status
}

async fn delete_managed(session: &mut dyn DirectorySession, dn: &str) -> OpStatus {
    let status = session.delete(dn, true).await;
    if status.control_unsupported() {
        debug!(dn, "ManageDsaIT unsupported, deleting without controls");
        return session.delete(dn, false).await;
    }
    status
}

async fn rename_managed(
    session: &mut dyn DirectorySession,
    dn: &str,
    rdn: &str,
    new_superior: &str,
) -> OpStatus {
    let status = session.rename(dn, rdn, new_superior, true, true).await;
    if status.control_unsupported() {
        debug!(dn, "ManageDsaIT unsupported, renaming without controls");
        return session.rename(dn, rdn, new_superior, true, false).await;
    }
    status
}
