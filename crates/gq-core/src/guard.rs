//! Caller-side checks that must pass before a move is handed to the engine

use crate::dn::{dn_eq, is_same_or_descendant};
use crate::types::ServerId;
use crate::{Error, Result};

/// Reject moves of an entry onto itself, and recursive moves into the
/// source's own subtree.
pub fn check_move(
    source_server: &ServerId,
    source_dn: &str,
    target_server: &ServerId,
    target_parent_dn: &str,
    recursive: bool,
) -> Result<()> {
    if source_server != target_server {
        return Ok(());
    }

    if dn_eq(source_dn, target_parent_dn) {
        return Err(Error::SelfMove(source_dn.to_string()));
    }

    if recursive && is_same_or_descendant(target_parent_dn, source_dn) {
        return Err(Error::TargetBelowSource {
            source_dn: source_dn.to_string(),
            target_dn: target_parent_dn.to_string(),
        });
    }

    Ok(())
}
