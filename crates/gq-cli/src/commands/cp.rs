//! cp command - copy an entry below a new parent, leaving the source intact

use super::transfer::{execute as transfer_execute, TransferOptions};
use super::CommandContext;
use anyhow::Result;

pub async fn execute(
    ctx: &CommandContext,
    source_dn: &str,
    target_parent_dn: &str,
    from: &str,
    to: Option<&str>,
    recursive: bool,
    cross_server: bool,
) -> Result<()> {
    let opts = TransferOptions {
        from: from.to_string(),
        to: to.map(str::to_string),
        recursive,
        cross_server,
        delete_moved: false,
    };

    transfer_execute(ctx, source_dn, target_parent_dn, opts).await
}
