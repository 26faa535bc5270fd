//! Shared driver for mv and cp

use super::CommandContext;
use crate::progress::{create_spinner, format_duration, truncate_dn};
use anyhow::{bail, Result};
use colored::Colorize;
use gq_core::dn::parent_dn;
use gq_core::{check_move, Error, ErrorSink, MoveFlags, MoveRequest, RefreshQueue, ServerId};
use gq_ldap::{LdapConnectionProvider, RelocationEngine, ServerRegistry};
use indicatif::ProgressBar;
use std::time::Instant;

pub struct TransferOptions {
    /// Server holding the source entry
    pub from: String,
    /// Server receiving the entry; defaults to `from`
    pub to: Option<String>,
    pub recursive: bool,
    pub cross_server: bool,
    /// Remove the source after a successful copy
    pub delete_moved: bool,
}

impl TransferOptions {
    pub fn flags(&self) -> MoveFlags {
        let mut flags = MoveFlags::NONE;
        if self.recursive {
            flags |= MoveFlags::RECURSIVE;
        }
        if self.cross_server {
            flags |= MoveFlags::CROSS_SERVER;
        }
        if self.delete_moved {
            flags |= MoveFlags::DELETE_MOVED;
        }
        flags
    }

    fn verb(&self) -> &'static str {
        if self.delete_moved {
            "move"
        } else {
            "copy"
        }
    }
}

pub async fn execute(
    ctx: &CommandContext,
    source_dn: &str,
    target_parent_dn: &str,
    opts: TransferOptions,
) -> Result<()> {
    let source_server = ServerId::new(opts.from.as_str());
    let target_server = ServerId::new(opts.to.as_deref().unwrap_or(&opts.from));

    for server in [&source_server, &target_server] {
        if ctx.config.server(server).is_none() {
            return Err(Error::UnknownServer(server.to_string()).into());
        }
    }

    check_move(
        &source_server,
        source_dn,
        &target_server,
        target_parent_dn,
        opts.recursive,
    )?;

    let request = MoveRequest::new(
        source_dn,
        source_server.clone(),
        target_parent_dn,
        target_server.clone(),
        opts.flags(),
    );
    ctx.debug(&format!(
        "{} {} ({}) -> {} ({}) flags={}",
        opts.verb(),
        request.source_dn,
        request.source_server,
        request.target_parent_dn,
        request.target_server,
        request.flags
    ));

    let provider = LdapConnectionProvider::new(ServerRegistry::from_config(&ctx.config));
    let engine = RelocationEngine::new(provider);

    let pb = if ctx.quiet || ctx.is_json() {
        ProgressBar::hidden()
    } else {
        create_spinner(&truncate_dn(source_dn, 60))
    };

    let mut moved: Vec<(String, String)> = Vec::new();
    let mut progress = |from_dn: &str, _to_dn: &str, new_dn: &str| {
        pb.inc(1);
        pb.set_message(truncate_dn(new_dn, 60));
        moved.push((from_dn.to_string(), new_dn.to_string()));
    };

    let title = if opts.delete_moved {
        "Moving entries"
    } else {
        "Copying entries"
    };
    let mut errors = ErrorSink::new(title);
    let started = Instant::now();

    let new_dn = engine
        .move_entry(&request, &mut progress, &mut errors)
        .await;

    pb.finish_and_clear();
    engine.provider().close_all().await;

    let messages = errors.flush();

    let Some(new_dn) = new_dn else {
        if ctx.is_json() {
            println!(
                "{}",
                serde_json::json!({
                    "status": "failed",
                    "source": source_dn,
                    "entries": moved.len(),
                    "errors": messages,
                })
            );
        } else {
            for message in &messages {
                ctx.error(&format!("{} {}", "error:".red().bold(), message));
            }
        }
        bail!("Failed to {} '{}'", opts.verb(), source_dn);
    };

    let mut refresh = RefreshQueue::new();
    refresh.push(&target_server, target_parent_dn);
    if opts.delete_moved {
        if let Ok(Some(parent)) = parent_dn(source_dn) {
            refresh.push(&source_server, parent);
        }
    }
    let refresh = refresh.drain();

    if ctx.is_json() {
        let changed: Vec<_> = refresh
            .iter()
            .map(|r| serde_json::json!({ "server": r.server.as_str(), "dn": r.dn }))
            .collect();
        let entries: Vec<_> = moved
            .iter()
            .map(|(from, to)| serde_json::json!({ "from": from, "to": to }))
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "source": source_dn,
                "new_dn": new_dn,
                "entries": entries,
                "changed_parents": changed,
                "warnings": messages,
            })
        );
        return Ok(());
    }

    for message in &messages {
        ctx.error(&format!("{} {}", "warning:".yellow().bold(), message));
    }

    for (from, to) in &moved {
        ctx.debug(&format!("{} -> {}", from, to));
    }

    ctx.info(&format!(
        "{} {} {} {} ({} entries in {})",
        if opts.delete_moved { "Moved" } else { "Copied" }.green(),
        source_dn.cyan(),
        "->".dimmed(),
        new_dn.cyan(),
        moved.len(),
        format_duration(started.elapsed().as_secs())
    ));

    for request in &refresh {
        ctx.debug(&format!("changed: {} on {}", request.dn, request.server));
    }

    Ok(())
}
