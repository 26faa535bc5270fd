//! servers command - list configured directory servers

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;
use gq_core::ServerConfig;
use gq_ldap::{ConnectionProvider, LdapConnectionProvider, ServerRegistry};

pub async fn execute(ctx: &CommandContext, check: bool) -> Result<()> {
    let servers = &ctx.config.servers;

    if servers.is_empty() {
        ctx.info("No servers configured");
        return Ok(());
    }

    let provider = LdapConnectionProvider::new(ServerRegistry::from_config(&ctx.config));
    let mut reachable = Vec::with_capacity(servers.len());

    for server in servers {
        let status = if check {
            let id = server.id();
            match provider.open(&id).await {
                Ok(session) => {
                    provider.close(session, true).await;
                    Some(Ok(()))
                }
                Err(e) => Some(Err(e.to_string())),
            }
        } else {
            None
        };
        reachable.push(status);
    }

    if ctx.is_json() {
        let rows: Vec<_> = servers
            .iter()
            .zip(&reachable)
            .map(|(server, status)| {
                serde_json::json!({
                    "name": server.name,
                    "url": server.server_url,
                    "bind_dn": describe_bind(server),
                    "protocol_version": server.protocol_version,
                    "rename_supported": server.supports_rename(),
                    "reachable": status.as_ref().map(|s| s.is_ok()),
                    "down_count": provider.server_down_count(&server.id()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for (server, status) in servers.iter().zip(&reachable) {
        let state = match status {
            Some(Ok(())) => format!(" {}", "up".green()),
            Some(Err(e)) => format!(" {} ({})", "down".red(), e),
            None => String::new(),
        };
        ctx.info(&format!(
            "{:<16} {} [{}, LDAPv{}]{}",
            server.name.cyan(),
            server.server_url,
            describe_bind(server),
            server.protocol_version,
            state
        ));
    }

    Ok(())
}

fn describe_bind(server: &ServerConfig) -> String {
    if server.is_anonymous() {
        "anonymous".to_string()
    } else {
        server.bind_dn.clone()
    }
}
