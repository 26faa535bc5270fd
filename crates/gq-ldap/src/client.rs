//! LDAP client implementation
//!
//! Connects and binds to configured servers with `ldap3`, caches bound
//! connections per server, and tracks how often each server was found down.
//! Supports LDAP, LDAPS (SSL), and STARTTLS connections.

use crate::result_code::SERVER_DOWN;
use crate::session::{
    ConnectionProvider, DirectoryEntry, DirectorySession, OpStatus, SearchOutcome, SearchScope,
    ENGINE_SEARCH_ATTRS, MANAGE_DSA_IT_OID, MATCH_ALL_FILTER,
};
use async_trait::async_trait;
use gq_core::{Error, GqConfig, Result, ServerConfig, ServerId};
use ldap3::controls::RawControl;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

// =========================================================================
// Server registry
// =========================================================================

struct ServerState {
    config: ServerConfig,
    down_count: AtomicU32,
}

/// Configured servers plus their health counters
pub struct ServerRegistry {
    servers: HashMap<ServerId, ServerState>,
}

impl ServerRegistry {
    pub fn new(servers: Vec<ServerConfig>) -> Self {
        let servers = servers
            .into_iter()
            .map(|config| {
                (
                    config.id(),
                    ServerState {
                        config,
                        down_count: AtomicU32::new(0),
                    },
                )
            })
            .collect();
        Self { servers }
    }

    pub fn from_config(config: &GqConfig) -> Self {
        Self::new(config.servers.clone())
    }

    pub fn get(&self, id: &ServerId) -> Option<&ServerConfig> {
        self.servers.get(id).map(|s| &s.config)
    }

    pub fn ids(&self) -> Vec<ServerId> {
        let mut ids: Vec<ServerId> = self.servers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn mark_down(&self, id: &ServerId) {
        if let Some(state) = self.servers.get(id) {
            let count = state.down_count.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(server = %id, count, "LDAP server marked down");
        }
    }

    pub fn down_count(&self, id: &ServerId) -> u32 {
        self.servers
            .get(id)
            .map(|s| s.down_count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

// =========================================================================
// Session
// =========================================================================

/// A bound `ldap3` handle. Clones of one cached handle share a connection id.
pub struct LdapSession {
    server: ServerId,
    connection_id: u64,
    protocol_version: u32,
    timeout: Duration,
    ldap: Ldap,
}

impl LdapSession {
    /// Arm the next operation with the configured timeout and, optionally,
    /// a critical ManageDsaIT control.
    fn prepare(&mut self, manage_dsa_it: bool) -> &mut Ldap {
        let ldap = self.ldap.with_timeout(self.timeout);
        if manage_dsa_it {
            ldap.with_controls(manage_dsa_it_control())
        } else {
            ldap
        }
    }
}

fn manage_dsa_it_control() -> RawControl {
    RawControl {
        ctype: MANAGE_DSA_IT_OID.to_string(),
        crit: true,
        val: None,
    }
}

fn status_from(result: ldap3::LdapResult) -> OpStatus {
    OpStatus {
        rc: result.rc,
        matched: result.matched,
        text: result.text,
    }
}

/// A failed request/response exchange means the connection is gone.
fn transport_failure(err: LdapError) -> OpStatus {
    OpStatus::with_text(SERVER_DOWN, err.to_string())
}

fn entry_from(entry: SearchEntry) -> DirectoryEntry {
    let mut attrs: Vec<(String, Vec<Vec<u8>>)> = entry
        .attrs
        .into_iter()
        .map(|(name, values)| (name, values.into_iter().map(String::into_bytes).collect()))
        .collect();
    attrs.extend(entry.bin_attrs);
    attrs.sort_by(|a, b| a.0.cmp(&b.0));

    DirectoryEntry {
        dn: entry.dn,
        attrs,
    }
}

fn scope_from(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
    }
}

#[async_trait]
impl DirectorySession for LdapSession {
    fn connection_id(&self) -> u64 {
        self.connection_id
    }

    fn server(&self) -> &ServerId {
        &self.server
    }

    fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        manage_dsa_it: bool,
    ) -> SearchOutcome {
        debug!(server = %self.server, base, ?scope, manage_dsa_it, "LDAP search");

        let result = self
            .prepare(manage_dsa_it)
            .search(
                base,
                scope_from(scope),
                MATCH_ALL_FILTER,
                ENGINE_SEARCH_ATTRS.to_vec(),
            )
            .await;

        match result {
            Ok(result) => {
                let entries = result
                    .0
                    .into_iter()
                    .filter(|e| !e.is_ref())
                    .map(|e| entry_from(SearchEntry::construct(e)))
                    .collect();
                SearchOutcome {
                    entries,
                    status: status_from(result.1),
                }
            }
            Err(e) => SearchOutcome::failed(transport_failure(e)),
        }
    }

    async fn add(
        &mut self,
        dn: &str,
        attrs: &[(String, Vec<Vec<u8>>)],
        manage_dsa_it: bool,
    ) -> OpStatus {
        debug!(server = %self.server, dn, attributes = attrs.len(), "LDAP add");

        let mods: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = attrs
            .iter()
            .map(|(name, values)| (name.as_bytes().to_vec(), values.iter().cloned().collect()))
            .collect();

        match self.prepare(manage_dsa_it).add(dn, mods).await {
            Ok(result) => status_from(result),
            Err(e) => transport_failure(e),
        }
    }

    async fn delete(&mut self, dn: &str, manage_dsa_it: bool) -> OpStatus {
        debug!(server = %self.server, dn, "LDAP delete");

        match self.prepare(manage_dsa_it).delete(dn).await {
            Ok(result) => status_from(result),
            Err(e) => transport_failure(e),
        }
    }

    async fn rename(
        &mut self,
        dn: &str,
        new_rdn: &str,
        new_superior: &str,
        delete_old_rdn: bool,
        manage_dsa_it: bool,
    ) -> OpStatus {
        debug!(server = %self.server, dn, new_rdn, new_superior, "LDAP modrdn");

        match self
            .prepare(manage_dsa_it)
            .modifydn(dn, new_rdn, delete_old_rdn, Some(new_superior))
            .await
        {
            Ok(result) => status_from(result),
            Err(e) => transport_failure(e),
        }
    }

    async fn unbind(&mut self) {
        if let Err(e) = self.ldap.unbind().await {
            debug!(server = %self.server, error = %e, "LDAP unbind failed");
        }
    }
}

/// A URL ldap3 cannot use is a configuration problem; anything else means
/// the server could not be reached.
fn connect_error(server: &str, err: LdapError) -> Error {
    match err {
        LdapError::UrlParsing { .. } | LdapError::UnknownScheme(_) => Error::ConnectFailed {
            server: server.to_string(),
            message: err.to_string(),
        },
        err => Error::ServerDown {
            server: server.to_string(),
            message: err.to_string(),
        },
    }
}

// =========================================================================
// Connection provider
// =========================================================================

struct Cached<H> {
    handle: H,
    connection_id: u64,
}

/// One cached handle per server. The lock is never held across an await.
struct ConnectionCache<H> {
    entries: RwLock<HashMap<ServerId, Cached<H>>>,
}

impl<H: Clone> ConnectionCache<H> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, server: &ServerId) -> Option<(H, u64)> {
        self.entries
            .read()
            .get(server)
            .map(|c| (c.handle.clone(), c.connection_id))
    }

    fn insert(&self, server: &ServerId, handle: H, connection_id: u64) {
        self.entries.write().insert(
            server.clone(),
            Cached {
                handle,
                connection_id,
            },
        );
    }

    fn evict(&self, server: &ServerId) -> bool {
        self.entries.write().remove(server).is_some()
    }

    /// Evict only if the cached handle is the given connection.
    fn evict_connection(&self, server: &ServerId, connection_id: u64) -> bool {
        let mut entries = self.entries.write();
        if entries
            .get(server)
            .is_some_and(|c| c.connection_id == connection_id)
        {
            entries.remove(server);
            true
        } else {
            false
        }
    }

    fn drain(&self) -> Vec<(ServerId, H)> {
        self.entries
            .write()
            .drain()
            .map(|(server, c)| (server, c.handle))
            .collect()
    }
}

/// Opens bound `ldap3` sessions for configured servers
pub struct LdapConnectionProvider {
    registry: ServerRegistry,
    cache: ConnectionCache<Ldap>,
}

impl LdapConnectionProvider {
    pub fn new(registry: ServerRegistry) -> Self {
        Self {
            registry,
            cache: ConnectionCache::new(),
        }
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    /// Drop and unbind every cached connection
    pub async fn close_all(&self) {
        for (server, mut ldap) in self.cache.drain() {
            if let Err(e) = ldap.unbind().await {
                debug!(server = %server, error = %e, "LDAP unbind failed");
            }
        }
        info!("LDAP connection cache cleared");
    }

    /// Create LDAP connection with proper TLS settings and bind
    async fn create_connection(&self, config: &ServerConfig) -> Result<Ldap> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(config.timeout_seconds))
            .set_starttls(config.start_tls)
            .set_no_tls_verify(config.skip_tls_verify);

        debug!(server = %config.name, url = %config.server_url, "Connecting to LDAP server");

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &config.server_url)
            .await
            .map_err(|e| connect_error(&config.name, e))?;

        ldap3::drive!(conn);

        if config.is_anonymous() {
            return Ok(ldap);
        }

        let result = ldap
            .simple_bind(&config.bind_dn, &config.bind_password)
            .await
            .map_err(|e| Error::ServerDown {
                server: config.name.clone(),
                message: e.to_string(),
            })?;

        if result.rc != 0 {
            let _ = ldap.unbind().await;
            return Err(Error::BindFailed {
                server: config.name.clone(),
                message: status_from(result).describe(),
            });
        }

        Ok(ldap)
    }
}

#[async_trait]
impl ConnectionProvider for LdapConnectionProvider {
    #[instrument(skip(self, server), fields(server = %server))]
    async fn open(&self, server: &ServerId) -> Result<Box<dyn DirectorySession>> {
        let config = self
            .registry
            .get(server)
            .ok_or_else(|| Error::UnknownServer(server.to_string()))?;

        let timeout = Duration::from_secs(config.timeout_seconds);

        if config.cache_connections {
            if let Some((ldap, connection_id)) = self.cache.get(server) {
                debug!("Reusing cached LDAP connection {}", connection_id);
                return Ok(Box::new(LdapSession {
                    server: server.clone(),
                    connection_id,
                    protocol_version: config.protocol_version,
                    timeout,
                    ldap,
                }));
            }
        }

        let ldap = match self.create_connection(config).await {
            Ok(ldap) => ldap,
            Err(e) => {
                if e.is_server_down() {
                    self.registry.mark_down(server);
                }
                return Err(e);
            }
        };

        let connection_id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        info!(connection_id, "LDAP connection established");

        if config.cache_connections {
            self.cache.insert(server, ldap.clone(), connection_id);
        }

        Ok(Box::new(LdapSession {
            server: server.clone(),
            connection_id,
            protocol_version: config.protocol_version,
            timeout,
            ldap,
        }))
    }

    async fn close(&self, mut session: Box<dyn DirectorySession>, force: bool) {
        let server = session.server().clone();
        let caching = self
            .registry
            .get(&server)
            .map(|c| c.cache_connections)
            .unwrap_or(false);

        if caching && !force {
            return;
        }

        self.cache.evict_connection(&server, session.connection_id());

        session.unbind().await;
        debug!(server = %server, force, "LDAP session closed");
    }

    fn server_down(&self, server: &ServerId) {
        self.registry.mark_down(server);
        if self.cache.evict(server) {
            debug!(server = %server, "Dropped cached connection to down server");
        }
    }

    fn server_down_count(&self, server: &ServerId) -> u32 {
        self.registry.down_count(server)
    }
}
