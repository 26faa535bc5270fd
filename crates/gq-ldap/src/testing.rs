//! In-memory directory servers for exercising the engine without a network

use crate::result_code::{
    ALREADY_EXISTS, NOT_ALLOWED_ON_NON_LEAF, NO_SUCH_OBJECT, SERVER_DOWN, SIZE_LIMIT_EXCEEDED,
    UNAVAILABLE_CRITICAL_EXTENSION, UNWILLING_TO_PERFORM,
};
use crate::session::{
    ConnectionProvider, DirectoryEntry, DirectorySession, OpStatus, SearchOutcome, SearchScope,
};
use async_trait::async_trait;
use gq_core::dn::{child_dn, explode_dn, normalize_dn};
use gq_core::{Error, Result, ServerId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Every protocol operation a session performed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Search {
        server: String,
        base: String,
        scope: SearchScope,
        managed: bool,
    },
    Add {
        server: String,
        dn: String,
        managed: bool,
    },
    Delete {
        server: String,
        dn: String,
        managed: bool,
    },
    Rename {
        server: String,
        dn: String,
        new_superior: String,
        managed: bool,
    },
}

impl Op {
    pub fn is_search(&self) -> bool {
        matches!(self, Op::Search { .. })
    }
    pub fn is_add(&self) -> bool {
        matches!(self, Op::Add { .. })
    }
    pub fn is_delete(&self) -> bool {
        matches!(self, Op::Delete { .. })
    }
    pub fn is_rename(&self) -> bool {
        matches!(self, Op::Rename { .. })
    }

    pub fn is_managed(&self) -> bool {
        match self {
            Op::Search { managed, .. }
            | Op::Add { managed, .. }
            | Op::Delete { managed, .. }
            | Op::Rename { managed, .. } => *managed,
        }
    }

    /// The same operation sent without the ManageDsaIT control.
    pub fn without_control(&self) -> Op {
        let mut op = self.clone();
        match &mut op {
            Op::Search { managed, .. }
            | Op::Add { managed, .. }
            | Op::Delete { managed, .. }
            | Op::Rename { managed, .. } => *managed = false,
        }
        op
    }
}

/// Behaviour knobs for one fake server.
#[derive(Debug, Clone)]
pub struct ServerBehavior {
    pub manage_dsa_it: bool,
    pub protocol_version: u32,
    pub rename_supported: bool,
    pub size_limit: Option<usize>,
    pub reachable: bool,
    /// Opens succeed but every operation reports the server down
    pub connection_drops: bool,
    /// Lowercased DNs whose add fails
    pub fail_add: HashSet<String>,
    /// Lowercased DNs whose delete fails
    pub fail_delete: HashSet<String>,
    /// Lowercased DNs that vanish just before their delete arrives
    pub vanish_on_delete: HashSet<String>,
}

impl Default for ServerBehavior {
    fn default() -> Self {
        Self {
            manage_dsa_it: true,
            protocol_version: 3,
            rename_supported: true,
            size_limit: None,
            reachable: true,
            connection_drops: false,
            fail_add: HashSet::new(),
            fail_delete: HashSet::new(),
            vanish_on_delete: HashSet::new(),
        }
    }
}

#[derive(Default)]
struct ServerData {
    entries: BTreeMap<String, DirectoryEntry>,
    behavior: ServerBehavior,
}

impl ServerData {
    fn key(dn: &str) -> String {
        normalize_dn(dn).unwrap_or_else(|_| dn.to_lowercase())
    }

    fn parent_key(key: &str) -> Option<String> {
        let components = explode_dn(key).ok()?;
        if components.len() <= 1 {
            return None;
        }
        Some(components[1..].join(","))
    }

    fn children(&self, key: &str) -> Vec<DirectoryEntry> {
        self.entries
            .iter()
            .filter(|(k, _)| Self::parent_key(k).as_deref() == Some(key))
            .map(|(_, e)| e.clone())
            .collect()
    }
}

/// A set of fake servers sharing one operation log.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    servers: Arc<Mutex<HashMap<ServerId, ServerData>>>,
    ops: Arc<Mutex<Vec<Op>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_server(&self, name: &str, behavior: ServerBehavior) {
        self.servers.lock().unwrap().insert(
            ServerId::new(name),
            ServerData {
                entries: BTreeMap::new(),
                behavior,
            },
        );
    }

    /// Seed an entry; parents are not checked.
    pub fn insert(&self, server: &str, entry: DirectoryEntry) {
        let mut servers = self.servers.lock().unwrap();
        let data = servers.get_mut(&ServerId::new(server)).unwrap();
        data.entries.insert(ServerData::key(&entry.dn), entry);
    }

    pub fn get(&self, server: &str, dn: &str) -> Option<DirectoryEntry> {
        let servers = self.servers.lock().unwrap();
        servers
            .get(&ServerId::new(server))
            .and_then(|d| d.entries.get(&ServerData::key(dn)).cloned())
    }

    pub fn contains(&self, server: &str, dn: &str) -> bool {
        self.get(server, dn).is_some()
    }

    pub fn entry_count(&self, server: &str) -> usize {
        self.servers.lock().unwrap()[&ServerId::new(server)]
            .entries
            .len()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }

    fn with_server<T>(&self, server: &ServerId, f: impl FnOnce(&mut ServerData) -> T) -> T {
        let mut servers = self.servers.lock().unwrap();
        f(servers.get_mut(server).unwrap())
    }
}

pub struct MemorySession {
    directory: MemoryDirectory,
    server: ServerId,
    connection_id: u64,
    protocol_version: u32,
}

impl MemorySession {
    /// Common preamble: reachability and control support.
    fn check(data: &ServerData, managed: bool) -> Option<OpStatus> {
        if !data.behavior.reachable || data.behavior.connection_drops {
            return Some(OpStatus::with_text(SERVER_DOWN, "connection reset"));
        }
        if managed && !data.behavior.manage_dsa_it {
            return Some(OpStatus::with_code(UNAVAILABLE_CRITICAL_EXTENSION));
        }
        None
    }
}

#[async_trait]
impl DirectorySession for MemorySession {
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
        self.directory.record(Op::Search {
            server: self.server.to_string(),
            base: base.to_string(),
            scope,
            managed: manage_dsa_it,
        });

        self.directory.with_server(&self.server, |data| {
            if let Some(status) = Self::check(data, manage_dsa_it) {
                return SearchOutcome::failed(status);
            }

            let key = ServerData::key(base);
            let Some(entry) = data.entries.get(&key) else {
                return SearchOutcome::failed(OpStatus::with_code(NO_SUCH_OBJECT));
            };

            match scope {
                SearchScope::Base => SearchOutcome {
                    entries: vec![entry.clone()],
                    status: OpStatus::success(),
                },
                SearchScope::OneLevel => {
                    let mut entries = data.children(&key);
                    let mut status = OpStatus::success();
                    if let Some(limit) = data.behavior.size_limit {
                        if entries.len() > limit {
                            entries.truncate(limit);
                            status = OpStatus::with_code(SIZE_LIMIT_EXCEEDED);
                        }
                    }
                    SearchOutcome { entries, status }
                }
            }
        })
    }

    async fn add(
        &mut self,
        dn: &str,
        attrs: &[(String, Vec<Vec<u8>>)],
        manage_dsa_it: bool,
    ) -> OpStatus {
        self.directory.record(Op::Add {
            server: self.server.to_string(),
            dn: dn.to_string(),
            managed: manage_dsa_it,
        });

        self.directory.with_server(&self.server, |data| {
            if let Some(status) = Self::check(data, manage_dsa_it) {
                return status;
            }

            let key = ServerData::key(dn);
            if data.behavior.fail_add.contains(&key) {
                return OpStatus::with_text(UNWILLING_TO_PERFORM, "add refused by test");
            }
            if data.entries.contains_key(&key) {
                return OpStatus::with_code(ALREADY_EXISTS);
            }
            if let Some(parent) = ServerData::parent_key(&key) {
                if !data.entries.contains_key(&parent) {
                    return OpStatus::with_code(NO_SUCH_OBJECT);
                }
            }

            data.entries.insert(
                key,
                DirectoryEntry {
                    dn: dn.to_string(),
                    attrs: attrs.to_vec(),
                },
            );
            OpStatus::success()
        })
    }

    async fn delete(&mut self, dn: &str, manage_dsa_it: bool) -> OpStatus {
        self.directory.record(Op::Delete {
            server: self.server.to_string(),
            dn: dn.to_string(),
            managed: manage_dsa_it,
        });

        self.directory.with_server(&self.server, |data| {
            if let Some(status) = Self::check(data, manage_dsa_it) {
                return status;
            }

            let key = ServerData::key(dn);
            if data.behavior.fail_delete.contains(&key) {
                return OpStatus::with_text(UNWILLING_TO_PERFORM, "delete refused by test");
            }
            if data.behavior.vanish_on_delete.contains(&key) {
                data.entries.remove(&key);
            }
            if !data.entries.contains_key(&key) {
                return OpStatus::with_code(NO_SUCH_OBJECT);
            }
            if !data.children(&key).is_empty() {
                return OpStatus::with_code(NOT_ALLOWED_ON_NON_LEAF);
            }
            data.entries.remove(&key);
            OpStatus::success()
        })
    }

    async fn rename(
        &mut self,
        dn: &str,
        new_rdn: &str,
        new_superior: &str,
        _delete_old_rdn: bool,
        manage_dsa_it: bool,
    ) -> OpStatus {
        self.directory.record(Op::Rename {
            server: self.server.to_string(),
            dn: dn.to_string(),
            new_superior: new_superior.to_string(),
            managed: manage_dsa_it,
        });

        self.directory.with_server(&self.server, |data| {
            if let Some(status) = Self::check(data, manage_dsa_it) {
                return status;
            }
            if !data.behavior.rename_supported {
                return OpStatus::with_text(UNWILLING_TO_PERFORM, "modrdn not supported");
            }

            let old_key = ServerData::key(dn);
            let superior_key = ServerData::key(new_superior);
            let new_dn = child_dn(new_rdn, new_superior);
            let new_key = ServerData::key(&new_dn);

            if !data.entries.contains_key(&old_key) || !data.entries.contains_key(&superior_key) {
                return OpStatus::with_code(NO_SUCH_OBJECT);
            }
            if data.entries.contains_key(&new_key) {
                return OpStatus::with_code(ALREADY_EXISTS);
            }

            // Relocate the entry and its whole subtree.
            let old_depth = explode_dn(dn).map(|c| c.len()).unwrap_or(0);
            let old_suffix = format!(",{}", old_key);
            let moved: Vec<String> = data
                .entries
                .keys()
                .filter(|k| **k == old_key || k.ends_with(&old_suffix))
                .cloned()
                .collect();
            for key in moved {
                let Some(mut entry) = data.entries.remove(&key) else {
                    continue;
                };
                let components = explode_dn(&entry.dn).unwrap_or_default();
                let keep = components.len().saturating_sub(old_depth);
                let mut parts = components[..keep].to_vec();
                parts.push(new_dn.clone());
                entry.dn = parts.join(",");
                data.entries.insert(ServerData::key(&entry.dn), entry);
            }
            OpStatus::success()
        })
    }

    async fn unbind(&mut self) {}
}

/// Hands out [`MemorySession`]s. With `shared` set, every open of one server
/// returns the same connection id, like a caching provider.
pub struct MemoryProvider {
    directory: MemoryDirectory,
    shared: bool,
    next_id: AtomicU64,
    down: Mutex<HashMap<ServerId, u32>>,
    pub opened: AtomicU32,
    pub closed: AtomicU32,
}

impl MemoryProvider {
    pub fn new(directory: MemoryDirectory, shared: bool) -> Self {
        Self {
            directory,
            shared,
            next_id: AtomicU64::new(1000),
            down: Mutex::new(HashMap::new()),
            opened: AtomicU32::new(0),
            closed: AtomicU32::new(0),
        }
    }

    pub fn open_sessions(&self) -> u32 {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionProvider for MemoryProvider {
    async fn open(&self, server: &ServerId) -> Result<Box<dyn DirectorySession>> {
        let state = {
            let servers = self.directory.servers.lock().unwrap();
            servers
                .get(server)
                .map(|d| (d.behavior.reachable, d.behavior.protocol_version))
        };

        let Some((reachable, protocol_version)) = state else {
            return Err(Error::UnknownServer(server.to_string()));
        };
        if !reachable {
            self.server_down(server);
            return Err(Error::ServerDown {
                server: server.to_string(),
                message: "connection refused".to_string(),
            });
        }

        let connection_id = if self.shared {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            std::hash::Hash::hash(server, &mut hasher);
            std::hash::Hasher::finish(&hasher)
        } else {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        };

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            directory: self.directory.clone(),
            server: server.clone(),
            connection_id,
            protocol_version,
        }))
    }

    async fn close(&self, _session: Box<dyn DirectorySession>, _force: bool) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn server_down(&self, server: &ServerId) {
        *self.down.lock().unwrap().entry(server.clone()).or_insert(0) += 1;
    }

    fn server_down_count(&self, server: &ServerId) -> u32 {
        self.down.lock().unwrap().get(server).copied().unwrap_or(0)
    }
}
