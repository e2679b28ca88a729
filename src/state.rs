//! Service-owned nameserver and search domain lists.
//!
//! [`ResolverState`] lives as long as the owning service and is handed by
//! `&mut` to [`ResolvConf::reconcile`](crate::ResolvConf::reconcile) and
//! [`ResolvConf::regenerate`](crate::ResolvConf::regenerate). Entries carry a
//! transient `marked` bit used by the reader's mark-and-sweep pass:
//!
//! 1. mark every `System` server and every search domain,
//! 2. re-add everything found in the external file, which unmarks it,
//! 3. drop whatever is still marked.

use crate::address::ServerAddress;
use crate::domain::normalize_search_domain;
use crate::error::Result;
use std::collections::HashSet;
use std::fmt;
use std::time::SystemTime;

/// Where a nameserver came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerOrigin {
    /// Learned from the external file. Owned by the reader.
    System,
    /// Configured fallback, used when nothing else is known.
    Fallback,
    /// Pushed by a network collaborator for one interface.
    Link {
        /// Kernel interface index.
        ifindex: u32,
    },
}

impl fmt::Display for ServerOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Fallback => f.write_str("fallback"),
            Self::Link { ifindex } => write!(f, "link:{ifindex}"),
        }
    }
}

/// A nameserver with its origin and cached rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    address: ServerAddress,
    origin: ServerOrigin,
    rendered: String,
    marked: bool,
}

impl ServerEntry {
    fn new(origin: ServerOrigin, address: ServerAddress) -> Self {
        Self {
            rendered: address.to_string(),
            address,
            origin,
            marked: false,
        }
    }

    /// The parsed server address.
    #[must_use]
    pub const fn address(&self) -> &ServerAddress {
        &self.address
    }

    /// Where this entry came from.
    #[must_use]
    pub const fn origin(&self) -> ServerOrigin {
        self.origin
    }

    /// The address as written on a `nameserver` line.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

/// A normalized search domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDomainEntry {
    name: String,
    marked: bool,
}

impl SearchDomainEntry {
    /// The normalized domain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Entries removed by a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Swept {
    /// System servers dropped.
    pub servers: usize,
    /// System search domains dropped.
    pub search_domains: usize,
}

/// The authoritative resolver configuration of a running service.
///
/// # Example
///
/// ```
/// use resolvconf_sync::{ResolverState, ServerOrigin};
///
/// let mut state = ResolverState::default();
/// state.add_server(ServerOrigin::Fallback, "192.0.2.53".parse()?);
/// state.add_search_domain("corp.example")?;
///
/// assert_eq!(state.active_server().map(|s| s.as_str()), Some("192.0.2.53"));
/// # Ok::<(), resolvconf_sync::ResolvConfError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ResolverState {
    servers: Vec<ServerEntry>,
    search_domains: Vec<SearchDomainEntry>,
    external_mtime: Option<SystemTime>,
    read_external: bool,
    active: Option<ServerAddress>,
}

impl ResolverState {
    /// Creates empty state, optionally ingesting the external file.
    #[must_use]
    pub const fn new(read_external: bool) -> Self {
        Self {
            servers: Vec::new(),
            search_domains: Vec::new(),
            external_mtime: None,
            read_external,
            active: None,
        }
    }

    /// Servers in priority order, possibly repeating an address across origins.
    #[must_use]
    pub fn servers(&self) -> &[ServerEntry] {
        &self.servers
    }

    /// All search domains, in insertion order.
    #[must_use]
    pub fn search_domains(&self) -> &[SearchDomainEntry] {
        &self.search_domains
    }

    /// Whether the external file is ingested at all.
    #[must_use]
    pub const fn read_external(&self) -> bool {
        self.read_external
    }

    /// Enables or disables ingestion of the external file.
    ///
    /// Re-enabling forgets the recorded modification time so the next pass
    /// reads the file even if it did not change meanwhile.
    pub fn set_read_external(&mut self, enabled: bool) {
        if enabled && !self.read_external {
            self.external_mtime = None;
        }
        self.read_external = enabled;
    }

    /// Modification time of the external file at the last ingestion.
    #[must_use]
    pub const fn external_mtime(&self) -> Option<SystemTime> {
        self.external_mtime
    }

    pub(crate) const fn set_external_mtime(&mut self, mtime: Option<SystemTime>) {
        self.external_mtime = mtime;
    }

    /// Adds a server, or re-confirms it if `origin` already lists `address`.
    ///
    /// Returns `true` if a new entry was appended.
    pub fn add_server(&mut self, origin: ServerOrigin, address: ServerAddress) -> bool {
        if let Some(existing) = self
            .servers
            .iter_mut()
            .find(|s| s.origin == origin && s.address == address)
        {
            existing.marked = false;
            return false;
        }

        self.servers.push(ServerEntry::new(origin, address));
        if self.active.is_none() {
            self.active = Some(address);
        }
        true
    }

    /// Removes the entry `origin` holds for `address`.
    pub fn remove_server(&mut self, origin: ServerOrigin, address: &ServerAddress) -> bool {
        let before = self.servers.len();
        self.servers
            .retain(|s| !(s.origin == origin && s.address == *address));
        let removed = self.servers.len() != before;
        if removed {
            self.repair_active();
        }
        removed
    }

    /// Adds a search domain, or re-confirms it if already present.
    ///
    /// Returns `true` if a new entry was appended.
    ///
    /// # Errors
    ///
    /// Returns [`ResolvConfError::InvalidDomain`](crate::ResolvConfError::InvalidDomain)
    /// if `domain` does not validate.
    pub fn add_search_domain(&mut self, domain: &str) -> Result<bool> {
        let name = normalize_search_domain(domain)?;
        if let Some(existing) = self.search_domains.iter_mut().find(|d| d.name == name) {
            existing.marked = false;
            return Ok(false);
        }
        self.search_domains.push(SearchDomainEntry {
            name,
            marked: false,
        });
        Ok(true)
    }

    /// Removes a search domain, matching on its normalized form.
    pub fn remove_search_domain(&mut self, domain: &str) -> bool {
        let Ok(name) = normalize_search_domain(domain) else {
            return false;
        };
        let before = self.search_domains.len();
        self.search_domains.retain(|d| d.name != name);
        self.search_domains.len() != before
    }

    /// The server queries currently go to.
    #[must_use]
    pub fn active_server(&self) -> Option<&ServerEntry> {
        let active = self.active.as_ref()?;
        self.servers.iter().find(|s| s.address == *active)
    }

    /// Points the active server at `address`. Fails if no entry has it.
    pub fn set_active_server(&mut self, address: &ServerAddress) -> bool {
        if self.servers.iter().any(|s| s.address == *address) {
            self.active = Some(*address);
            true
        } else {
            false
        }
    }

    /// Fails over to the entry after the active one, wrapping around.
    pub fn next_server(&mut self) -> Option<&ServerEntry> {
        let current = self
            .active
            .and_then(|a| self.servers.iter().position(|s| s.address == a));
        let next = match current {
            Some(i) => self.servers[i + 1..]
                .iter()
                .chain(&self.servers[..i])
                .find(|s| s.address != self.servers[i].address),
            None => self.servers.first(),
        };
        if let Some(next) = next {
            self.active = Some(next.address);
        }
        self.active_server()
    }

    /// Points the active server at the first entry.
    pub(crate) fn reset_active_to_first(&mut self) -> Option<&ServerEntry> {
        self.active = self.servers.first().map(|s| s.address);
        self.servers.first()
    }

    fn repair_active(&mut self) {
        let valid = self
            .active
            .is_some_and(|a| self.servers.iter().any(|s| s.address == a));
        if !valid {
            self.active = self.servers.first().map(|s| s.address);
        }
    }

    pub(crate) fn mark_system_servers(&mut self) {
        for server in &mut self.servers {
            if server.origin == ServerOrigin::System {
                server.marked = true;
            }
        }
    }

    pub(crate) fn mark_search_domains(&mut self) {
        for domain in &mut self.search_domains {
            domain.marked = true;
        }
    }

    /// Drops every entry still marked.
    pub(crate) fn sweep_marked(&mut self) -> Swept {
        let (servers, domains) = (self.servers.len(), self.search_domains.len());
        self.servers.retain(|s| !s.marked);
        self.search_domains.retain(|d| !d.marked);
        self.repair_active();
        Swept {
            servers: servers - self.servers.len(),
            search_domains: domains - self.search_domains.len(),
        }
    }

    /// Forgets everything learned from the external file.
    pub(crate) fn clear_system(&mut self) -> Swept {
        self.mark_system_servers();
        self.mark_search_domains();
        self.external_mtime = None;
        self.sweep_marked()
    }

    /// Servers across all origins, first occurrence of each address only.
    #[must_use]
    pub fn compile_servers(&self) -> Vec<&ServerEntry> {
        let mut seen = HashSet::new();
        self.servers
            .iter()
            .filter(|s| seen.insert(s.address))
            .collect()
    }

    /// Search domains in order.
    #[must_use]
    pub fn compile_search_domains(&self) -> Vec<&str> {
        self.search_domains.iter().map(|d| d.name.as_str()).collect()
    }
}

impl Default for ResolverState {
    fn default() -> Self {
        Self::new(true)
    }
}
