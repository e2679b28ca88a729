//! Paths and limits for resolv.conf management.

use std::path::PathBuf;

/// Default system-visible resolver configuration.
pub const DEFAULT_EXTERNAL_PATH: &str = "/etc/resolv.conf";

/// Default location of the service-managed copy.
pub const DEFAULT_MANAGED_PATH: &str = "/run/resolvconf-sync/resolv.conf";

/// Nameserver count the C resolver library honours (`MAXNS`).
pub const DEFAULT_MAX_NAMESERVERS: usize = 3;

/// Search domain count the C resolver library honours (`MAXDNSRCH`).
pub const DEFAULT_MAX_SEARCH_DOMAINS: usize = 6;

/// Total characters of search domains the C resolver library honours.
pub const DEFAULT_MAX_SEARCH_LENGTH: usize = 256;

/// Configuration for reading the external file and writing the managed copy.
///
/// # Example
///
/// ```
/// use resolvconf_sync::ResolvConfConfig;
///
/// let config = ResolvConfConfig::new()
///     .with_external_path("/tmp/resolv.conf")
///     .with_managed_path("/tmp/run/resolv.conf")
///     .with_read_external(false);
///
/// assert_eq!(config.external_path.to_str(), Some("/tmp/resolv.conf"));
/// assert!(!config.read_external);
/// assert_eq!(config.max_nameservers, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvConfConfig {
    /// File third parties may edit, usually `/etc/resolv.conf`.
    pub external_path: PathBuf,

    /// File written by this crate. The external path may be a symlink to it.
    pub managed_path: PathBuf,

    /// Name written into the managed copy's header.
    pub service_name: String,

    /// Whether newly created state ingests the external file.
    pub read_external: bool,

    /// Soft limit after which an advisory comment precedes further
    /// `nameserver` lines. Entries past it are still written.
    pub max_nameservers: usize,

    /// Hard limit on the number of written search domains.
    pub max_search_domains: usize,

    /// Hard limit on the summed length of written search domains.
    pub max_search_length: usize,
}

impl ResolvConfConfig {
    /// Creates a config with the default system paths and resolver limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            external_path: PathBuf::from(DEFAULT_EXTERNAL_PATH),
            managed_path: PathBuf::from(DEFAULT_MANAGED_PATH),
            service_name: env!("CARGO_PKG_NAME").to_string(),
            read_external: true,
            max_nameservers: DEFAULT_MAX_NAMESERVERS,
            max_search_domains: DEFAULT_MAX_SEARCH_DOMAINS,
            max_search_length: DEFAULT_MAX_SEARCH_LENGTH,
        }
    }

    /// Overrides the external file path.
    #[must_use]
    pub fn with_external_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.external_path = path.into();
        self
    }

    /// Overrides the managed copy path.
    #[must_use]
    pub fn with_managed_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.managed_path = path.into();
        self
    }

    /// Overrides the service name shown in the managed copy's header.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Enables or disables ingestion of the external file.
    #[must_use]
    pub const fn with_read_external(mut self, enabled: bool) -> Self {
        self.read_external = enabled;
        self
    }

    /// Overrides the advisory nameserver limit.
    #[must_use]
    pub const fn with_max_nameservers(mut self, max: usize) -> Self {
        self.max_nameservers = max;
        self
    }

    /// Overrides both search domain caps.
    #[must_use]
    pub const fn with_search_limits(mut self, max_domains: usize, max_length: usize) -> Self {
        self.max_search_domains = max_domains;
        self.max_search_length = max_length;
        self
    }
}

impl Default for ResolvConfConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_defaults() {
        let c = ResolvConfConfig::new();
        assert_eq!(c.external_path, PathBuf::from("/etc/resolv.conf"));
        assert_eq!(c.managed_path, PathBuf::from(DEFAULT_MANAGED_PATH));
        assert_eq!(c.service_name, "resolvconf-sync");
        assert!(c.read_external);
        assert_eq!(c.max_nameservers, 3);
        assert_eq!(c.max_search_domains, 6);
        assert_eq!(c.max_search_length, 256);
    }

    #[test]
    fn builders_override() {
        let c = ResolvConfConfig::new()
            .with_max_nameservers(2)
            .with_search_limits(10, 128)
            .with_service_name("netd");
        assert_eq!(c.max_nameservers, 2);
        assert_eq!(c.max_search_domains, 10);
        assert_eq!(c.max_search_length, 128);
        assert_eq!(c.service_name, "netd");
        assert_eq!(c, c.clone());
    }
}
