//! Handle tying the external file and the managed copy together.
//!
//! The reading half lives in [`reader`](crate::reader), the writing half in
//! [`writer`](crate::writer); both are methods on [`ResolvConf`].

use crate::config::ResolvConfConfig;
use crate::state::ResolverState;
use std::path::Path;

/// Keeps a managed `resolv.conf` in sync with a [`ResolverState`].
///
/// # Lifecycle
///
/// 1. At service start, create the handle and one state with
///    [`new_state`](Self::new_state).
/// 2. Whenever the network configuration may have changed, call
///    [`regenerate`](Self::regenerate). It absorbs edits to the external
///    file first, then rewrites the managed copy.
/// 3. Call [`reconcile`](Self::reconcile) alone when only the in-memory
///    list needs to be current, e.g. before answering a query.
///
/// # Loop avoidance
///
/// When the external file is a symlink to the managed copy (the usual
/// setup), reading it would only feed back our own output. The reader
/// compares device and inode of both paths and skips the file in that case.
///
/// # Example
///
/// ```rust,ignore
/// use resolvconf_sync::ResolvConf;
///
/// let resolv = ResolvConf::new();
/// let mut state = resolv.new_state();
/// resolv.regenerate(&mut state, &mut ())?;
/// ```
#[derive(Debug, Clone)]
pub struct ResolvConf {
    pub(crate) config: ResolvConfConfig,
}

impl ResolvConf {
    /// Creates a handle using `/etc/resolv.conf` and the default managed path.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ResolvConfConfig::new())
    }

    /// Creates a handle with custom paths and limits (useful for testing).
    #[must_use]
    pub const fn with_config(config: ResolvConfConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration this handle was built with.
    #[must_use]
    pub const fn config(&self) -> &ResolvConfConfig {
        &self.config
    }

    /// Returns the external file path.
    #[must_use]
    pub fn external_path(&self) -> &Path {
        &self.config.external_path
    }

    /// Returns the managed copy path.
    #[must_use]
    pub fn managed_path(&self) -> &Path {
        &self.config.managed_path
    }

    /// Creates empty state honouring the configured ingestion flag.
    #[must_use]
    pub const fn new_state(&self) -> ResolverState {
        ResolverState::new(self.config.read_external)
    }
}

impl Default for ResolvConf {
    fn default() -> Self {
        Self::new()
    }
}
