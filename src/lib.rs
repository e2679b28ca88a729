//! # resolvconf-sync
//!
//! Reconcile `/etc/resolv.conf` with the nameserver list of a long-running
//! DNS service, and keep a service-managed copy of the file in sync.
//!
//! Third-party tools (DHCP clients, VPN clients, network managers) write
//! `/etc/resolv.conf`. A local resolver service wants to know about those
//! servers, but also wants `/etc/resolv.conf` to be a symlink to a file it
//! generates itself. This crate handles both directions:
//!
//! - [`ResolvConf::reconcile`] ingests the external file when its
//!   modification time changes, replacing every server and search domain
//!   previously learned from it (mark-and-sweep). It refuses to read the
//!   file when it is a symlink to the managed copy.
//! - [`ResolvConf::regenerate`] reconciles first, then writes the
//!   deduplicated list to the managed copy through a temporary file and an
//!   atomic rename.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use resolvconf_sync::{ResolvConf, ResolvConfConfig, ServerOrigin};
//!
//! let resolv = ResolvConf::with_config(
//!     ResolvConfConfig::new().with_managed_path("/run/mydns/resolv.conf"),
//! );
//! let mut state = resolv.new_state();
//!
//! // Servers pushed by other parts of the service.
//! state.add_server(ServerOrigin::Link { ifindex: 2 }, "192.0.2.1".parse()?);
//!
//! // On every network change.
//! resolv.regenerate(&mut state, &mut ())?;
//! ```
//!
//! ## Hooks
//!
//! Implement [`ResolverHooks`] to be told when an external change re-points
//! the active server and when cached answers should be dropped.
//!
//! ## Threading
//!
//! Everything is synchronous. [`ResolverState`] belongs to one thread of
//! the owning service and is passed by `&mut`; nothing here locks.
//!
//! ## Permissions
//!
//! Writing the default managed path under `/run` requires root. The caller
//! is responsible for privileges. Only Unix targets are supported.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod address;
pub mod config;
pub mod domain;
pub mod error;
pub mod hooks;
pub mod reader;
pub mod resolv_conf;
pub mod state;
pub mod util;
pub mod writer;

pub use address::ServerAddress;
pub use config::ResolvConfConfig;
pub use domain::normalize_search_domain;
pub use error::{ResolvConfError, Result};
pub use hooks::ResolverHooks;
pub use reader::ReadOutcome;
pub use resolv_conf::ResolvConf;
pub use state::{ResolverState, SearchDomainEntry, ServerEntry, ServerOrigin, Swept};
