//! Callbacks into the owning service.

use crate::state::ServerEntry;

/// Collaborators notified when the external file changes the server set.
///
/// Both methods default to no-ops, and `()` implements the trait for
/// callers that keep no cache and track the active server through
/// [`ResolverState::active_server`](crate::ResolverState::active_server).
pub trait ResolverHooks {
    /// Called after ingestion re-points the active server at the first entry.
    fn active_server_changed(&mut self, _server: Option<&ServerEntry>) {}

    /// Called once per ingestion of a changed external file.
    fn flush_cache(&mut self) {}
}

impl ResolverHooks for () {}
