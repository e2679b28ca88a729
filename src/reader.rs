//! Ingestion of the external `resolv.conf`.
//!
//! Only three directives are understood:
//!
//! ```text
//! nameserver <address>
//! domain <domain>...
//! search <domain>...
//! ```
//!
//! `domain` and `search` are treated alike. Everything else, including
//! `options` and `sortlist`, is ignored. Lines whose first non-blank
//! character is `#` or `;` are comments.

use crate::address::ServerAddress;
use crate::error::{ResolvConfError, Result};
use crate::hooks::ResolverHooks;
use crate::resolv_conf::ResolvConf;
use crate::state::{ResolverState, ServerOrigin};
use crate::util::FileIdentity;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};

/// What a [`ResolvConf::reconcile`] pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Ingestion is switched off for this state.
    Disabled,
    /// The external file does not exist.
    Missing,
    /// The external file has not been modified since the last ingestion.
    Unchanged,
    /// The external file is the managed copy itself.
    OwnCopy,
    /// The file was parsed and merged.
    Applied {
        /// Servers of all origins after the merge.
        servers: usize,
        /// Search domains after the merge.
        search_domains: usize,
    },
}

impl ResolvConf {
    /// Merges the external file into `state` if it changed.
    ///
    /// On a changed file, all `System` servers and all search domains are
    /// replaced by the file's contents, the active server is reset to the
    /// first entry and `hooks` are told to flush their cache.
    ///
    /// Malformed addresses and domains are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ResolvConfError::Read`] if the file exists but cannot be
    /// stat'ed, opened or read. Everything previously learned from it has
    /// been removed from `state` by then.
    pub fn reconcile<H: ResolverHooks + ?Sized>(
        &self,
        state: &mut ResolverState,
        hooks: &mut H,
    ) -> Result<ReadOutcome> {
        if !state.read_external() {
            return Ok(ReadOutcome::Disabled);
        }

        let path = self.external_path();
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "External resolv.conf does not exist, skipping");
                return Ok(ReadOutcome::Missing);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to stat external resolv.conf");
                return Err(self.fail_safe(state, hooks, e));
            }
        };

        if meta.modified().ok() == state.external_mtime() && state.external_mtime().is_some() {
            return Ok(ReadOutcome::Unchanged);
        }

        if let Ok(own) = FileIdentity::of_path(self.managed_path()) {
            if FileIdentity::of(&meta) == own {
                tracing::debug!(
                    path = %path.display(),
                    managed = %self.managed_path().display(),
                    "External resolv.conf is our managed copy, skipping"
                );
                return Ok(ReadOutcome::OwnCopy);
            }
        }

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ReadOutcome::Missing),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to open external resolv.conf");
                return Err(self.fail_safe(state, hooks, e));
            }
        };

        // Take the timestamp from the handle we actually read.
        let mtime = match file.metadata().and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to stat open file");
                return Err(self.fail_safe(state, hooks, e));
            }
        };

        state.mark_system_servers();
        state.mark_search_domains();

        if let Err(e) = ingest(BufReader::new(file), state) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read external resolv.conf");
            return Err(self.fail_safe(state, hooks, e));
        }

        state.set_external_mtime(Some(mtime));
        let swept = state.sweep_marked();

        // Some network managers prepend VPN servers without dropping the
        // local ones, so always restart from the top after a change.
        hooks.active_server_changed(state.reset_active_to_first());
        hooks.flush_cache();

        tracing::info!(
            path = %path.display(),
            servers = state.servers().len(),
            search_domains = state.search_domains().len(),
            removed_servers = swept.servers,
            removed_search_domains = swept.search_domains,
            "Applied external resolv.conf"
        );
        Ok(ReadOutcome::Applied {
            servers: state.servers().len(),
            search_domains: state.search_domains().len(),
        })
    }

    /// Drops everything learned from the external file and builds the error.
    fn fail_safe<H: ResolverHooks + ?Sized>(
        &self,
        state: &mut ResolverState,
        hooks: &mut H,
        source: std::io::Error,
    ) -> ResolvConfError {
        let before = state.active_server().map(|s| *s.address());
        let swept = state.clear_system();
        let after = state.active_server();
        if before != after.map(|s| *s.address()) {
            hooks.active_server_changed(after);
        }
        tracing::warn!(
            path = %self.external_path().display(),
            removed_servers = swept.servers,
            removed_search_domains = swept.search_domains,
            "Dropped configuration learned from external resolv.conf"
        );
        ResolvConfError::Read {
            path: self.external_path().to_path_buf(),
            source,
        }
    }
}

/// Applies every line of `reader` to `state`. Only I/O errors are returned.
fn ingest<R: BufRead>(mut reader: R, state: &mut ResolverState) -> std::io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        apply_line(String::from_utf8_lossy(&buf).trim(), state);
    }
}

/// Adds or re-marks the entries named by one resolv.conf line.
fn apply_line(line: &str, state: &mut ResolverState) {
    if line.is_empty() || line.starts_with(['#', ';']) {
        return;
    }

    if let Some(address) = first_word(line, "nameserver") {
        match address.parse::<ServerAddress>() {
            Ok(address) => {
                state.add_server(ServerOrigin::System, address);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to parse DNS server address, ignoring"),
        }
        return;
    }

    if let Some(domains) = first_word(line, "domain").or_else(|| first_word(line, "search")) {
        for domain in domains.split_whitespace() {
            if let Err(e) = state.add_search_domain(domain) {
                tracing::warn!(error = %e, "Failed to parse search domain, ignoring");
            }
        }
    }
}

/// Returns the rest of `line` if it starts with the keyword `word`.
///
/// The keyword must be followed by whitespace or end the line, so
/// `nameservers 1.2.3.4` does not match `nameserver`.
fn first_word<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(word)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.starts_with(char::is_whitespace)
        .then(|| rest.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvConfConfig;
    use crate::hooks::recording::Recorder;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    fn resolv_in(dir: &Path) -> ResolvConf {
        ResolvConf::with_config(
            ResolvConfConfig::new()
                .with_external_path(dir.join("resolv.conf"))
                .with_managed_path(dir.join("run").join("resolv.conf")),
        )
    }

    /// Writes the external file with an explicit, strictly increasing mtime.
    fn write_external(resolv: &ResolvConf, content: &str, secs: u64) {
        std::fs::write(resolv.external_path(), content).unwrap();
        let file = File::options().write(true).open(resolv.external_path()).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + secs))
            .unwrap();
    }

    fn servers(state: &ResolverState) -> Vec<(&str, ServerOrigin)> {
        state
            .servers()
            .iter()
            .map(|s| (s.as_str(), s.origin()))
            .collect()
    }

    fn domains(state: &ResolverState) -> Vec<&str> {
        state.compile_search_domains()
    }

    #[test]
    fn first_word_requires_separator() {
        assert_eq!(first_word("nameserver 1.2.3.4", "nameserver"), Some("1.2.3.4"));
        assert_eq!(first_word("nameserver\t\t::1", "nameserver"), Some("::1"));
        assert_eq!(first_word("nameserver", "nameserver"), Some(""));
        assert_eq!(first_word("nameservers 1.2.3.4", "nameserver"), None);
        assert_eq!(first_word("Nameserver 1.2.3.4", "nameserver"), None);
        assert_eq!(first_word("search a b", "domain"), None);
    }

    #[test]
    fn parses_directives_and_skips_noise() {
        let dir = tempfile::tempdir().unwrap();
        let resolv = resolv_in(dir.path());
        write_external(
            &resolv,
            "# generated by dhclient\n\
             ; old style comment\n\
             \n\
             nameserver 192.0.2.1\n\
             \tnameserver 2001:db8::1   \n\
             nameserver not-an-address\n\
             nameserver\n\
             options edns0 trust-ad\n\
             domain corp.example\n\
             search lab.example bad..name Corp.Example.\n\
             nameservers 192.0.2.99\n\
             nameserver 192.0.2.2\n",
            1,
        );

        let mut state = resolv.new_state();
        let mut hooks = Recorder::default();
        let outcome = resolv.reconcile(&mut state, &mut hooks).unwrap();

        assert_eq!(
            outcome,
            ReadOutcome::Applied { servers: 3, search_domains: 2 }
        );
        assert_eq!(
            servers(&state),
            [
                ("192.0.2.1", ServerOrigin::System),
                ("2001:db8::1", ServerOrigin::System),
                ("192.0.2.2", ServerOrigin::System),
            ]
        );
        assert_eq!(domains(&state), ["corp.example", "lab.example"]);
        assert_eq!(hooks.active, [Some("192.0.2.1".to_string())]);
        assert_eq!(hooks.flushes, 1);
    }

    #[test]
    fn disabled_and_missing_are_noops() {
        let dir = tempfile::tempdir().unwrap();
        let resolv = resolv_in(dir.path());
        let mut hooks = Recorder::default();

        let mut state = resolv.new_state();
        assert_eq!(resolv.reconcile(&mut state, &mut hooks).unwrap(), ReadOutcome::Missing);

        write_external(&resolv, "nameserver 192.0.2.1\n", 1);
        state.set_read_external(false);
        assert_eq!(resolv.reconcile(&mut state, &mut hooks).unwrap(), ReadOutcome::Disabled);
        assert!(state.servers().is_empty());
        assert_eq!(hooks.flushes, 0);
    }

    #[test]
    fn unchanged_file_is_not_reparsed() {
        let dir = tempfile::tempdir().unwrap();
        let resolv = resolv_in(dir.path());
        write_external(&resolv, "nameserver 192.0.2.1\nnameserver 192.0.2.2\n", 1);

        let mut state = resolv.new_state();
        let mut hooks = Recorder::default();
        resolv.reconcile(&mut state, &mut hooks).unwrap();

        // Switch away from the first server; an unchanged file must not undo it.
        state.next_server();
        let snapshot = state.clone();
        let mtime = state.external_mtime();

        assert_eq!(resolv.reconcile(&mut state, &mut hooks).unwrap(), ReadOutcome::Unchanged);
        assert_eq!(state.external_mtime(), mtime);
        assert_eq!(state.servers(), snapshot.servers());
        assert_eq!(state.active_server().unwrap().as_str(), "192.0.2.2");
        assert_eq!(hooks.flushes, 1);
    }

    #[test]
    fn vanished_entries_are_swept() {
        let dir = tempfile::tempdir().unwrap();
        let resolv = resolv_in(dir.path());
        let mut state = resolv.new_state();
        state.add_server(ServerOrigin::System, "192.0.2.1".parse().unwrap());
        state.add_server(ServerOrigin::System, "192.0.2.2".parse().unwrap());
        state.add_server(ServerOrigin::Link { ifindex: 2 }, "198.51.100.1".parse().unwrap());
        state.add_search_domain("gone.example").unwrap();

        write_external(&resolv, "nameserver 192.0.2.2\nsearch new.example\n", 1);
        resolv.reconcile(&mut state, &mut ()).unwrap();

        assert_eq!(
            servers(&state),
            [
                ("192.0.2.2", ServerOrigin::System),
                ("198.51.100.1", ServerOrigin::Link { ifindex: 2 }),
            ]
        );
        assert_eq!(domains(&state), ["new.example"]);
    }

    #[test]
    fn change_fails_over_to_first_server() {
        let dir = tempfile::tempdir().unwrap();
        let resolv = resolv_in(dir.path());
        let mut state = resolv.new_state();
        let mut hooks = Recorder::default();

        write_external(&resolv, "nameserver 192.0.2.1\nnameserver 192.0.2.2\n", 1);
        resolv.reconcile(&mut state, &mut hooks).unwrap();
        assert!(state.set_active_server(&"192.0.2.2".parse().unwrap()));

        // Identical content, new mtime: still a change.
        write_external(&resolv, "nameserver 192.0.2.1\nnameserver 192.0.2.2\n", 2);
        resolv.reconcile(&mut state, &mut hooks).unwrap();

        assert_eq!(state.active_server().unwrap().as_str(), "192.0.2.1");
        assert_eq!(hooks.flushes, 2);
        assert_eq!(hooks.active.len(), 2);
    }

    #[test]
    fn symlink_to_managed_copy_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let resolv = resolv_in(dir.path());
        std::fs::create_dir_all(resolv.managed_path().parent().unwrap()).unwrap();
        std::fs::write(resolv.managed_path(), "nameserver 192.0.2.1\n").unwrap();
        std::os::unix::fs::symlink(resolv.managed_path(), resolv.external_path()).unwrap();

        let mut state = resolv.new_state();
        let mut hooks = Recorder::default();
        assert_eq!(resolv.reconcile(&mut state, &mut hooks).unwrap(), ReadOutcome::OwnCopy);
        assert!(state.servers().is_empty());
        assert_eq!(state.external_mtime(), None);
        assert_eq!(hooks.flushes, 0);
    }

    #[test]
    fn unreadable_file_clears_system_entries() {
        let dir = tempfile::tempdir().unwrap();
        let resolv = resolv_in(dir.path());
        let mut state = resolv.new_state();
        state.add_server(ServerOrigin::System, "192.0.2.1".parse().unwrap());
        state.add_server(ServerOrigin::Fallback, "192.0.2.53".parse().unwrap());
        state.add_search_domain("corp.example").unwrap();

        // Opening a directory succeeds, reading it fails.
        std::fs::create_dir(resolv.external_path()).unwrap();
        let mut hooks = Recorder::default();
        let err = resolv.reconcile(&mut state, &mut hooks).unwrap_err();

        assert!(matches!(err, ResolvConfError::Read { .. }));
        assert_eq!(servers(&state), [("192.0.2.53", ServerOrigin::Fallback)]);
        assert!(state.search_domains().is_empty());
        assert_eq!(hooks.active, [Some("192.0.2.53".to_string())]);
        assert_eq!(hooks.flushes, 0);
    }

    #[test]
    fn recovers_after_failed_read() {
        let dir = tempfile::tempdir().unwrap();
        let resolv = resolv_in(dir.path());
        let mut state = resolv.new_state();

        write_external(&resolv, "nameserver 192.0.2.1\n", 1);
        resolv.reconcile(&mut state, &mut ()).unwrap();

        std::fs::remove_file(resolv.external_path()).unwrap();
        std::fs::create_dir(resolv.external_path()).unwrap();
        assert!(resolv.reconcile(&mut state, &mut ()).is_err());
        assert!(state.servers().is_empty());

        // Same mtime as the first ingestion must still be re-read.
        std::fs::remove_dir(resolv.external_path()).unwrap();
        write_external(&resolv, "nameserver 192.0.2.1\n", 1);
        assert!(matches!(
            resolv.reconcile(&mut state, &mut ()).unwrap(),
            ReadOutcome::Applied { servers: 1, .. }
        ));
    }

    #[test]
    fn tolerates_invalid_utf8() {
        let mut state = ResolverState::default();
        ingest(
            &b"search \xff\xfe.example ok.example\nnameserver 192.0.2.1\n"[..],
            &mut state,
        )
        .unwrap();
        assert_eq!(domains(&state), ["ok.example"]);
        assert_eq!(state.servers().len(), 1);
    }
}
