//! Generation of the managed `resolv.conf`.
//!
//! Layout of the generated file:
//!
//! ```text
//! # This file is managed by resolvconf-sync. Do not edit.
//! #
//! # Third party programs must not access this file directly, but
//! # only through the symlink at /etc/resolv.conf. To manage
//! # resolv.conf(5) in a different way, replace the symlink by a
//! # static file or a different symlink.
//!
//! nameserver 192.0.2.1
//! nameserver 2001:db8::1
//! search corp.example lab.example
//! ```
//!
//! The file is written to a temporary sibling and renamed into place, so
//! readers see either the old or the new content, never a partial one.

use crate::config::ResolvConfConfig;
use crate::error::{ResolvConfError, Result};
use crate::hooks::ResolverHooks;
use crate::resolv_conf::ResolvConf;
use crate::state::{ResolverState, ServerEntry};
use std::ffi::OsString;
use std::fs::Permissions;
use std::io::{BufWriter, ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::NamedTempFile;

const NO_SERVERS: &str = "# No DNS servers known.\n";
const TOO_MANY_SERVERS: &str =
    "# Too many DNS servers configured, the following entries may be ignored.\n";
const TOO_MANY_DOMAINS: &str =
    "# Too many search domains configured, remaining ones ignored.\n";
const DOMAINS_TOO_LONG: &str =
    "# Total length of all search domains is too long, remaining ones ignored.\n";

/// Mode of the managed copy.
const MANAGED_MODE: u32 = 0o644;

impl ResolvConf {
    /// Rewrites the managed copy from `state`.
    ///
    /// The external file is reconciled first so its latest edits are
    /// included; a failure there is logged and does not stop the write.
    ///
    /// # Errors
    ///
    /// Returns [`ResolvConfError::Write`] if the managed copy could not be
    /// written. A previous copy survives when the temporary file could not
    /// even be created; any later failure removes it instead of leaving it
    /// half-written. The temporary file is never left behind.
    pub fn regenerate<H: ResolverHooks + ?Sized>(
        &self,
        state: &mut ResolverState,
        hooks: &mut H,
    ) -> Result<()> {
        if let Err(e) = self.reconcile(state, hooks) {
            tracing::warn!(error = %e, "Regenerating without external resolv.conf");
        }

        let content = self.render(state);
        write_atomic(self.managed_path(), |out| out.write_all(content.as_bytes()))?;

        tracing::info!(
            path = %self.managed_path().display(),
            servers = state.compile_servers().len(),
            search_domains = state.search_domains().len(),
            "Wrote managed resolv.conf"
        );
        Ok(())
    }

    /// Renders the managed copy for `state` without touching the disk.
    #[must_use]
    pub fn render(&self, state: &ResolverState) -> String {
        render(
            &self.config,
            &state.compile_servers(),
            &state.compile_search_domains(),
        )
    }
}

/// Fixed comment block naming the owner and the symlink third parties use.
fn header(config: &ResolvConfConfig) -> String {
    format!(
        "# This file is managed by {service}. Do not edit.\n\
         #\n\
         # Third party programs must not access this file directly, but\n\
         # only through the symlink at {external}. To manage\n\
         # resolv.conf(5) in a different way, replace the symlink by a\n\
         # static file or a different symlink.\n\n",
        service = config.service_name,
        external = config.external_path.display(),
    )
}

/// Formats the managed copy from already deduplicated lists.
///
/// Servers past `max_nameservers` are still written, after a comment;
/// enforcing the limit is up to the resolver library. Search domains stop
/// at whichever cap is hit first.
pub(crate) fn render(config: &ResolvConfConfig, servers: &[&ServerEntry], domains: &[&str]) -> String {
    let mut out = header(config);

    if servers.is_empty() {
        out.push_str(NO_SERVERS);
    }
    for (count, server) in servers.iter().enumerate() {
        if count == config.max_nameservers {
            out.push_str(TOO_MANY_SERVERS);
        }
        out.push_str("nameserver ");
        out.push_str(server.as_str());
        out.push('\n');
    }

    if domains.is_empty() {
        return out;
    }

    let mut written = Vec::new();
    let mut length = 0;
    let mut capped = None;
    for domain in domains {
        if written.len() >= config.max_search_domains {
            capped = Some(TOO_MANY_DOMAINS);
            break;
        }
        if length + domain.len() > config.max_search_length {
            capped = Some(DOMAINS_TOO_LONG);
            break;
        }
        length += domain.len();
        written.push(*domain);
    }

    if !written.is_empty() {
        out.push_str("search ");
        out.push_str(&written.join(" "));
        out.push('\n');
    }
    if let Some(comment) = capped {
        out.push_str(comment);
    }
    out
}

/// Replaces `path` with what `fill` writes, via a temporary sibling.
///
/// If the temporary file cannot be created, `path` is left as it was. Once
/// writing has started, any failure removes `path` rather than leaving it
/// stale or truncated, and the temporary file is deleted when its guard
/// drops.
pub(crate) fn write_atomic<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let tmp = match create_temp(path) {
        Ok(tmp) => tmp,
        Err(source) => {
            tracing::warn!(
                path = %path.display(),
                error = %source,
                "Failed to create temporary resolv.conf, keeping managed copy"
            );
            return Err(ResolvConfError::Write {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let Err(source) = fill_and_persist(tmp, path, fill) else {
        return Ok(());
    };

    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove managed resolv.conf"),
    }
    tracing::warn!(path = %path.display(), error = %source, "Failed to write managed resolv.conf");
    Err(ResolvConfError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Creates the temporary sibling `.<name>.XXXXXX` next to `path`, mode 0644.
fn create_temp(path: &Path) -> std::io::Result<NamedTempFile> {
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "managed path has no file name"))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut prefix = OsString::from(".");
    prefix.push(file_name);
    prefix.push(".");
    let tmp = tempfile::Builder::new().prefix(&prefix).tempfile_in(dir)?;

    if let Err(e) = tmp.as_file().set_permissions(Permissions::from_mode(MANAGED_MODE)) {
        tracing::warn!(path = %tmp.path().display(), error = %e, "Failed to set mode of temporary resolv.conf");
    }
    Ok(tmp)
}

/// Writes, flushes and syncs `tmp`, then renames it onto `path`.
fn fill_and_persist<F>(tmp: NamedTempFile, path: &Path, fill: F) -> std::io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    {
        let mut out = BufWriter::new(tmp.as_file());
        fill(&mut out)?;
        out.flush()?;
    }
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
