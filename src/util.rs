//! Internal utilities.

use std::fs::Metadata;
use std::path::Path;

/// Identity of a file on disk, independent of the path used to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    /// Extracts the device+inode pair from already-fetched metadata.
    #[must_use]
    pub fn of(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }

    /// Resolves `path` (following symlinks) to its identity.
    ///
    /// # Errors
    ///
    /// Returns the `stat` failure, including `NotFound`.
    pub fn of_path(path: &Path) -> std::io::Result<Self> {
        Ok(Self::of(&std::fs::metadata(path)?))
    }
}

/// Looks up the kernel index of a network interface by name.
///
/// Returns `None` for unknown names or names containing NUL.
#[must_use]
pub fn interface_index(name: &str) -> Option<u32> {
    let name = std::ffi::CString::new(name).ok()?;
    // SAFETY: `name` is a valid NUL-terminated string that outlives the call;
    // `if_nametoindex` only reads it.
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    (index != 0).then_some(index)
}

/// Name of the loopback interface on the build host.
#[cfg(test)]
pub(crate) const LOOPBACK: &str = if cfg!(target_os = "linux") { "lo" } else { "lo0" };

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symlink_resolves_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        std::fs::write(&target, "x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(
            FileIdentity::of_path(&link).unwrap(),
            FileIdentity::of_path(&target).unwrap()
        );
    }

    #[test]
    fn distinct_files_differ() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, "x").unwrap();
        std::fs::write(&b, "x").unwrap();

        assert_ne!(
            FileIdentity::of_path(&a).unwrap(),
            FileIdentity::of_path(&b).unwrap()
        );
        assert!(FileIdentity::of_path(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn loopback_has_an_index() {
        assert!(interface_index(LOOPBACK).is_some());
        assert_eq!(interface_index("no-such-iface0"), None);
        assert_eq!(interface_index("bad\0name"), None);
    }
}
