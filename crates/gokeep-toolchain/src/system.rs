use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Pass-through filesystem and environment capabilities. No retry
/// logic, no policy; one production adapter and test doubles behind it.
pub trait System: Send + Sync {
    fn stat(&self, path: &Path) -> io::Result<fs::Metadata>;
    fn lstat(&self, path: &Path) -> io::Result<fs::Metadata>;
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn remove_all(&self, path: &Path) -> io::Result<()>;
    fn mkdir_all(&self, path: &Path) -> io::Result<()>;
    fn env_var(&self, key: &str) -> Option<String>;

    /// Directories on the PATH variable, in order.
    fn path_entries(&self) -> Vec<PathBuf> {
        let Some(raw) = self.env_var("PATH") else {
            return Vec::new();
        };
        std::env::split_paths(&raw).collect()
    }

    /// Platform executable test: `.exe` extension on Windows, regular
    /// file with any execute bit on POSIX.
    fn is_executable(&self, path: &Path) -> bool {
        let Ok(metadata) = self.stat(path) else {
            return false;
        };
        if !metadata.is_file() {
            return false;
        }

        #[cfg(windows)]
        {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            metadata.permissions().mode() & 0o111 != 0
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsSystem;

impl System for OsSystem {
    fn stat(&self, path: &Path) -> io::Result<fs::Metadata> {
        fs::metadata(path)
    }

    fn lstat(&self, path: &Path) -> io::Result<fs::Metadata> {
        fs::symlink_metadata(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            entries.push(entry?.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(target, link)
        }

        #[cfg(windows)]
        {
            std::os::windows::fs::symlink_file(target, link)
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn env_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}
