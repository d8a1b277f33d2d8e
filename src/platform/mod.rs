use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// OS-specific filesystem conventions behind one interface so call sites
/// stay free of `#[cfg]` blocks.
pub trait Platform {
    /// Set restrictive *directory* permissions (0o700 on Unix, no-op on Windows).
    fn restrict_dir_permissions(path: &Path);

    /// Set restrictive *file* permissions (0o600 on Unix, no-op on Windows).
    fn restrict_file_permissions(path: &Path);

    /// Binary filename for this platform (`"questflow"` / `"questflow.exe"`).
    fn binary_name() -> &'static str;

    /// Default root data directory.
    /// Unix: `~/.questflow`, Windows: `%APPDATA%\questflow`.
    fn default_data_dir() -> Option<PathBuf>;
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::NativePlatform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::NativePlatform;

pub const DATA_DIR_ENV: &str = "QUESTFLOW_DATA_DIR";

/// Data directory from `QUESTFLOW_DATA_DIR`, falling back to the platform default.
pub fn resolve_data_dir(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = env(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    NativePlatform::default_data_dir().context("Could not find home directory")
}

/// Creates the data directory (if needed) with owner-only permissions.
pub fn ensure_data_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    NativePlatform::restrict_dir_permissions(dir);
    Ok(())
}
