//! Module directory configuration.
//!
//! Bare module names are resolved against the system module directory
//! first and a per-user fallback directory second. Absolute paths bypass
//! both.

use std::path::PathBuf;

/// Environment variable names.
pub mod env_vars {
    /// Overrides the system module directory.
    pub const MODULE_DIR: &str = "MODKIT_MODULE_DIR";
}

/// Default locations.
pub mod defaults {
    /// System module directory when `MODKIT_MODULE_DIR` is unset.
    pub const MODULE_DIR: &str = "/usr/lib/modkit/modules";

    /// Per-user module directory, relative to the home directory.
    pub const USER_SUBDIR: &str = ".modkit/modules";
}

/// The directories consulted when resolving a bare module name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDirs {
    /// System-wide module directory.
    pub system: PathBuf,

    /// Per-user fallback directory; `None` when no home directory exists.
    pub user: Option<PathBuf>,
}

impl ModuleDirs {
    /// Build from the environment: `MODKIT_MODULE_DIR` (or the compiled-in
    /// default) plus `~/.modkit/modules`.
    pub fn from_env() -> Self {
        let system = std::env::var(env_vars::MODULE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::MODULE_DIR));
        let user = dirs::home_dir().map(|home| home.join(defaults::USER_SUBDIR));
        Self { system, user }
    }

    /// Explicit directories, mainly for tests and embedders.
    pub fn new(system: impl Into<PathBuf>, user: Option<PathBuf>) -> Self {
        Self {
            system: system.into(),
            user,
        }
    }

    /// Directories in resolution order.
    pub fn search_order(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.system).chain(self.user.as_ref())
    }
}

impl Default for ModuleDirs {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dirs_search_order() {
        let dirs = ModuleDirs::new("/opt/mods", Some(PathBuf::from("/home/u/.modkit/modules")));
        let order: Vec<_> = dirs.search_order().collect();
        assert_eq!(order.len(), 2);
        assert_eq!(order[0], &PathBuf::from("/opt/mods"));
    }

    #[test]
    fn missing_user_dir_is_skipped() {
        let dirs = ModuleDirs::new("/opt/mods", None);
        assert_eq!(dirs.search_order().count(), 1);
    }
}
